//! Product listing route handler.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    db::{Product, ProductRepository},
    filters,
    middleware::RequireAdmin,
    state::AppState,
};

use super::dashboard::{AdminUserView, LOAD_ERROR};

/// Product view for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price: String,
    pub mrp: Option<String>,
    pub moq: Option<i32>,
    pub image_url: Option<String>,
    pub is_featured: bool,
    pub status: &'static str,
}

fn format_price(amount: Decimal) -> String {
    format!("₹{}", amount.round_dp(2))
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let category = match &product.subcategory {
            Some(sub) if !sub.is_empty() => format!("{} / {sub}", product.category),
            _ => product.category.clone(),
        };
        Self {
            name: product.name.clone(),
            sku: product.sku.clone().unwrap_or_default(),
            category,
            price: format_price(product.price),
            mrp: product.mrp.map(format_price),
            moq: product.moq,
            image_url: product.image_url.clone(),
            is_featured: product.is_featured.unwrap_or(false),
            status: if product.is_active() { "active" } else { "inactive" },
        }
    }
}

/// Products list template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub pending_count: Option<i64>,
    pub products: Vec<ProductView>,
    pub total: usize,
    pub search: String,
    pub error_message: Option<String>,
}

/// Query parameters for the products list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub q: String,
}

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/products", get(index))
}

/// Products list page handler.
///
/// GET /admin/products
#[instrument(skip(auth, state))]
async fn index(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Html<String> {
    let (products, total, error_message) = match ProductRepository::new(state.pool()).list_all().await {
        Ok(all) => {
            let total = all.len();
            let matching = all
                .iter()
                .filter(|p| p.matches_search(&query.q))
                .map(ProductView::from)
                .collect();
            (matching, total, None)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch products");
            (vec![], 0, Some(LOAD_ERROR.to_string()))
        }
    };

    let template = ProductsIndexTemplate {
        admin_user: AdminUserView::from(&auth),
        current_path: "/admin/products".to_string(),
        pending_count: state.pending().current(),
        products,
        total,
        search: query.q,
        error_message,
    };

    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dazzle_core::ProductId;

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Crystal Brooch".to_string(),
            sku: Some("BR-001".to_string()),
            category: "Jewellery".to_string(),
            subcategory: Some("Brooches".to_string()),
            price: Decimal::new(124_950, 2),
            mrp: None,
            moq: Some(12),
            image_url: None,
            is_featured: None,
            is_active: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_view_formats_fields() {
        let view = ProductView::from(&product());

        assert_eq!(view.price, "₹1249.50");
        assert_eq!(view.category, "Jewellery / Brooches");
        assert_eq!(view.status, "active");
        assert!(!view.is_featured);
    }

    #[test]
    fn test_inactive_product() {
        let mut product = product();
        product.is_active = Some(false);
        assert_eq!(ProductView::from(&product).status, "inactive");
    }
}
