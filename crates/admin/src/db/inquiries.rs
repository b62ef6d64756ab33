//! Read-only inquiry queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use dazzle_core::{Email, InquiryId, InquiryStatus};

use super::RepositoryError;

/// A customer inquiry.
#[derive(Debug, Clone)]
pub struct Inquiry {
    pub id: InquiryId,
    pub name: String,
    /// Kept as entered on the public form; not validated.
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: String,
    pub product_interest: Option<String>,
    pub quantity: Option<i32>,
    pub status: InquiryStatus,
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Inquiry {
    /// Case-insensitive substring match on name, email, company or product.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        let contains = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(&needle))
        };
        needle.is_empty()
            || contains(Some(&self.name))
            || contains(Some(&self.email))
            || contains(self.company.as_deref())
            || contains(self.product_interest.as_deref())
    }

    /// Whether the stored email parses as an address (for `mailto:` links).
    #[must_use]
    pub fn has_valid_email(&self) -> bool {
        Email::parse(&self.email).is_ok()
    }
}

/// Internal row type; `status` is read as text from the enum column.
#[derive(Debug, sqlx::FromRow)]
struct InquiryRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    message: String,
    product_interest: Option<String>,
    quantity: Option<i32>,
    status: String,
    priority: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InquiryRow> for Inquiry {
    type Error = RepositoryError;

    fn try_from(row: InquiryRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<InquiryStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: InquiryId::new(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            message: row.message,
            product_interest: row.product_interest,
            quantity: row.quantity,
            status,
            priority: row.priority,
            created_at: row.created_at,
        })
    }
}

/// Repository for inquiry queries.
pub struct InquiryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InquiryRepository<'a> {
    /// Create a new inquiry repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List inquiries newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status is unknown.
    pub async fn list(
        &self,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<Inquiry>, RepositoryError> {
        let rows = sqlx::query_as::<_, InquiryRow>(
            r"
            SELECT id, name, email, phone, company, message, product_interest,
                   quantity, status::text AS status, priority, created_at
            FROM public.inquiries
            WHERE ($1::text IS NULL OR status::text = $1)
            ORDER BY created_at DESC
            ",
        )
        .bind(status.map(InquiryStatus::as_str))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The `limit` most recent inquiries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status is unknown.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Inquiry>, RepositoryError> {
        let rows = sqlx::query_as::<_, InquiryRow>(
            r"
            SELECT id, name, email, phone, company, message, product_interest,
                   quantity, status::text AS status, priority, created_at
            FROM public.inquiries
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Count all inquiries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM public.inquiries")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count inquiries in the given status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_with_status(&self, status: InquiryStatus) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM public.inquiries WHERE status::text = $1",
        )
        .bind(status.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inquiry(company: Option<&str>) -> Inquiry {
        Inquiry {
            id: InquiryId::generate(),
            name: "Priya".to_owned(),
            email: "priya@lights.in".to_owned(),
            phone: None,
            company: company.map(String::from),
            message: "Need 500 panels".to_owned(),
            product_interest: Some("Round Panel".to_owned()),
            quantity: Some(500),
            status: InquiryStatus::New,
            priority: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_search_fields() {
        let i = inquiry(Some("Bright Co"));
        assert!(i.matches_search("priya"));
        assert!(i.matches_search("LIGHTS.IN"));
        assert!(i.matches_search("bright"));
        assert!(i.matches_search("panel"));
        assert!(!i.matches_search("strip"));
    }

    #[test]
    fn test_search_ignores_missing_company() {
        assert!(!inquiry(None).matches_search("bright"));
    }

    #[test]
    fn test_email_validity() {
        let mut i = inquiry(None);
        assert!(i.has_valid_email());
        i.email = "not an email".to_owned();
        assert!(!i.has_valid_email());
    }
}
