//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// CSS class for a status badge.
///
/// Usage in templates: `<span class="badge {{ request.status|badge_class }}">`
#[askama::filter_fn]
pub fn badge_class(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(badge_class_for(&value.to_string()))
}

fn badge_class_for(status: &str) -> &'static str {
    match status {
        "pending" | "new" => "badge-warning",
        "approved" | "won" | "active" => "badge-success",
        "rejected" | "lost" | "inactive" => "badge-danger",
        "contacted" | "negotiating" | "quoted" => "badge-info",
        _ => "badge-neutral",
    }
}
