//! Live pending-request count over Server-Sent Events.

use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use futures::StreamExt;
use serde::Serialize;

use crate::{middleware::RequireAdmin, state::AppState};

/// SSE event name carrying the count.
const EVENT_NAME: &str = "pending_count";

/// Payload of a `pending_count` event.
#[derive(Debug, Serialize)]
pub struct PendingCountEvent {
    pub count: i64,
}

/// Build the approvals API router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/api/approvals/pending-count", get(pending_count_stream))
}

fn to_event(count: i64) -> Event {
    let json = serde_json::to_string(&PendingCountEvent { count })
        .unwrap_or_else(|_| format!(r#"{{"count":{count}}}"#));
    Event::default().event(EVENT_NAME).data(json)
}

/// Stream the pending count: the current value, then every change.
///
/// GET /admin/api/approvals/pending-count
async fn pending_count_stream(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let updates = state.pending().updates().map(|count| Ok(to_event(count)));
    Sse::new(updates).keep_alive(KeepAlive::default())
}
