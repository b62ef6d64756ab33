//! Live count of pending admin requests.
//!
//! A trigger on `public.admin_requests` sends a notification on
//! [`CHANNEL`] for every change. A background task listens on that channel and
//! re-runs the count-only query on each notification, publishing the result
//! on a `watch` channel. Page renders read the latest value; the SSE endpoint
//! streams every change.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::watch;

use crate::db::{AdminRequestRepository, RepositoryError};

/// Notification channel written by the `admin_requests_notify` trigger.
pub const CHANNEL: &str = "admin_requests_changed";

/// Delay before reconnecting a dropped listener.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Read side of the pending count.
///
/// `None` until the first query completes.
#[derive(Clone)]
pub struct PendingCount {
    rx: watch::Receiver<Option<i64>>,
}

impl PendingCount {
    /// Latest known count.
    #[must_use]
    pub fn current(&self) -> Option<i64> {
        *self.rx.borrow()
    }

    /// Stream the current count, then every change.
    pub fn updates(&self) -> impl Stream<Item = i64> + Send + use<> {
        let mut rx = self.rx.clone();
        stream! {
            loop {
                let value = *rx.borrow_and_update();
                if let Some(count) = value {
                    yield count;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// A feed with a fixed value, for handlers exercised without a listener.
    #[must_use]
    pub fn fixed(count: Option<i64>) -> (watch::Sender<Option<i64>>, Self) {
        let (tx, rx) = watch::channel(count);
        (tx, Self { rx })
    }
}

/// Spawn the listener task and return the read side.
#[must_use]
pub fn spawn_listener(pool: PgPool) -> PendingCount {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(run_listener(pool, tx));
    PendingCount { rx }
}

async fn run_listener(pool: PgPool, tx: watch::Sender<Option<i64>>) {
    loop {
        match listen(&pool, &tx).await {
            Ok(ListenEnd::Closed) => {
                tracing::info!("Pending count listener stopped");
                return;
            }
            Ok(ListenEnd::ConnectionLost) => {
                tracing::warn!("Pending count listener lost its connection, reconnecting");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    delay_secs = RECONNECT_DELAY.as_secs(),
                    "Pending count listener failed, reconnecting"
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Why [`listen`] returned.
#[derive(Debug, PartialEq, Eq)]
enum ListenEnd {
    /// Every receiver is gone.
    Closed,
    /// The server closed the connection; notifications sent since were lost.
    ConnectionLost,
}

/// Listen until the connection drops or every receiver is gone.
async fn listen(pool: &PgPool, tx: &watch::Sender<Option<i64>>) -> Result<ListenEnd, RepositoryError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    tracing::info!(channel = CHANNEL, "Listening for admin request changes");

    // Changes made while disconnected were missed; start from a fresh count.
    refresh(pool, tx).await?;

    loop {
        // `recv` would reconnect silently; `None` here means the connection
        // dropped and the caller must listen again and re-count.
        let Some(notification) = listener.try_recv().await? else {
            return Ok(ListenEnd::ConnectionLost);
        };
        tracing::debug!(operation = notification.payload(), "Admin requests changed");
        refresh(pool, tx).await?;
        if tx.is_closed() {
            return Ok(ListenEnd::Closed);
        }
    }
}

async fn refresh(pool: &PgPool, tx: &watch::Sender<Option<i64>>) -> Result<(), RepositoryError> {
    let count = AdminRequestRepository::new(pool).count_pending().await?;
    tx.send_if_modified(|current| {
        let changed = *current != Some(count);
        *current = Some(count);
        changed
    });
    Ok(())
}
