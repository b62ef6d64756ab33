//! Integration tests for the live pending-request count.
//!
//! These tests require a `PostgreSQL` server reachable through `DATABASE_URL`.
//! Run with: cargo test -p dazzle-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use dazzle_admin::services::PendingCount;
use dazzle_admin::services::pending_count::spawn_listener;
use sqlx::PgPool;

/// Wait until the feed reports `expected`, failing after ten seconds.
async fn wait_for(feed: &PendingCount, expected: i64) {
    let reached = tokio::time::timeout(Duration::from_secs(10), async {
        while feed.current() != Some(expected) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "feed stuck at {:?}, expected {expected}",
        feed.current()
    );
}

/// Backend PID of the connection holding `LISTEN` in this database.
async fn listener_pid(pool: &PgPool) -> i32 {
    for _ in 0..100 {
        let pid = sqlx::query_scalar::<_, i32>(
            r"
            SELECT pid FROM pg_stat_activity
            WHERE datname = current_database() AND query ILIKE 'LISTEN%'
            ",
        )
        .fetch_optional(pool)
        .await
        .unwrap();
        if let Some(pid) = pid {
            return pid;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("listener connection never appeared");
}

async fn insert_pending(executor: impl sqlx::PgExecutor<'_>, email: &str) {
    sqlx::query(
        r"
        INSERT INTO public.admin_requests (user_id, full_name, email)
        VALUES (gen_random_uuid(), 'Test User', $1)
        ",
    )
    .bind(email)
    .execute(executor)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_count_follows_changes(pool: PgPool) {
    let feed = spawn_listener(pool.clone());
    wait_for(&feed, 0).await;

    insert_pending(&pool, "ann@x.com").await;
    wait_for(&feed, 1).await;

    sqlx::query("UPDATE public.admin_requests SET status = 'rejected', reviewed_at = now()")
        .execute(&pool)
        .await
        .unwrap();
    wait_for(&feed, 0).await;
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_count_recovers_changes_missed_while_disconnected(pool: PgPool) {
    let feed = spawn_listener(pool.clone());
    wait_for(&feed, 0).await;
    let pid = listener_pid(&pool).await;

    // The notification for this insert is sent at commit, after the
    // listener's connection is gone.
    let mut tx = pool.begin().await.unwrap();
    insert_pending(&mut *tx, "ann@x.com").await;
    sqlx::query("SELECT pg_terminate_backend($1, 5000)")
        .bind(pid)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    wait_for(&feed, 1).await;
}
