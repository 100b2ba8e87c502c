use std::{sync::OnceLock, time::Instant};

use deadpool_postgres::Client;
use tokio_postgres::{Row, types::ToSql};
use tracing::warn;

fn slow_query_threshold_ms() -> Option<u64> {
    static CACHE: OnceLock<Option<u64>> = OnceLock::new();

    *CACHE.get_or_init(|| {
        std::env::var("LBB_DB_LOG_MIN_DURATION_MS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|v| v.max(0) as u64)
            .filter(|v| *v > 0)
    })
}

fn maybe_log_slow_query(label: &str, started_at: Instant) {
    if let Some(threshold_ms) = slow_query_threshold_ms() {
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if elapsed_ms >= threshold_ms {
            warn!(query = label, elapsed_ms, "slow_query_detected");
        }
    }
}

/// Runs a read query through the pooled client's statement cache and logs it
/// when it exceeds `LBB_DB_LOG_MIN_DURATION_MS`.
pub async fn timed_query_cached(
    client: &Client,
    statement: &str,
    params: &[&(dyn ToSql + Sync)],
    label: &str,
) -> Result<Vec<Row>, tokio_postgres::Error> {
    let started = Instant::now();
    let prepared = client.prepare_cached(statement).await?;
    let result = client.query(&prepared, params).await;
    maybe_log_slow_query(label, started);
    result
}

/// Connectivity probe used by readiness checks.
pub async fn ping(client: &Client) -> Result<(), tokio_postgres::Error> {
    let started = Instant::now();
    let result = client.simple_query("SELECT 1").await.map(|_| ());
    maybe_log_slow_query("ping", started);
    result
}
