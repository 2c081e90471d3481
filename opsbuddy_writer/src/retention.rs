//! Optional retention sweep for old log rows.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use opsbuddy_store::logs;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Retention configuration, read from `LOG_RETENTION_DAYS`. Unset or
/// unparseable means the sweep is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionOptions {
    pub keep_days: Option<u32>,
}

impl RetentionOptions {
    pub fn from_env() -> Self {
        let keep_days = std::env::var("LOG_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|days| *days > 0);

        Self { keep_days }
    }
}

/// Periodically delete rows older than the retention window. Returns
/// immediately when retention is disabled.
pub async fn run_retention_sweep(
    pool: PgPool,
    options: RetentionOptions,
    ct: CancellationToken,
) {
    let Some(keep_days) = options.keep_days else {
        return;
    };

    info!(keep_days, "retention sweep enabled");
    let mut tick = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = ct.cancelled() => break,
            _ = tick.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(i64::from(keep_days));
                match logs::delete_older_than(&pool, cutoff).await {
                    Ok(0) => {}
                    Ok(deleted) => {
                        info!(deleted, cutoff = %cutoff.to_rfc3339(), "retention sweep deleted old logs");
                    }
                    Err(error) => warn!(error = %error, "retention sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_missing_retention_disables_the_sweep() {
        assert_eq!(RetentionOptions { keep_days: None }.keep_days, None);

        // Parsing happens in from_env; zero is filtered out.
        let parsed = "0".parse::<u32>().ok().filter(|days| *days > 0);
        assert_eq!(parsed, None);
    }
}
