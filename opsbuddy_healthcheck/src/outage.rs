//! Outage state persistence.
//!
//! Both transitions run inside one transaction. The single active
//! downtime invariant holds because only the no-active-row path inserts.
//! Concurrent probes of the same product are tolerated: the second
//! transaction finds the row the first committed and takes the
//! nothing-to-do path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snafu::ResultExt;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use opsbuddy_bus::{EventType, NotificationEvent, NotificationPublisher};
use opsbuddy_store::products::ProductWithOwner;
use opsbuddy_store::{downtimes, products};

use opsbuddy_store::error::QuerySnafu;

use crate::error::{Result, StoreSnafu};

/// Records outage transitions. The engine only ever calls this through a
/// trait object so tests can observe transitions without a store.
#[async_trait]
pub trait OutageTracker: Send + Sync {
    /// The product failed its retry budget. Opens a downtime row and
    /// emits a `service_down` event, once per outage.
    async fn mark_service_down(&self, product_id: i64) -> Result<()>;

    /// The product recovered. Closes the active downtime row and emits a
    /// `service_up` event.
    async fn mark_service_up(&self, product_id: i64) -> Result<()>;
}

/// Store-backed tracker publishing through the notification bus.
pub struct PgOutageTracker {
    pool: PgPool,
    publisher: Arc<dyn NotificationPublisher>,
}

impl PgOutageTracker {
    pub fn new(pool: PgPool, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self { pool, publisher }
    }

    fn down_event(product: &ProductWithOwner, timestamp: DateTime<Utc>) -> NotificationEvent {
        NotificationEvent {
            product_id: product.id,
            user_email: product.user_email.clone(),
            timestamp,
            event_type: EventType::ServiceDown,
            message: format!("Service {} is down", product.name),
        }
    }
}

#[async_trait]
impl OutageTracker for PgOutageTracker {
    async fn mark_service_down(&self, product_id: i64) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context(QuerySnafu {
                message: "beginning outage transaction",
            })
            .context(StoreSnafu)?;
        let active = downtimes::active(&mut *tx, product_id)
            .await
            .context(StoreSnafu)?;
        let now = Utc::now();

        match active {
            None => {
                let downtime = downtimes::open(&mut *tx, product_id, now)
                    .await
                    .context(StoreSnafu)?;

                let Some(product) = products::find_with_owner(&mut *tx, product_id)
                    .await
                    .context(StoreSnafu)?
                else {
                    // Product row vanished under us; drop the transaction.
                    warn!(product_id, "product not found while recording downtime");
                    return Ok(());
                };

                match self.publisher.publish(&Self::down_event(&product, now)).await {
                    Ok(()) => {
                        downtimes::set_notification_sent(&mut *tx, downtime.id)
                            .await
                            .context(StoreSnafu)?;
                    }
                    Err(error) => {
                        // The row commits with the flag unset and the
                        // publish is retried on the next down-classification.
                        warn!(product_id, error = %error,
                            "failed to publish downtime notification");
                    }
                }

                tx.commit()
                    .await
                    .context(QuerySnafu {
                        message: "committing outage transaction",
                    })
                    .context(StoreSnafu)?;
                info!(product_id, "recorded downtime");
            }
            Some(downtime) if !downtime.is_notification_sent => {
                let Some(product) = products::find_with_owner(&mut *tx, product_id)
                    .await
                    .context(StoreSnafu)?
                else {
                    warn!(product_id, "product not found while retrying notification");
                    return Ok(());
                };

                if let Err(error) =
                    self.publisher.publish(&Self::down_event(&product, now)).await
                {
                    warn!(product_id, error = %error,
                        "failed to publish downtime notification");
                    return Ok(());
                }

                downtimes::set_notification_sent(&mut *tx, downtime.id)
                    .await
                    .context(StoreSnafu)?;
                tx.commit()
                    .await
                    .context(QuerySnafu {
                        message: "committing outage transaction",
                    })
                    .context(StoreSnafu)?;
                info!(product_id, "downtime notification sent");
            }
            Some(_) => {
                // Still down, notification already delivered.
            }
        }

        Ok(())
    }

    async fn mark_service_up(&self, product_id: i64) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context(QuerySnafu {
                message: "beginning outage transaction",
            })
            .context(StoreSnafu)?;
        let now = Utc::now();

        let Some(downtime) = downtimes::active(&mut *tx, product_id)
            .await
            .context(StoreSnafu)?
        else {
            // Recovery without a recorded outage; tolerated.
            warn!(product_id, "no active downtime record found");
            return Ok(());
        };

        downtimes::close(&mut *tx, downtime.id, now)
            .await
            .context(StoreSnafu)?;

        let duration = now.signed_duration_since(downtime.start_time);
        let product = products::find_with_owner(&mut *tx, product_id)
            .await
            .context(StoreSnafu)?;

        let (name, user_email) = match product {
            Some(product) => (product.name, product.user_email),
            None => (format!("product {product_id}"), String::new()),
        };

        let event = NotificationEvent {
            product_id,
            user_email,
            timestamp: now,
            event_type: EventType::ServiceUp,
            message: format!(
                "Service {} is back up after {} downtime",
                name,
                format_duration(duration)
            ),
        };

        // The outage is over whether or not the event gets out.
        if let Err(error) = self.publisher.publish(&event).await {
            warn!(product_id, error = %error, "failed to publish recovery notification");
        }

        tx.commit()
            .await
            .context(QuerySnafu {
                message: "committing outage transaction",
            })
            .context(StoreSnafu)?;
        info!(product_id, duration = %format_duration(duration), "service is back up");

        Ok(())
    }
}

/// Render a duration as `1h2m3s`, dropping leading zero units.
fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(90)), "1m30s");
        assert_eq!(format_duration(chrono::Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }
}
