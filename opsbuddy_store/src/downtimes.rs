//! Queries over outage rows.
//!
//! The functions take an executor so the health-check state machine can
//! run them inside one transaction. Only `open` inserts; callers must have
//! checked that no active row exists, which preserves the single active
//! downtime invariant.

use chrono::{DateTime, Utc};
use snafu::ResultExt;
use sqlx::PgExecutor;

use crate::error::{QuerySnafu, Result};
use crate::models::{Downtime, DowntimeStatus};

/// The newest row for `product_id` that is still open, if any.
pub async fn active<'e>(
    executor: impl PgExecutor<'e>,
    product_id: i64,
) -> Result<Option<Downtime>> {
    sqlx::query_as::<_, Downtime>(
        "SELECT id, product_id, start_time, end_time, status, is_notification_sent \
         FROM downtimes \
         WHERE product_id = $1 AND end_time IS NULL \
         ORDER BY start_time DESC LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await
    .context(QuerySnafu {
        message: "selecting active downtime",
    })
}

/// Open a new outage for the product.
pub async fn open<'e>(
    executor: impl PgExecutor<'e>,
    product_id: i64,
    start_time: DateTime<Utc>,
) -> Result<Downtime> {
    sqlx::query_as::<_, Downtime>(
        "INSERT INTO downtimes (product_id, start_time, status, is_notification_sent) \
         VALUES ($1, $2, $3, FALSE) \
         RETURNING id, product_id, start_time, end_time, status, is_notification_sent",
    )
    .bind(product_id)
    .bind(start_time)
    .bind(DowntimeStatus::Down.as_str())
    .fetch_one(executor)
    .await
    .context(QuerySnafu {
        message: "opening downtime",
    })
}

/// Record that the down-notification for this row has been delivered.
/// The flag only ever transitions false to true.
pub async fn set_notification_sent<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<()> {
    sqlx::query("UPDATE downtimes SET is_notification_sent = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context(QuerySnafu {
            message: "marking notification sent",
        })?;

    Ok(())
}

/// Close the outage: set `end_time` and flip the status to `up`.
pub async fn close<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
    end_time: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE downtimes SET end_time = $2, status = $3 WHERE id = $1")
        .bind(id)
        .bind(end_time)
        .bind(DowntimeStatus::Up.as_str())
        .execute(executor)
        .await
        .context(QuerySnafu {
            message: "closing downtime",
        })?;

    Ok(())
}
