//! Batched inserts and maintenance for the `logs` hypertable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::ResultExt;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{QuerySnafu, Result};
use crate::models::{Log, NewLog};

/// Upper bound on rows per INSERT statement.
pub const INSERT_CHUNK_SIZE: usize = 500;

/// Insert a batch of rows inside a single transaction.
///
/// Foreign-key enforcement is relaxed for the duration of the transaction;
/// `product_id` has already been validated against the catalogue by the
/// ingestion service.
pub async fn insert_batch(pool: &PgPool, rows: &[NewLog]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context(QuerySnafu {
        message: "beginning log insert transaction",
    })?;

    sqlx::query("SET LOCAL session_replication_role = replica")
        .execute(&mut *tx)
        .await
        .context(QuerySnafu {
            message: "relaxing foreign key enforcement",
        })?;

    let mut inserted = 0u64;
    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        let mut product_ids = Vec::with_capacity(chunk.len());
        let mut payloads = Vec::with_capacity(chunk.len());
        let mut timestamps = Vec::with_capacity(chunk.len());
        for row in chunk {
            product_ids.push(row.product_id);
            payloads.push(row.log_data.clone());
            timestamps.push(row.timestamp);
        }

        let result = sqlx::query(
            "INSERT INTO logs (product_id, log_data, timestamp) \
             SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::timestamptz[])",
        )
        .bind(&product_ids)
        .bind(&payloads)
        .bind(&timestamps)
        .execute(&mut *tx)
        .await
        .context(QuerySnafu {
            message: "inserting log chunk",
        })?;

        inserted += result.rows_affected();
    }

    tx.commit().await.context(QuerySnafu {
        message: "committing log insert transaction",
    })?;

    Ok(inserted)
}

/// The last `limit` logs for a product strictly before `before`, newest
/// first. This is the read surface of the analysis collaborator.
pub async fn last_logs_before<'e>(
    executor: impl PgExecutor<'e>,
    product_id: i64,
    before: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Log>> {
    sqlx::query_as::<_, Log>(
        "SELECT id, product_id, log_data, timestamp FROM logs \
         WHERE product_id = $1 AND timestamp < $2 \
         ORDER BY timestamp DESC LIMIT $3",
    )
    .bind(product_id)
    .bind(before)
    .bind(limit)
    .fetch_all(executor)
    .await
    .context(QuerySnafu {
        message: "fetching logs before timestamp",
    })
}

/// Retention sweep: delete rows older than `cutoff`.
pub async fn delete_older_than<'e>(
    executor: impl PgExecutor<'e>,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM logs WHERE timestamp < $1")
        .bind(cutoff)
        .execute(executor)
        .await
        .context(QuerySnafu {
            message: "deleting old logs",
        })?;

    Ok(result.rows_affected())
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductLogCount {
    pub product_id: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub total_logs: i64,
    pub recent_logs_24h: i64,
    pub logs_by_product: Vec<ProductLogCount>,
}

/// Row counts served by the writer's metrics endpoint.
pub async fn stats(pool: &PgPool) -> Result<LogStats> {
    let total_logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logs")
        .fetch_one(pool)
        .await
        .context(QuerySnafu {
            message: "counting logs",
        })?;

    let recent_logs_24h: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM logs WHERE timestamp >= NOW() - INTERVAL '24 hours'",
    )
    .fetch_one(pool)
    .await
    .context(QuerySnafu {
        message: "counting recent logs",
    })?;

    let logs_by_product = sqlx::query_as::<_, ProductLogCount>(
        "SELECT product_id, COUNT(*) AS count FROM logs GROUP BY product_id",
    )
    .fetch_all(pool)
    .await
    .context(QuerySnafu {
        message: "counting logs by product",
    })?;

    Ok(LogStats {
        total_logs,
        recent_logs_24h,
        logs_by_product,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_splits_at_the_insert_bound() {
        let rows: Vec<NewLog> = (0..1201)
            .map(|i| NewLog {
                product_id: 1,
                log_data: format!("line {i}"),
                timestamp: Utc::now(),
            })
            .collect();

        let chunks: Vec<_> = rows.chunks(INSERT_CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 500);
        assert_eq!(chunks[1].len(), 500);
        assert_eq!(chunks[2].len(), 201);
    }
}
