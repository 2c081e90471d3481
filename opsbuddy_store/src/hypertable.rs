//! Timescale hypertable bootstrap for the `logs` table.
//!
//! The store requires any UNIQUE or PRIMARY KEY constraint on a hypertable
//! to include the partitioning column. Before the table is registered as a
//! hypertable, constraints and unique indexes that do not reference
//! `timestamp` are dropped and a composite `(id, timestamp)` primary key is
//! installed afterwards.

use snafu::ResultExt;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::error::{BootstrapSnafu, Result};

const CHUNK_INTERVAL: &str = "7 days";

/// Register `logs` as a hypertable partitioned on `timestamp`.
///
/// Detection goes through the Timescale metadata catalogue, so the whole
/// bootstrap is idempotent and a no-op on an already-partitioned table.
pub async fn ensure_hypertable(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS timescaledb CASCADE")
        .execute(pool)
        .await
        .context(BootstrapSnafu {
            message: "enabling timescaledb extension",
        })?;

    let already: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM timescaledb_information.hypertables \
         WHERE hypertable_name = 'logs')",
    )
    .fetch_one(pool)
    .await
    .context(BootstrapSnafu {
        message: "checking hypertable registration",
    })?;

    if already {
        return Ok(());
    }

    drop_conflicting_constraints(pool).await?;
    drop_conflicting_indexes(pool).await?;

    sqlx::query(&format!(
        "SELECT create_hypertable('logs', 'timestamp', \
         chunk_time_interval => INTERVAL '{CHUNK_INTERVAL}', migrate_data => TRUE)"
    ))
    .execute(pool)
    .await
    .context(BootstrapSnafu {
        message: "creating hypertable",
    })?;

    // The composite key includes the partitioning column, as required.
    if let Err(error) = sqlx::query("ALTER TABLE logs ADD PRIMARY KEY (id, timestamp)")
        .execute(pool)
        .await
    {
        warn!(error = %error, "could not add composite primary key to logs");
    }

    info!(chunk_interval = CHUNK_INTERVAL, "logs hypertable created");
    Ok(())
}

async fn drop_conflicting_constraints(pool: &PgPool) -> Result<()> {
    let constraints = sqlx::query(
        "SELECT conname, pg_get_constraintdef(oid) AS condef FROM pg_constraint \
         WHERE conrelid = 'logs'::regclass AND contype IN ('p', 'u')",
    )
    .fetch_all(pool)
    .await
    .context(BootstrapSnafu {
        message: "listing logs constraints",
    })?;

    for row in constraints {
        let name: String = row.get("conname");
        let def: String = row.get("condef");
        if name.trim().is_empty() || references_timestamp(&def) {
            continue;
        }

        let drop = format!("ALTER TABLE logs DROP CONSTRAINT IF EXISTS {name}");
        if let Err(error) = sqlx::query(&drop).execute(pool).await {
            warn!(constraint = %name, error = %error, "could not drop constraint");
        } else {
            info!(constraint = %name, definition = %def, "dropped conflicting constraint");
        }
    }

    Ok(())
}

async fn drop_conflicting_indexes(pool: &PgPool) -> Result<()> {
    let indexes = sqlx::query(
        "SELECT indexname, indexdef FROM pg_indexes \
         WHERE schemaname = current_schema() AND tablename = 'logs'",
    )
    .fetch_all(pool)
    .await
    .context(BootstrapSnafu {
        message: "listing logs indexes",
    })?;

    for row in indexes {
        let name: String = row.get("indexname");
        let def: String = row.get("indexdef");
        if name.trim().is_empty() || !is_conflicting_unique_index(&def) {
            continue;
        }

        let drop = format!("DROP INDEX IF EXISTS {name}");
        if let Err(error) = sqlx::query(&drop).execute(pool).await {
            warn!(index = %name, error = %error, "could not drop index");
        } else {
            info!(index = %name, definition = %def, "dropped conflicting unique index");
        }
    }

    Ok(())
}

/// Whether a constraint or index definition references the `timestamp`
/// partitioning column.
fn references_timestamp(definition: &str) -> bool {
    let definition = definition.to_lowercase();
    ["(timestamp)", "(timestamp,", ", timestamp", "timestamp)"]
        .iter()
        .any(|needle| definition.contains(needle))
}

fn is_conflicting_unique_index(definition: &str) -> bool {
    definition.to_lowercase().contains("unique index") && !references_timestamp(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_references_timestamp() {
        assert!(references_timestamp("PRIMARY KEY (id, timestamp)"));
        assert!(references_timestamp("UNIQUE (timestamp)"));
        assert!(references_timestamp("UNIQUE (product_id, TIMESTAMP)"));
    }

    #[test]
    fn plain_id_key_does_not_reference_timestamp() {
        assert!(!references_timestamp("PRIMARY KEY (id)"));
        assert!(!references_timestamp("UNIQUE (product_id)"));
    }

    #[test]
    fn only_unique_indexes_without_timestamp_conflict() {
        assert!(is_conflicting_unique_index(
            "CREATE UNIQUE INDEX logs_id_key ON logs USING btree (id)"
        ));
        assert!(!is_conflicting_unique_index(
            "CREATE UNIQUE INDEX logs_id_ts ON logs USING btree (id, timestamp)"
        ));
        assert!(!is_conflicting_unique_index(
            "CREATE INDEX idx_logs_product_id ON logs USING btree (product_id)"
        ));
    }
}
