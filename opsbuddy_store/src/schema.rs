//! Idempotent bootstrap DDL.
//!
//! The HTTP collaborator owns migrations for its own surfaces; the core
//! only guarantees that the tables it touches exist before it starts.

use snafu::ResultExt;
use sqlx::PgPool;
use tracing::info;

use crate::error::{BootstrapSnafu, Result};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(255) NOT NULL UNIQUE,
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL DEFAULT '',
    provider VARCHAR(50) NOT NULL DEFAULT 'google',
    provider_id VARCHAR(255) NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS products (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    user_id BIGINT NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    auth_token UUID NOT NULL UNIQUE DEFAULT gen_random_uuid(),
    health_api TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS logs (
    id BIGSERIAL,
    product_id BIGINT NOT NULL,
    log_data TEXT NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_logs_product_id ON logs (product_id);

CREATE TABLE IF NOT EXISTS downtimes (
    id BIGSERIAL PRIMARY KEY,
    product_id BIGINT NOT NULL REFERENCES products(id),
    start_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    end_time TIMESTAMPTZ,
    status VARCHAR(50) NOT NULL DEFAULT 'down',
    is_notification_sent BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS idx_downtimes_product_id ON downtimes (product_id);

CREATE TABLE IF NOT EXISTS quick_fixes (
    id BIGSERIAL PRIMARY KEY,
    downtime_id BIGINT NOT NULL REFERENCES downtimes(id),
    product_id BIGINT NOT NULL REFERENCES products(id),
    title VARCHAR(255) NOT NULL,
    description TEXT NOT NULL,
    priority VARCHAR(20) NOT NULL DEFAULT 'medium',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_quick_fixes_downtime_id ON quick_fixes (downtime_id);
"#;

/// Apply the bootstrap DDL. Safe to run on every start.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context(BootstrapSnafu {
            message: "applying schema",
        })?;

    info!("schema bootstrap complete");
    Ok(())
}
