//! Read-only queries against the product catalogue.

use chrono::{DateTime, Utc};
use snafu::ResultExt;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::{QuerySnafu, Result};
use crate::models::Product;

/// A product joined with its owner's notification address.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithOwner {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub user_email: String,
}

/// The subset of a product the prober needs.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct ProbeTarget {
    pub id: i64,
    pub health_api: String,
}

pub async fn find_by_auth_token<'e>(
    executor: impl PgExecutor<'e>,
    auth_token: Uuid,
) -> Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, user_id, created_at, auth_token, health_api \
         FROM products WHERE auth_token = $1",
    )
    .bind(auth_token)
    .fetch_optional(executor)
    .await
    .context(QuerySnafu {
        message: "looking up product by auth token",
    })
}

pub async fn find_with_owner<'e>(
    executor: impl PgExecutor<'e>,
    product_id: i64,
) -> Result<Option<ProductWithOwner>> {
    sqlx::query_as::<_, ProductWithOwner>(
        "SELECT p.id, p.name, p.description, u.email AS user_email \
         FROM products p JOIN users u ON u.id = p.user_id \
         WHERE p.id = $1",
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await
    .context(QuerySnafu {
        message: "looking up product with owner",
    })
}

/// All products that carry a health endpoint, for the initial heap load.
pub async fn probe_targets<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<ProbeTarget>> {
    sqlx::query_as::<_, ProbeTarget>(
        "SELECT id, health_api FROM products WHERE health_api != ''",
    )
    .fetch_all(executor)
    .await
    .context(QuerySnafu {
        message: "listing probe targets",
    })
}

/// Probe-eligible products registered after `since`, for rediscovery.
pub async fn probe_targets_created_after<'e>(
    executor: impl PgExecutor<'e>,
    since: DateTime<Utc>,
) -> Result<Vec<ProbeTarget>> {
    sqlx::query_as::<_, ProbeTarget>(
        "SELECT id, health_api FROM products \
         WHERE created_at > $1 AND health_api != ''",
    )
    .bind(since)
    .fetch_all(executor)
    .await
    .context(QuerySnafu {
        message: "listing newly created probe targets",
    })
}
