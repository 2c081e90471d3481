//! Write surface for the analysis collaborator.

use snafu::ResultExt;
use sqlx::PgExecutor;

use crate::error::{QuerySnafu, Result};
use crate::models::QuickFixPriority;

/// A remediation suggestion ready for insertion.
#[derive(Debug, Clone)]
pub struct NewQuickFix {
    pub title: String,
    pub description: String,
    pub priority: QuickFixPriority,
}

/// Insert a batch of suggestions linked to a downtime record.
pub async fn insert_batch<'e>(
    executor: impl PgExecutor<'e>,
    downtime_id: i64,
    product_id: i64,
    fixes: &[NewQuickFix],
) -> Result<u64> {
    if fixes.is_empty() {
        return Ok(0);
    }

    let mut titles = Vec::with_capacity(fixes.len());
    let mut descriptions = Vec::with_capacity(fixes.len());
    let mut priorities = Vec::with_capacity(fixes.len());
    for fix in fixes {
        titles.push(fix.title.clone());
        descriptions.push(fix.description.clone());
        priorities.push(fix.priority.as_str().to_string());
    }

    let result = sqlx::query(
        "INSERT INTO quick_fixes (downtime_id, product_id, title, description, priority) \
         SELECT $1, $2, * FROM UNNEST($3::text[], $4::text[], $5::text[])",
    )
    .bind(downtime_id)
    .bind(product_id)
    .bind(&titles)
    .bind(&descriptions)
    .bind(&priorities)
    .execute(executor)
    .await
    .context(QuerySnafu {
        message: "inserting quick fixes",
    })?;

    Ok(result.rows_affected())
}
