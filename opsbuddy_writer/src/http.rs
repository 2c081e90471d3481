//! Liveness, metrics, and status endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde_json::{Value, json};
use snafu::ResultExt;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use opsbuddy_store::logs;

use crate::error::{BindSnafu, Result, ServeSnafu};
use crate::metrics::WriterMetrics;

const SERVICE_NAME: &str = "opsbuddy-writer";

struct AppState {
    pool: PgPool,
    metrics: Arc<WriterMetrics>,
    started_at: Instant,
}

pub struct HttpServer {
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(pool: PgPool, metrics: Arc<WriterMetrics>) -> Self {
        Self {
            state: Arc::new(AppState {
                pool,
                metrics,
                started_at: Instant::now(),
            }),
        }
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/status", get(status_handler))
            .with_state(self.state)
    }

    /// Serve until cancellation.
    pub async fn run(self, address: SocketAddr, ct: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(address).await.context(BindSnafu {
            address: address.to_string(),
        })?;

        info!(%address, "status server listening");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async move { ct.cancelled().await })
            .await
            .context(ServeSnafu)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let mut health = json!({
        "service": SERVICE_NAME,
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => {
            health["database"] = json!("healthy");
            (StatusCode::OK, Json(health))
        }
        Err(error) => {
            health["status"] = json!("unhealthy");
            health["database"] = json!("unhealthy");
            health["database_error"] = json!(error.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(health))
        }
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let mut body = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "writer": state.metrics.snapshot(),
    });

    match logs::stats(&state.pool).await {
        Ok(stats) => {
            body["database_stats"] =
                serde_json::to_value(stats).unwrap_or_else(|_| json!(null));
        }
        Err(error) => {
            body["database_stats_error"] = json!(error.to_string());
        }
    }

    (StatusCode::OK, Json(body))
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
