//! Request processing and the tonic service wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use snafu::{OptionExt, ResultExt, ensure};
use sqlx::PgPool;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};
use uuid::Uuid;

use opsbuddy_bus::{LogBatchMessage, LogBatchPublisher, LogRecord};
use opsbuddy_store::products;

use crate::cache::TokenCache;
use crate::error::{
    BusUnavailableSnafu, IngestError, InvalidAuthTokenSnafu, Result, ServiceIdMismatchSnafu,
    StoreSnafu, ingest_error_to_status,
};
use crate::pb;
use crate::pb::ingestion_service_server::{
    IngestionService as TonicService, IngestionServiceServer as TonicServer,
};

/// Authoritative token to product-id resolution.
///
/// The cache sits in front of this; implementations are picked at
/// composition time (the store in production, a stub in tests).
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Resolve an auth token to a product id, or `None` when the token is
    /// unknown. A malformed token is simply unknown.
    async fn product_id_for_token(&self, token: &str) -> Result<Option<i64>>;
}

/// Directory backed by the `products` table.
pub struct StoreProductDirectory {
    pool: PgPool,
}

impl StoreProductDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductDirectory for StoreProductDirectory {
    async fn product_id_for_token(&self, token: &str) -> Result<Option<i64>> {
        // Tokens are UUIDs; anything else cannot match a product.
        let Ok(token) = Uuid::parse_str(token) else {
            return Ok(None);
        };

        let product = products::find_by_auth_token(&self.pool, token)
            .await
            .context(StoreSnafu)?;

        Ok(product.map(|p| p.id))
    }
}

/// Validates and forwards log batches.
pub struct IngestionProcessor {
    directory: Arc<dyn ProductDirectory>,
    cache: TokenCache,
    publisher: Arc<dyn LogBatchPublisher>,
}

impl IngestionProcessor {
    pub fn new(
        directory: Arc<dyn ProductDirectory>,
        cache: TokenCache,
        publisher: Arc<dyn LogBatchPublisher>,
    ) -> Self {
        Self {
            directory,
            cache,
            publisher,
        }
    }

    /// Process one batch: resolve the token (cache first, store as the
    /// authority), check the claimed service id, publish.
    pub async fn process(&self, request: pb::IngestEventRequest) -> Result<()> {
        let product_id = self.resolve_product_id(&request.auth_token).await?;

        // A leaked token must not let a caller submit under another
        // product id, so the claimed id has to match the resolved one.
        ensure!(
            product_id == request.service_id,
            ServiceIdMismatchSnafu {
                service_id: request.service_id,
            }
        );

        let batch = LogBatchMessage {
            product_id,
            logs: request
                .logs
                .into_iter()
                .map(|entry| LogRecord {
                    timestamp: entry.timestamp,
                    message: entry.message,
                })
                .collect(),
        };

        self.publisher
            .publish(&batch)
            .await
            .context(BusUnavailableSnafu)?;

        Ok(())
    }

    async fn resolve_product_id(&self, auth_token: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(auth_token).await {
            return Ok(cached);
        }

        let product_id = self
            .directory
            .product_id_for_token(auth_token)
            .await?
            .context(InvalidAuthTokenSnafu)?
            .to_string();

        // Best-effort: a failed write only costs the next lookup.
        self.cache.set(auth_token, &product_id).await;

        Ok(product_id)
    }
}

/// Tonic service exposing the processor.
pub struct IngestionServer {
    inner: Arc<IngestionProcessor>,
}

impl IngestionServer {
    pub fn new(inner: Arc<IngestionProcessor>) -> Self {
        Self { inner }
    }

    pub fn into_tonic_server(self) -> TonicServer<Self> {
        TonicServer::new(self)
    }
}

#[tonic::async_trait]
impl TonicService for IngestionServer {
    async fn ingest_log_batch(
        &self,
        request: Request<pb::IngestEventRequest>,
    ) -> std::result::Result<Response<pb::IngestEventResponse>, Status> {
        let request = request.into_inner();

        if let Err(error) = self.inner.process(request).await {
            match &error {
                // Expected client mistakes stay below error level.
                IngestError::InvalidAuthToken | IngestError::ServiceIdMismatch { .. } => {
                    debug!(error = %error, "rejected log batch");
                }
                _ => warn!(error = %error, "failed to process log batch"),
            }
            return Err(ingest_error_to_status(error));
        }

        Ok(Response::new(pb::IngestEventResponse { success: true }))
    }
}
