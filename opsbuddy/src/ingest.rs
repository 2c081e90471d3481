use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use opsbuddy_bus::{BusOptions, KafkaLogProducer};
use opsbuddy_ingest::{
    CacheOptions, IngestionProcessor, IngestionServer, StoreProductDirectory, TokenCache, pb,
};
use opsbuddy_store::DatabaseOptions;

use crate::error::{
    BusSnafu, IngestSnafu, InvalidListenAddressSnafu, Result, StoreSnafu, TonicReflectionSnafu,
    TonicServerSnafu,
};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// gRPC listen address.
    #[arg(long, default_value = "0.0.0.0:50051")]
    address: String,
}

impl IngestArgs {
    pub async fn run(self, ct: CancellationToken) -> Result<()> {
        let address = self
            .address
            .parse::<SocketAddr>()
            .context(InvalidListenAddressSnafu {
                address: self.address.clone(),
            })?;

        let pool = DatabaseOptions::from_env()
            .connect()
            .await
            .context(StoreSnafu)?;

        let cache_options = CacheOptions::from_env().context(IngestSnafu)?;
        let cache = TokenCache::connect(&cache_options)
            .await
            .context(IngestSnafu)?;

        let bus = BusOptions::from_env("logs").context(BusSnafu)?;
        let producer = KafkaLogProducer::new(&bus).context(BusSnafu)?;

        let directory = Arc::new(StoreProductDirectory::new(pool.clone()));
        let processor = Arc::new(IngestionProcessor::new(
            directory,
            cache,
            Arc::new(producer),
        ));

        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(pb::ingestion_file_descriptor_set())
            .build_v1()
            .context(TonicReflectionSnafu)?;

        let ingestion_service = IngestionServer::new(processor).into_tonic_server();

        info!(%address, topic = %bus.topic, "ingestion service listening");

        tonic::transport::Server::builder()
            .add_service(reflection_service)
            .add_service(ingestion_service)
            .serve_with_shutdown(address, async move {
                ct.cancelled().await;
            })
            .await
            .context(TonicServerSnafu)?;

        pool.close().await;
        info!("ingestion service stopped");
        Ok(())
    }
}
