use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use opsbuddy_bus::{BusConsumer, BusOptions, ConsumerOptions};
use opsbuddy_store::{DatabaseOptions, hypertable, schema};
use opsbuddy_writer::{
    HttpServer, LogWriter, RetentionOptions, WriterMetrics, run_retention_sweep,
};

use crate::error::{BusSnafu, Result, StoreSnafu, WriterSnafu};

const CLOSE_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Args)]
pub struct WriterArgs {
    /// Consumer group id.
    #[arg(long, default_value = "log-writer")]
    group_id: String,
    /// Status server port; falls back to SERVER_PORT, then 8080.
    #[arg(long)]
    port: Option<u16>,
}

impl WriterArgs {
    fn status_address(&self) -> SocketAddr {
        let port = self
            .port
            .or_else(|| std::env::var("SERVER_PORT").ok()?.parse().ok())
            .unwrap_or(8080);

        SocketAddr::from(([0, 0, 0, 0], port))
    }

    pub async fn run(self, ct: CancellationToken) -> Result<()> {
        let status_address = self.status_address();

        let pool = DatabaseOptions::from_env()
            .connect()
            .await
            .context(StoreSnafu)?;

        // The writer owns the logs table lifecycle: plain DDL first, then
        // the hypertable bootstrap with its constraint requirements.
        schema::apply_schema(&pool).await.context(StoreSnafu)?;
        hypertable::ensure_hypertable(&pool)
            .await
            .context(StoreSnafu)?;

        let bus = BusOptions::from_env("logs").context(BusSnafu)?;
        let topic = bus.topic.clone();
        let consumer =
            BusConsumer::new(ConsumerOptions::new(bus, &self.group_id)).context(BusSnafu)?;

        let metrics = Arc::new(WriterMetrics::default());
        let writer = LogWriter::new(pool.clone(), metrics.clone());

        let retention = tokio::spawn(run_retention_sweep(
            pool.clone(),
            RetentionOptions::from_env(),
            ct.clone(),
        ));

        info!(topic = %topic, group = %self.group_id, "writer started");

        let http_server = HttpServer::new(pool.clone(), metrics);
        let (consume_result, serve_result) = tokio::join!(
            consumer.run(ct.clone(), &writer),
            http_server.run(status_address, ct.clone()),
        );

        consume_result.context(BusSnafu)?;
        serve_result.context(WriterSnafu)?;

        if let Err(error) = retention.await {
            warn!(error = %error, "retention task join failed");
        }

        if tokio::time::timeout(CLOSE_DEADLINE, pool.close())
            .await
            .is_err()
        {
            warn!("database pool did not close within the deadline");
        }

        info!("writer stopped");
        Ok(())
    }
}
