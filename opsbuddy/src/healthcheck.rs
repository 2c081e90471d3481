use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use opsbuddy_bus::{BusOptions, KafkaNotificationProducer};
use opsbuddy_healthcheck::{
    EngineOptions, HealthCheckEngine, HttpProber, PgOutageTracker, StoreProductSource,
};
use opsbuddy_store::DatabaseOptions;

use crate::error::{BusSnafu, HealthCheckSnafu, Result, StoreSnafu};

const CLOSE_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Args)]
pub struct HealthCheckArgs {
    /// Number of probe workers.
    #[arg(long, default_value_t = 5)]
    workers: usize,
}

impl HealthCheckArgs {
    pub async fn run(self, ct: CancellationToken) -> Result<()> {
        let pool = DatabaseOptions::from_env()
            .connect()
            .await
            .context(StoreSnafu)?;

        let bus = BusOptions::from_env("notifications").context(BusSnafu)?;
        let producer = KafkaNotificationProducer::new(&bus).context(BusSnafu)?;

        let source = Arc::new(StoreProductSource::new(pool.clone()));
        let tracker = Arc::new(PgOutageTracker::new(pool.clone(), Arc::new(producer)));
        let prober = Arc::new(HttpProber::new().context(HealthCheckSnafu)?);

        let options = EngineOptions {
            worker_count: self.workers,
            ..EngineOptions::default()
        };

        info!(
            workers = options.worker_count,
            topic = %bus.topic,
            "health-check engine starting"
        );

        let engine = HealthCheckEngine::new(source, prober, tracker, options);
        engine.run(ct).await.context(HealthCheckSnafu)?;

        if tokio::time::timeout(CLOSE_DEADLINE, pool.close())
            .await
            .is_err()
        {
            warn!("database pool did not close within the deadline");
        }

        Ok(())
    }
}
