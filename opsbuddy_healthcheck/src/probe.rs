//! Liveness probes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use snafu::ResultExt;
use tracing::debug;

use crate::error::{ProbeClientSnafu, Result};

/// Issues a single liveness probe against a health endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `true` iff the endpoint answered HTTP 200 within the timeout.
    /// Timeouts, connection errors, and non-200 statuses are all failures.
    async fn probe(&self, url: &str) -> bool;
}

/// HTTP prober with a 30-second client timeout.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(ProbeClientSnafu)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(error) => {
                debug!(url, error = %error, "probe request failed");
                false
            }
        }
    }
}
