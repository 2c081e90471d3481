use snafu::Snafu;

/// Health-check engine error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HealthCheckError {
    /// A store operation failed; the condition is re-evaluated on the
    /// next probe.
    #[snafu(display("store operation failed"))]
    Store { source: opsbuddy_store::StoreError },
    /// The probe HTTP client could not be built.
    #[snafu(display("failed to build probe client"))]
    ProbeClient { source: reqwest::Error },
}

pub type Result<T, E = HealthCheckError> = std::result::Result<T, E>;
