use snafu::Snafu;
use tonic::Status;

/// Ingestion error types.
///
/// The display message is forwarded to the gRPC client, so it should be
/// useful to the caller without leaking internals.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IngestError {
    /// The auth token resolves to no product. Expected traffic; callers
    /// log it below error level.
    #[snafu(display("invalid auth token"))]
    InvalidAuthToken,
    /// The token is valid but names a different product than `service_id`.
    #[snafu(display("service id {service_id} does not match the authenticated product"))]
    ServiceIdMismatch { service_id: String },
    /// The authoritative store lookup failed.
    #[snafu(display("product lookup failed"))]
    Store { source: opsbuddy_store::StoreError },
    /// The batch could not be handed to the bus; the client should retry.
    #[snafu(display("log bus unavailable"))]
    BusUnavailable { source: opsbuddy_bus::BusError },
    /// A required cache environment variable is missing.
    #[snafu(display("missing required environment variable {name}"))]
    MissingEnv { name: String },
    /// The token cache could not be reached at startup.
    #[snafu(display("failed to connect to token cache"))]
    CacheConnect { source: redis::RedisError },
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Map ingestion errors onto gRPC status codes.
pub fn ingest_error_to_status(error: IngestError) -> Status {
    match &error {
        IngestError::InvalidAuthToken => Status::unauthenticated(error.to_string()),
        IngestError::ServiceIdMismatch { .. } => Status::permission_denied(error.to_string()),
        IngestError::BusUnavailable { .. } => Status::unavailable(error.to_string()),
        IngestError::Store { .. }
        | IngestError::MissingEnv { .. }
        | IngestError::CacheConnect { .. } => Status::internal(error.to_string()),
    }
}
