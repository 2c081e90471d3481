use snafu::Snafu;

/// Store error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// Connection establishment failed after all retry attempts.
    #[snafu(display("failed to connect to database after {attempts} attempts"))]
    Connect { attempts: u32, source: sqlx::Error },
    /// A query against the store failed.
    #[snafu(display("query failed: {message}"))]
    Query {
        message: &'static str,
        source: sqlx::Error,
    },
    /// The schema or hypertable bootstrap failed.
    #[snafu(display("store bootstrap failed: {message}"))]
    Bootstrap {
        message: &'static str,
        source: sqlx::Error,
    },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
