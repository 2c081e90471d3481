use snafu::Snafu;

/// Writer error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriterError {
    #[snafu(display("bus error"))]
    Bus { source: opsbuddy_bus::BusError },
    #[snafu(display("store error"))]
    Store { source: opsbuddy_store::StoreError },
    #[snafu(display("failed to bind status server to {address}"))]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[snafu(display("status server failed"))]
    Serve { source: std::io::Error },
}

pub type Result<T, E = WriterError> = std::result::Result<T, E>;
