use snafu::Snafu;

/// Top-level CLI errors. Init failures surface here and exit non-zero
/// through the snafu report.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("invalid listen address {address}"))]
    InvalidListenAddress {
        address: String,
        source: std::net::AddrParseError,
    },
    #[snafu(display("store initialization failed"))]
    Store { source: opsbuddy_store::StoreError },
    #[snafu(display("bus initialization failed"))]
    Bus { source: opsbuddy_bus::BusError },
    #[snafu(display("ingestion service failed"))]
    Ingest {
        source: opsbuddy_ingest::IngestError,
    },
    #[snafu(display("writer service failed"))]
    Writer {
        source: opsbuddy_writer::WriterError,
    },
    #[snafu(display("health-check engine failed"))]
    HealthCheck {
        source: opsbuddy_healthcheck::HealthCheckError,
    },
    #[snafu(display("gRPC server failed"))]
    TonicServer { source: tonic::transport::Error },
    #[snafu(display("failed to build gRPC reflection service"))]
    TonicReflection {
        source: tonic_reflection::server::Error,
    },
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
