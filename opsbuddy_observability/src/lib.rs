use std::borrow::Cow;

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::{prelude::*, registry::LookupSpan};

use crate::format::OpsFormat;

mod format;

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Initialize the process-wide tracing subscriber.
///
/// Log filtering follows `RUST_LOG` (defaulting to `info`), and
/// `RUST_LOG_FORMAT=json` switches to newline-delimited JSON for
/// collection by an external agent.
pub fn init_observability(
    _package_name: impl Into<Cow<'static, str>>,
    _package_version: impl Into<Cow<'static, str>>,
) {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    let layers = vec![stdout()];

    tracing_subscriber::registry().with(layers).init();
}

fn stdout<S>() -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let log_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"));

    let json_fmt = std::env::var("RUST_LOG_FORMAT")
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(log_env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .event_format(OpsFormat::default())
            .fmt_fields(OpsFormat::default())
            .with_filter(log_env_filter)
            .boxed()
    }
}
