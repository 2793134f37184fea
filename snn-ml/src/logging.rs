//! Tracing subscriber setup for binaries and tests that drive the tuner.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the stderr log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `RUST_LOG` when set, otherwise `info` for verbose runs and `warn` for quiet ones.
fn filter_for(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }))
}

/// Install a human-readable stderr subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(verbose: bool) -> bool {
    init_logging_with(verbose, LogFormat::Pretty)
}

/// Install a stderr subscriber in the given format.
pub fn init_logging_with(verbose: bool, format: LogFormat) -> bool {
    let layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter_for(verbose))
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter_for(verbose))
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logging(false);
        assert!(!init_logging(true));
        assert!(!init_logging_with(true, LogFormat::Json));
    }
}
