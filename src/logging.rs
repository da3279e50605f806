use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs the global subscriber: 0 → info, 1 → debug, more → trace.
/// `RUST_LOG` directives are honoured as well.
pub fn enable_logging(verbose: u8) -> Result<(), TryInitError> {
    let log_level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_an_error() {
        let _ = enable_logging(1);
        assert!(enable_logging(0).is_err());
    }
}
