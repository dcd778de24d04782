//! Tracing subscriber setup and the process-level panic safety net.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colorized output for local development.
    Pretty,
    /// Single-line JSON records for log shippers.
    Json,
}

impl LogFormat {
    /// Reads the format from the `LOGGER` environment variable:
    /// `dev` selects [`Self::Pretty`], anything else [`Self::Json`].
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var("LOGGER").is_ok_and(|value| value == "dev") {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Installs the global subscriber with an `RUST_LOG` env filter
/// (default `info`).
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .finish()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .finish()
            .try_init(),
    }
}

/// Installs a panic hook that logs the panic under the `Global` context
/// label before delegating to the previous hook.
///
/// Safety net for code that escapes normal error propagation; it does not
/// replace error handling anywhere else.
pub fn install_panic_logger() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(context = "Global", panic = %info, "unhandled panic caught");
        previous(info);
    }));
}
