//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the default level from the debug flag
//! - Keep console output free of ANSI colours
//!
//! `RUST_LOG` overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

/// Default filter directive for debug or release mode.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "exgin=debug,info"
    } else {
        "exgin=info,warn"
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(debug: bool) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(debug))),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .try_init()
}
