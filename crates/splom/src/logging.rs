#![forbid(unsafe_code)]

//! Subscriber setup for applications and examples.
//!
//! The library crates only emit `tracing` events under the `splom.*`
//! targets; installing a subscriber is the application's call.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

/// Filter used when neither `RUST_LOG` nor an explicit directive is given.
pub const DEFAULT_FILTER: &str = "splom=info";

/// Build the filter: `RUST_LOG` wins, then `directives`, then
/// [`DEFAULT_FILTER`].
pub fn filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global fmt subscriber filtered by `directives` (or
/// `RUST_LOG` when set). Fails if a subscriber is already installed.
pub fn init(directives: &str) -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(filter(Some(directives)))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
