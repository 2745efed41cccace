//! Tracing setup for binaries and hosts embedding the engine.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=tally_engine=trace` - Trace the engine only
//! - Default: [`DEFAULT_FILTER`]

use tracing::Subscriber;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,tally_engine=debug,tally_db=debug,sqlx=warn";

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]; an unparsable value falls back to
/// the default. Calling this twice is harmless: the second call leaves the
/// first subscriber in place and returns `false`.
pub fn init_tracing() -> bool {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    subscriber(env_filter(directives.as_deref())).try_init().is_ok()
}

fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}
