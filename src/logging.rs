//! Logging setup.
//!
//! The library only emits `tracing` events: delta application at `TRACE`,
//! truncation, eviction and stale snapshots at `DEBUG`, rejected watchers at
//! `WARN`. Binaries, tests and benches that want to see them call
//! [`init_logging`] once.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Installs a formatting subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call repeatedly; only the first call has an effect, and a
/// subscriber installed elsewhere is left in place.
pub fn init_logging() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("initialized tracing subscriber");
        }
    });
}
