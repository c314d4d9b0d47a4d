//! Shared test-only scaffolding: one-time logging/error-report setup and
//! hard-coded wire-format vectors used across the workspace's unit and
//! property tests.

use std::sync::Once;

pub mod prelude {
    pub use color_eyre::eyre::Result;
}

pub mod vectors;

static INIT: Once = Once::new();

/// Installs `color_eyre`'s report hook and a `tracing` subscriber, once per
/// test binary. Call this at the top of every test so panics and `?`-bubbled
/// errors print with context instead of a bare `Debug` dump.
pub fn init() {
    INIT.call_once(|| {
        let _ = color_eyre::install();
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                std::env::var("NODE_LOG").unwrap_or_else(|_| "info".to_string()),
            )
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
