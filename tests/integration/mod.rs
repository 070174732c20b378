//! Integration tests for the context field system

use std::sync::Once;

mod scopes;
mod task_isolation;

static TRACING: Once = Once::new();

/// Route crate trace events to the test harness when `RUST_LOG` asks for
/// them. Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
