//! Logging setup for the CLI.
//!
//! Installs a global tracing subscriber writing to stdout, filtered by
//! `RUST_LOG` with an `info` default. Library users are expected to install
//! their own subscriber instead.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize tracing once; later calls are no-ops.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init();
    }
}
