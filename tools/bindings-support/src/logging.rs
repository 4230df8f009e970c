//! Logging setup for the maintenance tools
//!
//! Events are emitted with `tracing`; the binaries install a `fmt` subscriber
//! through one of the helpers below.

use tracing_subscriber::{EnvFilter, fmt};

/// Default filter: info+ for the tooling crates, warn+ for everything else
pub const DEFAULT_FILTER: &str = "bindings_support=info,xtask=info,warn";

/// Verbose filter used by `--verbose`
pub const DEV_FILTER: &str = "bindings_support=debug,xtask=debug,info";

/// Initialize tracing with `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Initialize tracing with a custom filter
pub fn init_tracing_with_filter(filter: &str) {
    fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Initialize tracing for development with more verbose output
pub fn init_tracing_dev() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEV_FILTER.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_parse() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(EnvFilter::try_new(DEV_FILTER).is_ok());
    }
}
