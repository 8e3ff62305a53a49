// Tracing setup shared by the proxy server and the demo CLI
use tracing_subscriber::EnvFilter;

/// Resolve the log filter: `RUST_LOG`, then `LOG_LEVEL`, then `default_filter`.
pub fn resolve_filter(default_filter: &str) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| default_filter.to_string())
}

/// Install a fmt subscriber with an env-driven filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = resolve_filter(default_filter);
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn rust_log_wins_over_log_level() {
        std::env::set_var("RUST_LOG", "debug,hyper=warn");
        std::env::set_var("LOG_LEVEL", "error");
        assert_eq!(resolve_filter("info"), "debug,hyper=warn");
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn log_level_is_normalized() {
        std::env::remove_var("RUST_LOG");
        std::env::set_var("LOG_LEVEL", " WARN ");
        assert_eq!(resolve_filter("info"), "warn");
        std::env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn falls_back_to_default() {
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("LOG_LEVEL");
        assert_eq!(resolve_filter("info,chef_core=debug"), "info,chef_core=debug");
    }
}
