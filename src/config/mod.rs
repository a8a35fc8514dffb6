// Configuration module entry point
// Loads configuration, validates the redirect target and holds runtime state

mod state;
mod target;
mod types;

use std::net::SocketAddr;

use crate::error::StartupError;

// Re-export public types
pub use state::AppState;
pub use target::RedirectTarget;
pub use types::Config;

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix for environment overrides, e.g. `REDIRECT_SERVER__PORT=9000`
const ENV_PREFIX: &str = "REDIRECT";

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// A missing file is not an error; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", types::DEFAULT_HOST)?
            .set_default("server.port", i64::from(types::DEFAULT_PORT))?
            .set_default("redirect.target", types::DEFAULT_TARGET)?
            .set_default("redirect.cache_max_age", types::DEFAULT_CACHE_MAX_AGE)?
            .set_default("logging.level", types::DEFAULT_LOG_LEVEL)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", types::DEFAULT_ACCESS_LOG_FORMAT)?
            .set_default("performance.keep_alive_timeout", types::DEFAULT_KEEP_ALIVE_TIMEOUT)?
            .set_default("performance.read_timeout", types::DEFAULT_READ_TIMEOUT)?
            .set_default("performance.write_timeout", types::DEFAULT_WRITE_TIMEOUT)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| StartupError::InvalidAddress { addr, source })
    }

    /// Parse the configured destination; a malformed one refuses startup
    pub fn redirect_target(&self) -> Result<RedirectTarget, StartupError> {
        RedirectTarget::parse(&self.redirect.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "permaredirect-{}-{name}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load_from("/nonexistent/permaredirect/config").unwrap();
        assert_eq!(cfg.server.port, types::DEFAULT_PORT);
        assert_eq!(cfg.redirect.target, types::DEFAULT_TARGET);
        assert_eq!(cfg.redirect.cache_max_age, types::DEFAULT_CACHE_MAX_AGE);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_temp_config(
            "override",
            r#"
[server]
port = 9090
workers = 2

[redirect]
target = "https://example.com/landing"

[performance]
max_connections = 64
"#,
        );

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.workers, Some(2));
        assert_eq!(cfg.server.host, types::DEFAULT_HOST);
        assert_eq!(cfg.redirect.target, "https://example.com/landing");
        assert_eq!(cfg.performance.max_connections, Some(64));
        assert_eq!(cfg.performance.read_timeout, types::DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_environment_overrides() {
        // Keys no other test asserts on, since the environment is process-wide
        std::env::set_var("REDIRECT_LOGGING__LEVEL", "debug");
        std::env::set_var("REDIRECT_PERFORMANCE__WRITE_TIMEOUT", "45");
        std::env::set_var("REDIRECT_LOGGING__ERROR_LOG_FILE", "/tmp/permaredirect-error.log");

        let cfg = Config::load_from("/nonexistent/permaredirect/config");

        std::env::remove_var("REDIRECT_LOGGING__LEVEL");
        std::env::remove_var("REDIRECT_PERFORMANCE__WRITE_TIMEOUT");
        std::env::remove_var("REDIRECT_LOGGING__ERROR_LOG_FILE");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.performance.write_timeout, 45);
        assert_eq!(
            cfg.logging.error_log_file.as_deref(),
            Some("/tmp/permaredirect-error.log")
        );
    }

    #[test]
    fn test_invalid_target_refuses_startup() {
        let mut cfg = Config::default();
        cfg.redirect.target = "not a url".to_string();
        assert!(matches!(
            cfg.redirect_target(),
            Err(StartupError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::default();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), types::DEFAULT_PORT);

        let mut bad = Config::default();
        bad.server.host = "not-an-ip".to_string();
        assert!(bad.get_socket_addr().is_err());
    }
}
