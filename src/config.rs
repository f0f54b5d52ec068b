/*!
 * Configuration support for the gorzdrav library
 *
 * Provides runtime configuration for the directory client: upstream
 * location, request headers, timeouts, retry policy and concurrency.
 */

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides, e.g. `GORZDRAV_TIMEOUT_SECONDS`
pub const ENV_PREFIX: &str = "GORZDRAV";

/// Upper bound for the timeout and delay settings, in seconds
pub const MAX_WAIT_SECONDS: f64 = 3600.0;

/// Global configuration for the gorzdrav client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GorzdravConfig {
    /// Upstream API root, without version
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upstream API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// User-Agent header sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent upstream
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Referer header sent upstream
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    /// Attempts per request, first one included
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff between attempts in seconds, doubled after each failure
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay: f64,

    /// Pause before every attempt in seconds (0 disables)
    #[serde(default = "default_request_delay")]
    pub request_delay: f64,

    /// Maximum number of requests in flight
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for GorzdravConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            referer: default_referer(),
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay: default_retry_initial_delay(),
            request_delay: default_request_delay(),
            pool_size: default_pool_size(),
        }
    }
}

// Default value functions for serde
fn default_api_url() -> String {
    "https://gorzdrav.spb.ru/_api/api".to_string()
}

fn default_api_version() -> String {
    "v2".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/124.0.0.0".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_referer() -> String {
    "https://gorzdrav.spb.ru/service-free-schedule".to_string()
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_delay() -> f64 {
    1.0
}

fn default_request_delay() -> f64 {
    1.0
}

fn default_pool_size() -> usize {
    5
}

impl GorzdravConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Versioned API root, e.g. `https://gorzdrav.spb.ru/_api/api/v2`
    pub fn versioned_api_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `GORZDRAV_API_URL`: upstream API root
    /// - `GORZDRAV_API_VERSION`: e.g. "v2"
    /// - `GORZDRAV_USER_AGENT`: header value
    /// - `GORZDRAV_TIMEOUT_SECONDS`: number
    /// - `GORZDRAV_RETRY_ATTEMPTS`: number
    /// - `GORZDRAV_RETRY_INITIAL_DELAY`: seconds
    /// - `GORZDRAV_REQUEST_DELAY`: seconds
    /// - `GORZDRAV_POOL_SIZE`: number
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GORZDRAV_API_URL") {
            config.api_url = val;
        }

        if let Ok(val) = std::env::var("GORZDRAV_API_VERSION") {
            config.api_version = val;
        }

        if let Ok(val) = std::env::var("GORZDRAV_USER_AGENT") {
            config.user_agent = val;
        }

        if let Ok(val) = std::env::var("GORZDRAV_TIMEOUT_SECONDS") {
            if let Ok(secs) = val.parse() {
                config.timeout_seconds = secs;
            }
        }

        if let Ok(val) = std::env::var("GORZDRAV_RETRY_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                config.retry_attempts = attempts;
            }
        }

        if let Ok(val) = std::env::var("GORZDRAV_RETRY_INITIAL_DELAY") {
            if let Ok(secs) = val.parse() {
                config.retry_initial_delay = secs;
            }
        }

        if let Ok(val) = std::env::var("GORZDRAV_REQUEST_DELAY") {
            if let Ok(secs) = val.parse() {
                config.request_delay = secs;
            }
        }

        if let Ok(val) = std::env::var("GORZDRAV_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                config.pool_size = size;
            }
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::GorzdravError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::GorzdravError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/gorzdrav/config.toml` on Unix-like systems
    /// or `%APPDATA%\gorzdrav\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "gorzdrav")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Layer defaults, an optional TOML file and `GORZDRAV_*` environment
    /// variables, later sources winning.
    pub fn layered(file: Option<&Path>) -> crate::Result<Self> {
        let defaults = ::config::Config::try_from(&Self::default())?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = file {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }

        let config: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Environment variables
    /// 2. Default config file (if exists)
    /// 3. Built-in defaults
    pub fn load() -> Self {
        let file = Self::default_config_path().filter(|path| path.exists());
        Self::layered(file.as_deref()).unwrap_or_else(|_| Self::from_env())
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |message: &str, suggestion: &str| crate::GorzdravError::Configuration {
            message: message.to_string(),
            suggestion: Some(suggestion.to_string()),
        };

        if self.retry_attempts == 0 {
            return Err(invalid("retry_attempts must be at least 1", "Set retry_attempts = 1 to disable retries"));
        }
        if self.pool_size == 0 {
            return Err(invalid("pool_size must be at least 1", "Use the default pool_size = 5"));
        }
        if !(self.timeout_seconds > 0.0 && self.timeout_seconds <= MAX_WAIT_SECONDS) {
            return Err(invalid(
                "timeout_seconds must be a positive number of at most 3600",
                "Use the default timeout_seconds = 30",
            ));
        }
        for (name, delay) in [
            ("retry_initial_delay", self.retry_initial_delay),
            ("request_delay", self.request_delay),
        ] {
            if !(0.0..=MAX_WAIT_SECONDS).contains(&delay) {
                return Err(invalid(
                    &format!("{} must be between 0 and 3600 seconds", name),
                    "Use 0 to disable a delay",
                ));
            }
        }
        if url::Url::parse(&self.api_url).is_err() {
            return Err(invalid("api_url is not a valid URL", "Use https://gorzdrav.spb.ru/_api/api"));
        }
        Ok(())
    }

    /// Fast settings for local runs and tests: single attempt, no pacing
    pub fn fast() -> Self {
        Self {
            retry_attempts: 1,
            retry_initial_delay: 0.0,
            request_delay: 0.0,
            timeout_seconds: 10.0,
            ..Self::default()
        }
    }
}

// Global configuration support
lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<GorzdravConfig>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: GorzdravConfig) {
    let mut guard = GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(config);
}

/// Get the global configuration (or the loaded one if not set)
pub fn global_config() -> GorzdravConfig {
    GLOBAL_CONFIG
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .cloned()
        .unwrap_or_else(GorzdravConfig::load)
}

/// Clear the global configuration
pub fn clear_global_config() {
    let mut guard = GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Builder for customizing configuration
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: GorzdravConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set upstream API root
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set upstream API version
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set request timeout
    pub fn timeout_seconds(mut self, seconds: f64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set retry attempts
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    /// Set base retry backoff
    pub fn retry_initial_delay(mut self, seconds: f64) -> Self {
        self.config.retry_initial_delay = seconds;
        self
    }

    /// Set pacing delay
    pub fn request_delay(mut self, seconds: f64) -> Self {
        self.config.request_delay = seconds;
        self
    }

    /// Set concurrency bound
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GorzdravConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = GorzdravConfig::default();
        assert_eq!(config.versioned_api_url(), "https://gorzdrav.spb.ru/_api/api/v2");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.referer, "https://gorzdrav.spb.ru/service-free-schedule");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .api_url("http://localhost:8080/api/")
            .api_version("/v3")
            .retry_attempts(5)
            .request_delay(0.0)
            .pool_size(2)
            .build();

        assert_eq!(config.versioned_api_url(), "http://localhost:8080/api/v3");
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.request_delay, 0.0);
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = ConfigBuilder::new().retry_attempts(0).build();
        assert!(matches!(
            config.validate(),
            Err(crate::GorzdravError::Configuration { .. })
        ));
        let config = ConfigBuilder::new().pool_size(0).build();
        assert!(config.validate().is_err());
        let config = ConfigBuilder::new().api_url("not a url").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_durations() {
        for config in [
            ConfigBuilder::new().timeout_seconds(f64::INFINITY).build(),
            ConfigBuilder::new().timeout_seconds(f64::NAN).build(),
            ConfigBuilder::new().timeout_seconds(0.0).build(),
            ConfigBuilder::new().timeout_seconds(MAX_WAIT_SECONDS + 1.0).build(),
            ConfigBuilder::new().retry_initial_delay(f64::INFINITY).build(),
            ConfigBuilder::new().retry_initial_delay(-1.0).build(),
            ConfigBuilder::new().request_delay(f64::INFINITY).build(),
            ConfigBuilder::new().request_delay(f64::NAN).build(),
        ] {
            assert!(
                matches!(config.validate(), Err(crate::GorzdravError::Configuration { .. })),
                "{:?} should be rejected",
                config
            );
        }

        let edge = ConfigBuilder::new()
            .timeout_seconds(MAX_WAIT_SECONDS)
            .retry_initial_delay(0.0)
            .request_delay(MAX_WAIT_SECONDS)
            .build();
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_global_config_set_and_clear() {
        let custom = ConfigBuilder::new().api_version("v7").pool_size(3).build();
        set_global_config(custom.clone());
        assert_eq!(global_config(), custom);

        clear_global_config();
        assert_eq!(global_config(), GorzdravConfig::load());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ConfigBuilder::new().pool_size(9).retry_attempts(2).build();
        config.save(&path).unwrap();

        let loaded = GorzdravConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pool_size = 7\n").unwrap();

        let loaded = GorzdravConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pool_size, 7);
        assert_eq!(loaded.api_version, "v2");
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pool_size = [").unwrap();

        assert!(matches!(
            GorzdravConfig::from_file(&path),
            Err(crate::GorzdravError::Configuration { .. })
        ));
    }

    #[test]
    fn test_layered_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_version = \"v9\"\nretry_attempts = 4\n").unwrap();

        let loaded = GorzdravConfig::layered(Some(&path)).unwrap();
        assert_eq!(loaded.api_version, "v9");
        assert_eq!(loaded.retry_attempts, 4);
        assert_eq!(loaded.user_agent, GorzdravConfig::default().user_agent);
    }
}
