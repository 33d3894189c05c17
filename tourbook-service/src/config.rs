//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: TOURBOOK_, nested keys split on `__`,
//!    e.g. `TOURBOOK_SERVICE__PORT=8080`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/tourbook/config.toml
//! 4. System directory: /etc/tourbook/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::handlers::Environment;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "TOURBOOK_";

/// Application name, used for the XDG and system config directories
pub const APP_NAME: &str = "tourbook";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Per-client limits on the API routes
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// List query defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Seed data loaded at start-up (optional)
    #[serde(default)]
    pub seed: Option<SeedConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Decides how much error detail responses carry
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            environment: Environment::default(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP middleware configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in KB
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,

    /// CORS mode: "permissive" or "restrictive"
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Enable gzip compression
    #[serde(default = "default_true")]
    pub compression: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_kb: default_body_limit_kb(),
            cors_mode: default_cors_mode(),
            compression: true,
        }
    }
}

impl MiddlewareConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_kb.saturating_mul(1024)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests each client may make per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Rate limit window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Message sent once a client's quota is used up
    #[serde(default = "default_rate_limit_message")]
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            message: default_rate_limit_message(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Defaults applied to every list query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size when `limit` is missing or unusable
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Sort applied when `sort` is missing
    #[serde(default = "default_sort")]
    pub default_sort: String,

    /// Version field excluded when `fields` is missing
    #[serde(default = "default_version_field")]
    pub version_field: String,

    /// Requested fields containing this marker are never projected
    #[serde(default = "default_sensitive_marker")]
    pub sensitive_marker: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_sort: default_sort(),
            version_field: default_version_field(),
            sensitive_marker: default_sensitive_marker(),
        }
    }
}

/// Seed data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Directory holding tours.json, users.json, reviews.json, bookings.json
    pub dir: PathBuf,
}

fn default_name() -> String {
    APP_NAME.to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_body_limit_kb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    3600
}

fn default_rate_limit_message() -> String {
    "too many requests from this IP. try in an hour...".to_string()
}

fn default_limit() -> u64 {
    100
}

fn default_sort() -> String {
    "-createdAt".to_string()
}

fn default_version_field() -> String {
    "__v".to_string()
}

fn default_sensitive_marker() -> String {
    "password".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Every config file found is merged, lowest priority first, and
    /// environment variables override all of them.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment.merge(Self::env()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the XDG and system directories. A missing file yields
    /// the defaults (plus environment overrides).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        Ok(config)
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Find all possible config file paths
    ///
    /// Returns paths in priority order (highest first):
    /// 1. Current working directory
    /// 2. XDG config directory
    /// 3. System directory
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(Path::new("/etc").join(APP_NAME).join("config.toml"));
        paths
    }

    /// Address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.service.port)
    }
}
