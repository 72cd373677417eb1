//! Configuration loading and representation.
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults;
//! 2. an optional TOML file (`PVZ_CONFIG`, default `pvz.toml`);
//! 3. environment variables prefixed `PVZ__`, nested with `__`
//!    (e.g. `PVZ__DATABASE__URL`, `PVZ__SECURITY__JWT_SECRET`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use pvz_directory::PageLimits;
use pvz_observability::LoggingConfig;

/// Signing secret used when none is configured. Development only.
pub const DEV_JWT_SECRET: &str = "pvz-dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub directory: DirectoryConfig,
    pub requests: RequestConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// No `url` means the in-memory store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
    /// bcrypt work factor for stored passwords.
    pub password_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 12 * 60 * 60,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        let limits = PageLimits::default();
        Self {
            default_limit: limits.default_limit,
            max_limit: limits.max_limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Deadline applied to every engine/directory call made for a request.
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl AppConfig {
    /// Load from `PVZ_CONFIG` (or `pvz.toml`) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("PVZ_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pvz.toml"));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());

        let config: AppConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("PVZ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.directory;
        if d.max_limit == 0 || d.default_limit == 0 || d.default_limit > d.max_limit {
            return Err(ConfigError::Invalid(format!(
                "directory limits must satisfy 1 <= default_limit ({}) <= max_limit ({})",
                d.default_limit, d.max_limit
            )));
        }
        if !(4..=31).contains(&self.security.password_cost) {
            return Err(ConfigError::Invalid(format!(
                "security.password_cost must be within 4..=31, got {}",
                self.security.password_cost
            )));
        }
        if self.requests.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "requests.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server address: {e}")))
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.directory.default_limit,
            max_limit: self.directory.max_limit,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.requests.timeout_ms)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.security.token_ttl_secs)
    }

    /// The token signing secret, or the development default (with a warning).
    pub fn jwt_secret(&self) -> &str {
        match self.security.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("security.jwt_secret is not set; using the development secret");
                DEV_JWT_SECRET
            }
        }
    }
}
