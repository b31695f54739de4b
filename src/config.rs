//! Configuration management for webp-migrator
//!
//! This module provides the run configuration, loaded once from environment
//! variables with documented fallback defaults and passed explicitly to every
//! component. Nothing reads ambient globals after startup.
//!
//! # Environment Variables
//!
//! - `WEBP_ADMIN_USER`: WordPress admin username - default: "admin"
//! - `WEBP_ADMIN_PASSWORD`: WordPress admin password - default: "admin123"
//! - `WEBP_ADMIN_EMAIL`: WordPress admin email - default: "admin@webp-test.local"
//! - `WEBP_SITE_TITLE`: Site title - default: "WebP Migrator Test Site"
//! - `WEBP_SITE_URL`: Site URL - default: "http://localhost:8080"
//! - `WEBP_HTTP_PORT`: Published HTTP port - default: 8080
//! - `WEBP_DB_ADMIN_PORT`: Database admin UI (phpMyAdmin) port - default: 8081
//! - `WEBP_MYSQL_PORT`: Published MySQL port - default: 3306
//! - `WEBP_CONTAINER`: WordPress container name - default: "webp-migrator-wordpress"
//! - `WEBP_DB_CONTAINER`: Database container name - default: "webp-migrator-mysql"
//! - `WEBP_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use webp_migrator::EnvConfig;
//!
//! let config = EnvConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("Installing against {}", config.site_url);
//! ```

use std::env;
use thiserror::Error;

const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_EMAIL: &str = "admin@webp-test.local";
const DEFAULT_SITE_TITLE: &str = "WebP Migrator Test Site";
const DEFAULT_SITE_URL: &str = "http://localhost:8080";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_DB_ADMIN_PORT: u16 = 8081;
const DEFAULT_MYSQL_PORT: u16 = 3306;
const DEFAULT_CONTAINER: &str = "webp-migrator-wordpress";
const DEFAULT_DB_CONTAINER: &str = "webp-migrator-mysql";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse a configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Run configuration for all components
///
/// Constructed once via `Default::default()`, which reads `WEBP_*` environment
/// variables and falls back to the documented defaults. Immutable for the run.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// WordPress admin username
    pub admin_user: String,

    /// WordPress admin password
    pub admin_password: String,

    /// WordPress admin email
    pub admin_email: String,

    /// Site title used by the core install
    pub site_title: String,

    /// Site URL; also the target of the HTTP readiness probe
    pub site_url: String,

    /// Published HTTP port
    pub http_port: u16,

    /// Database admin UI port (phpMyAdmin)
    pub db_admin_port: u16,

    /// Published database engine port
    pub mysql_port: u16,

    /// WordPress container name
    pub container: String,

    /// Database container name
    pub db_container: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            admin_user: env_or("WEBP_ADMIN_USER", DEFAULT_ADMIN_USER),
            admin_password: env_or("WEBP_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            admin_email: env_or("WEBP_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            site_title: env_or("WEBP_SITE_TITLE", DEFAULT_SITE_TITLE),
            site_url: env_or("WEBP_SITE_URL", DEFAULT_SITE_URL),
            http_port: env_port("WEBP_HTTP_PORT", DEFAULT_HTTP_PORT),
            db_admin_port: env_port("WEBP_DB_ADMIN_PORT", DEFAULT_DB_ADMIN_PORT),
            mysql_port: env_port("WEBP_MYSQL_PORT", DEFAULT_MYSQL_PORT),
            container: env_or("WEBP_CONTAINER", DEFAULT_CONTAINER),
            db_container: env_or("WEBP_DB_CONTAINER", DEFAULT_DB_CONTAINER),
            log_level: env_or("WEBP_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        }
    }
}

impl EnvConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_user.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "admin username must not be empty".to_string(),
            ));
        }
        if self.admin_email.is_empty() || !self.admin_email.contains('@') {
            return Err(ConfigError::ValidationFailed(format!(
                "admin email '{}' is not a valid address",
                self.admin_email
            )));
        }
        if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "site URL '{}' must start with http:// or https://",
                self.site_url
            )));
        }
        Ok(())
    }

    /// URL of the admin dashboard, used by the final verification probe
    pub fn admin_url(&self) -> String {
        format!("{}/wp-admin/", self.site_url.trim_end_matches('/'))
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).ok().unwrap_or_else(|| default.to_string())
}

fn env_port(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default)
}
