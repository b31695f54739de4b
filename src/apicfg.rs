//! REST API configuration artifact
//!
//! `--generate-api-config` writes a JSON description of the plugin's REST
//! surface so that external tooling (and the test harness) can discover the
//! endpoints without parsing PHP. Both routes require the `manage_options`
//! capability, i.e. an administrator.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const API_NAMESPACE: &str = "webp-migrator/v1";
pub const API_CONFIG_FILENAME: &str = "webp-migrator-api.json";

/// Capability every route is gated behind
const ADMIN_CAPABILITY: &str = "manage_options";

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize API config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRoute {
    pub method: String,
    pub route: String,
    pub permission: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub namespace: String,
    pub routes: Vec<ApiRoute>,
}

impl ApiConfig {
    /// The plugin's REST surface: status query and batch processing trigger
    pub fn standard() -> Self {
        Self {
            namespace: API_NAMESPACE.to_string(),
            routes: vec![
                ApiRoute {
                    method: "GET".to_string(),
                    route: format!("/wp-json/{}/status", API_NAMESPACE),
                    permission: ADMIN_CAPABILITY.to_string(),
                    description: "Migration progress and queue state".to_string(),
                },
                ApiRoute {
                    method: "POST".to_string(),
                    route: format!("/wp-json/{}/process", API_NAMESPACE),
                    permission: ADMIN_CAPABILITY.to_string(),
                    description: "Process the next batch of attachments".to_string(),
                },
            ],
        }
    }

    /// Writes the config as pretty JSON into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<std::path::PathBuf, ApiConfigError> {
        let path = dir.join(API_CONFIG_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|source| ApiConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "API configuration written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_standard_config_routes() {
        let config = ApiConfig::standard();
        assert_eq!(config.namespace, "webp-migrator/v1");
        assert_eq!(config.routes.len(), 2);

        let get = &config.routes[0];
        assert_eq!(get.method, "GET");
        assert_eq!(get.route, "/wp-json/webp-migrator/v1/status");

        let post = &config.routes[1];
        assert_eq!(post.method, "POST");
        assert_eq!(post.route, "/wp-json/webp-migrator/v1/process");

        for route in &config.routes {
            assert_eq!(route.permission, "manage_options");
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = ApiConfig::standard().write_to(dir.path()).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let back: ApiConfig = serde_json::from_str(&contents).unwrap();
        assert_eq!(back, ApiConfig::standard());
    }
}
