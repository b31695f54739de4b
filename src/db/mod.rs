//! Plugin option/postmeta storage strategies
//!
//! Every database-touching operation goes through the [`OptionStore`] trait,
//! with two implementations selected once per run by a capability check:
//!
//! 1. [`WpCliStore`](wpcli::WpCliStore) - preferred; drives WP-CLI in the
//!    target environment.
//! 2. [`MysqlDirectStore`](mysql::MysqlDirectStore) - fallback; drives the
//!    `mysql` client with credentials parsed out of `wp-config.php`.
//!
//! When neither capability is present, selection fails with
//! [`StoreError::Unsupported`] and the operation reports itself as
//! unsupported in this environment instead of silently doing nothing.

pub mod mysql;
pub mod wp_config;
pub mod wpcli;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::exec::{CommandRunner, ExecError};

/// Errors from option/postmeta storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The underlying tool exited non-zero
    #[error("{context} failed (exit {code}): {message}")]
    CommandFailed {
        context: String,
        code: i32,
        message: String,
    },

    /// Tool output could not be parsed
    #[error("failed to parse {0}")]
    Parse(String),

    /// No strategy is available in this environment
    #[error("unsupported in this environment: {0}")]
    Unsupported(String),
}

/// Which strategy a store instance uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    WpCli,
    MysqlDirect,
}

/// One postmeta row, addressed by post and key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostmetaRow {
    pub post_id: u64,
    pub meta_key: String,
    pub meta_value: String,
}

/// Storage operations over WordPress options and postmeta
///
/// Prefix arguments are literal prefixes; implementations are responsible
/// for escaping them into whatever pattern syntax their tool uses.
#[async_trait]
pub trait OptionStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    async fn get_option(&self, name: &str) -> Result<Option<String>, StoreError>;

    async fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// All options whose name starts with `prefix`
    async fn list_options(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError>;

    /// Deletes all options whose name starts with `prefix`; returns the count
    async fn delete_options(&self, prefix: &str) -> Result<u64, StoreError>;

    /// All postmeta rows whose key starts with `prefix`
    async fn list_postmeta(&self, prefix: &str) -> Result<Vec<PostmetaRow>, StoreError>;

    async fn set_postmeta(
        &self,
        post_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> Result<(), StoreError>;

    /// Deletes all postmeta rows whose key starts with `prefix`
    async fn delete_postmeta(&self, prefix: &str) -> Result<u64, StoreError>;

    /// Unschedules recurring cron events whose hook starts with `prefix`
    async fn clear_cron_events(&self, hook_prefix: &str) -> Result<u64, StoreError>;
}

/// Selects a storage strategy once per run.
///
/// `wp_runner` executes in the WordPress target, `db_runner` where the
/// `mysql` client lives (the database container on the container path).
pub async fn select_store(
    use_wp_cli: bool,
    wp_runner: &CommandRunner,
    db_runner: &CommandRunner,
    wp_path: &str,
) -> Result<Box<dyn OptionStore>, StoreError> {
    if use_wp_cli {
        match wp_runner.run("wp", &["--version", "--allow-root"]).await {
            Ok(out) if out.success() => {
                debug!(version = out.stdout_trimmed(), "WP-CLI is reachable");
                let store = wpcli::WpCliStore::new(wp_runner.clone(), wp_path.to_string());
                return Ok(Box::new(store));
            }
            Ok(out) => {
                info!(code = out.code, "WP-CLI present but not functional, trying direct database access");
            }
            Err(e) => {
                info!(error = %e, "WP-CLI not reachable, trying direct database access");
            }
        }
    }

    let creds = wp_config::load_db_credentials(wp_runner, wp_path).await?;
    match db_runner.run("mysql", &["--version"]).await {
        Ok(out) if out.success() => {
            debug!(client = out.stdout_trimmed(), "MySQL client is reachable");
            Ok(Box::new(mysql::MysqlDirectStore::new(db_runner.clone(), creds)))
        }
        Ok(_) | Err(_) => Err(StoreError::Unsupported(
            "neither WP-CLI nor a MySQL client is reachable".to_string(),
        )),
    }
}

/// Escapes a literal prefix for use in a SQL LIKE pattern
pub(crate) fn escape_like_prefix(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_prefix_escapes_wildcards() {
        assert_eq!(escape_like_prefix("webp_migrator_"), "webp\\_migrator\\_");
        assert_eq!(escape_like_prefix("100%"), "100\\%");
    }

    #[test]
    fn test_postmeta_row_roundtrips_through_json() {
        let row = PostmetaRow {
            post_id: 42,
            meta_key: "_webp_migrator_status".to_string(),
            meta_value: "converted".to_string(),
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: PostmetaRow = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }
}
