//! WP-CLI storage strategy
//!
//! The preferred strategy: options through `wp option`, postmeta through
//! `wp db query` (prefix-matched across all posts, which `wp post meta`
//! cannot do), cron through `wp cron event`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{escape_like_prefix, OptionStore, PostmetaRow, StoreError, StoreKind};
use crate::exec::{CmdOutput, CommandRunner};

pub struct WpCliStore {
    runner: CommandRunner,
    wp_path: String,
}

#[derive(Debug, Deserialize)]
struct OptionRow {
    option_name: String,
    option_value: String,
}

#[derive(Debug, Deserialize)]
struct CronRow {
    hook: String,
}

impl WpCliStore {
    pub fn new(runner: CommandRunner, wp_path: String) -> Self {
        Self { runner, wp_path }
    }

    async fn wp(&self, args: &[&str]) -> Result<CmdOutput, StoreError> {
        Ok(self.runner.wp(&self.wp_path, args).await?)
    }

    async fn wp_ok(&self, context: &str, args: &[&str]) -> Result<CmdOutput, StoreError> {
        let out = self.wp(args).await?;
        if !out.success() {
            return Err(StoreError::CommandFailed {
                context: context.to_string(),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }
        Ok(out)
    }

    async fn table_prefix(&self) -> Result<String, StoreError> {
        let out = self.wp_ok("wp db prefix", &["db", "prefix"]).await?;
        Ok(out.stdout_trimmed().to_string())
    }

    /// Runs a raw query and returns tab-separated rows without headers
    async fn db_query(&self, sql: &str) -> Result<Vec<String>, StoreError> {
        let out = self
            .wp_ok("wp db query", &["db", "query", sql, "--skip-column-names"])
            .await?;
        Ok(out
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect())
    }
}

#[async_trait]
impl OptionStore for WpCliStore {
    fn kind(&self) -> StoreKind {
        StoreKind::WpCli
    }

    async fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        let out = self.wp(&["option", "get", name]).await?;
        if out.success() {
            Ok(Some(out.stdout_trimmed().to_string()))
        } else {
            // `wp option get` exits 1 for a missing option
            Ok(None)
        }
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.wp_ok("wp option update", &["option", "update", name, value])
            .await?;
        Ok(())
    }

    async fn list_options(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        // --search uses * / ? wildcards and escapes the rest itself
        let pattern = format!("{}*", prefix);
        let out = self
            .wp_ok(
                "wp option list",
                &["option", "list", "--search", &pattern, "--format=json"],
            )
            .await?;

        let rows: Vec<OptionRow> = serde_json::from_str(out.stdout_trimmed())
            .map_err(|e| StoreError::Parse(format!("wp option list output: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.option_name, r.option_value))
            .collect())
    }

    async fn delete_options(&self, prefix: &str) -> Result<u64, StoreError> {
        let options = self.list_options(prefix).await?;
        let mut deleted = 0u64;
        for name in options.keys() {
            let out = self.wp(&["option", "delete", name]).await?;
            if out.success() {
                deleted += 1;
            } else {
                debug!(option = %name, "Option vanished before deletion");
            }
        }
        Ok(deleted)
    }

    async fn list_postmeta(&self, prefix: &str) -> Result<Vec<PostmetaRow>, StoreError> {
        let table = format!("{}postmeta", self.table_prefix().await?);
        let sql = format!(
            "SELECT post_id, meta_key, meta_value FROM {} WHERE meta_key LIKE '{}%'",
            table,
            escape_like_prefix(prefix)
        );

        let mut rows = Vec::new();
        for line in self.db_query(&sql).await? {
            let mut parts = line.splitn(3, '\t');
            let (Some(id), Some(key), value) = (parts.next(), parts.next(), parts.next()) else {
                return Err(StoreError::Parse(format!("postmeta row '{}'", line)));
            };
            let post_id = id
                .parse::<u64>()
                .map_err(|_| StoreError::Parse(format!("postmeta post_id '{}'", id)))?;
            rows.push(PostmetaRow {
                post_id,
                meta_key: key.to_string(),
                meta_value: value.unwrap_or("").to_string(),
            });
        }
        Ok(rows)
    }

    async fn set_postmeta(
        &self,
        post_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> Result<(), StoreError> {
        let id = post_id.to_string();
        self.wp_ok(
            "wp post meta update",
            &["post", "meta", "update", &id, meta_key, meta_value],
        )
        .await?;
        Ok(())
    }

    async fn delete_postmeta(&self, prefix: &str) -> Result<u64, StoreError> {
        let rows = self.list_postmeta(prefix).await?;
        let mut deleted = 0u64;
        for row in &rows {
            let id = row.post_id.to_string();
            let out = self
                .wp(&["post", "meta", "delete", &id, &row.meta_key])
                .await?;
            if out.success() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn clear_cron_events(&self, hook_prefix: &str) -> Result<u64, StoreError> {
        let out = self
            .wp_ok(
                "wp cron event list",
                &["cron", "event", "list", "--fields=hook", "--format=json"],
            )
            .await?;

        let rows: Vec<CronRow> = serde_json::from_str(out.stdout_trimmed())
            .map_err(|e| StoreError::Parse(format!("wp cron event list output: {}", e)))?;

        let mut cleared = 0u64;
        for hook in rows
            .iter()
            .map(|r| r.hook.as_str())
            .filter(|h| h.starts_with(hook_prefix))
        {
            let out = self.wp(&["cron", "event", "delete", hook]).await?;
            if out.success() {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
