//! Direct MySQL storage strategy
//!
//! Fallback when WP-CLI is unavailable: drives the `mysql` client against the
//! WordPress tables using credentials from [`super::wp_config`]. Cron events
//! live inside a PHP-serialized blob in the `cron` option, which raw SQL
//! cannot safely rewrite, so that one operation reports itself unsupported.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use super::wp_config::DbCredentials;
use super::{escape_like_prefix, OptionStore, PostmetaRow, StoreError, StoreKind};
use crate::exec::CommandRunner;

pub struct MysqlDirectStore {
    runner: CommandRunner,
    creds: DbCredentials,
}

impl MysqlDirectStore {
    pub fn new(runner: CommandRunner, creds: DbCredentials) -> Self {
        Self { runner, creds }
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.creds.table_prefix, name)
    }

    /// DB_HOST with any `:port` suffix split off, e.g. "db:3306" -> ("db", Some("3306"))
    fn host_and_port(&self) -> (&str, Option<&str>) {
        match self.creds.host.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (self.creds.host.as_str(), None),
        }
    }

    /// Runs one or more SQL statements; returns raw tab-separated rows
    async fn query(&self, sql: &str) -> Result<Vec<String>, StoreError> {
        let password_arg = format!("-p{}", self.creds.password);
        let (host, port) = self.host_and_port();
        let mut args = vec![
            "-h",
            host,
            "-u",
            self.creds.user.as_str(),
            password_arg.as_str(),
            "-D",
            self.creds.name.as_str(),
            "-N",
            "-B",
        ];
        if let Some(port) = port {
            args.push("-P");
            args.push(port);
        }
        args.push("-e");
        args.push(sql);

        let out = self.runner.run("mysql", &args).await?;
        if !out.success() {
            return Err(StoreError::CommandFailed {
                context: "mysql query".to_string(),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }

        Ok(out
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// Runs a mutation followed by `SELECT ROW_COUNT()` for an affected count
    async fn execute_counted(&self, sql: &str) -> Result<u64, StoreError> {
        let combined = format!("{}; SELECT ROW_COUNT();", sql.trim_end_matches(';'));
        let rows = self.query(&combined).await?;
        let count = rows
            .last()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }
}

/// Escapes a string literal for inclusion in single quotes
fn escape_sql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

#[async_trait]
impl OptionStore for MysqlDirectStore {
    fn kind(&self) -> StoreKind {
        StoreKind::MysqlDirect
    }

    async fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        let sql = format!(
            "SELECT option_value FROM {} WHERE option_name = '{}'",
            self.table("options"),
            escape_sql(name)
        );
        let rows = self.query(&sql).await?;
        Ok(rows.into_iter().next())
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (option_name, option_value, autoload) VALUES ('{}', '{}', 'yes') \
             ON DUPLICATE KEY UPDATE option_value = VALUES(option_value)",
            self.table("options"),
            escape_sql(name),
            escape_sql(value)
        );
        self.query(&sql).await?;
        Ok(())
    }

    async fn list_options(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let sql = format!(
            "SELECT option_name, option_value FROM {} WHERE option_name LIKE '{}%'",
            self.table("options"),
            escape_like_prefix(&escape_sql(prefix))
        );

        let mut map = BTreeMap::new();
        for line in self.query(&sql).await? {
            let Some((name, value)) = line.split_once('\t') else {
                return Err(StoreError::Parse(format!("options row '{}'", line)));
            };
            map.insert(name.to_string(), value.to_string());
        }
        Ok(map)
    }

    async fn delete_options(&self, prefix: &str) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE option_name LIKE '{}%'",
            self.table("options"),
            escape_like_prefix(&escape_sql(prefix))
        );
        self.execute_counted(&sql).await
    }

    async fn list_postmeta(&self, prefix: &str) -> Result<Vec<PostmetaRow>, StoreError> {
        let sql = format!(
            "SELECT post_id, meta_key, meta_value FROM {} WHERE meta_key LIKE '{}%'",
            self.table("postmeta"),
            escape_like_prefix(&escape_sql(prefix))
        );

        let mut rows = Vec::new();
        for line in self.query(&sql).await? {
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
        // postmeta has no unique key on (post_id, meta_key); replace manually
        let table = self.table("postmeta");
        let sql = format!(
            "DELETE FROM {table} WHERE post_id = {id} AND meta_key = '{key}'; \
             INSERT INTO {table} (post_id, meta_key, meta_value) VALUES ({id}, '{key}', '{value}')",
            table = table,
            id = post_id,
            key = escape_sql(meta_key),
            value = escape_sql(meta_value)
        );
        self.query(&sql).await?;
        Ok(())
    }

    async fn delete_postmeta(&self, prefix: &str) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE meta_key LIKE '{}%'",
            self.table("postmeta"),
            escape_like_prefix(&escape_sql(prefix))
        );
        self.execute_counted(&sql).await
    }

    async fn clear_cron_events(&self, hook_prefix: &str) -> Result<u64, StoreError> {
        debug!(hook_prefix, "Cron cleanup requested on the direct-SQL path");
        Err(StoreError::Unsupported(
            "cron event removal needs WP-CLI; the schedule is a serialized blob".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_sql_quotes() {
        assert_eq!(escape_sql("it's"), "it''s");
        assert_eq!(escape_sql(r"back\slash"), r"back\\slash");
    }

    fn store_with_host(host: &str) -> MysqlDirectStore {
        MysqlDirectStore::new(
            CommandRunner::host(),
            DbCredentials {
                name: "wp".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                host: host.to_string(),
                table_prefix: "wp_".to_string(),
            },
        )
    }

    #[test]
    fn test_host_with_port_suffix_is_split() {
        let store = store_with_host("db:3306");
        assert_eq!(store.host_and_port(), ("db", Some("3306")));
    }

    #[test]
    fn test_plain_host_has_no_port() {
        let store = store_with_host("localhost");
        assert_eq!(store.host_and_port(), ("localhost", None));
    }

    #[test]
    fn test_table_names_use_configured_prefix() {
        let store = MysqlDirectStore::new(
            CommandRunner::host(),
            DbCredentials {
                name: "wp".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                host: "db".to_string(),
                table_prefix: "dev_".to_string(),
            },
        );
        assert_eq!(store.table("options"), "dev_options");
        assert_eq!(store.table("postmeta"), "dev_postmeta");
    }
}
