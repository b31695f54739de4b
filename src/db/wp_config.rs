//! Database credential extraction from `wp-config.php`
//!
//! The fallback strategy has no WP-CLI to ask, so it reads the WordPress
//! configuration file from the target and pulls out the `define('DB_*', ...)`
//! constants and the `$table_prefix` assignment with regular expressions.

use regex::Regex;

use super::StoreError;
use crate::exec::CommandRunner;

const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Connection parameters read from the target WordPress configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub table_prefix: String,
}

/// Reads `wp-config.php` from the target and parses credentials
pub async fn load_db_credentials(
    runner: &CommandRunner,
    wp_path: &str,
) -> Result<DbCredentials, StoreError> {
    let config_path = format!("{}/wp-config.php", wp_path.trim_end_matches('/'));
    let out = runner.run("cat", &[config_path.as_str()]).await?;
    if !out.success() {
        return Err(StoreError::CommandFailed {
            context: format!("reading {}", config_path),
            code: out.code,
            message: out.error_line().to_string(),
        });
    }
    parse_wp_config(&out.stdout)
}

/// Parses the `DB_*` defines and `$table_prefix` out of wp-config.php text
pub fn parse_wp_config(contents: &str) -> Result<DbCredentials, StoreError> {
    let name = define_value(contents, "DB_NAME")
        .ok_or_else(|| StoreError::Parse("DB_NAME from wp-config.php".to_string()))?;
    let user = define_value(contents, "DB_USER")
        .ok_or_else(|| StoreError::Parse("DB_USER from wp-config.php".to_string()))?;
    let password = define_value(contents, "DB_PASSWORD")
        .ok_or_else(|| StoreError::Parse("DB_PASSWORD from wp-config.php".to_string()))?;
    let host = define_value(contents, "DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let table_prefix = table_prefix(contents);

    Ok(DbCredentials {
        name,
        user,
        password,
        host,
        table_prefix,
    })
}

fn define_value(contents: &str, constant: &str) -> Option<String> {
    // define('DB_NAME', 'wordpress'); with either quote style
    let pattern = format!(
        r#"define\(\s*['"]{}['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#,
        regex::escape(constant)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(contents).map(|c| c[1].to_string())
}

fn table_prefix(contents: &str) -> String {
    Regex::new(r#"\$table_prefix\s*=\s*['"]([^'"]+)['"]"#)
        .ok()
        .and_then(|re| re.captures(contents).map(|c| c[1].to_string()))
        .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string())
}
