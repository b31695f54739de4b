//! Plugin option namespace and seeded defaults
//!
//! Everything the plugin writes to the database is namespaced: options under
//! `webp_migrator_`, postmeta under `_webp_migrator_`, cron hooks under
//! `webp_migrator_`. Cleanup matches by prefix, never by enumerated key
//! list, so keys added by newer plugin versions are still removed.

use serde::{Deserialize, Serialize};

/// Namespace prefix for rows in the options table
pub const OPTION_PREFIX: &str = "webp_migrator_";

/// Namespace prefix for postmeta keys
pub const POSTMETA_PREFIX: &str = "_webp_migrator_";

/// Namespace prefix for scheduled cron hooks
pub const CRON_HOOK_PREFIX: &str = "webp_migrator_";

/// The settings option seeded by `setup-db`
pub const SETTINGS_OPTION: &str = "webp_migrator_settings";

/// Schema marker option seeded by `setup-db`
pub const DB_VERSION_OPTION: &str = "webp_migrator_db_version";

pub const DB_VERSION: &str = "1.0.0";

/// Default plugin settings seeded by `setup-db`.
///
/// Quality 59 is the setup default; the 75 that appears in some of the
/// plugin's own documentation is a display default and is not seeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    pub quality: u32,
    pub batch_size: u32,
    pub validation: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            quality: 59,
            batch_size: 10,
            validation: "enabled".to_string(),
        }
    }
}

impl PluginSettings {
    pub fn to_json(&self) -> String {
        // Serialization of this flat struct cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The (name, value) pairs that `setup-db` seeds
pub fn default_options() -> Vec<(String, String)> {
    vec![
        (
            SETTINGS_OPTION.to_string(),
            PluginSettings::default().to_json(),
        ),
        (DB_VERSION_OPTION.to_string(), DB_VERSION.to_string()),
    ]
}
