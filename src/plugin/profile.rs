//! Deployment profiles
//!
//! A profile is a named set of plugins with activation flags, deciding what
//! gets deployed into an environment. Two profiles are built in
//! (`development`, `production`); a YAML file can define others.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::plugin::MAIN_PLUGIN_SLUG;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile '{0}' (built-ins: development, production)")]
    Unknown(String),

    #[error("failed to read profile file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One plugin in a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub slug: String,

    #[serde(default)]
    pub activate: bool,
}

/// Named set of plugins to deploy and activate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub plugins: Vec<ProfileEntry>,
}

impl Profile {
    /// Built-in profile table
    pub fn builtin(name: &str) -> Result<Profile, ProfileError> {
        match name {
            "development" => Ok(Profile {
                name: "development".to_string(),
                plugins: vec![
                    ProfileEntry {
                        slug: MAIN_PLUGIN_SLUG.to_string(),
                        activate: true,
                    },
                    ProfileEntry {
                        slug: "query-monitor".to_string(),
                        activate: true,
                    },
                ],
            }),
            "production" => Ok(Profile {
                name: "production".to_string(),
                plugins: vec![ProfileEntry {
                    slug: MAIN_PLUGIN_SLUG.to_string(),
                    activate: true,
                }],
            }),
            other => Err(ProfileError::Unknown(other.to_string())),
        }
    }

    /// Loads a profile from a YAML file
    pub fn load(path: &Path) -> Result<Profile, ProfileError> {
        let contents = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ProfileError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Entry for the main plugin, if the profile includes it
    pub fn main_entry(&self) -> Option<&ProfileEntry> {
        self.plugins.iter().find(|p| p.slug == MAIN_PLUGIN_SLUG)
    }

    /// Extra plugins installed from the registry rather than local source
    pub fn extra_plugins(&self) -> impl Iterator<Item = &ProfileEntry> {
        self.plugins.iter().filter(|p| p.slug != MAIN_PLUGIN_SLUG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_development_includes_main_plugin() {
        let profile = Profile::builtin("development").unwrap();
        let main = profile.main_entry().expect("main plugin present");
        assert!(main.activate);
        assert!(profile.extra_plugins().count() >= 1);
    }

    #[test]
    fn test_builtin_production_is_main_only() {
        let profile = Profile::builtin("production").unwrap();
        assert_eq!(profile.plugins.len(), 1);
        assert!(profile.main_entry().is_some());
    }

    #[test]
    fn test_unknown_builtin_errors() {
        assert!(matches!(
            Profile::builtin("staging"),
            Err(ProfileError::Unknown(_))
        ));
    }

    #[test]
    fn test_load_yaml_profile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name: custom\nplugins:\n  - slug: webp-safe-migrator\n    activate: true\n  - slug: wp-crontrol"
        )
        .unwrap();

        let profile = Profile::load(file.path()).unwrap();
        assert_eq!(profile.name, "custom");
        assert_eq!(profile.plugins.len(), 2);
        // activate defaults to false when omitted
        assert!(!profile.plugins[1].activate);
    }
}
