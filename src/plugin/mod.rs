//! Plugin lifecycle management
//!
//! Installs, activates, inspects, and removes the WebP Safe Migrator plugin
//! in the target environment. File operations go to the plugin directory
//! under `wp-content/plugins`; database operations go through the
//! [`OptionStore`](crate::db::OptionStore) strategy selected for the run.
//!
//! Activation prefers WP-CLI. When WP-CLI is unavailable the install still
//! deploys files and reports that activation must happen through the admin
//! interface; it never fails the whole install over a missing convenience.

pub mod files;
pub mod options;
pub mod profile;

pub use options::{PluginSettings, CRON_HOOK_PREFIX, OPTION_PREFIX, POSTMETA_PREFIX};
pub use profile::{Profile, ProfileEntry, ProfileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{OptionStore, StoreError};
use crate::exec::{CommandRunner, ExecError, ExecTarget};

/// Slug of the plugin this tool exists for
pub const MAIN_PLUGIN_SLUG: &str = "webp-safe-migrator";

/// Web server user that owns plugin files inside the containers
const WEB_USER: &str = "www-data";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Files(#[from] files::FilesError),

    #[error("{context} failed (exit {code}): {message}")]
    CommandFailed {
        context: String,
        code: i32,
        message: String,
    },

    #[error("plugin '{0}' is not installed")]
    NotInstalled(String),

    #[error("failed to parse {0}")]
    Parse(String),
}

/// What to deploy and where
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub slug: String,

    /// Host-side source tree of the plugin
    pub source: PathBuf,

    /// Activate after deploying
    pub activate: bool,
}

impl PluginDescriptor {
    pub fn target_dir(&self, wp_path: &str) -> String {
        format!(
            "{}/wp-content/plugins/{}",
            wp_path.trim_end_matches('/'),
            self.slug
        )
    }
}

/// Installed/active state of one plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub slug: String,
    pub installed: bool,
    pub active: bool,
    pub version: Option<String>,
}

/// How activation ended during an install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    /// Not requested
    Skipped,
    /// WP-CLI missing; activation left to the admin interface
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub files_copied: usize,
    pub activation: ActivationOutcome,
    pub extra_plugins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallReport {
    pub files_removed: bool,
    pub options_removed: u64,
    pub postmeta_removed: u64,
    pub cron_cleared: u64,
    pub backups_removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub options_removed: u64,
    pub postmeta_removed: u64,
}

#[derive(Debug, Deserialize)]
struct WpPluginRow {
    name: String,
    status: String,
    #[serde(default)]
    version: Option<String>,
}

/// Drives plugin lifecycle operations against one target
pub struct PluginManager {
    runner: CommandRunner,
    wp_path: String,
}

impl PluginManager {
    pub fn new(runner: CommandRunner, wp_path: String) -> Self {
        Self { runner, wp_path }
    }

    /// Copies the plugin source tree into the target plugin directory,
    /// overwriting any existing copy. Idempotent.
    pub async fn deploy(&self, desc: &PluginDescriptor) -> Result<usize, LifecycleError> {
        if !desc.source.exists() {
            return Err(files::FilesError::SourceMissing(desc.source.clone()).into());
        }
        let target = desc.target_dir(&self.wp_path);

        let copied = match self.runner.target() {
            ExecTarget::Native => files::copy_tree(&desc.source, Path::new(&target))?,
            ExecTarget::Container { engine, name } => {
                self.runner.run("mkdir", &["-p", &target]).await?;

                let host = CommandRunner::host();
                let src = format!("{}/.", desc.source.display());
                let dst = format!("{}:{}", name, target);
                let out = host.run(engine.binary(), &["cp", &src, &dst]).await?;
                if !out.success() {
                    return Err(LifecycleError::CommandFailed {
                        context: format!("{} cp into {}", engine.binary(), name),
                        code: out.code,
                        message: out.error_line().to_string(),
                    });
                }
                files::list_files(&desc.source)?.len()
            }
        };

        info!(slug = %desc.slug, files = copied, target = %target, "Plugin files deployed");
        Ok(copied)
    }

    /// Hands plugin files to the web server user (container targets only)
    pub async fn fix_ownership(&self, desc: &PluginDescriptor) -> Result<(), LifecycleError> {
        if matches!(self.runner.target(), ExecTarget::Native) {
            return Ok(());
        }
        let target = desc.target_dir(&self.wp_path);
        let owner = format!("{0}:{0}", WEB_USER);
        let out = self.runner.run("chown", &["-R", &owner, &target]).await?;
        if !out.success() {
            // Non-fatal: WordPress can read root-owned files, it just
            // cannot auto-update them.
            warn!(code = out.code, "Could not change plugin file ownership");
        }
        Ok(())
    }

    /// Full install: deploy, ownership, profile extras, optional activation
    pub async fn install(
        &self,
        desc: &PluginDescriptor,
        profile: &Profile,
    ) -> Result<InstallReport, LifecycleError> {
        let files_copied = self.deploy(desc).await?;
        self.fix_ownership(desc).await?;

        let mut extra_plugins = Vec::new();
        for entry in profile.extra_plugins() {
            match self.install_from_registry(entry).await {
                Ok(()) => extra_plugins.push(entry.slug.clone()),
                Err(e) => warn!(slug = %entry.slug, error = %e, "Extra plugin install failed"),
            }
        }

        let activation = if desc.activate {
            self.try_activate(&desc.slug).await
        } else {
            ActivationOutcome::Skipped
        };

        Ok(InstallReport {
            files_copied,
            activation,
            extra_plugins,
        })
    }

    async fn install_from_registry(&self, entry: &ProfileEntry) -> Result<(), LifecycleError> {
        let mut args = vec!["plugin", "install", entry.slug.as_str()];
        if entry.activate {
            args.push("--activate");
        }
        let out = self.runner.wp(&self.wp_path, &args).await?;
        if !out.success() {
            return Err(LifecycleError::CommandFailed {
                context: format!("wp plugin install {}", entry.slug),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }
        Ok(())
    }

    async fn try_activate(&self, slug: &str) -> ActivationOutcome {
        match self.activate(slug).await {
            Ok(()) => ActivationOutcome::Activated,
            Err(e) => ActivationOutcome::Unavailable(format!(
                "{} - activate '{}' manually under Plugins in the admin interface",
                e, slug
            )),
        }
    }

    pub async fn activate(&self, slug: &str) -> Result<(), LifecycleError> {
        let out = self
            .runner
            .wp(&self.wp_path, &["plugin", "activate", slug])
            .await?;
        if !out.success() {
            return Err(LifecycleError::CommandFailed {
                context: format!("wp plugin activate {}", slug),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }
        info!(slug, "Plugin activated");
        Ok(())
    }

    pub async fn deactivate(&self, slug: &str) -> Result<(), LifecycleError> {
        let out = self
            .runner
            .wp(&self.wp_path, &["plugin", "deactivate", slug])
            .await?;
        if !out.success() {
            return Err(LifecycleError::CommandFailed {
                context: format!("wp plugin deactivate {}", slug),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }
        info!(slug, "Plugin deactivated");
        Ok(())
    }

    /// Installed/active state via `wp plugin list`
    pub async fn status(&self, slug: &str) -> Result<PluginStatus, LifecycleError> {
        let out = self
            .runner
            .wp(
                &self.wp_path,
                &[
                    "plugin",
                    "list",
                    "--fields=name,status,version",
                    "--format=json",
                ],
            )
            .await?;
        if !out.success() {
            return Err(LifecycleError::CommandFailed {
                context: "wp plugin list".to_string(),
                code: out.code,
                message: out.error_line().to_string(),
            });
        }

        let rows: Vec<WpPluginRow> = serde_json::from_str(out.stdout_trimmed())
            .map_err(|e| LifecycleError::Parse(format!("wp plugin list output: {}", e)))?;

        Ok(match rows.into_iter().find(|r| r.name == slug) {
            Some(row) => PluginStatus {
                slug: slug.to_string(),
                installed: true,
                active: row.status == "active" || row.status == "active-network",
                version: row.version,
            },
            None => PluginStatus {
                slug: slug.to_string(),
                installed: false,
                active: false,
                version: None,
            },
        })
    }

    /// Whether the plugin directory exists in the target
    pub async fn files_present(&self, desc: &PluginDescriptor) -> Result<bool, LifecycleError> {
        let target = desc.target_dir(&self.wp_path);
        match self.runner.target() {
            ExecTarget::Native => Ok(Path::new(&target).is_dir()),
            ExecTarget::Container { .. } => {
                let out = self.runner.run("test", &["-d", &target]).await?;
                Ok(out.success())
            }
        }
    }

    /// Removes the plugin and, optionally, every trace of it in the database.
    ///
    /// Fails fast with [`LifecycleError::NotInstalled`] when there is nothing
    /// to remove. The caller is responsible for confirmation prompting; by
    /// the time this runs the decision is made.
    pub async fn uninstall(
        &self,
        desc: &PluginDescriptor,
        store: Option<&dyn OptionStore>,
        remove_backups: Option<&Path>,
    ) -> Result<UninstallReport, LifecycleError> {
        if !self.files_present(desc).await? {
            return Err(LifecycleError::NotInstalled(desc.slug.clone()));
        }

        let mut report = UninstallReport::default();

        if let Err(e) = self.deactivate(&desc.slug).await {
            warn!(error = %e, "Deactivation before uninstall failed; removing files anyway");
        }

        let target = desc.target_dir(&self.wp_path);
        match self.runner.target() {
            ExecTarget::Native => {
                std::fs::remove_dir_all(&target).map_err(|source| files::FilesError::Io {
                    path: PathBuf::from(&target),
                    source,
                })?;
            }
            ExecTarget::Container { .. } => {
                let out = self.runner.run("rm", &["-rf", &target]).await?;
                if !out.success() {
                    return Err(LifecycleError::CommandFailed {
                        context: format!("removing {}", target),
                        code: out.code,
                        message: out.error_line().to_string(),
                    });
                }
            }
        }
        report.files_removed = true;
        info!(slug = %desc.slug, "Plugin files removed");

        if let Some(store) = store {
            report.options_removed = store.delete_options(OPTION_PREFIX).await?;
            report.postmeta_removed = store.delete_postmeta(POSTMETA_PREFIX).await?;
            report.cron_cleared = match store.clear_cron_events(CRON_HOOK_PREFIX).await {
                Ok(n) => n,
                Err(StoreError::Unsupported(reason)) => {
                    warn!(reason, "Skipping cron cleanup");
                    0
                }
                Err(e) => return Err(e.into()),
            };
        }

        if let Some(backup_dir) = remove_backups {
            if backup_dir.exists() {
                std::fs::remove_dir_all(backup_dir).map_err(|source| files::FilesError::Io {
                    path: backup_dir.to_path_buf(),
                    source,
                })?;
                report.backups_removed = true;
            }
        }

        Ok(report)
    }

    /// Seeds the default plugin options. Idempotent.
    pub async fn setup_db(&self, store: &dyn OptionStore) -> Result<usize, LifecycleError> {
        let defaults = options::default_options();
        for (name, value) in &defaults {
            store.set_option(name, value).await?;
        }
        info!(seeded = defaults.len(), "Default plugin options seeded");
        Ok(defaults.len())
    }

    /// Removes everything `setup_db` (or the plugin itself) wrote, matched by
    /// namespace prefix. The exact inverse of setup; a second run is a no-op.
    pub async fn cleanup(&self, store: &dyn OptionStore) -> Result<CleanupReport, LifecycleError> {
        let options_removed = store.delete_options(OPTION_PREFIX).await?;
        let postmeta_removed = store.delete_postmeta(POSTMETA_PREFIX).await?;
        info!(
            options_removed,
            postmeta_removed, "Plugin database namespace cleaned"
        );
        Ok(CleanupReport {
            options_removed,
            postmeta_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dir_shape() {
        let desc = PluginDescriptor {
            slug: MAIN_PLUGIN_SLUG.to_string(),
            source: PathBuf::from("./src"),
            activate: true,
        };
        assert_eq!(
            desc.target_dir("/var/www/html/"),
            "/var/www/html/wp-content/plugins/webp-safe-migrator"
        );
    }

    #[tokio::test]
    async fn test_native_deploy_and_uninstall_roundtrip() {
        use tempfile::TempDir;

        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("plugin.php"), "<?php").unwrap();
        let wp = TempDir::new().unwrap();
        let wp_path = wp.path().to_str().unwrap().to_string();

        let manager = PluginManager::new(CommandRunner::host(), wp_path.clone());
        let desc = PluginDescriptor {
            slug: "webp-safe-migrator".to_string(),
            source: source.path().to_path_buf(),
            activate: false,
        };

        assert!(!manager.files_present(&desc).await.unwrap());
        let copied = manager.deploy(&desc).await.unwrap();
        assert_eq!(copied, 1);
        assert!(manager.files_present(&desc).await.unwrap());

        // Deploy again: overwrite, same result (idempotent)
        assert_eq!(manager.deploy(&desc).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_uninstall_when_not_installed_fails_fast() {
        use tempfile::TempDir;

        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("plugin.php"), "<?php").unwrap();
        let wp = TempDir::new().unwrap();

        let manager = PluginManager::new(
            CommandRunner::host(),
            wp.path().to_str().unwrap().to_string(),
        );
        let desc = PluginDescriptor {
            slug: "webp-safe-migrator".to_string(),
            source: source.path().to_path_buf(),
            activate: false,
        };

        let err = manager.uninstall(&desc, None, None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotInstalled(_)));
    }
}
