//! webp-migrator - development environment tool for the WebP Safe Migrator plugin
//!
//! This library drives a local WordPress environment end to end: it detects
//! what the host offers (container engines, privileges), waits for the
//! environment to come up, installs WordPress, and manages the plugin's full
//! lifecycle including database state, backups, and clean removal.
//!
//! # Core Concepts
//!
//! - **Execution path**: commands run inside the environment containers when
//!   an engine is live, natively against a host install when privileged, or
//!   not at all (manual instructions) when neither is available
//! - **Option store**: a strategy over WP-CLI or direct MySQL access for
//!   reading and writing the plugin's namespaced database state
//! - **Backup unit**: a JSON database snapshot plus an optional files archive
//!   sharing one timestamp, restored together
//!
//! # Example Usage
//!
//! ```ignore
//! use webp_migrator::config::EnvConfig;
//! use webp_migrator::detection;
//!
//! async fn where_do_we_run() {
//!     let config = EnvConfig::default();
//!     let env = detection::detect().await;
//!     println!(
//!         "target {} via {}",
//!         config.site_url,
//!         env.execution_path(None, false)
//!     );
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`detection`]: host inspection and execution-path policy
//! - [`probe`]: readiness polling (container health, HTTP)
//! - [`orchestrator`]: the ordered install sequence
//! - [`plugin`]: deploy/activate/uninstall lifecycle
//! - [`db`]: option store strategies (WP-CLI, direct MySQL)
//! - [`backup`]: snapshot + archive units

pub mod apicfg;
pub mod backup;
pub mod cli;
pub mod config;
pub mod db;
pub mod detection;
pub mod exec;
pub mod orchestrator;
pub mod plugin;
pub mod probe;

// Re-export key types for convenient access
pub use backup::{BackupError, BackupManager, Snapshot};
pub use config::{ConfigError, EnvConfig};
pub use db::{OptionStore, StoreError, StoreKind};
pub use detection::{EnvironmentInfo, ExecutionPath};
pub use exec::{CommandRunner, ExecTarget};
pub use orchestrator::{InstallOrchestrator, InstallPlan, RunReport};
pub use plugin::{PluginDescriptor, PluginManager, PluginStatus};
pub use probe::{Poller, ProbeOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
