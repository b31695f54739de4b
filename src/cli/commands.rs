use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::detection::Engine;

/// Development environment CLI for the WebP Safe Migrator WordPress plugin
#[derive(Parser, Debug)]
#[command(
    name = "webp-migrator",
    about = "Provision and drive a local WordPress environment for the WebP Safe Migrator plugin",
    version,
    long_about = "webp-migrator detects the local container engine, waits for the WordPress \
                  environment to come up, installs and configures the site, and manages the \
                  plugin's lifecycle: deploy, activate, back up, restore, and clean removal."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Install WordPress and deploy the plugin",
        long_about = "Waits for the environment to become ready, installs WordPress core if \
                      needed, deploys the plugin per the selected profile, optionally seeds \
                      the default plugin options, and verifies the admin URL.\n\n\
                      Examples:\n  \
                      webp-migrator install\n  \
                      webp-migrator install --with-database --activate\n  \
                      webp-migrator install --engine podman --profile production"
    )]
    Install(InstallArgs),

    #[command(about = "Redeploy plugin files into an existing environment")]
    Update(UpdateArgs),

    #[command(
        about = "Remove the plugin, its data, and optionally its backups",
        long_about = "Deactivates the plugin, removes its files, deletes every option and \
                      postmeta row in the plugin namespace, and unschedules its cron events. \
                      Destructive; prompts for confirmation unless --force is given."
    )]
    Uninstall(UninstallArgs),

    #[command(about = "Export plugin options, postmeta, and files into a backup unit")]
    Backup(BackupArgs),

    #[command(
        about = "Re-apply a backup snapshot",
        long_about = "Restores option and postmeta values from a snapshot, and unpacks the \
                      paired files archive when present. Refuses snapshots recorded for a \
                      different plugin slug."
    )]
    Restore(RestoreArgs),

    #[command(about = "Activate the plugin")]
    Activate(TargetOnlyArgs),

    #[command(about = "Deactivate the plugin")]
    Deactivate(TargetOnlyArgs),

    #[command(about = "Show environment and plugin status")]
    Status(TargetOnlyArgs),

    #[command(
        about = "Remove every option and postmeta row in the plugin namespace",
        long_about = "The exact inverse of setup-db: removes everything under the plugin's \
                      option/postmeta namespace prefix, whether setup-db created it or the \
                      plugin did. Running it twice is a no-op the second time."
    )]
    Cleanup(CleanupArgs),

    #[command(
        name = "setup-db",
        about = "Seed the default plugin options (quality 59, batch size 10, validation on)"
    )]
    SetupDb(TargetOnlyArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    /// First live engine, docker preferred
    Auto,
    Docker,
    Podman,
}

impl EngineArg {
    pub fn forced(self) -> Option<Engine> {
        match self {
            EngineArg::Auto => None,
            EngineArg::Docker => Some(Engine::Docker),
            EngineArg::Podman => Some(Engine::Podman),
        }
    }
}

/// Options shared by every action: where the target WordPress lives
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(
        long,
        value_name = "PATH",
        default_value = "/var/www/html",
        help = "WordPress install path inside the target"
    )]
    pub wp_path: String,

    #[arg(
        long,
        value_name = "NAME",
        help = "Target container name (defaults to WEBP_CONTAINER)"
    )]
    pub container: Option<String>,

    #[arg(long, value_enum, default_value = "auto", help = "Container engine")]
    pub engine: EngineArg,

    #[arg(long, help = "Run against a host WordPress install instead of a container")]
    pub native: bool,

    #[arg(long, help = "Skip WP-CLI and use direct database access only")]
    pub no_wp_cli: bool,

    #[arg(
        long,
        value_name = "SLUG",
        default_value = "webp-safe-migrator",
        help = "Plugin slug to operate on"
    )]
    pub slug: String,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "./src",
        help = "Plugin source tree to deploy"
    )]
    pub plugin_source: PathBuf,

    #[arg(long, help = "Activate the plugin after deploying")]
    pub activate: bool,

    #[arg(long, help = "Seed the default plugin options after deploying")]
    pub with_database: bool,

    #[arg(long, help = "Write the REST API configuration artifact")]
    pub generate_api_config: bool,

    #[arg(
        long,
        value_name = "NAME",
        default_value = "development",
        help = "Plugin profile (development|production, or a name from --profile-file)"
    )]
    pub profile: String,

    #[arg(long, value_name = "FILE", help = "YAML file defining the profile")]
    pub profile_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "120",
        help = "Readiness budget per probe"
    )]
    pub readiness_timeout: u64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "5",
        help = "Readiness poll interval"
    )]
    pub poll_interval: u64,

    #[arg(long, help = "Skip the readiness probes")]
    pub skip_probes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, value_name = "PATH", default_value = "./src")]
    pub plugin_source: PathBuf,

    #[arg(long, help = "Re-activate the plugin after redeploying")]
    pub activate: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UninstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, help = "Skip the confirmation prompt")]
    pub force: bool,

    #[arg(long, help = "Also delete plugin options, postmeta, and cron events")]
    pub with_database: bool,

    #[arg(long, help = "Also delete the backup directory")]
    pub remove_backups: bool,

    #[arg(long, value_name = "PATH", help = "Backup directory to delete")]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, value_name = "PATH", help = "Backup directory (defaults to the user data dir)")]
    pub backup_dir: Option<PathBuf>,

    #[arg(long, help = "Also archive the deployed plugin files")]
    pub include_files: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(value_name = "SNAPSHOT", help = "Snapshot file to restore")]
    pub snapshot: Option<PathBuf>,

    #[arg(long, conflicts_with = "snapshot", help = "Restore the most recent snapshot")]
    pub latest: bool,

    #[arg(long, value_name = "PATH", help = "Backup directory (defaults to the user data dir)")]
    pub backup_dir: Option<PathBuf>,

    #[arg(long, help = "Also unpack the paired files archive")]
    pub include_files: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, help = "Skip the confirmation prompt")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TargetOnlyArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_all_actions_parse() {
        for action in [
            "install",
            "update",
            "uninstall",
            "backup",
            "restore",
            "activate",
            "deactivate",
            "status",
            "cleanup",
            "setup-db",
        ] {
            let result = CliArgs::try_parse_from(["webp-migrator", action]);
            assert!(result.is_ok(), "action '{}' failed to parse", action);
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = CliArgs::try_parse_from(["webp-migrator", "provision"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_install_flags() {
        let args = CliArgs::try_parse_from([
            "webp-migrator",
            "install",
            "--with-database",
            "--activate",
            "--engine",
            "podman",
            "--profile",
            "production",
        ])
        .unwrap();

        match args.command {
            Commands::Install(install) => {
                assert!(install.with_database);
                assert!(install.activate);
                assert_eq!(install.target.engine, EngineArg::Podman);
                assert_eq!(install.profile, "production");
                assert_eq!(install.target.wp_path, "/var/www/html");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_restore_latest_conflicts_with_positional() {
        let result = CliArgs::try_parse_from([
            "webp-migrator",
            "restore",
            "snap.json",
            "--latest",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = CliArgs::try_parse_from(["webp-migrator", "status", "-v", "-q"]);
        assert!(result.is_err());
    }
}
