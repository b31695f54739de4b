//! Subcommand handlers
//!
//! Each handler builds its components from the run configuration and the
//! detected environment, performs one lifecycle action, prints through the
//! formatter, and returns a process exit code. Destructive actions confirm
//! on stdin first unless `--force` was given.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, warn};

use super::commands::{
    BackupArgs, CleanupArgs, InstallArgs, RestoreArgs, TargetArgs, TargetOnlyArgs, UninstallArgs,
    UpdateArgs,
};
use super::output::OutputFormatter;
use crate::apicfg::ApiConfig;
use crate::backup::{default_backup_dir, BackupManager};
use crate::config::EnvConfig;
use crate::db::{select_store, OptionStore};
use crate::detection::{self, EnvironmentInfo, ExecutionPath};
use crate::exec::{CommandRunner, ExecTarget};
use crate::orchestrator::{InstallOrchestrator, InstallPlan};
use crate::plugin::{
    files, LifecycleError, PluginDescriptor, PluginManager, Profile,
};
use crate::probe::{LoggingHandler, Poller};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;

/// Everything a handler needs to reach the target environment
struct RunContext {
    config: EnvConfig,
    wp_runner: CommandRunner,
    db_runner: CommandRunner,
}

impl RunContext {
    /// Detects the environment and resolves the execution path. On the
    /// manual path this prints instructions and yields no context.
    async fn build(target: &TargetArgs) -> Result<RunContext, i32> {
        let config = EnvConfig::default();
        if let Err(e) = config.validate() {
            error!(error = %e, "Invalid configuration");
            return Err(EXIT_FAILURE);
        }

        let env = detection::detect().await;
        let path = env.execution_path(target.engine.forced(), target.native);

        let (wp_runner, db_runner) = match path {
            ExecutionPath::Container(engine) => {
                let container = target
                    .container
                    .clone()
                    .unwrap_or_else(|| config.container.clone());
                (
                    CommandRunner::new(ExecTarget::Container {
                        engine,
                        name: container,
                    }),
                    CommandRunner::new(ExecTarget::Container {
                        engine,
                        name: config.db_container.clone(),
                    }),
                )
            }
            ExecutionPath::NativePrivileged => (CommandRunner::host(), CommandRunner::host()),
            ExecutionPath::Manual => {
                print_manual_instructions(&config, &env);
                return Err(EXIT_FAILURE);
            }
        };

        Ok(RunContext {
            config,
            wp_runner,
            db_runner,
        })
    }

    async fn store(&self, target: &TargetArgs) -> Result<Box<dyn OptionStore>, i32> {
        match select_store(
            !target.no_wp_cli,
            &self.wp_runner,
            &self.db_runner,
            &target.wp_path,
        )
        .await
        {
            Ok(store) => Ok(store),
            Err(e) => {
                error!(error = %e, "No database strategy available");
                eprintln!("This operation is unsupported in this environment: {}", e);
                Err(EXIT_FAILURE)
            }
        }
    }

    fn manager(&self, target: &TargetArgs) -> PluginManager {
        PluginManager::new(self.wp_runner.clone(), target.wp_path.clone())
    }
}

fn print_manual_instructions(config: &EnvConfig, env: &EnvironmentInfo) {
    eprintln!("No container engine is reachable and this session lacks the privileges");
    eprintln!("for a native install. To proceed manually:");
    eprintln!();
    match env.package_manager {
        Some(pm) => eprintln!(
            "  1. Install Docker or Podman (e.g. via {}), then re-run this command.",
            pm.binary()
        ),
        None => eprintln!("  1. Install Docker or Podman, then re-run this command."),
    }
    eprintln!("  2. Or install WordPress yourself and point this tool at it with --native");
    eprintln!("     from a privileged shell.");
    eprintln!(
        "  3. Or copy the plugin into wp-content/plugins and activate it at {}",
        config.admin_url()
    );
}

fn confirm(prompt: &str, force: bool) -> bool {
    if force {
        return true;
    }
    print!("{} Type 'yes' to continue: ", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn load_profile(name: &str, file: Option<&Path>) -> Result<Profile, i32> {
    let result = match file {
        Some(path) => Profile::load(path),
        None => Profile::builtin(name),
    };
    result.map_err(|e| {
        error!(error = %e, "Could not load profile");
        EXIT_FAILURE
    })
}

fn descriptor(target: &TargetArgs, source: &Path, activate: bool) -> PluginDescriptor {
    PluginDescriptor {
        slug: target.slug.clone(),
        source: source.to_path_buf(),
        activate,
    }
}

pub async fn handle_install(args: &InstallArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let profile = match load_profile(&args.profile, args.profile_file.as_deref()) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let store = if args.with_database {
        match ctx.store(&args.target).await {
            Ok(s) => Some(s),
            // Reported inside the run as a failed database-setup step
            Err(_) => None,
        }
    } else {
        None
    };

    let plan = InstallPlan {
        descriptor: descriptor(&args.target, &args.plugin_source, args.activate),
        profile,
        with_database: args.with_database,
        skip_probes: args.skip_probes,
    };

    let poller = Poller::new(
        Duration::from_secs(args.poll_interval.max(1)),
        Duration::from_secs(args.readiness_timeout),
    );
    let orchestrator = InstallOrchestrator::new(
        &ctx.config,
        ctx.wp_runner.clone(),
        args.target.wp_path.clone(),
        poller,
        &LoggingHandler,
    );

    let report = orchestrator.run(&plan, store.as_deref()).await;

    match formatter.format_report(&report) {
        Ok(out) => print!("{}", out),
        Err(e) => error!(error = %e, "Failed to format report"),
    }

    if args.generate_api_config {
        match ApiConfig::standard().write_to(Path::new(".")) {
            Ok(path) => print!("{}", formatter.format_result("written", &path.display().to_string())),
            Err(e) => {
                error!(error = %e, "Failed to write API configuration");
                return EXIT_FAILURE;
            }
        }
    }

    if report.overall_success() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

pub async fn handle_update(args: &UpdateArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let manager = ctx.manager(&args.target);
    let desc = descriptor(&args.target, &args.plugin_source, args.activate);

    let copied = match manager.deploy(&desc).await {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "Redeploy failed");
            return EXIT_FAILURE;
        }
    };
    if let Err(e) = manager.fix_ownership(&desc).await {
        warn!(error = %e, "Ownership fix failed");
    }

    if args.activate {
        if let Err(e) = manager.activate(&desc.slug).await {
            error!(error = %e, "Re-activation failed");
            return EXIT_FAILURE;
        }
    }

    print!(
        "{}",
        formatter.format_result("updated", &format!("{} files deployed", copied))
    );
    EXIT_OK
}

pub async fn handle_uninstall(args: &UninstallArgs, formatter: &OutputFormatter) -> i32 {
    let mut scope = vec!["plugin files"];
    if args.with_database {
        scope.push("namespaced options/postmeta/cron");
    }
    if args.remove_backups {
        scope.push("backups");
    }
    let prompt = format!("About to remove: {}.", scope.join(", "));
    if !confirm(&prompt, args.force) {
        eprintln!("Aborted.");
        return EXIT_FAILURE;
    }

    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let manager = ctx.manager(&args.target);
    let desc = descriptor(&args.target, Path::new("."), false);

    let store = if args.with_database {
        match ctx.store(&args.target).await {
            Ok(s) => Some(s),
            Err(code) => return code,
        }
    } else {
        None
    };

    let backup_dir = args
        .remove_backups
        .then(|| args.backup_dir.clone().unwrap_or_else(default_backup_dir));

    match manager
        .uninstall(&desc, store.as_deref(), backup_dir.as_deref())
        .await
    {
        Ok(report) => {
            print!(
                "{}",
                formatter.format_result(
                    "uninstalled",
                    &format!(
                        "files removed; {} options, {} postmeta rows, {} cron events removed{}",
                        report.options_removed,
                        report.postmeta_removed,
                        report.cron_cleared,
                        if report.backups_removed {
                            "; backups removed"
                        } else {
                            ""
                        }
                    )
                )
            );
            EXIT_OK
        }
        Err(LifecycleError::NotInstalled(slug)) => {
            eprintln!("Plugin '{}' is not installed; nothing removed.", slug);
            EXIT_FAILURE
        }
        Err(e) => {
            error!(error = %e, "Uninstall failed");
            EXIT_FAILURE
        }
    }
}

/// Pulls the deployed plugin tree to a host directory for archiving
async fn fetch_plugin_tree(
    ctx: &RunContext,
    target: &TargetArgs,
    dest: &Path,
) -> Result<PathBuf, String> {
    let plugin_dir = format!(
        "{}/wp-content/plugins/{}",
        target.wp_path.trim_end_matches('/'),
        target.slug
    );

    match ctx.wp_runner.target() {
        ExecTarget::Native => {
            let local = dest.join(&target.slug);
            files::copy_tree(Path::new(&plugin_dir), &local).map_err(|e| e.to_string())?;
            Ok(local)
        }
        ExecTarget::Container { engine, name } => {
            let host = CommandRunner::host();
            let src = format!("{}:{}", name, plugin_dir);
            let out = host
                .run(engine.binary(), &["cp", &src, &dest.display().to_string()])
                .await
                .map_err(|e| e.to_string())?;
            if !out.success() {
                return Err(format!("{} cp failed: {}", engine.binary(), out.error_line()));
            }
            Ok(dest.join(&target.slug))
        }
    }
}

pub async fn handle_backup(args: &BackupArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let store = match ctx.store(&args.target).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let backup_dir = args.backup_dir.clone().unwrap_or_else(default_backup_dir);
    let manager = BackupManager::new(backup_dir, args.target.slug.clone());

    let staging = std::env::temp_dir().join(format!("webp-migrator-backup-{}", std::process::id()));
    let plugin_tree = if args.include_files {
        if let Err(e) = std::fs::create_dir_all(&staging) {
            error!(error = %e, "Could not create staging directory");
            return EXIT_FAILURE;
        }
        match fetch_plugin_tree(&ctx, &args.target, &staging).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, "Could not fetch deployed plugin files");
                let _ = std::fs::remove_dir_all(&staging);
                return EXIT_FAILURE;
            }
        }
    } else {
        None
    };

    let result = manager.backup(store.as_ref(), plugin_tree.as_deref()).await;
    let _ = std::fs::remove_dir_all(&staging);

    match result {
        Ok(unit) => {
            let detail = match &unit.archive {
                Some(archive) => format!(
                    "{} + {}",
                    unit.snapshot.display(),
                    archive.display()
                ),
                None => unit.snapshot.display().to_string(),
            };
            print!("{}", formatter.format_result("backup written", &detail));
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Backup failed; no snapshot written");
            EXIT_FAILURE
        }
    }
}

pub async fn handle_restore(args: &RestoreArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let store = match ctx.store(&args.target).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let backup_dir = args.backup_dir.clone().unwrap_or_else(default_backup_dir);
    let manager = BackupManager::new(backup_dir, args.target.slug.clone());

    let snapshot = match (&args.snapshot, args.latest) {
        (Some(path), _) => path.clone(),
        (None, true) => match manager.latest_snapshot() {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "No snapshot to restore");
                return EXIT_FAILURE;
            }
        },
        (None, false) => {
            eprintln!("Give a snapshot file or --latest.");
            return EXIT_FAILURE;
        }
    };

    // Files land in a host staging dir first; the container path pushes
    // them through `<engine> cp` afterwards.
    let staging = std::env::temp_dir().join(format!("webp-migrator-restore-{}", std::process::id()));
    let files_dest = if args.include_files {
        if let Err(e) = std::fs::create_dir_all(&staging) {
            error!(error = %e, "Could not create staging directory");
            return EXIT_FAILURE;
        }
        Some(staging.clone())
    } else {
        None
    };

    let result = manager
        .restore(&snapshot, store.as_ref(), files_dest.as_deref())
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            let _ = std::fs::remove_dir_all(&staging);
            error!(error = %e, "Restore failed; nothing applied");
            eprintln!("{}", e);
            return EXIT_FAILURE;
        }
    };

    if report.files_unpacked {
        let plugins_dir = format!(
            "{}/wp-content/plugins",
            args.target.wp_path.trim_end_matches('/')
        );
        let unpacked = staging.join(&args.target.slug);
        let pushed = match ctx.wp_runner.target() {
            ExecTarget::Native => files::copy_tree(
                &unpacked,
                &PathBuf::from(&plugins_dir).join(&args.target.slug),
            )
            .map(|_| ())
            .map_err(|e| e.to_string()),
            ExecTarget::Container { engine, name } => {
                let host = CommandRunner::host();
                let dst = format!("{}:{}/", name, plugins_dir);
                match host
                    .run(engine.binary(), &["cp", &unpacked.display().to_string(), &dst])
                    .await
                {
                    Ok(out) if out.success() => Ok(()),
                    Ok(out) => Err(out.error_line().to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
        };
        if let Err(e) = pushed {
            let _ = std::fs::remove_dir_all(&staging);
            error!(error = %e, "Database restored but files could not be placed");
            return EXIT_FAILURE;
        }
    }
    let _ = std::fs::remove_dir_all(&staging);

    print!(
        "{}",
        formatter.format_result(
            "restored",
            &format!(
                "{} options, {} postmeta rows{}",
                report.options_applied,
                report.postmeta_applied,
                if report.files_unpacked { ", files" } else { "" }
            )
        )
    );
    EXIT_OK
}

pub async fn handle_activate(args: &TargetOnlyArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    match ctx.manager(&args.target).activate(&args.target.slug).await {
        Ok(()) => {
            print!("{}", formatter.format_result("activated", &args.target.slug));
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Activation failed");
            EXIT_FAILURE
        }
    }
}

pub async fn handle_deactivate(args: &TargetOnlyArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    match ctx.manager(&args.target).deactivate(&args.target.slug).await {
        Ok(()) => {
            print!("{}", formatter.format_result("deactivated", &args.target.slug));
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Deactivation failed");
            EXIT_FAILURE
        }
    }
}

pub async fn handle_status(args: &TargetOnlyArgs, formatter: &OutputFormatter) -> i32 {
    let config = EnvConfig::default();
    let env = detection::detect().await;
    match formatter.format_environment(&env) {
        Ok(out) => print!("{}", out),
        Err(e) => error!(error = %e, "Failed to format environment"),
    }

    let path = env.execution_path(args.target.engine.forced(), args.target.native);
    let wp_runner = match path {
        ExecutionPath::Container(engine) => CommandRunner::new(ExecTarget::Container {
            engine,
            name: args
                .target
                .container
                .clone()
                .unwrap_or_else(|| config.container.clone()),
        }),
        ExecutionPath::NativePrivileged => CommandRunner::host(),
        ExecutionPath::Manual => {
            // Environment summary is still useful without a target
            return EXIT_OK;
        }
    };

    let manager = PluginManager::new(wp_runner, args.target.wp_path.clone());
    match manager.status(&args.target.slug).await {
        Ok(status) => match formatter.format_plugin_status(&status) {
            Ok(out) => {
                print!("{}", out);
                EXIT_OK
            }
            Err(e) => {
                error!(error = %e, "Failed to format status");
                EXIT_FAILURE
            }
        },
        Err(e) => {
            warn!(error = %e, "Plugin status unavailable");
            eprintln!("Plugin status unavailable: {}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_cleanup(args: &CleanupArgs, formatter: &OutputFormatter) -> i32 {
    let prompt = "About to remove every option and postmeta row in the plugin namespace.";
    if !confirm(prompt, args.force) {
        eprintln!("Aborted.");
        return EXIT_FAILURE;
    }

    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let store = match ctx.store(&args.target).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match ctx.manager(&args.target).cleanup(store.as_ref()).await {
        Ok(report) => {
            print!(
                "{}",
                formatter.format_result(
                    "cleaned",
                    &format!(
                        "{} options, {} postmeta rows removed",
                        report.options_removed, report.postmeta_removed
                    )
                )
            );
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Cleanup failed");
            EXIT_FAILURE
        }
    }
}

pub async fn handle_setup_db(args: &TargetOnlyArgs, formatter: &OutputFormatter) -> i32 {
    let ctx = match RunContext::build(&args.target).await {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let store = match ctx.store(&args.target).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match ctx.manager(&args.target).setup_db(store.as_ref()).await {
        Ok(seeded) => {
            print!(
                "{}",
                formatter.format_result("seeded", &format!("{} default options", seeded))
            );
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Database setup failed");
            EXIT_FAILURE
        }
    }
}
