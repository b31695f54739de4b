//! Installation orchestration
//!
//! Takes a freshly started (or partially configured) environment to a fully
//! installed, plugin-activated WordPress instance through a fixed sequence
//! of idempotent steps:
//!
//! 1. `core-status` - already installed? then verify/repair the admin account
//! 2. `core-install` - `wp core install` (hard prerequisite for 3-5)
//! 3. `plugin-deploy` - files + profile extras + activation
//! 4. `database-setup` - seed default plugin options (when enabled)
//! 5. `content-seed` - create the welcome page unless it already exists
//! 6. `verify` - HTTP probe of the admin URL
//!
//! Steps are strictly sequential; a failure is recorded and later
//! independent steps still run, except when the failed step is a hard
//! prerequisite (no core install means nothing to activate into). Readiness
//! probing happens up front and a timeout only downgrades to a warning.
//!
//! Two orchestration runs against the same container/database are not
//! guarded against; that matches the behavior this tool replaces and is a
//! documented limitation rather than a bug to fix here.

pub mod report;

pub use report::{RunReport, StepOutcome, StepStatus};

use tracing::{info, warn};

use crate::config::EnvConfig;
use crate::db::OptionStore;
use crate::exec::{CommandRunner, ExecTarget};
use crate::plugin::{ActivationOutcome, PluginDescriptor, PluginManager, Profile};
use crate::probe::{container, http, Poller, ProbeHandler};

/// Title of the idempotently seeded welcome page
pub const WELCOME_PAGE_TITLE: &str = "Welcome to WebP Migrator Testing";

const WELCOME_PAGE_CONTENT: &str =
    "Upload some images and run the migrator from Media > WebP Migrator. \
     This page was created by the environment setup and is safe to delete.";

/// Options for one orchestration run
pub struct InstallPlan {
    pub descriptor: PluginDescriptor,
    pub profile: Profile,

    /// Seed default plugin options after deploying
    pub with_database: bool,

    /// Skip the readiness gate (useful against an environment known to be up)
    pub skip_probes: bool,
}

/// Runs the ordered install sequence against one target
pub struct InstallOrchestrator<'a> {
    config: &'a EnvConfig,
    runner: CommandRunner,
    wp_path: String,
    poller: Poller,
    handler: &'a dyn ProbeHandler,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        config: &'a EnvConfig,
        runner: CommandRunner,
        wp_path: String,
        poller: Poller,
        handler: &'a dyn ProbeHandler,
    ) -> Self {
        Self {
            config,
            runner,
            wp_path,
            poller,
            handler,
        }
    }

    /// Executes the full sequence and returns the aggregated report
    pub async fn run(
        &self,
        plan: &InstallPlan,
        store: Option<&dyn OptionStore>,
    ) -> RunReport {
        let mut report = RunReport::new();

        if !plan.skip_probes {
            self.readiness_gate().await;
        }

        let core_ready = self.step_core(&mut report).await;

        if core_ready {
            self.step_plugin(&mut report, plan).await;
            if plan.with_database {
                self.step_database(&mut report, store).await;
            }
            self.step_content(&mut report).await;
            self.step_verify(&mut report).await;
        } else {
            for step in ["plugin-deploy", "database-setup", "content-seed", "verify"] {
                if step == "database-setup" && !plan.with_database {
                    continue;
                }
                report.record(StepOutcome::skipped(step, "core install did not succeed"));
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Install run finished"
        );
        report
    }

    /// Container health first, then HTTP. Timeouts are warnings: WP-CLI may
    /// succeed anyway, or fail with a clearer diagnostic than we could give.
    async fn readiness_gate(&self) {
        if let ExecTarget::Container { engine, name } = self.runner.target() {
            let engine = *engine;
            let name = name.clone();
            let target = format!("container {}", name);
            let outcome = self
                .poller
                .run(&target, self.handler, || {
                    let name = name.clone();
                    async move { container::container_healthy(engine, &name).await }
                })
                .await;
            if !outcome.is_ready() {
                warn!(container = %name, "Container never reported healthy; proceeding anyway");
            }
        }

        let url = self.config.site_url.clone();
        let outcome = self
            .poller
            .run(&url.clone(), self.handler, || {
                let url = url.clone();
                async move { http::url_reachable(&url).await }
            })
            .await;
        if !outcome.is_ready() {
            warn!(url = %self.config.site_url, "Site never answered HTTP; proceeding anyway");
        }
    }

    /// Steps 1-2. Returns whether a working core install exists afterwards.
    async fn step_core(&self, report: &mut RunReport) -> bool {
        let installed = match self.runner.wp(&self.wp_path, &["core", "is-installed"]).await {
            Ok(out) => out.success(),
            Err(e) => {
                report.record(StepOutcome::failed(
                    "core-status",
                    None,
                    format!("could not query install state: {}", e),
                ));
                return false;
            }
        };

        if installed {
            match self.repair_admin_account().await {
                Ok(action) => report.record(StepOutcome::success(
                    "core-status",
                    format!("already installed; admin account {}", action),
                )),
                Err(msg) => report.record(StepOutcome::failed("core-status", None, msg)),
            }
            report.record(StepOutcome::skipped("core-install", "already installed"));
            return true;
        }

        report.record(StepOutcome::success("core-status", "not installed yet"));

        let url = self.config.site_url.clone();
        let title = format!("--title={}", self.config.site_title);
        let user = format!("--admin_user={}", self.config.admin_user);
        let pass = format!("--admin_password={}", self.config.admin_password);
        let email = format!("--admin_email={}", self.config.admin_email);
        let url_arg = format!("--url={}", url);

        match self
            .runner
            .wp(
                &self.wp_path,
                &[
                    "core",
                    "install",
                    &url_arg,
                    &title,
                    &user,
                    &pass,
                    &email,
                    "--skip-email",
                ],
            )
            .await
        {
            Ok(out) if out.success() => {
                report.record(StepOutcome::success(
                    "core-install",
                    format!("site installed at {}", url),
                ));
                true
            }
            Ok(out) => {
                report.record(StepOutcome::failed(
                    "core-install",
                    Some(out.code),
                    out.error_line().to_string(),
                ));
                false
            }
            Err(e) => {
                report.record(StepOutcome::failed("core-install", None, e.to_string()));
                false
            }
        }
    }

    /// Update the password when the admin user exists, create it otherwise
    async fn repair_admin_account(&self) -> Result<String, String> {
        let user = &self.config.admin_user;
        let exists = self
            .runner
            .wp(&self.wp_path, &["user", "get", user, "--field=ID"])
            .await
            .map(|out| out.success())
            .map_err(|e| e.to_string())?;

        if exists {
            let pass = format!("--user_pass={}", self.config.admin_password);
            let out = self
                .runner
                .wp(&self.wp_path, &["user", "update", user, &pass])
                .await
                .map_err(|e| e.to_string())?;
            if out.success() {
                Ok("password refreshed".to_string())
            } else {
                Err(format!("admin password update failed: {}", out.error_line()))
            }
        } else {
            let pass = format!("--user_pass={}", self.config.admin_password);
            let out = self
                .runner
                .wp(
                    &self.wp_path,
                    &[
                        "user",
                        "create",
                        user,
                        &self.config.admin_email,
                        "--role=administrator",
                        &pass,
                    ],
                )
                .await
                .map_err(|e| e.to_string())?;
            if out.success() {
                Ok("created".to_string())
            } else {
                Err(format!("admin account creation failed: {}", out.error_line()))
            }
        }
    }

    async fn step_plugin(&self, report: &mut RunReport, plan: &InstallPlan) {
        let manager = PluginManager::new(self.runner.clone(), self.wp_path.clone());
        match manager.install(&plan.descriptor, &plan.profile).await {
            Ok(install) => {
                let mut message = format!("{} files deployed", install.files_copied);
                match &install.activation {
                    ActivationOutcome::Activated => message.push_str(", activated"),
                    ActivationOutcome::Skipped => {}
                    ActivationOutcome::Unavailable(hint) => {
                        warn!(hint = %hint, "Automatic activation unavailable");
                        message.push_str(", activation pending (no WP-CLI)");
                    }
                }
                if !install.extra_plugins.is_empty() {
                    message.push_str(&format!(", extras: {}", install.extra_plugins.join(", ")));
                }
                report.record(StepOutcome::success("plugin-deploy", message));
            }
            Err(e) => report.record(StepOutcome::failed("plugin-deploy", None, e.to_string())),
        }
    }

    async fn step_database(&self, report: &mut RunReport, store: Option<&dyn OptionStore>) {
        let manager = PluginManager::new(self.runner.clone(), self.wp_path.clone());
        match store {
            Some(store) => match manager.setup_db(store).await {
                Ok(seeded) => report.record(StepOutcome::success(
                    "database-setup",
                    format!("{} default options seeded", seeded),
                )),
                Err(e) => {
                    report.record(StepOutcome::failed("database-setup", None, e.to_string()))
                }
            },
            None => report.record(StepOutcome::failed(
                "database-setup",
                None,
                "no database strategy available in this environment",
            )),
        }
    }

    /// Seeds the welcome page, once. Re-runs find the page and do nothing.
    async fn step_content(&self, report: &mut RunReport) {
        let existing = self
            .runner
            .wp(
                &self.wp_path,
                &[
                    "post",
                    "list",
                    "--post_type=page",
                    "--field=post_title",
                    "--post_status=publish,draft",
                ],
            )
            .await;

        match existing {
            Ok(out) if out.success() => {
                if out.stdout.lines().any(|l| l.trim() == WELCOME_PAGE_TITLE) {
                    report.record(StepOutcome::success("content-seed", "welcome page already exists"));
                    return;
                }
            }
            Ok(out) => {
                report.record(StepOutcome::failed(
                    "content-seed",
                    Some(out.code),
                    out.error_line().to_string(),
                ));
                return;
            }
            Err(e) => {
                report.record(StepOutcome::failed("content-seed", None, e.to_string()));
                return;
            }
        }

        let title = format!("--post_title={}", WELCOME_PAGE_TITLE);
        let content = format!("--post_content={}", WELCOME_PAGE_CONTENT);
        match self
            .runner
            .wp(
                &self.wp_path,
                &[
                    "post",
                    "create",
                    "--post_type=page",
                    "--post_status=publish",
                    &title,
                    &content,
                ],
            )
            .await
        {
            Ok(out) if out.success() => {
                report.record(StepOutcome::success("content-seed", "welcome page created"))
            }
            Ok(out) => report.record(StepOutcome::failed(
                "content-seed",
                Some(out.code),
                out.error_line().to_string(),
            )),
            Err(e) => report.record(StepOutcome::failed("content-seed", None, e.to_string())),
        }
    }

    async fn step_verify(&self, report: &mut RunReport) {
        let admin_url = self.config.admin_url();
        if http::url_healthy(&admin_url).await {
            report.record(StepOutcome::success(
                "verify",
                format!("{} answers", admin_url),
            ));
        } else {
            report.record(StepOutcome::failed(
                "verify",
                None,
                format!("{} did not answer with a non-error status", admin_url),
            ));
        }
    }
}
