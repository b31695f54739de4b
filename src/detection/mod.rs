//! Environment detection
//!
//! Inspects the host once at startup and produces an immutable
//! [`EnvironmentInfo`] descriptor: OS family and distro, live container
//! engines, package manager, and privilege level. The descriptor drives the
//! execution-path decision (container vs native vs manual) for the rest of
//! the run.
//!
//! Probes are read-only and individually fallible without failing detection
//! as a whole; a probe that cannot decide reports "not available".

pub mod engine;
pub mod host;
pub mod types;

pub use types::{Engine, EnvironmentInfo, ExecutionPath, OsKind, PackageManager};

use tracing::info;

/// Runs all probes and assembles the descriptor
pub async fn detect() -> EnvironmentInfo {
    let os = OsKind::current();
    let distro = host::distro_name();
    let engines = engine::live_engines().await;
    let package_manager = host::detect_package_manager(os);
    let elevated = host::is_elevated(os).await;

    let env = EnvironmentInfo {
        os,
        distro,
        engines,
        package_manager,
        elevated,
    };

    info!(
        os = %env.os,
        distro = env.distro.as_deref().unwrap_or("unknown"),
        engines = ?env.engines.iter().map(|e| e.binary()).collect::<Vec<_>>(),
        elevated = env.elevated,
        "Environment detected"
    );

    env
}
