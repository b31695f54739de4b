//! Host-level probes: OS identity, package manager, privilege level
//!
//! All probes are read-only and inconclusive results degrade to "not
//! available" rather than erroring.

use sysinfo::System;
use tracing::debug;

use super::engine::binary_on_path;
use super::types::{OsKind, PackageManager};
use crate::exec::CommandRunner;

/// Product/distribution name as reported by the host, e.g. "Ubuntu 24.04"
pub fn distro_name() -> Option<String> {
    let name = System::name()?;
    match System::os_version() {
        Some(version) => Some(format!("{} {}", name, version)),
        None => Some(name),
    }
}

/// First recognized package manager on PATH, checked in a fixed order
pub fn detect_package_manager(os: OsKind) -> Option<PackageManager> {
    let candidates: &[PackageManager] = match os {
        OsKind::Linux => &[
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Pacman,
            PackageManager::Zypper,
        ],
        OsKind::Macos => &[PackageManager::Brew],
        OsKind::Windows => &[PackageManager::Winget, PackageManager::Choco],
        OsKind::Other => &[],
    };

    candidates
        .iter()
        .copied()
        .find(|pm| binary_on_path(pm.binary()))
}

/// Checks whether the process runs with elevated privileges.
///
/// Unix: `id -u` == 0. Windows: `net session` succeeds only for
/// administrators. Any probe failure means "not elevated".
pub async fn is_elevated(os: OsKind) -> bool {
    let runner = CommandRunner::host();

    match os {
        OsKind::Windows => match runner.run("net", &["session"]).await {
            Ok(out) => out.success(),
            Err(_) => false,
        },
        _ => match runner.run("id", &["-u"]).await {
            Ok(out) if out.success() => out.stdout_trimmed() == "0",
            Ok(_) | Err(_) => {
                debug!("Privilege probe inconclusive, assuming unprivileged");
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_elevation_probe_never_errors() {
        let _ = is_elevated(OsKind::current()).await;
    }

    #[test]
    fn test_package_manager_probe_is_quiet() {
        // Must not panic on any host; result depends on the machine.
        let _ = detect_package_manager(OsKind::current());
    }

    #[test]
    fn test_other_os_has_no_candidates() {
        assert_eq!(detect_package_manager(OsKind::Other), None);
    }
}
