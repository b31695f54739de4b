//! Environment descriptor types
//!
//! The descriptor is computed once at startup by read-only probes and stays
//! immutable for the run; every component receives it explicitly.

use serde::Serialize;
use std::fmt;

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Linux,
    Macos,
    Windows,
    Other,
}

impl OsKind {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => OsKind::Linux,
            "macos" => OsKind::Macos,
            "windows" => OsKind::Windows,
            _ => OsKind::Other,
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::Linux => write!(f, "linux"),
            OsKind::Macos => write!(f, "macos"),
            OsKind::Windows => write!(f, "windows"),
            OsKind::Other => write!(f, "other"),
        }
    }
}

/// Supported container engines, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Docker,
    Podman,
}

impl Engine {
    /// CLI binary name for this engine
    pub fn binary(&self) -> &'static str {
        match self {
            Engine::Docker => "docker",
            Engine::Podman => "podman",
        }
    }

    pub const ALL: [Engine; 2] = [Engine::Docker, Engine::Podman];
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

/// Host package managers we know how to point the operator at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Zypper,
    Brew,
    Choco,
    Winget,
}

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
            PackageManager::Brew => "brew",
            PackageManager::Choco => "choco",
            PackageManager::Winget => "winget",
        }
    }
}

/// Which execution path the run takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionPath {
    /// Commands run inside the environment containers
    Container(Engine),

    /// Commands run directly against a host WordPress install
    NativePrivileged,

    /// Neither path is available; print manual instructions
    Manual,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPath::Container(e) => write!(f, "container ({})", e),
            ExecutionPath::NativePrivileged => write!(f, "native (privileged)"),
            ExecutionPath::Manual => write!(f, "manual"),
        }
    }
}

/// Immutable environment descriptor computed once at start
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    /// Operating system family
    pub os: OsKind,

    /// Distribution / OS product name when the host reports one
    pub distro: Option<String>,

    /// Container engines that are present AND answered a liveness call
    pub engines: Vec<Engine>,

    /// First recognized package manager on PATH
    pub package_manager: Option<PackageManager>,

    /// Whether the process runs with elevated privileges
    pub elevated: bool,
}

impl EnvironmentInfo {
    /// First live engine in preference order (docker, then podman)
    pub fn preferred_engine(&self) -> Option<Engine> {
        self.engines.first().copied()
    }

    pub fn has_engine(&self, engine: Engine) -> bool {
        self.engines.contains(&engine)
    }

    /// Chooses the execution path for this run.
    ///
    /// Policy: prefer containers whenever an engine is live; without elevated
    /// privileges containers are the only automated option; with neither, the
    /// operator gets manual instructions instead of a hard failure.
    pub fn execution_path(&self, forced_engine: Option<Engine>, force_native: bool) -> ExecutionPath {
        if force_native {
            return if self.elevated {
                ExecutionPath::NativePrivileged
            } else {
                ExecutionPath::Manual
            };
        }

        if let Some(engine) = forced_engine {
            if self.has_engine(engine) {
                return ExecutionPath::Container(engine);
            }
            return ExecutionPath::Manual;
        }

        if let Some(engine) = self.preferred_engine() {
            return ExecutionPath::Container(engine);
        }

        if self.elevated {
            ExecutionPath::NativePrivileged
        } else {
            ExecutionPath::Manual
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(engines: Vec<Engine>, elevated: bool) -> EnvironmentInfo {
        EnvironmentInfo {
            os: OsKind::Linux,
            distro: None,
            engines,
            package_manager: None,
            elevated,
        }
    }

    #[test]
    fn test_container_preferred_when_engine_live() {
        let env = info(vec![Engine::Docker, Engine::Podman], true);
        assert_eq!(
            env.execution_path(None, false),
            ExecutionPath::Container(Engine::Docker)
        );
    }

    #[test]
    fn test_forced_engine_respected() {
        let env = info(vec![Engine::Docker, Engine::Podman], false);
        assert_eq!(
            env.execution_path(Some(Engine::Podman), false),
            ExecutionPath::Container(Engine::Podman)
        );
    }

    #[test]
    fn test_forced_engine_missing_degrades_to_manual() {
        let env = info(vec![Engine::Docker], false);
        assert_eq!(env.execution_path(Some(Engine::Podman), false), ExecutionPath::Manual);
    }

    #[test]
    fn test_native_requires_privileges() {
        let env = info(vec![], true);
        assert_eq!(env.execution_path(None, false), ExecutionPath::NativePrivileged);

        let env = info(vec![], false);
        assert_eq!(env.execution_path(None, false), ExecutionPath::Manual);
    }

    #[test]
    fn test_force_native_without_privileges_is_manual() {
        let env = info(vec![Engine::Docker], false);
        assert_eq!(env.execution_path(None, true), ExecutionPath::Manual);
    }
}
