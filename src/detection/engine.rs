//! Container engine probing
//!
//! Probes are strictly read-only: a PATH lookup followed by a lightweight
//! liveness call (`<engine> info`). An inconclusive probe degrades to "not
//! available" and never fails the run. For Docker, the daemon socket is also
//! pinged through the API client as a cheaper first check.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::Engine;
use crate::exec::CommandRunner;

#[cfg(unix)]
const DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Checks whether `name` resolves to an executable file on PATH
pub fn binary_on_path(name: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };

    env::split_paths(&path).any(|dir| candidate_exists(&dir, name))
}

fn candidate_exists(dir: &Path, name: &str) -> bool {
    let mut candidates: Vec<PathBuf> = vec![dir.join(name)];
    if cfg!(windows) {
        candidates.push(dir.join(format!("{}.exe", name)));
        candidates.push(dir.join(format!("{}.bat", name)));
    }
    candidates.iter().any(|c| c.is_file())
}

/// Pings the Docker daemon socket through the API client.
///
/// Only meaningful on unix hosts with the default socket path; anywhere else
/// the answer is "unknown" (`false`) and the CLI liveness probe decides.
#[cfg(unix)]
pub async fn docker_socket_alive() -> bool {
    if !Path::new(DOCKER_SOCKET_PATH).exists() {
        debug!("Docker socket not found at {}", DOCKER_SOCKET_PATH);
        return false;
    }

    use bollard::Docker;

    let docker = match Docker::connect_with_local_defaults() {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to connect to Docker: {}", e);
            return false;
        }
    };

    match docker.version().await {
        Ok(v) => {
            let api_version = v.api_version.unwrap_or_else(|| "0.0".to_string());
            debug!("Docker API version: {}", api_version);
            true
        }
        Err(e) => {
            debug!("Failed to get Docker version: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
pub async fn docker_socket_alive() -> bool {
    false
}

/// Probes one engine: present on PATH AND answering a liveness call
pub async fn engine_alive(engine: Engine) -> bool {
    if !binary_on_path(engine.binary()) {
        debug!(engine = %engine, "Engine binary not on PATH");
        return false;
    }

    if engine == Engine::Docker && docker_socket_alive().await {
        return true;
    }

    let runner = CommandRunner::host();
    match runner
        .run(engine.binary(), &["info", "--format", "{{.ServerVersion}}"])
        .await
    {
        Ok(out) if out.success() => {
            debug!(engine = %engine, version = out.stdout_trimmed(), "Engine is live");
            true
        }
        Ok(out) => {
            debug!(engine = %engine, code = out.code, "Engine present but daemon not reachable");
            false
        }
        Err(e) => {
            debug!(engine = %engine, error = %e, "Engine liveness probe failed");
            false
        }
    }
}

/// Probes all known engines, in preference order
pub async fn live_engines() -> Vec<Engine> {
    let mut live = Vec::new();
    for engine in Engine::ALL {
        if engine_alive(engine).await {
            live.push(engine);
        }
    }
    live
}
