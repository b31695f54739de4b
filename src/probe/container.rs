//! Container-level health probe
//!
//! Asks the engine CLI for the container's health status. Containers without
//! a configured healthcheck report no health at all; for those, a plain
//! "running" state counts as healthy.

use tracing::debug;

use crate::detection::Engine;
use crate::exec::CommandRunner;

/// True when the container reports `healthy`, or `running` with no
/// healthcheck configured. Any probe failure is "not ready yet".
pub async fn container_healthy(engine: Engine, name: &str) -> bool {
    let runner = CommandRunner::host();

    let health = runner
        .run(
            engine.binary(),
            &["inspect", "--format", "{{.State.Health.Status}}", name],
        )
        .await;

    match health {
        Ok(out) if out.success() => {
            let status = out.stdout_trimmed();
            debug!(container = name, status, "Container health status");
            match status {
                "healthy" => true,
                // "<no value>" is what the template yields without a healthcheck
                "" | "<no value>" => container_running(engine, name).await,
                _ => false,
            }
        }
        Ok(_) | Err(_) => false,
    }
}

async fn container_running(engine: Engine, name: &str) -> bool {
    let runner = CommandRunner::host();
    match runner
        .run(
            engine.binary(),
            &["inspect", "--format", "{{.State.Status}}", name],
        )
        .await
    {
        Ok(out) if out.success() => out.stdout_trimmed() == "running",
        Ok(_) | Err(_) => false,
    }
}
