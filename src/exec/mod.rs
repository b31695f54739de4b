//! External process execution
//!
//! Every administrative action in this tool ultimately shells out to an
//! external binary: the container engine CLI, WP-CLI, or the MySQL client.
//! This module provides a single async execution layer with structured
//! results, so callers branch on exit codes instead of scraping panics.
//!
//! Commands either run directly on the host (`ExecTarget::Native`) or inside
//! a container through `<engine> exec` (`ExecTarget::Container`). The runner
//! never enforces a per-command timeout; only the polling loops in
//! [`crate::probe`] carry a time budget.

use std::fmt;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::detection::Engine;

/// Errors from spawning or collecting an external process
#[derive(Debug, Error)]
pub enum ExecError {
    /// The binary could not be spawned (usually: not on PATH)
    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Output was not valid UTF-8
    #[error("'{program}' produced non-UTF-8 output")]
    InvalidOutput { program: String },
}

/// Where a command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecTarget {
    /// Directly on the host
    Native,

    /// Inside a container via `<engine> exec <name> ...`
    Container { engine: Engine, name: String },
}

impl fmt::Display for ExecTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecTarget::Native => write!(f, "host"),
            ExecTarget::Container { engine, name } => {
                write!(f, "container {} ({})", name, engine.binary())
            }
        }
    }
}

/// Structured result of an external command
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// Exit code; -1 when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout with surrounding whitespace trimmed
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// First non-empty line of stderr, for compact failure messages
    pub fn error_line(&self) -> &str {
        self.stderr
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("")
            .trim()
    }
}

/// Runs external commands against a fixed target
#[derive(Debug, Clone)]
pub struct CommandRunner {
    target: ExecTarget,
}

impl CommandRunner {
    pub fn new(target: ExecTarget) -> Self {
        Self { target }
    }

    /// Runner for host-level commands (engine CLI itself, native installs)
    pub fn host() -> Self {
        Self::new(ExecTarget::Native)
    }

    pub fn target(&self) -> &ExecTarget {
        &self.target
    }

    /// Runs `program` with `args` against the configured target and collects
    /// stdout/stderr. A non-zero exit is NOT an `Err`; callers inspect
    /// [`CmdOutput::success`] so that expected failures (e.g. `wp core
    /// is-installed` on an empty site) stay on the happy path.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput, ExecError> {
        let (bin, full_args) = self.materialize(program, args);

        debug!(target = %self.target, program, ?args, "Running external command");

        let output = Command::new(&bin)
            .args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExecError::SpawnFailed {
                program: bin.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code().unwrap_or(-1);

        if code != 0 {
            debug!(target = %self.target, program, code, stderr = %stderr.trim(), "Command exited non-zero");
        }

        Ok(CmdOutput {
            code,
            stdout,
            stderr,
        })
    }

    /// Invokes WP-CLI with `--path` pointing at the WordPress installation.
    ///
    /// Inside the official WordPress containers WP-CLI must run as the web
    /// user's superuser, so `--allow-root` is always passed.
    pub async fn wp(&self, wp_path: &str, args: &[&str]) -> Result<CmdOutput, ExecError> {
        let path_arg = format!("--path={}", wp_path);
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        full.extend_from_slice(args);
        full.push(path_arg.as_str());
        full.push("--allow-root");
        self.run("wp", &full).await
    }

    fn materialize(&self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        match &self.target {
            ExecTarget::Native => (
                program.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ),
            ExecTarget::Container { engine, name } => {
                let mut full = vec!["exec".to_string(), name.clone(), program.to_string()];
                full.extend(args.iter().map(|s| s.to_string()));
                (engine.binary().to_string(), full)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_run_captures_stdout() {
        let runner = CommandRunner::host();
        let out = runner.run("echo", &["hello"]).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_trimmed(), "hello");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = CommandRunner::host();
        let err = runner
            .run("definitely-not-a-real-binary-xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_err() {
        let runner = CommandRunner::host();
        let out = runner.run("sh", &["-c", "exit 3"]).await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code, 3);
    }

    #[test]
    fn test_container_target_materializes_engine_exec() {
        let runner = CommandRunner::new(ExecTarget::Container {
            engine: Engine::Docker,
            name: "webp-migrator-wordpress".to_string(),
        });
        let (bin, args) = runner.materialize("wp", &["plugin", "list"]);
        assert_eq!(bin, "docker");
        assert_eq!(
            args,
            vec!["exec", "webp-migrator-wordpress", "wp", "plugin", "list"]
        );
    }

    #[test]
    fn test_error_line_picks_first_nonempty() {
        let out = CmdOutput {
            code: 1,
            stdout: String::new(),
            stderr: "\n  Error: no such container\ndetail".to_string(),
        };
        assert_eq!(out.error_line(), "Error: no such container");
    }
}
