//! Output formatting for human and machine consumption
//!
//! Human output goes to stdout with light coloring when attached to a tty;
//! JSON output is a single document for scripting. Logging (tracing) goes to
//! stderr and is independent of this.

use anyhow::Result;
use serde_json::json;

use crate::detection::EnvironmentInfo;
use crate::orchestrator::{RunReport, StepStatus};
use crate::plugin::PluginStatus;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

pub struct OutputFormatter {
    format: OutputFormat,
    color: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: format == OutputFormat::Human && atty::is(atty::Stream::Stdout),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn status_mark(&self, status: StepStatus) -> String {
        match status {
            StepStatus::Success => self.paint(GREEN, "ok"),
            StepStatus::Failed => self.paint(RED, "FAILED"),
            StepStatus::Skipped => self.paint(YELLOW, "skipped"),
        }
    }

    /// Formats an orchestration run report with a final summary line
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            // Terminated with a newline so line-buffered stdout flushes
            OutputFormat::Json => Ok(format!(
                "{}\n",
                serde_json::to_string_pretty(&json!({
                    "started_at": report.started_at,
                    "steps": report.outcomes,
                    "summary": {
                        "succeeded": report.succeeded(),
                        "failed": report.failed(),
                        "skipped": report.skipped(),
                        "overall_success": report.overall_success(),
                    }
                }))?
            )),
            OutputFormat::Human => {
                let mut out = String::new();
                for outcome in &report.outcomes {
                    out.push_str(&format!(
                        "  {:<16} {:<8} {}\n",
                        outcome.step,
                        self.status_mark(outcome.status),
                        outcome.message
                    ));
                }
                out.push_str(&format!(
                    "\n{} succeeded, {} failed, {} skipped\n",
                    report.succeeded(),
                    report.failed(),
                    report.skipped()
                ));
                Ok(out)
            }
        }
    }

    pub fn format_plugin_status(&self, status: &PluginStatus) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(status)?)),
            OutputFormat::Human => {
                let state = if !status.installed {
                    self.paint(RED, "not installed")
                } else if status.active {
                    self.paint(GREEN, "active")
                } else {
                    self.paint(YELLOW, "installed, inactive")
                };
                let version = status.version.as_deref().unwrap_or("-");
                Ok(format!(
                    "{}: {} (version {})\n",
                    status.slug, state, version
                ))
            }
        }
    }

    pub fn format_environment(&self, env: &EnvironmentInfo) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(env)?)),
            OutputFormat::Human => {
                let engines = if env.engines.is_empty() {
                    "none".to_string()
                } else {
                    env.engines
                        .iter()
                        .map(|e| e.binary())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                Ok(format!(
                    "os: {}{}\nengines: {}\npackage manager: {}\nelevated: {}\n",
                    env.os,
                    env.distro
                        .as_deref()
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default(),
                    engines,
                    env.package_manager
                        .map(|p| p.binary())
                        .unwrap_or("none"),
                    env.elevated
                ))
            }
        }
    }

    /// One standalone result line, e.g. for backup/cleanup counts
    pub fn format_result(&self, label: &str, detail: &str) -> String {
        match self.format {
            OutputFormat::Json => format!("{}\n", json!({ "result": label, "detail": detail })),
            OutputFormat::Human => format!("{} {}\n", self.paint(GREEN, label), detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StepOutcome;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new();
        report.record(StepOutcome::success("core-install", "site installed"));
        report.record(StepOutcome::failed("verify", None, "no answer"));
        report
    }

    #[test]
    fn test_json_report_contains_summary() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter.format_report(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["succeeded"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["overall_success"], false);
    }

    #[test]
    fn test_human_report_has_summary_line() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let out = formatter.format_report(&sample_report()).unwrap();
        assert!(out.contains("core-install"));
        assert!(out.contains("1 succeeded, 1 failed, 0 skipped"));
    }

    #[test]
    fn test_plugin_status_json_roundtrip() {
        let status = PluginStatus {
            slug: "webp-safe-migrator".to_string(),
            installed: true,
            active: true,
            version: Some("0.3.0".to_string()),
        };
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter.format_plugin_status(&status).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["active"], true);
    }
}
