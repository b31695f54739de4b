//! Install step outcomes and the aggregated run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How one step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    /// Not run, either because it was unnecessary or a prerequisite failed
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Success => write!(f, "ok"),
            StepStatus::Failed => write!(f, "FAILED"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of one orchestration step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,

    /// Exit code of the underlying tool, when one ran
    pub exit_code: Option<i32>,

    pub message: String,
}

impl StepOutcome {
    pub fn success(step: &str, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Success,
            exit_code: Some(0),
            message: message.into(),
        }
    }

    pub fn failed(step: &str, exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Failed,
            exit_code,
            message: message.into(),
        }
    }

    pub fn skipped(step: &str, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Skipped,
            exit_code: None,
            message: message.into(),
        }
    }
}

/// Aggregated result of an orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> usize {
        self.count(StepStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    /// True when no step failed
    pub fn overall_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
