//! Core types for provisioning runs

use serde::{Deserialize, Serialize};
use std::process::Output;
use std::time::Duration;

/// Outcome of a probe against live system state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeState {
    /// The artifact has reached its target state
    Satisfied { details: Option<String> },
    /// The artifact has not reached its target state
    Unsatisfied { details: Option<String> },
    /// The probe could not give a definite answer
    Unknown { reason: String },
}

impl ProbeState {
    pub fn satisfied() -> Self {
        Self::Satisfied { details: None }
    }

    pub fn unsatisfied() -> Self {
        Self::Unsatisfied { details: None }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
        }
    }

    /// Map a definite answer onto a probe state
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::satisfied()
        } else {
            Self::unsatisfied()
        }
    }

    /// Attach details to a definite state. Unknown states keep their reason.
    pub fn with_details(self, details: impl Into<String>) -> Self {
        match self {
            Self::Satisfied { .. } => Self::Satisfied {
                details: Some(details.into()),
            },
            Self::Unsatisfied { .. } => Self::Unsatisfied {
                details: Some(details.into()),
            },
            unknown @ Self::Unknown { .. } => unknown,
        }
    }

    /// Combine two probes: satisfied only if both are.
    ///
    /// Unknown wins over everything, so an ambiguous sub-probe is never
    /// masked by a definite one.
    pub fn and(self, other: ProbeState) -> Self {
        match (self, other) {
            (unknown @ Self::Unknown { .. }, _) | (_, unknown @ Self::Unknown { .. }) => unknown,
            (Self::Satisfied { .. }, Self::Satisfied { .. }) => Self::satisfied(),
            (unsatisfied @ Self::Unsatisfied { .. }, _) | (_, unsatisfied) => unsatisfied,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Short human-readable form for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Satisfied { details: Some(d) } | Self::Unsatisfied { details: Some(d) } => {
                d.clone()
            }
            Self::Satisfied { details: None } => "satisfied".to_string(),
            Self::Unsatisfied { details: None } => "not satisfied".to_string(),
            Self::Unknown { reason } => format!("unknown ({reason})"),
        }
    }
}

/// What happened to a step during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Precondition already held; action not invoked
    Skipped { reason: String },
    /// Action ran and the postcondition held
    Executed { attempts: u32 },
}

impl StepOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

/// Record of a single step in a run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Summary of a run, in step order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub target: String,
    pub records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, outcome: StepOutcome) {
        self.records.push(StepRecord {
            name: name.to_string(),
            outcome,
        });
    }

    /// Number of steps whose action ran
    pub fn executed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.is_executed())
            .count()
    }

    /// Number of steps skipped because their target state already held
    pub fn skipped(&self) -> usize {
        self.records.len() - self.executed()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Names of executed steps, in execution order
    pub fn executed_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_executed())
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Bounded, fixed-interval retry policy for transient failures.
///
/// The wait is for a one-shot kernel/udev event, so there is no
/// exponential growth and no jitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub attempts: u32,
    /// Pause between attempts in milliseconds
    pub interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            interval_ms: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Attempts actually made; a zero budget still runs the action once.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Output from an external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
