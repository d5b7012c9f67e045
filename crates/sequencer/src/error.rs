//! Error types for provisioning runs.
//!
//! Errors are categorized so the sequencer can decide what to retry and the
//! CLI can explain what went wrong. No variant is ever used to signal a
//! deliberate skip; skips are reported as outcomes, not errors.

use thiserror::Error;

use crate::types::CommandOutput;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input or unmet precondition detected before the run starts
    Validation,
    /// Condition expected to clear on its own (e.g. a device node not yet created)
    Transient,
    /// A step's postcondition did not hold after its action
    StepFailed,
    /// An external tool rejected a command
    Collaborator,
    /// A probe could not determine the state of the system
    Probe,
    /// Local IO failure
    Io,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Short user-facing label.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::Transient => "Transient condition",
            Self::StepFailed => "Step failed",
            Self::Collaborator => "External command failed",
            Self::Probe => "System state unknown",
            Self::Io => "IO error",
        }
    }

    /// Actionable advice for this category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the input and run again",
            Self::Transient => "Wait a moment and run again",
            Self::StepFailed | Self::Collaborator => {
                "Fix the underlying issue and run again; completed steps will be skipped"
            }
            Self::Probe => "Check that the required tools are installed and runnable",
            Self::Io => "Check file permissions and free space",
        }
    }
}

/// Errors that can occur while provisioning.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input, missing privilege, or missing collaborator file
    #[error("{message}")]
    Validation {
        /// What was rejected and why
        message: String,
    },

    /// Expected-to-clear condition, retried per step policy
    #[error("{message}")]
    Transient {
        /// What is not ready yet
        message: String,
    },

    /// Postcondition unmet after the action ran (and after retries)
    #[error("step '{step}' failed: expected {expected}, observed {observed}")]
    StepFailed {
        /// Name of the failed step
        step: String,
        /// State the step should have produced
        expected: String,
        /// State actually observed
        observed: String,
    },

    /// An external tool exited unsuccessfully
    #[error("`{command}` failed ({status}): {stderr}")]
    Collaborator {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Standard error output, verbatim (trimmed)
        stderr: String,
    },

    /// A probe could not give a definite answer
    #[error("cannot determine state for step '{step}': {reason}")]
    ProbeFailed {
        /// Step whose probe failed
        step: String,
        /// Why the probe failed
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Transient { .. } => ErrorCategory::Transient,
            Error::StepFailed { .. } => ErrorCategory::StepFailed,
            Error::Collaborator { .. } => ErrorCategory::Collaborator,
            Error::ProbeFailed { .. } => ErrorCategory::Probe,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Error::Transient {
            message: message.into(),
        }
    }

    /// Build a collaborator error from a finished command.
    pub fn collaborator(cmd: &str, args: &[&str], output: &CommandOutput) -> Self {
        let status = match output.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = output.stderr_str();
        let stderr = stderr.trim();

        Error::Collaborator {
            command: format_command(cmd, args),
            status,
            stderr: if stderr.is_empty() {
                "(no output)".to_string()
            } else {
                stderr.to_string()
            },
        }
    }
}

/// Render a command line for messages and logs.
pub fn format_command(cmd: &str, args: &[&str]) -> String {
    if args.is_empty() {
        cmd.to_string()
    } else {
        format!("{} {}", cmd, args.join(" "))
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
