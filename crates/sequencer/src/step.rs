//! Step trait for idempotent provisioning
//!
//! A Step is one provisioning action guarded by probes of live system
//! state: it is skipped when its target state already holds and verified
//! after it runs.

use crate::context::StepContext;
use crate::error::Result;
use crate::types::{ProbeState, RetryPolicy};
use std::fmt;

/// Core trait for provisioning steps
///
/// # Example
///
/// ```ignore
/// use sequencer::{ProbeState, Step, StepContext};
/// use std::path::PathBuf;
///
/// #[derive(Debug)]
/// struct MarkerFile {
///     path: PathBuf,
/// }
///
/// impl Step for MarkerFile {
///     fn name(&self) -> &str {
///         "marker"
///     }
///
///     fn description(&self) -> String {
///         format!("Write marker {}", self.path.display())
///     }
///
///     fn expected(&self) -> String {
///         format!("{} present", self.path.display())
///     }
///
///     fn precondition(&self, ctx: &StepContext) -> ProbeState {
///         match ctx.system.exists(&self.path) {
///             Ok(found) => ProbeState::from_bool(found),
///             Err(e) => ProbeState::unknown(e.to_string()),
///         }
///     }
///
///     fn action(&self, ctx: &StepContext) -> sequencer::Result<()> {
///         ctx.system.write_file(&self.path, b"done", 0o644)
///     }
/// }
/// ```
pub trait Step: fmt::Debug {
    /// Name of the step, unique within a run
    fn name(&self) -> &str;

    /// Human-readable description of what the action does
    fn description(&self) -> String;

    /// The state this step produces, used in failure diagnostics
    fn expected(&self) -> String;

    /// Probe whether the target state already holds
    ///
    /// `Satisfied` means the action is skipped. `Unknown` aborts the run:
    /// an ambiguous state is never treated as "needs action".
    fn precondition(&self, ctx: &StepContext) -> ProbeState;

    /// Perform the side effect
    ///
    /// Return [`Error::Transient`](crate::Error::Transient) for conditions
    /// that are expected to clear on their own; they are retried when the
    /// step has a retry policy. Actions of retryable steps must be safe to
    /// invoke again after a transient failure.
    fn action(&self, ctx: &StepContext) -> Result<()>;

    /// Verify the target state after the action
    ///
    /// Defaults to the precondition probe.
    fn postcondition(&self, ctx: &StepContext) -> ProbeState {
        self.precondition(ctx)
    }

    /// Retry policy for transient failures; `None` means not retryable
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }
}

/// A boxed step for type-erased storage
pub type BoxedStep = Box<dyn Step>;

/// Extension trait for working with steps
pub trait StepExt {
    /// Whether transient failures of this step are retried
    fn is_retryable(&self) -> bool;
}

impl<S: Step + ?Sized> StepExt for S {
    fn is_retryable(&self) -> bool {
        self.retry_policy().is_some()
    }
}
