//! Execution engine - runs steps in declared order, fail-fast

use crate::context::{ProgressCallback, StepContext};
use crate::error::Error;
use crate::retry::with_retry;
use crate::run::Run;
use crate::step::Step;
use crate::types::{ProbeState, RetryPolicy, RunReport, StepOutcome};

/// A run that stopped before completing every step
///
/// Carries the records of the steps that finished before the failure so the
/// caller can show how far provisioning got. No rollback has been attempted.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Steps completed (executed or skipped) before the failure
    pub report: RunReport,
    /// The error that aborted the run
    #[source]
    pub error: Error,
}

/// Read-only view of one step before a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPreview {
    pub name: String,
    pub description: String,
    pub state: ProbeState,
}

impl StepPreview {
    /// Whether the step's action would currently be invoked
    pub fn is_pending(&self) -> bool {
        !self.state.is_satisfied()
    }
}

/// Execute a run to completion or to its first failure
///
/// For each step in order:
/// 1. Probe the precondition; if satisfied, record a skip and move on.
///    An unknown state aborts the run.
/// 2. Invoke the action, retrying transient failures per the step's policy.
/// 3. Probe the postcondition; anything but satisfied aborts the run.
///
/// Later steps are never probed once a step has failed.
pub fn execute<P: ProgressCallback>(
    run: Run,
    ctx: &StepContext,
    progress: &mut P,
) -> Result<RunReport, RunFailure> {
    let mut report = RunReport::new(run.target());

    if let Err(error) = run.validate() {
        return Err(RunFailure { report, error });
    }

    let total = run.len();
    progress.on_run_start(run.target(), total);
    log::info!("provisioning {} ({} steps)", run.target(), total);

    for (index, step) in run.steps().iter().enumerate() {
        progress.on_step_start(index + 1, total, step.name(), &step.description());

        match run_step(step.as_ref(), ctx, progress) {
            Ok(outcome) => {
                match &outcome {
                    StepOutcome::Skipped { reason } => {
                        progress.on_step_skipped(step.name(), reason);
                    }
                    StepOutcome::Executed { .. } => {
                        progress.on_step_complete(step.name(), &outcome);
                    }
                }
                report.push(step.name(), outcome);
            }
            Err(error) => {
                log::error!("step '{}' aborted the run: {}", step.name(), error);
                progress.on_step_failed(step.name(), &error);
                return Err(RunFailure { report, error });
            }
        }
    }

    log::info!(
        "run complete: {} executed, {} skipped",
        report.executed(),
        report.skipped()
    );
    Ok(report)
}

/// Probe, act, verify a single step
fn run_step<P: ProgressCallback>(
    step: &dyn Step,
    ctx: &StepContext,
    progress: &mut P,
) -> Result<StepOutcome, Error> {
    match step.precondition(ctx) {
        ProbeState::Satisfied { details } => {
            let reason = details.unwrap_or_else(|| "already in target state".to_string());
            log::info!("skipping '{}': {}", step.name(), reason);
            return Ok(StepOutcome::Skipped { reason });
        }
        ProbeState::Unknown { reason } => {
            return Err(Error::ProbeFailed {
                step: step.name().to_string(),
                reason,
            });
        }
        ProbeState::Unsatisfied { details } => {
            log::debug!(
                "'{}' needs action: {}",
                step.name(),
                details.as_deref().unwrap_or("not in target state")
            );
        }
    }

    let policy = step.retry_policy().unwrap_or_else(RetryPolicy::no_retry);
    let attempts = match with_retry(
        &policy,
        |attempt, max, error, delay| progress.on_retry(step.name(), attempt, max, error, delay),
        |delay| ctx.system.sleep(delay),
        || step.action(ctx),
    ) {
        Ok(((), attempts)) => attempts,
        Err(Error::Transient { message }) => {
            return Err(Error::StepFailed {
                step: step.name().to_string(),
                expected: step.expected(),
                observed: format!(
                    "{} (gave up after {} attempts)",
                    message,
                    policy.max_attempts()
                ),
            });
        }
        Err(e) => return Err(e),
    };

    match step.postcondition(ctx) {
        ProbeState::Satisfied { .. } => Ok(StepOutcome::Executed { attempts }),
        ProbeState::Unsatisfied { details } => Err(Error::StepFailed {
            step: step.name().to_string(),
            expected: step.expected(),
            observed: details.unwrap_or_else(|| "not in target state".to_string()),
        }),
        ProbeState::Unknown { reason } => Err(Error::ProbeFailed {
            step: step.name().to_string(),
            reason,
        }),
    }
}

/// Probe every step's precondition without acting
///
/// Later steps often depend on artifacts earlier ones create, so this is a
/// snapshot of current state, not a plan. Unknown states are reported, not
/// raised; [`execute`] still treats them as fatal.
pub fn preview(run: &Run, ctx: &StepContext) -> Vec<StepPreview> {
    run.steps()
        .iter()
        .map(|step| StepPreview {
            name: step.name().to_string(),
            description: step.description(),
            state: step.precondition(ctx),
        })
        .collect()
}
