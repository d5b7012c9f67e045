//! Step context and provider traits
//!
//! These traits keep the sequencer free of any concrete process, filesystem,
//! or terminal implementation. The binary supplies the real ones; tests
//! supply in-memory fakes.

use crate::error::{Error, Result};
use crate::types::{CommandOutput, StepOutcome};
use std::path::Path;
use std::time::Duration;

/// Access to the live system a run provisions
///
/// Every probe and action goes through this trait. Nothing read through it
/// is cached by the sequencer.
pub trait System {
    /// Run a command to completion and capture its output
    ///
    /// Returns `Err` only when the command could not be executed at all;
    /// a nonzero exit is reported through [`CommandOutput::success`].
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command and turn a nonzero exit into a collaborator error
    fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(cmd, args)?;
        if !output.success {
            return Err(Error::collaborator(cmd, args, &output));
        }
        Ok(output)
    }

    /// Whether a path exists, following symlinks
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Read a whole file
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a whole file with the given permission bits, creating parents
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()>;

    /// Pause between retry attempts
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Context passed to probes and actions
pub struct StepContext<'a> {
    /// The system being provisioned
    pub system: &'a dyn System,
    /// Whether to output verbose information
    pub verbose: bool,
}

impl<'a> StepContext<'a> {
    pub fn new(system: &'a dyn System) -> Self {
        Self {
            system,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Progress callback for a run
///
/// Implement this trait to receive updates as the sequencer works through
/// the steps.
pub trait ProgressCallback {
    /// Called once before the first step
    fn on_run_start(&mut self, target: &str, total: usize);

    /// Called when a step is about to be probed
    fn on_step_start(&mut self, index: usize, total: usize, name: &str, description: &str);

    /// Called when a step is skipped because its target state already holds
    fn on_step_skipped(&mut self, name: &str, reason: &str);

    /// Called before waiting to retry a transient failure
    fn on_retry(
        &mut self,
        name: &str,
        attempt: u32,
        max_attempts: u32,
        error: &Error,
        delay: Duration,
    );

    /// Called when a step's action ran and its postcondition held
    fn on_step_complete(&mut self, name: &str, outcome: &StepOutcome);

    /// Called when a step aborts the run
    fn on_step_failed(&mut self, name: &str, error: &Error);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _target: &str, _total: usize) {}
    fn on_step_start(&mut self, _index: usize, _total: usize, _name: &str, _description: &str) {}
    fn on_step_skipped(&mut self, _name: &str, _reason: &str) {}
    fn on_retry(
        &mut self,
        _name: &str,
        _attempt: u32,
        _max: u32,
        _error: &Error,
        _delay: Duration,
    ) {
    }
    fn on_step_complete(&mut self, _name: &str, _outcome: &StepOutcome) {}
    fn on_step_failed(&mut self, _name: &str, _error: &Error) {}
}
