//! # Sequencer
//!
//! An idempotent provisioning state machine.
//!
//! A provisioning job is an ordered list of steps. Each step carries a
//! precondition probe, an action, and a postcondition probe, all expressed
//! against live system state. The sequencer runs the steps in declared
//! order, skips any step whose target state already holds, retries
//! transient failures within a bounded budget, and stops at the first
//! failure. Re-running the same job resumes where the last one stopped.
//!
//! ## Core Concepts
//!
//! - **Step**: one provisioning action guarded by probes
//! - **ProbeState**: satisfied, unsatisfied, or unknown (never guessed)
//! - **Run**: the ordered steps for one target, consumed once
//! - **RunReport**: which steps executed and which were skipped
//!
//! ## Example
//!
//! ```ignore
//! use sequencer::{execute, NoProgress, Run, StepContext};
//!
//! let run = Run::new("/dev/disk/by-id/ata-EXAMPLE")
//!     .with_step(PartitionStep::new(/* ... */))
//!     .with_step(KeyFileStep::new(/* ... */));
//!
//! let ctx = StepContext::new(&system);
//! let report = execute(run, &ctx, &mut NoProgress)?;
//! println!("{} executed, {} skipped", report.executed(), report.skipped());
//! ```
//!
//! ## Provider Traits
//!
//! - [`System`]: runs commands and touches files on the target host
//! - [`ProgressCallback`]: receives progress updates
//!
//! Both are injected, so the sequencer can be driven entirely by fakes in
//! tests.

pub mod context;
pub mod error;
pub mod executor;
pub mod retry;
pub mod run;
pub mod step;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback, StepContext, System};
pub use error::{Error, ErrorCategory, Result, format_command};
pub use executor::{RunFailure, StepPreview, execute, preview};
pub use retry::with_retry;
pub use run::Run;
pub use step::{BoxedStep, Step, StepExt};
pub use types::{CommandOutput, ProbeState, RetryPolicy, RunReport, StepOutcome, StepRecord};
