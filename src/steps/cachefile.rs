//! Cache file step - record the pool in the boot-time import cache

use sequencer::{ProbeState, Result, Step, StepContext};
use std::path::PathBuf;

use crate::probe;

#[derive(Debug, Clone)]
pub struct CacheFileStep {
    pub pool: String,
    pub path: PathBuf,
}

impl Step for CacheFileStep {
    fn name(&self) -> &str {
        "cachefile"
    }

    fn description(&self) -> String {
        format!("Set cachefile of {} to {}", self.pool, self.path.display())
    }

    fn expected(&self) -> String {
        format!("cachefile={} and {} present", self.path.display(), self.path.display())
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        let wanted = self.path.display().to_string();
        match probe::pool_property(ctx.system, &self.pool, "cachefile") {
            Ok(Some(value)) if value == wanted => probe::path_exists(ctx.system, &self.path),
            Ok(Some(value)) => {
                ProbeState::unsatisfied().with_details(format!("cachefile is {value}"))
            }
            Ok(None) => {
                ProbeState::unsatisfied().with_details(format!("pool {} does not exist", self.pool))
            }
            Err(reason) => ProbeState::unknown(reason),
        }
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let assignment = format!("cachefile={}", self.path.display());
        ctx.system.run_checked("zpool", &["set", &assignment, &self.pool])?;
        Ok(())
    }
}
