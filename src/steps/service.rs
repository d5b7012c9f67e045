//! Service steps - deploy the key-load unit and enable boot units

use sequencer::{ProbeState, Result, Step, StepContext};
use std::path::PathBuf;

use crate::probe;

const UNIT_MODE: u32 = 0o644;

/// Copy the collaborator unit file into the systemd unit directory
#[derive(Debug, Clone)]
pub struct UnitDeployStep {
    /// Unit file shipped next to the executable
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Step for UnitDeployStep {
    fn name(&self) -> &str {
        "service-deploy"
    }

    fn description(&self) -> String {
        format!("Install {}", self.dest.display())
    }

    fn expected(&self) -> String {
        format!("{} identical to {}", self.dest.display(), self.source.display())
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        match ctx.system.read_file(&self.source) {
            Ok(contents) => probe::file_matches(ctx.system, &self.dest, &contents),
            Err(e) => ProbeState::unknown(format!(
                "cannot read {}: {}",
                self.source.display(),
                e
            )),
        }
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let contents = ctx.system.read_file(&self.source)?;
        ctx.system.write_file(&self.dest, &contents, UNIT_MODE)?;
        ctx.system.run_checked("systemctl", &["daemon-reload"])?;
        Ok(())
    }
}

/// Enable the units that unlock, import, and mount the pool at boot
#[derive(Debug, Clone)]
pub struct UnitEnableStep {
    pub units: Vec<String>,
}

impl Step for UnitEnableStep {
    fn name(&self) -> &str {
        "service-enable"
    }

    fn description(&self) -> String {
        format!("Enable {}", self.units.join(", "))
    }

    fn expected(&self) -> String {
        format!("{} enabled", self.units.join(", "))
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        probe::units_enabled(ctx.system, &self.units)
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let mut args = vec!["enable"];
        args.extend(self.units.iter().map(String::as_str));
        ctx.system.run_checked("systemctl", &args)?;
        Ok(())
    }
}
