//! Partition step - carve the pool partition and wait for its by-id link

use sequencer::{Error, ProbeState, Result, RetryPolicy, Step, StepContext};
use std::path::PathBuf;

use crate::probe;

/// Create partition `number` spanning the whole disk
#[derive(Debug, Clone)]
pub struct PartitionStep {
    /// Whole-disk by-id path
    pub disk: PathBuf,
    /// By-id link udev creates for the new partition
    pub link: PathBuf,
    pub number: u32,
    pub label: String,
    /// GPT type code passed to sgdisk (BF00 = Solaris root / ZFS)
    pub type_code: String,
    pub retry: RetryPolicy,
}

impl PartitionStep {
    /// Whether the partition table already holds our partition
    ///
    /// A previous attempt may have written the table before udev caught up,
    /// so the action must not create the partition twice.
    fn in_table(&self, ctx: &StepContext) -> Result<bool> {
        let number = self.number.to_string();
        let disk = self.disk.to_string_lossy();
        let output = ctx.system.run_checked("sgdisk", &["-i", &number, &disk])?;
        Ok(!output.stdout_str().contains("does not exist"))
    }
}

impl Step for PartitionStep {
    fn name(&self) -> &str {
        "partition"
    }

    fn description(&self) -> String {
        format!("Create partition {} on {}", self.number, self.disk.display())
    }

    fn expected(&self) -> String {
        format!("{} present", self.link.display())
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        probe::path_exists(ctx.system, &self.link)
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let disk = self.disk.to_string_lossy();

        if self.in_table(ctx)? {
            log::info!(
                "partition {} already in table of {}, waiting for link",
                self.number,
                disk
            );
        } else {
            let n = self.number;
            let new = format!("{n}:0:0");
            let typecode = format!("{n}:{}", self.type_code);
            let name = format!("{n}:{}", self.label);
            ctx.system.run_checked(
                "sgdisk",
                &["-n", &new, "-t", &typecode, "-c", &name, &disk],
            )?;
        }

        ctx.system.run_checked("partprobe", &[&disk])?;
        ctx.system.run_checked("udevadm", &["settle"])?;

        if ctx.system.exists(&self.link)? {
            Ok(())
        } else {
            Err(Error::transient(format!(
                "{} not yet created by udev",
                self.link.display()
            )))
        }
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        Some(self.retry.clone())
    }
}
