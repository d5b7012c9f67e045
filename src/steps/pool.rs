//! Pool step - create the encrypted pool on the new partition

use sequencer::{ProbeState, Result, Step, StepContext};
use std::path::PathBuf;

use crate::config::PoolProperties;
use crate::probe;

#[derive(Debug, Clone)]
pub struct PoolStep {
    pub pool: String,
    /// Partition by-id path used as the single vdev
    pub vdev: PathBuf,
    pub key_file: PathBuf,
    pub properties: PoolProperties,
}

impl PoolStep {
    /// Arguments to `zpool`, in order
    pub fn create_args(&self) -> Vec<String> {
        let props = &self.properties;
        let mut args = vec![
            "create".to_string(),
            "-f".to_string(),
            "-o".to_string(),
            format!("ashift={}", props.ashift),
            "-O".to_string(),
            format!("encryption={}", props.encryption),
            "-O".to_string(),
            "keyformat=raw".to_string(),
            "-O".to_string(),
            format!("keylocation=file://{}", self.key_file.display()),
            "-O".to_string(),
            format!("compression={}", props.compression),
            "-O".to_string(),
            "atime=off".to_string(),
            "-O".to_string(),
            "xattr=sa".to_string(),
            "-O".to_string(),
            "acltype=posixacl".to_string(),
        ];
        if let Some(mountpoint) = &props.mountpoint {
            args.push("-m".to_string());
            args.push(mountpoint.clone());
        }
        args.push(self.pool.clone());
        args.push(self.vdev.display().to_string());
        args
    }
}

impl Step for PoolStep {
    fn name(&self) -> &str {
        "pool"
    }

    fn description(&self) -> String {
        format!("Create encrypted pool {} on {}", self.pool, self.vdev.display())
    }

    fn expected(&self) -> String {
        format!("pool {} exists", self.pool)
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        probe::pool_exists(ctx.system, &self.pool)
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let args = self.create_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        ctx.system.run_checked("zpool", &args)?;
        log::info!("created pool {}", self.pool);
        Ok(())
    }
}
