//! Key file step - raw encryption key for the pool

use rand::RngCore;
use rand::rngs::OsRng;
use sequencer::{ProbeState, Result, Step, StepContext};
use std::path::PathBuf;

use crate::probe;

/// Length of a raw aes-256 key
pub const KEY_LEN: usize = 32;

/// Owner read-only
const KEY_MODE: u32 = 0o400;

/// Generate the pool's raw key file
///
/// An existing key file is never touched: it may already protect data.
/// A file of the wrong length stops the run for the operator to resolve.
#[derive(Debug, Clone)]
pub struct KeyFileStep {
    pub path: PathBuf,
}

impl Step for KeyFileStep {
    fn name(&self) -> &str {
        "keyfile"
    }

    fn description(&self) -> String {
        format!("Generate encryption key {}", self.path.display())
    }

    fn expected(&self) -> String {
        format!("{}-byte key at {}", KEY_LEN, self.path.display())
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        match probe::path_exists(ctx.system, &self.path) {
            ProbeState::Satisfied { .. } => {}
            other => return other,
        }
        match ctx.system.read_file(&self.path) {
            Ok(key) if key.len() == KEY_LEN => ProbeState::satisfied()
                .with_details(format!("{} holds a {}-byte key", self.path.display(), KEY_LEN)),
            Ok(key) => ProbeState::unknown(format!(
                "{} is {} bytes, expected {}; restore the key or remove the file",
                self.path.display(),
                key.len(),
                KEY_LEN
            )),
            Err(e) => ProbeState::unknown(format!("cannot read {}: {}", self.path.display(), e)),
        }
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        ctx.system.write_file(&self.path, &key, KEY_MODE)?;
        log::info!("wrote {} ({} bytes)", self.path.display(), KEY_LEN);
        Ok(())
    }

    fn postcondition(&self, ctx: &StepContext) -> ProbeState {
        match ctx.system.read_file(&self.path) {
            Ok(key) if key.len() == KEY_LEN => {
                ProbeState::satisfied().with_details(format!("{} written", self.path.display()))
            }
            Ok(key) => ProbeState::unsatisfied()
                .with_details(format!("key is {} bytes, expected {}", key.len(), KEY_LEN)),
            Err(e) => ProbeState::unknown(format!("cannot read {}: {}", self.path.display(), e)),
        }
    }
}
