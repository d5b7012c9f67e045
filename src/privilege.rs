//! Administrator privilege check
//!
//! The tool never escalates on its own; it refuses to start without root.

use sequencer::{Error, Result};

/// Check if we're running as root
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Fail with a validation error unless running as root
pub fn require_root() -> Result<()> {
    if is_root() {
        Ok(())
    } else {
        Err(Error::validation(
            "administrator rights required: run as root (e.g. with sudo)",
        ))
    }
}
