//! Target disk resolution and validation
//!
//! The target must be a whole disk named through the stable by-id
//! namespace. Anything else is rejected before a run is built, together
//! with the list of disks that would have been accepted.

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A validated target disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The by-id path as given, e.g. /dev/disk/by-id/ata-WDC_WD40EFRX-0001
    id: PathBuf,
}

impl Target {
    /// Wrap a path without validation (used once the resolver has accepted it)
    pub(crate) fn new_unchecked(id: impl Into<PathBuf>) -> Self {
        Self { id: id.into() }
    }

    pub fn path(&self) -> &Path {
        &self.id
    }

    pub fn display(&self) -> String {
        self.id.display().to_string()
    }

    /// By-id path of partition `number` on this disk
    pub fn partition_path(&self, number: u32) -> PathBuf {
        let mut path = self.id.clone().into_os_string();
        path.push(format!("-part{number}"));
        PathBuf::from(path)
    }
}

/// Why a target was rejected
#[derive(Debug, Error)]
#[error("invalid target {input}: {reason}")]
pub struct TargetError {
    pub input: String,
    pub reason: String,
    /// Disks currently available under the by-id directory
    pub candidates: Vec<String>,
}

/// Validates target identifiers against a by-id directory
#[derive(Debug, Clone)]
pub struct TargetResolver {
    by_id_dir: PathBuf,
}

impl TargetResolver {
    pub fn new(by_id_dir: impl Into<PathBuf>) -> Self {
        Self {
            by_id_dir: by_id_dir.into(),
        }
    }

    /// Validate `input` and return the target it names
    pub fn resolve(&self, input: &str) -> Result<Target, TargetError> {
        let path = Path::new(input);

        let name = match path.strip_prefix(&self.by_id_dir) {
            Ok(rest) if rest.components().count() == 1 => rest.to_string_lossy().to_string(),
            _ => {
                return Err(self.reject(
                    input,
                    format!(
                        "expected a stable identifier under {}",
                        self.by_id_dir.display()
                    ),
                ));
            }
        };

        if is_partition_entry(&name) {
            return Err(self.reject(input, "this is a partition, not a whole disk".to_string()));
        }

        // Follows the by-id symlink to the device node
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => return Err(self.reject(input, format!("cannot resolve path: {e}"))),
        };
        if !meta.file_type().is_block_device() {
            return Err(self.reject(input, "not a block device".to_string()));
        }

        log::debug!("target {} accepted", input);
        Ok(Target::new_unchecked(path))
    }

    /// Whole disks available under the by-id directory, sorted
    ///
    /// Device-mapper, partition, and LVM entries are excluded. A missing or
    /// unreadable directory yields an empty list.
    pub fn candidates(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.by_id_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("cannot list {}: {}", self.by_id_dir.display(), e);
                return Vec::new();
            }
        };

        let mut disks: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| is_disk_entry(name))
            .map(|name| self.by_id_dir.join(name).display().to_string())
            .collect();
        disks.sort();
        disks
    }

    fn reject(&self, input: &str, reason: String) -> TargetError {
        TargetError {
            input: input.to_string(),
            reason,
            candidates: self.candidates(),
        }
    }
}

fn is_partition_entry(name: &str) -> bool {
    name.rsplit_once("-part")
        .is_some_and(|(_, n)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn is_disk_entry(name: &str) -> bool {
    !name.starts_with("dm-") && !name.starts_with("lvm-") && !is_partition_entry(name)
}
