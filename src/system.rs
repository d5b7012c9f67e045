//! Live host access - the real `System` behind every probe and action
//!
//! Commands are run to completion with captured output; nothing here
//! interprets exit codes. That is left to the probes and steps, which know
//! what each collaborator's statuses mean.

use sequencer::{CommandOutput, Error, Result, System, format_command};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// The machine this process runs on
#[derive(Debug, Default)]
pub struct HostSystem;

impl System for HostSystem {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("$ {}", format_command(cmd, args));

        let output = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to execute {}: {}", format_command(cmd, args), e),
                ))
            })?;

        let output = CommandOutput::from(output);
        if !output.success {
            log::debug!(
                "{} exited with {:?}: {}",
                cmd,
                output.code,
                output.stderr_str().trim()
            );
        }
        Ok(output)
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.try_exists()?)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
            // New parent directories are private
            fs::set_permissions(parent, Permissions::from_mode(0o700))?;
        }

        // Staged beside the target and renamed over it; `path` never holds a
        // partial write
        let tmp = staging_path(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(&tmp)?;
        file.write_all(contents)?;
        // open() leaves the mode of a stale staging file alone
        file.set_permissions(Permissions::from_mode(mode))?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
        log::debug!("wrote {} ({:o})", path.display(), mode);
        Ok(())
    }
}

/// Hidden sibling used while writing `path`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_output() {
        let output = HostSystem.run("sh", &["-c", "echo out; echo err >&2; exit 3"]).unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout_str().trim(), "out");
        assert_eq!(output.stderr_str().trim(), "err");
    }

    #[test]
    fn test_run_missing_binary_is_error() {
        let result = HostSystem.run("definitely-not-a-real-command-xyz", &[]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_run_checked_surfaces_collaborator_error() {
        let err = HostSystem
            .run_checked("sh", &["-c", "echo 'no such pool' >&2; exit 1"])
            .unwrap_err();
        assert!(err.to_string().contains("no such pool"));
    }

    #[test]
    fn test_write_file_sets_mode_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("tank.key");

        HostSystem.write_file(&path, &[7u8; 32], 0o400).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o400);
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 32]);

        let parent = fs::metadata(path.parent().unwrap()).unwrap();
        assert_eq!(parent.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn test_write_file_overwrites_with_new_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.service");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, Permissions::from_mode(0o600)).unwrap();

        HostSystem.write_file(&path, b"new", 0o644).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o644);
    }

    #[test]
    fn test_write_file_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tank.key");

        HostSystem.write_file(&path, &[1u8; 32], 0o400).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["tank.key"]);
    }

    #[test]
    fn test_write_file_replaces_stale_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tank.key");
        let stale = staging_path(&path);
        fs::write(&stale, "partial").unwrap();
        fs::set_permissions(&stale, Permissions::from_mode(0o644)).unwrap();

        HostSystem.write_file(&path, &[2u8; 32], 0o400).unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![2u8; 32]);
        assert_eq!(
            fs::metadata(&path).unwrap().permissions().mode() & 0o777,
            0o400
        );
        assert!(!stale.exists());
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/etc/zfs/keys/tank.key")),
            PathBuf::from("/etc/zfs/keys/.tank.key.tmp")
        );
    }

    #[test]
    fn test_exists_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("ata-disk-part1");
        std::os::unix::fs::symlink(dir.path().join("missing"), &link).unwrap();

        assert!(!HostSystem.exists(&link).unwrap());
        fs::write(dir.path().join("missing"), "").unwrap();
        assert!(HostSystem.exists(&link).unwrap());
    }
}
