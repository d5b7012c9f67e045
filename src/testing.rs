//! In-memory stand-in for the host, used by probe, step, and scenario tests
//!
//! Simulates just enough of sgdisk, partprobe, udevadm, zpool, systemctl,
//! rpm, dnf, and modprobe, plus a flat filesystem, to drive full runs.

use sequencer::{CommandOutput, Error, Result, System};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Build a command reply
pub fn reply(success: bool, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
        success,
        code: Some(if success { 0 } else { 1 }),
    }
}

/// Units shipped by the zfs package
const ZFS_UNITS: [&str; 3] = ["zfs-import-cache.service", "zfs-mount.service", "zfs.target"];

#[derive(Debug, Clone)]
struct MockFile {
    contents: Vec<u8>,
    mode: u32,
}

#[derive(Default)]
struct MockState {
    files: BTreeMap<PathBuf, MockFile>,
    stat_failures: BTreeSet<PathBuf>,
    /// Partition links not yet created by "udev", with remaining lookups
    pending_links: BTreeMap<PathBuf, Option<u32>>,
    partitions: BTreeSet<(String, u32)>,
    packages: BTreeSet<String>,
    modules: BTreeSet<String>,
    pools: BTreeSet<String>,
    pool_props: BTreeMap<(String, String), String>,
    units: BTreeSet<String>,
    enabled: BTreeSet<String>,
    missing_commands: BTreeSet<String>,
    scripts: Vec<(String, CommandOutput)>,
    link_delay: Option<u32>,
    commands: Vec<String>,
    sleeps: Vec<Duration>,
}

#[derive(Default)]
pub struct MockSystem {
    state: RefCell<MockState>,
}

impl MockSystem {
    pub fn new() -> Self {
        let system = Self::default();
        system.state.borrow_mut().link_delay = Some(0);
        system
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        self.state.borrow_mut().files.insert(
            path.into(),
            MockFile {
                contents: contents.to_vec(),
                mode: 0o644,
            },
        );
    }

    pub fn fail_stat(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().stat_failures.insert(path.into());
    }

    pub fn install_package(&self, name: &str) {
        self.state.borrow_mut().packages.insert(name.to_string());
    }

    pub fn load_module(&self, name: &str) {
        self.state.borrow_mut().modules.insert(name.to_string());
    }

    pub fn add_pool(&self, name: &str) {
        self.state.borrow_mut().pools.insert(name.to_string());
    }

    pub fn add_partition(&self, disk: &str, number: u32) {
        self.state
            .borrow_mut()
            .partitions
            .insert((disk.to_string(), number));
    }

    pub fn add_unit(&self, unit: &str) {
        self.state.borrow_mut().units.insert(unit.to_string());
    }

    pub fn enable_unit(&self, unit: &str) {
        self.state.borrow_mut().enabled.insert(unit.to_string());
    }

    /// Make spawning `cmd` fail as if it were not installed
    pub fn missing_command(&self, cmd: &str) {
        self.state
            .borrow_mut()
            .missing_commands
            .insert(cmd.to_string());
    }

    /// Answer every command line starting with `prefix` with `output`
    pub fn script(&self, prefix: &str, output: CommandOutput) {
        self.state
            .borrow_mut()
            .scripts
            .push((prefix.to_string(), output));
    }

    pub fn clear_scripts(&self) {
        self.state.borrow_mut().scripts.clear();
    }

    /// Partition links appear only after this many failed lookups
    pub fn delay_links(&self, lookups: u32) {
        self.state.borrow_mut().link_delay = Some(lookups);
    }

    /// Partition links never appear
    pub fn never_link(&self) {
        self.state.borrow_mut().link_delay = None;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .files
            .get(Path::new(path))
            .map(|f| f.contents.clone())
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.state.borrow().files.get(Path::new(path)).map(|f| f.mode)
    }

    pub fn has_pool(&self, name: &str) -> bool {
        self.state.borrow().pools.contains(name)
    }

    pub fn is_enabled(&self, unit: &str) -> bool {
        self.state.borrow().enabled.contains(unit)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.state.borrow().modules.contains(name)
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.state.borrow().packages.contains(name)
    }

    pub fn partition_count(&self) -> usize {
        self.state.borrow().partitions.len()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }

    // ------------------------------------------------------------------
    // Simulated tools
    // ------------------------------------------------------------------

    fn sgdisk(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        let Some(disk) = args.last().map(|d| d.to_string()) else {
            return reply(false, "", "usage");
        };

        match args.first() {
            Some(&"-i") => {
                let number: u32 = args.get(1).and_then(|n| n.parse().ok()).unwrap_or(0);
                if state.partitions.contains(&(disk, number)) {
                    reply(true, "Partition GUID code: 6A898CC3-1DD2-11B2-99A6-080020736631\n", "")
                } else {
                    reply(true, &format!("Partition #{number} does not exist.\n"), "")
                }
            }
            Some(&"-n") => {
                let number: u32 = args
                    .get(1)
                    .and_then(|layout| layout.split(':').next())
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                if !state.partitions.insert((disk.clone(), number)) {
                    return reply(false, "", "Could not create partition: already exists");
                }
                let link = PathBuf::from(format!("{disk}-part{number}"));
                let delay = state.link_delay;
                state.pending_links.insert(link, delay);
                reply(true, "The operation has completed successfully.\n", "")
            }
            _ => reply(false, "", "unsupported sgdisk invocation"),
        }
    }

    fn zpool(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        let no_such_pool =
            |pool: &str| reply(false, "", &format!("cannot open '{pool}': no such pool"));

        match args {
            ["list", "-H", "-o", "name", pool] => {
                if state.pools.contains(*pool) {
                    reply(true, &format!("{pool}\n"), "")
                } else {
                    no_such_pool(pool)
                }
            }
            ["get", "-H", "-o", "value", property, pool] => {
                if !state.pools.contains(*pool) {
                    return no_such_pool(pool);
                }
                let value = state
                    .pool_props
                    .get(&(pool.to_string(), property.to_string()))
                    .cloned()
                    .unwrap_or_else(|| "-".to_string());
                reply(true, &format!("{value}\n"), "")
            }
            ["set", assignment, pool] => {
                if !state.pools.contains(*pool) {
                    return no_such_pool(pool);
                }
                let Some((property, value)) = assignment.split_once('=') else {
                    return reply(false, "", "bad property assignment");
                };
                state
                    .pool_props
                    .insert((pool.to_string(), property.to_string()), value.to_string());
                if property == "cachefile" {
                    state.files.insert(
                        PathBuf::from(value),
                        MockFile {
                            contents: b"zpool cache".to_vec(),
                            mode: 0o644,
                        },
                    );
                }
                reply(true, "", "")
            }
            ["create", .., pool, vdev] => {
                if state.pools.contains(*pool) {
                    return reply(
                        false,
                        "",
                        &format!("cannot create '{pool}': pool already exists"),
                    );
                }
                if !state.files.contains_key(Path::new(vdev)) {
                    return reply(false, "", &format!("cannot open '{vdev}': no such device"));
                }
                let key_missing = args
                    .iter()
                    .filter_map(|a| a.strip_prefix("keylocation=file://"))
                    .any(|key| !state.files.contains_key(Path::new(key)));
                if key_missing {
                    return reply(false, "", "Failed to open key material file");
                }
                state.pools.insert(pool.to_string());
                reply(true, "", "")
            }
            _ => reply(false, "", "unsupported zpool invocation"),
        }
    }

    fn systemctl(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        match args {
            ["daemon-reload"] => reply(true, "", ""),
            ["is-enabled", unit] => {
                if state.enabled.contains(*unit) {
                    reply(true, "enabled\n", "")
                } else if Self::unit_known(&state, unit) {
                    reply(false, "disabled\n", "")
                } else {
                    reply(false, "not-found\n", "")
                }
            }
            ["enable", units @ ..] => {
                if let Some(unknown) = units.iter().find(|u| !Self::unit_known(&state, u)) {
                    return reply(
                        false,
                        "",
                        &format!("Failed to enable unit: Unit file {unknown} does not exist."),
                    );
                }
                for unit in units {
                    state.enabled.insert(unit.to_string());
                }
                reply(true, "", "")
            }
            _ => reply(false, "", "unsupported systemctl invocation"),
        }
    }

    fn unit_known(state: &MockState, unit: &str) -> bool {
        state.units.contains(unit)
            || state
                .files
                .keys()
                .any(|p| p.file_name().is_some_and(|n| n == unit))
    }

    fn rpm(&self, args: &[&str]) -> CommandOutput {
        let state = self.state.borrow();
        match args {
            ["-q", package] if state.packages.contains(*package) => {
                reply(true, &format!("{package}-2.2.4-1.fc40.x86_64\n"), "")
            }
            ["-q", package] => reply(false, &format!("package {package} is not installed\n"), ""),
            _ => reply(false, "", "unsupported rpm invocation"),
        }
    }

    fn dnf(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        match args {
            ["install", "-y", packages @ ..] if !packages.is_empty() => {
                for package in packages {
                    state.packages.insert(package.to_string());
                    if *package == "zfs" {
                        for unit in ZFS_UNITS {
                            state.units.insert(unit.to_string());
                        }
                    }
                }
                reply(true, "Complete!\n", "")
            }
            _ => reply(false, "", "unsupported dnf invocation"),
        }
    }

    fn modprobe(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        match args {
            [module] if state.packages.contains("zfs") || *module != "zfs" => {
                state.modules.insert(module.to_string());
                reply(true, "", "")
            }
            [module] => reply(
                false,
                "",
                &format!("modprobe: FATAL: Module {module} not found in directory /lib/modules"),
            ),
            _ => reply(false, "", "unsupported modprobe invocation"),
        }
    }
}

impl System for MockSystem {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = sequencer::format_command(cmd, args);
        self.state.borrow_mut().commands.push(line.clone());

        if self.state.borrow().missing_commands.contains(cmd) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("failed to execute {line}: No such file or directory"),
            )));
        }

        let scripted = self
            .state
            .borrow()
            .scripts
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone());
        if let Some(output) = scripted {
            return Ok(output);
        }

        Ok(match cmd {
            "sgdisk" => self.sgdisk(args),
            "partprobe" | "udevadm" => reply(true, "", ""),
            "zpool" => self.zpool(args),
            "systemctl" => self.systemctl(args),
            "rpm" => self.rpm(args),
            "dnf" => self.dnf(args),
            "modprobe" => self.modprobe(args),
            other => reply(false, "", &format!("{other}: command not simulated")),
        })
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let mut state = self.state.borrow_mut();

        if state.stat_failures.contains(path) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }

        match state.pending_links.get(path).copied() {
            Some(Some(0)) => {
                state.pending_links.remove(path);
                state.files.insert(
                    path.to_path_buf(),
                    MockFile {
                        contents: Vec::new(),
                        mode: 0o777,
                    },
                );
                return Ok(true);
            }
            Some(Some(remaining)) => {
                state
                    .pending_links
                    .insert(path.to_path_buf(), Some(remaining - 1));
                return Ok(false);
            }
            Some(None) => return Ok(false),
            None => {}
        }

        Ok(state.files.contains_key(path))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.borrow();

        if path == Path::new("/proc/modules") {
            let listing: String = state
                .modules
                .iter()
                .map(|m| format!("{m} 6127616 0 - Live 0x0000000000000000\n"))
                .collect();
            return Ok(listing.into_bytes());
        }

        state
            .files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: No such file or directory", path.display()),
                ))
            })
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        self.state.borrow_mut().files.insert(
            path.to_path_buf(),
            MockFile {
                contents: contents.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        self.state.borrow_mut().sleeps.push(duration);
    }
}
