//! Read-only probes of live system state
//!
//! Each probe answers one question ("is this package installed?", "does this
//! pool exist?") with a definite yes/no, or `Unknown` when the answer cannot
//! be trusted: the tool could not run, or replied with something outside
//! the states we know how to read. Nothing is cached between calls.

use sequencer::{CommandOutput, ProbeState, System};
use std::path::Path;

/// Whether a path exists (following symlinks)
pub fn path_exists(system: &dyn System, path: &Path) -> ProbeState {
    match system.exists(path) {
        Ok(true) => ProbeState::satisfied().with_details(format!("{} present", path.display())),
        Ok(false) => ProbeState::unsatisfied().with_details(format!("{} missing", path.display())),
        Err(e) => ProbeState::unknown(format!("cannot stat {}: {}", path.display(), e)),
    }
}

/// Whether a file exists with exactly the given content
pub fn file_matches(system: &dyn System, path: &Path, expected: &[u8]) -> ProbeState {
    match path_exists(system, path) {
        ProbeState::Satisfied { .. } => {}
        other => return other,
    }
    match system.read_file(path) {
        Ok(actual) if actual == expected => {
            ProbeState::satisfied().with_details(format!("{} up to date", path.display()))
        }
        Ok(_) => ProbeState::unsatisfied().with_details(format!("{} differs", path.display())),
        Err(e) => ProbeState::unknown(format!("cannot read {}: {}", path.display(), e)),
    }
}

/// Whether an RPM package is installed
pub fn package_installed(system: &dyn System, package: &str) -> ProbeState {
    let output = match system.run("rpm", &["-q", package]) {
        Ok(output) => output,
        Err(e) => return ProbeState::unknown(format!("rpm: {e}")),
    };

    if output.success {
        return ProbeState::satisfied().with_details(format!("{package} installed"));
    }
    if output.stdout_str().contains("is not installed") {
        return ProbeState::unsatisfied().with_details(format!("{package} not installed"));
    }
    ProbeState::unknown(format!("rpm -q {package}: {}", failure_text(&output)))
}

/// Whether a kernel module is loaded, per /proc/modules
pub fn module_loaded(system: &dyn System, module: &str) -> ProbeState {
    let modules = match system.read_file(Path::new("/proc/modules")) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(e) => return ProbeState::unknown(format!("cannot read /proc/modules: {e}")),
    };

    let wanted = normalize_module(module);
    let loaded = modules
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| normalize_module(name) == wanted);

    if loaded {
        ProbeState::satisfied().with_details(format!("module {module} loaded"))
    } else {
        ProbeState::unsatisfied().with_details(format!("module {module} not loaded"))
    }
}

/// Whether a pool with this name is imported
pub fn pool_exists(system: &dyn System, pool: &str) -> ProbeState {
    let output = match system.run("zpool", &["list", "-H", "-o", "name", pool]) {
        Ok(output) => output,
        Err(e) => return ProbeState::unknown(format!("zpool: {e}")),
    };

    if output.success {
        if output.stdout_str().lines().any(|l| l.trim() == pool) {
            return ProbeState::satisfied().with_details(format!("pool {pool} exists"));
        }
        return ProbeState::unknown(format!(
            "zpool list returned unexpected output: {}",
            output.stdout_str().trim()
        ));
    }
    if is_no_such_pool(&output) {
        return ProbeState::unsatisfied().with_details(format!("pool {pool} does not exist"));
    }
    ProbeState::unknown(format!("zpool list {pool}: {}", failure_text(&output)))
}

/// Current value of a pool property, or `None` if the pool does not exist
pub fn pool_property(
    system: &dyn System,
    pool: &str,
    property: &str,
) -> Result<Option<String>, String> {
    let output = system
        .run("zpool", &["get", "-H", "-o", "value", property, pool])
        .map_err(|e| format!("zpool: {e}"))?;

    if output.success {
        return Ok(Some(output.stdout_str().trim().to_string()));
    }
    if is_no_such_pool(&output) {
        return Ok(None);
    }
    Err(format!("zpool get {property} {pool}: {}", failure_text(&output)))
}

/// Whether a systemd unit is enabled
pub fn unit_enabled(system: &dyn System, unit: &str) -> ProbeState {
    let output = match system.run("systemctl", &["is-enabled", unit]) {
        Ok(output) => output,
        Err(e) => return ProbeState::unknown(format!("systemctl: {e}")),
    };

    let state = output.stdout_str().trim().to_string();
    match state.as_str() {
        "enabled" => ProbeState::satisfied().with_details(format!("{unit} enabled")),
        "disabled" | "not-found" => {
            ProbeState::unsatisfied().with_details(format!("{unit} {state}"))
        }
        "" if output.stderr_str().contains("No such file or directory") => {
            ProbeState::unsatisfied().with_details(format!("{unit} not installed"))
        }
        "" => ProbeState::unknown(format!(
            "systemctl is-enabled {unit}: {}",
            failure_text(&output)
        )),
        other => ProbeState::unknown(format!("{unit} is {other}")),
    }
}

/// Whether every unit in the list is enabled
pub fn units_enabled(system: &dyn System, units: &[String]) -> ProbeState {
    let mut state = ProbeState::satisfied();
    let mut missing = Vec::new();
    for unit in units {
        let probe = unit_enabled(system, unit);
        if !probe.is_satisfied() && !probe.is_unknown() {
            missing.push(unit.as_str());
        }
        state = state.and(probe);
    }

    match state {
        ProbeState::Satisfied { .. } => {
            ProbeState::satisfied().with_details(format!("{} enabled", units.join(", ")))
        }
        ProbeState::Unsatisfied { .. } => {
            ProbeState::unsatisfied().with_details(format!("not enabled: {}", missing.join(", ")))
        }
        unknown => unknown,
    }
}

fn normalize_module(name: &str) -> String {
    name.replace('-', "_")
}

fn is_no_such_pool(output: &CommandOutput) -> bool {
    output.stderr_str().contains("no such pool")
}

fn failure_text(output: &CommandOutput) -> String {
    let stderr = output.stderr_str();
    let stderr = stderr.trim();
    let code = output
        .code
        .map_or_else(|| "signal".to_string(), |c| format!("exit code {c}"));
    if stderr.is_empty() {
        code
    } else {
        format!("{code}: {stderr}")
    }
}
