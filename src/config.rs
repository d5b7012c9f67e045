use anyhow::{Context, Result};
use sequencer::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/poolstrap/config.toml";

/// Collaborator unit file, expected next to the executable
pub const LOAD_KEY_UNIT: &str = "zfs-load-key.service";

// ============================================================================
// Provision Config
// ============================================================================

/// Everything that parameterizes a run besides the target disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Name of the pool to create
    pub pool_name: String,
    /// Directory holding stable disk identifiers
    pub by_id_dir: PathBuf,
    pub partition: PartitionConfig,
    pub pool: PoolProperties,
    /// Raw encryption key; defaults to /etc/zfs/keys/<pool>.key
    pub key_file: Option<PathBuf>,
    /// Pool cache file used for boot-time import
    pub cache_file: PathBuf,
    pub services: ServiceConfig,
    pub host: HostConfig,
    /// Retry budget for steps waiting on udev
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub number: u32,
    pub label: String,
    /// sgdisk type code (BF00 = Solaris root / ZFS)
    pub type_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolProperties {
    pub ashift: u8,
    pub encryption: String,
    pub compression: String,
    pub mountpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Where unit files are installed
    pub unit_dir: PathBuf,
    /// Override for the collaborator unit file location
    pub unit_source: Option<PathBuf>,
    /// Units enabled alongside the key-load unit
    pub boot_units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Install packages and load kernel modules before the core steps
    pub prepare: bool,
    pub packages: Vec<String>,
    pub modules: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            pool_name: "tank".to_string(),
            by_id_dir: PathBuf::from("/dev/disk/by-id"),
            partition: PartitionConfig::default(),
            pool: PoolProperties::default(),
            key_file: None,
            cache_file: PathBuf::from("/etc/zfs/zpool.cache"),
            services: ServiceConfig::default(),
            host: HostConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            number: 1,
            label: "zfs".to_string(),
            type_code: "BF00".to_string(),
        }
    }
}

impl Default for PoolProperties {
    fn default() -> Self {
        Self {
            ashift: 12,
            encryption: "aes-256-gcm".to_string(),
            compression: "lz4".to_string(),
            mountpoint: None,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            unit_dir: PathBuf::from("/etc/systemd/system"),
            unit_source: None,
            boot_units: vec![
                "zfs-import-cache.service".to_string(),
                "zfs-mount.service".to_string(),
                "zfs.target".to_string(),
            ],
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            prepare: false,
            packages: vec!["zfs".to_string()],
            modules: vec!["zfs".to_string()],
        }
    }
}

impl ProvisionConfig {
    /// Reject values that would be misread by the tools they are passed to
    pub fn validate(&self) -> sequencer::Result<()> {
        validate_pool_name(&self.pool_name)
    }

    /// Load config from an explicit path, or the default path if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from(default)
                } else {
                    log::debug!("no config at {}, using defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Effective key file path
    pub fn key_file(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/etc/zfs/keys/{}.key", self.pool_name)))
    }

    /// Effective location of the collaborator unit file
    pub fn unit_source(&self) -> Result<PathBuf> {
        if let Some(path) = &self.services.unit_source {
            return Ok(path.clone());
        }
        let exe = std::env::current_exe().context("Could not determine executable path")?;
        let dir = exe
            .parent()
            .context("Executable path has no parent directory")?;
        Ok(dir.join(LOAD_KEY_UNIT))
    }

    /// Units that must be enabled for boot-time unlock and mount
    pub fn units_to_enable(&self) -> Vec<String> {
        let mut units = vec![LOAD_KEY_UNIT.to_string()];
        for unit in &self.services.boot_units {
            if !units.contains(unit) {
                units.push(unit.clone());
            }
        }
        units
    }
}

/// Pool names zpool reserves for vdev keywords
const RESERVED_POOL_PREFIXES: [&str; 4] = ["mirror", "raidz", "draid", "spare"];

/// A pool name must start with a letter and contain only letters, digits,
/// and `_ . : -`. It ends up in zpool argument lists and in the key file path.
fn validate_pool_name(name: &str) -> sequencer::Result<()> {
    let invalid = |reason: &str| {
        Err(sequencer::Error::validation(format!(
            "invalid pool name '{name}': {reason}"
        )))
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return invalid("empty"),
        Some(c) if !c.is_ascii_alphabetic() => return invalid("must start with a letter"),
        Some(_) => {}
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || "_.:-".contains(*c))) {
        return invalid(format!("'{c}' is not allowed").as_str());
    }
    if name == "log" || RESERVED_POOL_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return invalid("reserved by zpool");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
