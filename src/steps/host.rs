//! Host preparation steps - ZFS packages and kernel module

use sequencer::{ProbeState, Result, Step, StepContext};

use crate::probe;

/// Install the ZFS userland and kernel packages with dnf
#[derive(Debug, Clone)]
pub struct PackagesStep {
    pub packages: Vec<String>,
}

impl Step for PackagesStep {
    fn name(&self) -> &str {
        "packages"
    }

    fn description(&self) -> String {
        format!("Install {}", self.packages.join(", "))
    }

    fn expected(&self) -> String {
        format!("{} installed", self.packages.join(", "))
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        self.packages
            .iter()
            .map(|p| probe::package_installed(ctx.system, p))
            .fold(ProbeState::satisfied(), ProbeState::and)
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        let mut args = vec!["install", "-y"];
        args.extend(self.packages.iter().map(String::as_str));
        ctx.system.run_checked("dnf", &args)?;
        Ok(())
    }
}

/// Load kernel modules
#[derive(Debug, Clone)]
pub struct KernelModuleStep {
    pub modules: Vec<String>,
}

impl Step for KernelModuleStep {
    fn name(&self) -> &str {
        "kernel-module"
    }

    fn description(&self) -> String {
        format!("Load kernel module {}", self.modules.join(", "))
    }

    fn expected(&self) -> String {
        format!("{} loaded", self.modules.join(", "))
    }

    fn precondition(&self, ctx: &StepContext) -> ProbeState {
        self.modules
            .iter()
            .map(|m| probe::module_loaded(ctx.system, m))
            .fold(ProbeState::satisfied(), ProbeState::and)
    }

    fn action(&self, ctx: &StepContext) -> Result<()> {
        for module in &self.modules {
            if probe::module_loaded(ctx.system, module).is_satisfied() {
                continue;
            }
            ctx.system.run_checked("modprobe", &[module.as_str()])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSystem;

    #[test]
    fn test_installs_packages() {
        let system = MockSystem::new();
        system.install_package("kernel-devel");
        let step = PackagesStep {
            packages: vec!["kernel-devel".into(), "zfs".into()],
        };
        let ctx = StepContext::new(&system);

        assert!(!step.precondition(&ctx).is_satisfied());
        step.action(&ctx).unwrap();
        assert_eq!(system.commands().last().unwrap(), "dnf install -y kernel-devel zfs");
        assert!(step.postcondition(&ctx).is_satisfied());
    }

    #[test]
    fn test_loads_only_missing_modules() {
        let system = MockSystem::new();
        system.install_package("zfs");
        system.load_module("spl");
        let step = KernelModuleStep {
            modules: vec!["spl".into(), "zfs".into()],
        };
        let ctx = StepContext::new(&system);

        step.action(&ctx).unwrap();
        assert!(system.commands().contains(&"modprobe zfs".to_string()));
        assert!(!system.commands().contains(&"modprobe spl".to_string()));
        assert!(system.has_module("zfs"));
    }

    #[test]
    fn test_modprobe_without_package_fails() {
        let system = MockSystem::new();
        let step = KernelModuleStep {
            modules: vec!["zfs".into()],
        };
        let ctx = StepContext::new(&system);

        let err = step.action(&ctx).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
