//! The provisioning command: validate, preview, confirm, execute

use anyhow::{Context as _, Result, bail};
use sequencer::{Run, StepContext, System};
use std::path::Path;

use crate::Context;
use crate::cli::Cli;
use crate::config::ProvisionConfig;
use crate::privilege;
use crate::progress::ConsoleProgress;
use crate::report;
use crate::steps;
use crate::system::HostSystem;
use crate::target::{Target, TargetError, TargetResolver};
use crate::ui;

/// Gates a run must pass before it is built, in order: configuration,
/// target, privilege, collaborator unit file
pub struct Preflight<'a> {
    pub system: &'a dyn System,
    pub resolver: &'a TargetResolver,
    pub check_root: fn() -> sequencer::Result<()>,
}

impl Preflight<'_> {
    /// Validate everything and build the run; nothing is executed
    pub fn prepare(
        &self,
        input: Option<&str>,
        config: &ProvisionConfig,
        unit_source: &Path,
    ) -> Result<(Target, Run)> {
        config.validate()?;
        let target = self.resolve(input)?;
        let run = self.prepare_target(&target, config, unit_source)?;
        Ok((target, run))
    }

    fn resolve(&self, input: Option<&str>) -> Result<Target> {
        let Some(input) = input else {
            list_candidates(&self.resolver.candidates());
            bail!("no target disk given");
        };
        match self.resolver.resolve(input) {
            Ok(target) => Ok(target),
            Err(e) => {
                show_rejection(&e);
                Err(e.into())
            }
        }
    }

    fn prepare_target(
        &self,
        target: &Target,
        config: &ProvisionConfig,
        unit_source: &Path,
    ) -> Result<Run> {
        (self.check_root)()?;

        if !self
            .system
            .exists(unit_source)
            .with_context(|| format!("Could not check {}", unit_source.display()))?
        {
            bail!(
                "collaborator unit file {} not found (it ships next to the poolstrap binary)",
                unit_source.display()
            );
        }

        Ok(steps::build_run(target, config, unit_source))
    }
}

pub fn run(ctx: &Context, cli: &Cli) -> Result<()> {
    let mut config = ProvisionConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, cli);

    let system = HostSystem;
    let resolver = TargetResolver::new(&config.by_id_dir);
    let unit_source = config.unit_source()?;
    let preflight = Preflight {
        system: &system,
        resolver: &resolver,
        check_root: privilege::require_root,
    };
    let (target, run) = preflight.prepare(cli.target.as_deref(), &config, &unit_source)?;

    let step_ctx = StepContext::new(&system).verbose(ctx.verbose > 0);

    let previews = sequencer::preview(&run, &step_ctx);
    if !ctx.quiet {
        report::display_preview(&target.display(), &previews);
    }

    if report::has_pending(&previews)
        && !cli.yes
        && !confirm_proceed(&config, &target.display())?
    {
        ui::info("Aborted. No changes made.");
        bail!("provisioning declined");
    }

    let mut progress = ConsoleProgress::new(ctx.quiet);
    match sequencer::execute(run, &step_ctx, &mut progress) {
        Ok(summary) => {
            if !ctx.quiet {
                report::print_summary(&summary);
            }
            Ok(())
        }
        Err(failure) => {
            report::print_failure(&failure);
            Err(failure.into())
        }
    }
}

fn apply_overrides(config: &mut ProvisionConfig, cli: &Cli) {
    if let Some(pool) = &cli.pool {
        config.pool_name.clone_from(pool);
    }
    if cli.prepare_host {
        config.host.prepare = true;
    }
}

fn list_candidates(candidates: &[String]) {
    if candidates.is_empty() {
        ui::warn("No candidate disks found");
        return;
    }
    ui::header("Candidate disks");
    for disk in candidates {
        println!("  {disk}");
    }
    println!();
}

fn show_rejection(error: &TargetError) {
    ui::kv("rejected", &error.input);
    ui::kv("reason", &error.reason);
    list_candidates(&error.candidates);
}

fn confirm_proceed(config: &ProvisionConfig, target: &str) -> Result<bool> {
    use dialoguer::Confirm;

    println!();
    ui::warn(&format!(
        "This partitions {} and creates pool '{}' on it",
        target, config.pool_name
    ));

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;

    Ok(confirmed)
}
