//! Step registry - the ordered provisioning steps for one target disk
//!
//! Pure data assembly: nothing here touches the system. Each step probes
//! and acts through the [`StepContext`](sequencer::StepContext) it is
//! handed at execution time.

mod cachefile;
mod host;
mod keyfile;
mod partition;
mod pool;
mod service;

pub use cachefile::CacheFileStep;
pub use host::{KernelModuleStep, PackagesStep};
pub use keyfile::KeyFileStep;
pub use partition::PartitionStep;
pub use pool::PoolStep;
pub use service::{UnitDeployStep, UnitEnableStep};

use sequencer::Run;
use std::path::Path;

use crate::config::{LOAD_KEY_UNIT, ProvisionConfig};
use crate::target::Target;

/// Build the run for `target`
///
/// Host preparation (packages, kernel module) comes first when enabled.
/// The core sequence is always partition, keyfile, pool, service-deploy,
/// service-enable, cachefile.
pub fn build_run(target: &Target, config: &ProvisionConfig, unit_source: &Path) -> Run {
    let mut run = Run::new(target.display());

    if config.host.prepare {
        run = run
            .with_step(PackagesStep {
                packages: config.host.packages.clone(),
            })
            .with_step(KernelModuleStep {
                modules: config.host.modules.clone(),
            });
    }

    let partition = target.partition_path(config.partition.number);
    let key_file = config.key_file();

    run.with_step(PartitionStep {
        disk: target.path().to_path_buf(),
        link: partition.clone(),
        number: config.partition.number,
        label: config.partition.label.clone(),
        type_code: config.partition.type_code.clone(),
        retry: config.retry.clone(),
    })
    .with_step(KeyFileStep {
        path: key_file.clone(),
    })
    .with_step(PoolStep {
        pool: config.pool_name.clone(),
        vdev: partition,
        key_file,
        properties: config.pool.clone(),
    })
    .with_step(UnitDeployStep {
        source: unit_source.to_path_buf(),
        dest: config.services.unit_dir.join(LOAD_KEY_UNIT),
    })
    .with_step(UnitEnableStep {
        units: config.units_to_enable(),
    })
    .with_step(CacheFileStep {
        pool: config.pool_name.clone(),
        path: config.cache_file.clone(),
    })
}
