//! Provisioning engine
//!
//! The engine runs one provisioning pass:
//! 1. Gate - Claim the instance marker, or stop if it already exists
//! 2. Planning - Build the ordered directive list from the config
//! 3. Executing - Apply directives sequentially, failing fast

pub mod executor;
pub mod planner;

pub use executor::{
    ExecuteOptions, ExecuteSummary, LogProgress, NoProgress, ProgressCallback, execute,
};
pub use planner::ExecutionPlan;

use anyhow::{Context, Result};
use hostkit::Backend;
use std::path::PathBuf;

use crate::config::Config;
use crate::gate::Gate;

/// Where the engine keeps its state and how it runs
#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub marker_dir: PathBuf,
    pub hostname_record: PathBuf,
    pub dry_run: bool,
}

/// How a provisioning pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The marker already existed; nothing ran
    AlreadyProvisioned,
    /// Nothing was changed; `summary` counts what would have run
    DryRun {
        already_provisioned: bool,
        summary: ExecuteSummary,
    },
    Applied(ExecuteSummary),
}

/// Provision the host once for `config.instance_id`.
///
/// Steps that succeed before a failure are not undone.
pub fn apply<P: ProgressCallback>(
    config: &Config,
    host: &dyn Backend,
    settings: &ApplySettings,
    progress: &mut P,
) -> Result<Outcome> {
    let gate = Gate::new(&settings.marker_dir);
    let plan = ExecutionPlan::from_config(config, &settings.hostname_record);

    if settings.dry_run {
        let already_provisioned = gate.is_marked(host, &config.instance_id)?;
        let opts = ExecuteOptions { dry_run: true };
        let summary = execute(&plan, host, &opts, progress)?;
        return Ok(Outcome::DryRun {
            already_provisioned,
            summary,
        });
    }

    let acquired = gate
        .acquire(host, &config.instance_id)
        .context("error making instance id semaphore")?;
    if !acquired {
        log::info!(
            "already ran before for instance {}, nothing to do",
            config.instance_id
        );
        return Ok(Outcome::AlreadyProvisioned);
    }

    log::debug!(
        "claimed instance {} in {}, applying {} directives ({})",
        config.instance_id,
        gate.dir().display(),
        plan.directives.len(),
        plan.breakdown()
    );
    let summary = execute(&plan, host, &ExecuteOptions::default(), progress)?;
    Ok(Outcome::Applied(summary))
}
