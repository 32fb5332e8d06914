//! Execution engine - applies directives one at a time, stopping at the first failure

use anyhow::Result;

use crate::directive::{ApplyContext, ApplyResult, Directive};
use hostkit::Backend;

use super::planner::ExecutionPlan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub executed: usize,
    pub no_change: usize,
    pub skipped: usize,
}

impl ExecuteSummary {
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Executed => self.executed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.modified + self.executed + self.no_change + self.skipped
    }

    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.executed
    }
}

/// Progress callback for reporting execution status
pub trait ProgressCallback {
    /// Called before a directive is applied; `index` is zero-based
    fn on_directive_start(&mut self, index: usize, total: usize, directive: &dyn Directive);

    fn on_directive_complete(&mut self, directive: &dyn Directive, result: &ApplyResult);

    fn on_directive_failed(&mut self, directive: &dyn Directive, error: &anyhow::Error);
}

/// Progress callback that does nothing
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_directive_start(&mut self, _index: usize, _total: usize, _directive: &dyn Directive) {}
    fn on_directive_complete(&mut self, _directive: &dyn Directive, _result: &ApplyResult) {}
    fn on_directive_failed(&mut self, _directive: &dyn Directive, _error: &anyhow::Error) {}
}

/// Progress callback that writes to the log
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_directive_start(&mut self, index: usize, total: usize, directive: &dyn Directive) {
        log::debug!(
            "[{}/{}] {}: {}",
            index + 1,
            total,
            directive.kind(),
            directive.description()
        );
    }

    fn on_directive_complete(&mut self, directive: &dyn Directive, result: &ApplyResult) {
        match result {
            ApplyResult::Skipped { reason } => {
                log::debug!("{} skipped: {}", directive.id(), reason);
            }
            other => log::debug!("{} -> {:?}", directive.id(), other),
        }
    }

    fn on_directive_failed(&mut self, directive: &dyn Directive, error: &anyhow::Error) {
        log::debug!("{} failed: {:#}", directive.id(), error);
    }
}

/// Apply every directive in order.
///
/// The first failure is returned unchanged; directives applied before it
/// keep their effect and later ones never run.
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    host: &dyn Backend,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ExecuteSummary> {
    let ctx = ApplyContext {
        dry_run: opts.dry_run,
        host,
    };
    let total = plan.directives.len();
    let mut summary = ExecuteSummary::default();

    for (index, directive) in plan.directives.iter().enumerate() {
        let directive = directive.as_ref();
        progress.on_directive_start(index, total, directive);

        match directive.apply(&ctx) {
            Ok(result) => {
                progress.on_directive_complete(directive, &result);
                summary.add_result(&result);
            }
            Err(err) => {
                progress.on_directive_failed(directive, &err);
                return Err(err);
            }
        }
    }

    Ok(summary)
}
