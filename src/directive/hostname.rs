//! Hostname directive
//!
//! The persisted record is rewritten before the live kernel hostname is
//! changed. If setting the live name fails the record has already moved on;
//! nothing is rolled back.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{ApplyContext, ApplyResult, Directive, DirectiveKind, skipped};

#[derive(Debug, Clone)]
pub struct Hostname {
    pub target: String,
    /// Persisted hostname record, usually `/etc/hostname`
    pub record: PathBuf,
}

impl Hostname {
    pub fn new(target: &str, record: impl Into<PathBuf>) -> Self {
        Self {
            target: target.to_string(),
            record: record.into(),
        }
    }
}

impl Directive for Hostname {
    fn id(&self) -> String {
        format!("hostname:{}", self.target)
    }

    fn description(&self) -> String {
        format!("Set hostname to {}", self.target)
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Hostname
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        if self.target.is_empty() {
            log::warn!("no hostname configured, leaving it unchanged");
            return Ok(skipped("no hostname configured"));
        }
        if ctx.dry_run {
            return Ok(skipped("dry run"));
        }

        log::info!("setting hostname: {}", self.target);
        let host = ctx.host;

        let current = host.hostname().context("can't get current hostname")?;
        let unchanged = current == self.target;
        if unchanged {
            log::info!("hostname is already {}", self.target);
        }

        let record = self.record.display();
        let mode = host
            .file_mode(&self.record)
            .with_context(|| format!("can't read {record}"))?;
        host.remove_file(&self.record)
            .with_context(|| format!("can't remove {record}"))?;
        host.write_file(&self.record, self.target.as_bytes(), mode)
            .with_context(|| format!("can't write {record}"))?;

        host.set_hostname(&self.target)
            .with_context(|| format!("can't set hostname to {}", self.target))?;

        Ok(if unchanged {
            ApplyResult::NoChange
        } else {
            ApplyResult::Modified
        })
    }
}
