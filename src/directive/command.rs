//! `runcmd` entry, run through `sh -c` with inherited stdio

use anyhow::{Context, Result};

use super::{ApplyContext, ApplyResult, Directive, DirectiveKind, skipped};

const SHELL: &str = "sh";

#[derive(Debug, Clone)]
pub struct Command {
    pub index: usize,
    pub line: String,
}

impl Command {
    pub fn new(index: usize, line: &str) -> Self {
        Self {
            index,
            line: line.to_string(),
        }
    }
}

impl Directive for Command {
    fn id(&self) -> String {
        format!("runcmd:{}", self.index)
    }

    fn description(&self) -> String {
        format!("Run {}", self.line)
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Command
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(skipped("dry run"));
        }

        log::info!("running command: {}", self.line);
        ctx.host
            .run(SHELL, &["-c", &self.line])
            .with_context(|| format!("runcmd[{}] failed: {}", self.index, self.line))?;

        Ok(ApplyResult::Executed)
    }
}
