//! Execution planner - turns a configuration into an ordered list of directives

use std::path::Path;

use crate::config::Config;
use crate::directive::{self, Directive, DirectiveKind};

pub type BoxedDirective = Box<dyn Directive>;

/// Directives in the order they will be applied:
/// hostname, then users, files and commands in declaration order
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub directives: Vec<BoxedDirective>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config, hostname_record: &Path) -> Self {
        let mut plan = Self::new();

        plan.add(Box::new(directive::Hostname::new(
            &config.hostname,
            hostname_record,
        )));
        for user in &config.users {
            plan.add(Box::new(directive::User::from_config(user)));
        }
        for file in &config.files {
            plan.add(Box::new(directive::File::from_config(file)));
        }
        for (index, line) in config.runcmd.iter().enumerate() {
            plan.add(Box::new(directive::Command::new(index, line)));
        }

        plan
    }

    pub fn add(&mut self, directive: BoxedDirective) {
        self.directives.push(directive);
    }

    /// Number of directives of `kind`
    pub fn count(&self, kind: DirectiveKind) -> usize {
        self.directives.iter().filter(|d| d.kind() == kind).count()
    }

    /// Per-kind counts for logging, e.g. `hostname=1 user=2 file=0 command=1`
    pub fn breakdown(&self) -> String {
        DirectiveKind::ALL
            .iter()
            .map(|&kind| format!("{kind}={}", self.count(kind)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
