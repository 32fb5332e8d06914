//! Directive trait and types for one-shot machine provisioning
//!
//! Every configuration entry is modeled as a Directive with:
//! - An identity used in logs and error context
//! - An apply function that mutates the host through a `Backend`
//!
//! Directives are imperative: applying one never inspects desired state
//! beyond what the step itself needs.

use anyhow::Result;
use hostkit::Backend;
use std::fmt;

pub mod command;
pub mod file;
pub mod hostname;
pub mod user;

pub use command::Command;
pub use file::File;
pub use hostname::Hostname;
pub use user::User;

/// Result of applying a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// Host already matched
    NoChange,
    /// Something new was created (account, file)
    Created,
    /// Something existing was changed
    Modified,
    /// A command ran to completion
    Executed,
    /// Apply was skipped
    Skipped { reason: String },
}

/// Kind of directive, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirectiveKind {
    Hostname,
    User,
    File,
    Command,
}

impl DirectiveKind {
    /// Every kind, in application order
    pub const ALL: [Self; 4] = [Self::Hostname, Self::User, Self::File, Self::Command];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hostname => "hostname",
            Self::User => "user",
            Self::File => "file",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context passed to apply operations
pub struct ApplyContext<'a> {
    pub dry_run: bool,
    pub host: &'a dyn Backend,
}

/// Core trait for all directives
pub trait Directive: fmt::Debug {
    /// Unique identifier (e.g., "user:alice", "file:/etc/motd")
    fn id(&self) -> String;

    /// Human-readable description
    fn description(&self) -> String;

    fn kind(&self) -> DirectiveKind;

    /// Mutate the host. Errors carry context naming the target.
    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult>;
}

pub(crate) fn skipped(reason: impl Into<String>) -> ApplyResult {
    ApplyResult::Skipped {
        reason: reason.into(),
    }
}
