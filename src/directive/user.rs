//! User account directive
//!
//! Accounts are created with `useradd`. Minimal distributions (BusyBox,
//! Alpine) ship only `adduser`, so when `useradd` is missing or fails the
//! account is created with `adduser` and joined to each group one call at a
//! time. Any other failure (timeout, permission denied spawning) is returned
//! as is.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{ApplyContext, ApplyResult, Directive, DirectiveKind, skipped};
use crate::config;

const PRIMARY_TOOL: &str = "useradd";
const FALLBACK_TOOL: &str = "adduser";

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub home: PathBuf,
    pub shell: String,
    pub groups: Vec<String>,
    /// Declared but not provisioned; only logged
    pub github: Option<String>,
    pub sudo: Vec<String>,
    pub ssh_keys: Vec<String>,
}

impl User {
    pub fn from_config(user: &config::User) -> Self {
        Self {
            name: user.name.clone(),
            home: user.home_dir(),
            shell: user.login_shell().to_string(),
            groups: user.groups.clone(),
            github: user.github.as_ref().map(|h| h.as_str().to_string()),
            sudo: user.sudo.iter().map(|r| r.as_str().to_string()).collect(),
            ssh_keys: user
                .authorized_keys
                .iter()
                .map(|k| {
                    [k.options(), Some(k.algorithm()), k.comment()]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect(),
        }
    }

    fn useradd_args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            self.home.display().to_string(),
            "-s".to_string(),
            self.shell.clone(),
            "-m".to_string(),
            "-U".to_string(),
        ];
        if !self.groups.is_empty() {
            args.push("-G".to_string());
            args.push(self.groups.join(","));
        }
        args.push(self.name.clone());
        args
    }

    fn adduser_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.home.display().to_string(),
            "-s".to_string(),
            self.shell.clone(),
            "-D".to_string(),
            self.name.clone(),
        ]
    }

    fn create_minimal(&self, ctx: &ApplyContext) -> Result<()> {
        let args = self.adduser_args();
        ctx.host
            .run(FALLBACK_TOOL, &as_strs(&args))
            .with_context(|| format!("can't create user {} with {FALLBACK_TOOL}", self.name))?;

        for group in &self.groups {
            ctx.host
                .run(FALLBACK_TOOL, &[self.name.as_str(), group.as_str()])
                .with_context(|| format!("can't add user {} to group {group}", self.name))?;
        }
        Ok(())
    }
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

impl Directive for User {
    fn id(&self) -> String {
        format!("user:{}", self.name)
    }

    fn description(&self) -> String {
        if self.groups.is_empty() {
            format!("Create user {}", self.name)
        } else {
            format!("Create user {} in {}", self.name, self.groups.join(", "))
        }
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::User
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(skipped("dry run"));
        }

        log::info!(
            "creating user: name={} home={} shell={} groups={:?} github={}",
            self.name,
            self.home.display(),
            self.shell,
            self.groups,
            self.github.as_deref().unwrap_or("-"),
        );

        for rule in &self.sudo {
            log::debug!("user {}: sudo rule {rule:?} is not applied", self.name);
        }
        for key in &self.ssh_keys {
            log::debug!("user {}: ssh key ({key}) is not installed", self.name);
        }

        let args = self.useradd_args();
        match ctx.host.run(PRIMARY_TOOL, &as_strs(&args)) {
            Ok(()) => {}
            Err(err) if err.triggers_fallback() => {
                log::warn!("{PRIMARY_TOOL} failed ({err}), retrying with {FALLBACK_TOOL}");
                self.create_minimal(ctx)?;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("can't create user {}", self.name));
            }
        }

        Ok(ApplyResult::Created)
    }
}
