//! File directive
//!
//! Writes contents verbatim, applies the declared mode and then the declared
//! owner and group. The file is truncated on every write, so shorter contents
//! fully replace whatever was there before.

use anyhow::{Context, Result};
use hostkit::{FileMode, Ownership};
use std::path::PathBuf;

use super::{ApplyContext, ApplyResult, Directive, DirectiveKind, skipped};
use crate::config;

#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub permissions: String,
    pub contents: String,
    pub owner: String,
    pub group: String,
}

impl File {
    pub fn from_config(file: &config::File) -> Self {
        Self {
            path: file.path.clone(),
            permissions: file.permissions.clone(),
            contents: file.contents.clone(),
            owner: file.owner.clone(),
            group: file.group.clone(),
        }
    }
}

impl Directive for File {
    fn id(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn description(&self) -> String {
        format!(
            "Write {} ({} {}:{})",
            self.path.display(),
            self.permissions,
            self.owner,
            self.group
        )
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::File
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        let path = self.path.display();

        // Bad permissions must fail before anything touches the disk
        let mode = FileMode::parse(&self.permissions).with_context(|| format!("file {path}"))?;

        if ctx.dry_run {
            return Ok(skipped("dry run"));
        }

        log::info!(
            "writing file: path={path} perms={mode} owner={} group={}",
            self.owner,
            self.group
        );
        let host = ctx.host;

        let existed = host
            .exists(&self.path)
            .with_context(|| format!("can't check {path}"))?;

        host.write_file(&self.path, self.contents.as_bytes(), mode)
            .with_context(|| format!("can't write {path}"))?;

        let uid = host
            .lookup_user(&self.owner)
            .with_context(|| format!("can't find user {} for {path}", self.owner))?;
        let gid = host
            .lookup_group(&self.group)
            .with_context(|| format!("can't find group {} for {path}", self.group))?;

        let ownership = Ownership { uid, gid };
        host.chown(&self.path, ownership).with_context(|| {
            format!(
                "can't chown {path} to {ownership} ({}:{})",
                self.owner, self.group
            )
        })?;

        Ok(if existed {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostkit::{MockBackend, SystemBackend, current_identity};
    use std::fs;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::Path;

    fn file(
        path: impl Into<PathBuf>,
        permissions: &str,
        contents: &str,
        owner: &str,
        group: &str,
    ) -> File {
        File {
            path: path.into(),
            permissions: permissions.to_string(),
            contents: contents.to_string(),
            owner: owner.to_string(),
            group: group.to_string(),
        }
    }

    fn apply(directive: &File, host: &dyn hostkit::Backend) -> Result<ApplyResult> {
        directive.apply(&ApplyContext {
            dry_run: false,
            host,
        })
    }

    #[test]
    fn test_write_real_file_as_self() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo");
        let (user, group) = current_identity().unwrap();

        let directive = file(&path, "0777", "test foo", &user, &group);
        let result = apply(&directive, &SystemBackend::new()).unwrap();

        assert_eq!(result, ApplyResult::Created);
        assert_eq!(fs::read_to_string(&path).unwrap(), "test foo");

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o7777, 0o777);
        assert_eq!(meta.uid(), fs::metadata(dir.path()).unwrap().uid());
    }

    #[test]
    fn test_shorter_contents_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        fs::write(&path, "a very long previous message of the day").unwrap();
        let (user, group) = current_identity().unwrap();

        let directive = file(&path, "0644", "short", &user, &group);
        let result = apply(&directive, &SystemBackend::new()).unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_bad_permissions_fail_before_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never");

        let directive = file(&path, "xyz", "x", "root", "root");
        let err = apply(&directive, &SystemBackend::new()).unwrap_err();

        let msg = format!("{err:#}");
        assert_eq!(msg.matches("xyz").count(), 1, "{msg}");
        assert_eq!(msg.matches("can't read permissions").count(), 1, "{msg}");
        assert!(msg.contains("never"));
        assert!(!path.exists());
    }

    #[test]
    fn test_bad_permissions_fail_even_in_dry_run() {
        let host = MockBackend::new();
        let err = file("/etc/x", "0999", "x", "root", "root")
            .apply(&ApplyContext {
                dry_run: true,
                host: &host,
            })
            .unwrap_err();
        assert!(format!("{err:#}").contains("0999"));
    }

    #[test]
    fn test_unknown_owner_names_user() {
        let host = MockBackend::new();
        let directive = file("/etc/x", "0644", "x", "nobody-here", "root");
        let err = apply(&directive, &host).unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("can't find user nobody-here"));
        // contents are written before ownership is resolved
        assert_eq!(host.contents(Path::new("/etc/x")).unwrap(), b"x");
    }

    #[test]
    fn test_unknown_group_names_group() {
        let host = MockBackend::new();
        let directive = file("/etc/x", "0644", "x", "root", "no-such-group");
        let err = apply(&directive, &host).unwrap_err();
        assert!(format!("{err:#}").contains("can't find group no-such-group"));
    }

    #[test]
    fn test_ownership_applied() {
        let host = MockBackend::new()
            .with_user("app", 1001)
            .with_group("app", 1002);
        apply(&file("/srv/app/env", "0600", "KEY=1\n", "app", "app"), &host).unwrap();

        let written = host.file(Path::new("/srv/app/env")).unwrap();
        assert_eq!(written.contents, b"KEY=1\n");
        assert_eq!(written.mode.bits(), 0o600);
        assert_eq!(written.owner, Some(Ownership { uid: 1001, gid: 1002 }));
    }
}
