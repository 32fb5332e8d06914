//! Production backend talking to the running OS.
//!
//! Hostname, account-database lookups and ownership go through `nix`;
//! files and processes use the standard library's Unix extensions.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::unistd::{Gid, Group, Uid, User, chown, getgid, gethostname, getuid, sethostname};

use crate::error::{Error, Result};
use crate::types::{FileMode, Ownership};

use super::Backend;

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Backend implementation that mutates the real machine.
#[derive(Debug, Clone, Default)]
pub struct SystemBackend {
    timeout: Option<Duration>,
}

impl SystemBackend {
    /// Create a backend that waits indefinitely for child processes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill child processes that run longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn wait(&self, program: &str, mut child: Child) -> Result<ExitStatus> {
        let spawn_err = |source: io::Error| Error::Spawn {
            program: program.to_string(),
            source,
        };

        let Some(timeout) = self.timeout else {
            return child.wait().map_err(spawn_err);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(spawn_err)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The child may exit between try_wait and kill; either way reap it.
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout {
                    program: program.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl Backend for SystemBackend {
    fn hostname(&self) -> Result<String> {
        let name = gethostname().map_err(|errno| Error::Hostname {
            action: "get",
            source: errno.into(),
        })?;
        Ok(name.to_string_lossy().into_owned())
    }

    fn set_hostname(&self, name: &str) -> Result<()> {
        sethostname(name).map_err(|errno| Error::Hostname {
            action: "set",
            source: errno.into(),
        })
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        path.try_exists().map_err(|e| Error::io(path, e))
    }

    fn file_mode(&self, path: &Path) -> Result<FileMode> {
        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        Ok(FileMode::from_bits(metadata.permissions().mode()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode.bits())
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        file.write_all(contents).map_err(|e| Error::io(path, e))?;
        file.set_permissions(Permissions::from_mode(mode.bits()))
            .map_err(|e| Error::io(path, e))?;
        file.sync_all().map_err(|e| Error::io(path, e))
    }

    fn create_new(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<bool> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode.bits())
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(Error::io(path, e)),
        };

        file.write_all(contents).map_err(|e| Error::io(path, e))?;
        file.sync_all().map_err(|e| Error::io(path, e))?;
        Ok(true)
    }

    fn create_dir_all(&self, path: &Path, mode: FileMode) -> Result<()> {
        DirBuilder::new()
            .recursive(true)
            .mode(mode.bits())
            .create(path)
            .map_err(|e| Error::io(path, e))
    }

    fn lookup_user(&self, name: &str) -> Result<u32> {
        user_id(name)
    }

    fn lookup_group(&self, name: &str) -> Result<u32> {
        group_id(name)
    }

    fn chown(&self, path: &Path, owner: Ownership) -> Result<()> {
        chown(
            path,
            Some(Uid::from_raw(owner.uid)),
            Some(Gid::from_raw(owner.gid)),
        )
        .map_err(|errno| Error::io(path, errno.into()))
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::ToolNotFound(program.to_string())
                } else {
                    Error::Spawn {
                        program: program.to_string(),
                        source: e,
                    }
                }
            })?;

        let status = self.wait(program, child)?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                program: program.to_string(),
                status: status.to_string(),
            })
        }
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.contains('\0') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Resolve a user name through the system account database.
pub fn user_id(name: &str) -> Result<u32> {
    check_name(name)?;
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid.as_raw()),
        Ok(None) => Err(Error::UserNotFound(name.to_string())),
        Err(errno) => Err(Error::Lookup {
            name: name.to_string(),
            source: errno.into(),
        }),
    }
}

/// Resolve a group name through the system group database.
pub fn group_id(name: &str) -> Result<u32> {
    check_name(name)?;
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        Ok(None) => Err(Error::GroupNotFound(name.to_string())),
        Err(errno) => Err(Error::Lookup {
            name: name.to_string(),
            source: errno.into(),
        }),
    }
}

/// Name of the user and primary group running this process.
///
/// Used by tests and diagnostics that need a chown target guaranteed to be
/// permitted for the caller.
pub fn current_identity() -> Result<(String, String)> {
    let uid = getuid();
    let gid = getgid();

    let user = User::from_uid(uid)
        .map_err(|errno| Error::Lookup {
            name: uid.to_string(),
            source: errno.into(),
        })?
        .ok_or_else(|| Error::UserNotFound(uid.to_string()))?;
    let group = Group::from_gid(gid)
        .map_err(|errno| Error::Lookup {
            name: gid.to_string(),
            source: errno.into(),
        })?
        .ok_or_else(|| Error::GroupNotFound(gid.to_string()))?;

    Ok((user.name, group.name))
}
