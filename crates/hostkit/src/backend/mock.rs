//! In-memory backend for testing provisioning logic without touching the OS.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::types::{FileMode, Ownership};

use super::Backend;

/// A file held by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFile {
    /// Exact bytes written.
    pub contents: Vec<u8>,
    /// Permission bits.
    pub mode: FileMode,
    /// Set once `chown` has been applied.
    pub owner: Option<Ownership>,
}

#[derive(Debug, Default)]
struct MockState {
    hostname: String,
    hostname_locked: bool,
    files: BTreeMap<PathBuf, MockFile>,
    dirs: BTreeSet<PathBuf>,
    users: HashMap<String, u32>,
    groups: HashMap<String, u32>,
    missing_programs: BTreeSet<String>,
    failing: Vec<Vec<String>>,
    hanging: Vec<Vec<String>>,
    invocations: Vec<Vec<String>>,
}

/// Mock backend storing machine state in memory.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock machine named `localhost` that knows only `root`.
    #[must_use]
    pub fn new() -> Self {
        let mock = Self::default();
        {
            let mut state = mock.state();
            state.hostname = "localhost".to_string();
            state.users.insert("root".to_string(), 0);
            state.groups.insert("root".to_string(), 0);
        }
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the live hostname.
    #[must_use]
    pub fn with_hostname(self, name: &str) -> Self {
        self.state().hostname = name.to_string();
        self
    }

    /// Make `set_hostname` fail with `EPERM`.
    #[must_use]
    pub fn with_locked_hostname(self) -> Self {
        self.state().hostname_locked = true;
        self
    }

    /// Register an account.
    #[must_use]
    pub fn with_user(self, name: &str, uid: u32) -> Self {
        self.state().users.insert(name.to_string(), uid);
        self
    }

    /// Register a group.
    #[must_use]
    pub fn with_group(self, name: &str, gid: u32) -> Self {
        self.state().groups.insert(name.to_string(), gid);
        self
    }

    /// Seed a file.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &[u8], mode: FileMode) -> Self {
        self.state().files.insert(
            path.into(),
            MockFile {
                contents: contents.to_vec(),
                mode,
                owner: None,
            },
        );
        self
    }

    /// Pretend `program` is not installed.
    #[must_use]
    pub fn without_program(self, program: &str) -> Self {
        self.state().missing_programs.insert(program.to_string());
        self
    }

    /// Fail every invocation whose argv starts with `prefix`.
    #[must_use]
    pub fn failing(self, prefix: &[&str]) -> Self {
        self.state()
            .failing
            .push(prefix.iter().map(ToString::to_string).collect());
        self
    }

    /// Report a timeout for every invocation whose argv starts with `prefix`.
    #[must_use]
    pub fn hanging(self, prefix: &[&str]) -> Self {
        self.state()
            .hanging
            .push(prefix.iter().map(ToString::to_string).collect());
        self
    }

    /// Current live hostname.
    pub fn current_hostname(&self) -> String {
        self.state().hostname.clone()
    }

    /// Snapshot of a file.
    pub fn file(&self, path: &Path) -> Option<MockFile> {
        self.state().files.get(path).cloned()
    }

    /// Contents of a file.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.file(path).map(|f| f.contents)
    }

    /// Whether a directory was created.
    pub fn has_dir(&self, path: &Path) -> bool {
        self.state().dirs.contains(path)
    }

    /// Every program invocation so far, as argv vectors.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.state().invocations.clone()
    }
}

fn matches_prefix(argv: &[String], prefixes: &[Vec<String>]) -> bool {
    prefixes.iter().any(|p| argv.starts_with(p))
}

fn not_found(path: &Path) -> Error {
    Error::io(path, io::Error::from(io::ErrorKind::NotFound))
}

impl Backend for MockBackend {
    fn hostname(&self) -> Result<String> {
        Ok(self.state().hostname.clone())
    }

    fn set_hostname(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        if state.hostname_locked {
            return Err(Error::Hostname {
                action: "set",
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        state.hostname = name.to_string();
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let state = self.state();
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    fn file_mode(&self, path: &Path) -> Result<FileMode> {
        self.state()
            .files
            .get(path)
            .map(|f| f.mode)
            .ok_or_else(|| not_found(path))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<()> {
        let mut state = self.state();
        let owner = state.files.get(path).and_then(|f| f.owner);
        state.files.insert(
            path.to_path_buf(),
            MockFile {
                contents: contents.to_vec(),
                mode,
                owner,
            },
        );
        Ok(())
    }

    fn create_new(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<bool> {
        let mut state = self.state();
        if state.files.contains_key(path) {
            return Ok(false);
        }
        state.files.insert(
            path.to_path_buf(),
            MockFile {
                contents: contents.to_vec(),
                mode,
                owner: None,
            },
        );
        Ok(true)
    }

    fn create_dir_all(&self, path: &Path, _mode: FileMode) -> Result<()> {
        let mut state = self.state();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn lookup_user(&self, name: &str) -> Result<u32> {
        self.state()
            .users
            .get(name)
            .copied()
            .ok_or_else(|| Error::UserNotFound(name.to_string()))
    }

    fn lookup_group(&self, name: &str) -> Result<u32> {
        self.state()
            .groups
            .get(name)
            .copied()
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))
    }

    fn chown(&self, path: &Path, owner: Ownership) -> Result<()> {
        let mut state = self.state();
        let file = state.files.get_mut(path).ok_or_else(|| not_found(path))?;
        file.owner = Some(owner);
        Ok(())
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let mut state = self.state();
        let argv: Vec<String> = std::iter::once(program)
            .chain(args.iter().copied())
            .map(ToString::to_string)
            .collect();

        if state.missing_programs.contains(program) {
            return Err(Error::ToolNotFound(program.to_string()));
        }

        state.invocations.push(argv.clone());

        if matches_prefix(&argv, &state.hanging) {
            return Err(Error::Timeout {
                program: program.to_string(),
                secs: 0,
            });
        }
        if matches_prefix(&argv, &state.failing) {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_mock_defaults() {
        let mock = MockBackend::new();
        assert_eq!(mock.hostname().unwrap(), "localhost");
        assert_eq!(mock.lookup_user("root").unwrap(), 0);
        assert_eq!(mock.lookup_group("root").unwrap(), 0);
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn test_mock_clones_share_state() {
        let mock = MockBackend::new();
        let handle = mock.clone();
        mock.set_hostname("node-1").unwrap();
        assert_eq!(handle.current_hostname(), "node-1");
    }

    #[test]
    fn test_mock_locked_hostname() {
        let mock = MockBackend::new().with_locked_hostname();
        let err = mock.set_hostname("node-1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Permission);
        assert_eq!(mock.current_hostname(), "localhost");
    }

    #[test]
    fn test_mock_write_keeps_owner() {
        let path = Path::new("/etc/motd");
        let mock = MockBackend::new();
        mock.write_file(path, b"one", FileMode::from_bits(0o644)).unwrap();
        mock.chown(path, Ownership { uid: 5, gid: 6 }).unwrap();
        mock.write_file(path, b"two", FileMode::from_bits(0o600)).unwrap();

        let file = mock.file(path).unwrap();
        assert_eq!(file.contents, b"two");
        assert_eq!(file.mode.bits(), 0o600);
        assert_eq!(file.owner, Some(Ownership { uid: 5, gid: 6 }));
    }

    #[test]
    fn test_mock_create_new_exclusive() {
        let path = Path::new("/var/cloud/i-1");
        let mock = MockBackend::new();
        assert!(mock.create_new(path, b"i-1", FileMode::from_bits(0o644)).unwrap());
        assert!(!mock.create_new(path, b"other", FileMode::from_bits(0o644)).unwrap());
        assert_eq!(mock.contents(path).unwrap(), b"i-1");
    }

    #[test]
    fn test_mock_remove_missing_file() {
        let mock = MockBackend::new();
        let err = mock.remove_file(Path::new("/nope")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_mock_chown_missing_file() {
        let mock = MockBackend::new();
        assert!(mock.chown(Path::new("/nope"), Ownership { uid: 0, gid: 0 }).is_err());
    }

    #[test]
    fn test_mock_dirs_record_ancestors() {
        let mock = MockBackend::new();
        mock.create_dir_all(Path::new("/var/cloud"), FileMode::from_bits(0o700))
            .unwrap();
        assert!(mock.has_dir(Path::new("/var")));
        assert!(mock.has_dir(Path::new("/var/cloud")));
        assert!(mock.exists(Path::new("/var/cloud")).unwrap());
    }

    #[test]
    fn test_mock_run_records_and_fails() {
        let mock = MockBackend::new()
            .without_program("useradd")
            .failing(&["adduser", "alice", "docker"])
            .hanging(&["sh", "-c", "sleep infinity"]);

        let err = mock.run("useradd", &["alice"]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ToolMissing);

        mock.run("adduser", &["-D", "alice"]).unwrap();
        let err = mock.run("adduser", &["alice", "docker"]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ToolFailed);

        let err = mock.run("sh", &["-c", "sleep infinity"]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);

        // Missing programs never start, so they are not recorded.
        assert_eq!(
            mock.invocations(),
            vec![
                vec!["adduser", "-D", "alice"],
                vec!["adduser", "alice", "docker"],
                vec!["sh", "-c", "sleep infinity"],
            ]
        );
    }
}
