//! Backend trait and implementations for host mutation.
//!
//! The [`Backend`] trait is the single capability through which callers touch
//! the machine: kernel hostname, files, the account database and child
//! processes. [`system::SystemBackend`] talks to the real OS; [`MockBackend`]
//! keeps everything in memory so provisioning logic can be tested without
//! root privileges.
//!
//! # Testing
//!
//! ```
//! use hostkit::backend::{Backend, MockBackend};
//! use hostkit::FileMode;
//! use std::path::Path;
//!
//! let mock = MockBackend::new().with_hostname("old-name");
//! mock.set_hostname("new-name").unwrap();
//! assert_eq!(mock.hostname().unwrap(), "new-name");
//!
//! mock.write_file(Path::new("/etc/motd"), b"hello", FileMode::from_bits(0o644)).unwrap();
//! assert_eq!(mock.contents(Path::new("/etc/motd")).unwrap(), b"hello");
//! ```

pub mod mock;
pub mod system;

pub use mock::{MockBackend, MockFile};

use std::path::Path;

use crate::error::Result;
use crate::types::{FileMode, Ownership};

/// Side-effecting access to the host OS.
///
/// Every method is synchronous and runs to completion before returning.
pub trait Backend: Send + Sync {
    /// Current kernel hostname.
    fn hostname(&self) -> Result<String>;

    /// Change the live kernel hostname.
    fn set_hostname(&self, name: &str) -> Result<()>;

    /// Whether something exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Permission bits of an existing file.
    fn file_mode(&self, path: &Path) -> Result<FileMode>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Create or replace a file with exactly `contents` and permission `mode`.
    ///
    /// Pre-existing content is truncated. The mode is applied explicitly after
    /// writing so it also holds for files that already existed.
    fn write_file(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<()>;

    /// Create `path` exclusively. Returns `Ok(false)` when it already exists.
    ///
    /// The existence check and the creation are a single atomic operation.
    fn create_new(&self, path: &Path, contents: &[u8], mode: FileMode) -> Result<bool>;

    /// Create a directory and its parents; newly created ones get `mode`.
    fn create_dir_all(&self, path: &Path, mode: FileMode) -> Result<()>;

    /// Resolve a user name to its numeric id.
    fn lookup_user(&self, name: &str) -> Result<u32>;

    /// Resolve a group name to its numeric id.
    fn lookup_group(&self, name: &str) -> Result<u32>;

    /// Change owner and group of `path`.
    fn chown(&self, path: &Path, owner: Ownership) -> Result<()>;

    /// Run a program to completion with inherited stdio.
    ///
    /// Non-zero exit is an error; output is not captured.
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;
}
