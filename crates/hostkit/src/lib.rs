//! # hostkit
//!
//! Pure Rust library for mutating the state of the machine it runs on.
//!
//! This crate provides:
//! - A [`Backend`] trait covering the kernel hostname, files with mode and
//!   ownership, the account and group databases, and child processes
//! - [`SystemBackend`], the production implementation (nix + std)
//! - [`MockBackend`], an in-memory machine for tests
//! - A categorized [`Error`] type so callers can tell "this tool is missing
//!   or failed" apart from every other failure
//!
//! ## Example
//!
//! ```no_run
//! use hostkit::{Backend, FileMode, Ownership, SystemBackend};
//! use std::path::Path;
//!
//! let host = SystemBackend::new();
//! let path = Path::new("/etc/motd");
//!
//! host.write_file(path, b"welcome\n", FileMode::parse("0644")?)?;
//! let owner = Ownership {
//!     uid: host.lookup_user("root")?,
//!     gid: host.lookup_group("root")?,
//! };
//! host.chown(path, owner)?;
//! # Ok::<(), hostkit::Error>(())
//! ```
//!
//! ## Platform Support
//!
//! Unix only: hostnames, uids and permission bits have no Windows equivalent.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg(unix)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::system::{SystemBackend, current_identity};
pub use backend::{Backend, MockBackend, MockFile};
pub use error::{Error, ErrorCategory, Result};
pub use types::{FileMode, Ownership};
