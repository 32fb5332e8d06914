//! Error types for host mutation operations.
//!
//! Errors are categorized so callers can decide deliberately which failures
//! justify switching to an alternative tool (for example `useradd` missing on
//! a BusyBox-based distribution) and which must abort immediately.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of host errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The executable does not exist on this machine.
    ToolMissing,
    /// The executable ran but exited unsuccessfully.
    ToolFailed,
    /// A user, group or path could not be found.
    NotFound,
    /// Permission denied.
    Permission,
    /// Caller supplied malformed input (mode string, name with NUL, ...).
    InvalidInput,
    /// A process exceeded its time limit and was killed.
    Timeout,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether an alternative tool should be tried after this failure.
    ///
    /// Only a missing or failing executable qualifies; timeouts, permission
    /// problems and I/O errors are never papered over by a fallback.
    #[must_use]
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Self::ToolMissing | Self::ToolFailed)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ToolMissing => "Executable not found",
            Self::ToolFailed => "Command failed",
            Self::NotFound => "Not found",
            Self::Permission => "Permission denied",
            Self::InvalidInput => "Invalid input",
            Self::Timeout => "Timed out",
            Self::Other => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while mutating the host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error on a specific path.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Permission string is not an octal file mode.
    #[error("can't read permissions {value:?}: {reason}")]
    InvalidMode {
        /// The offending permission string.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No such user in the account database.
    #[error("can't find user {0}")]
    UserNotFound(String),

    /// No such group in the group database.
    #[error("can't find group {0}")]
    GroupNotFound(String),

    /// The account or group database lookup itself failed.
    #[error("lookup of {name} failed: {source}")]
    Lookup {
        /// Name being resolved.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Name cannot be passed to the OS (interior NUL byte).
    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// Executable not found in PATH.
    #[error("{0}: executable not found")]
    ToolNotFound(String),

    /// Process could not be spawned or waited on.
    #[error("can't run {program}: {source}")]
    Spawn {
        /// Program being executed.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Process exited unsuccessfully.
    #[error("{program} failed: {status}")]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit status description (exit code or signal).
        status: String,
    },

    /// Process exceeded its time limit.
    #[error("{program} timed out after {secs}s")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Configured limit in seconds.
        secs: u64,
    },

    /// Reading or changing the kernel hostname failed.
    #[error("can't {action} hostname: {source}")]
    Hostname {
        /// "get" or "set".
        action: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Io { source, .. } | Error::Hostname { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => ErrorCategory::Permission,
                io::ErrorKind::NotFound => ErrorCategory::NotFound,
                _ => ErrorCategory::Other,
            },
            Error::InvalidMode { .. } | Error::InvalidName(_) => ErrorCategory::InvalidInput,
            Error::UserNotFound(_) | Error::GroupNotFound(_) => ErrorCategory::NotFound,
            Error::Lookup { .. } => ErrorCategory::Other,
            Error::ToolNotFound(_) => ErrorCategory::ToolMissing,
            Error::Spawn { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    ErrorCategory::Permission
                } else {
                    ErrorCategory::Other
                }
            }
            Error::CommandFailed { .. } => ErrorCategory::ToolFailed,
            Error::Timeout { .. } => ErrorCategory::Timeout,
        }
    }

    /// Whether an alternative tool should be tried after this failure.
    #[must_use]
    pub fn triggers_fallback(&self) -> bool {
        self.category().triggers_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_categories() {
        assert!(ErrorCategory::ToolMissing.triggers_fallback());
        assert!(ErrorCategory::ToolFailed.triggers_fallback());
        assert!(!ErrorCategory::Timeout.triggers_fallback());
        assert!(!ErrorCategory::Permission.triggers_fallback());
        assert!(!ErrorCategory::NotFound.triggers_fallback());
        assert!(!ErrorCategory::InvalidInput.triggers_fallback());
        assert!(!ErrorCategory::Other.triggers_fallback());
    }

    #[test]
    fn test_tool_not_found_category() {
        let err = Error::ToolNotFound("useradd".to_string());
        assert_eq!(err.category(), ErrorCategory::ToolMissing);
        assert!(err.triggers_fallback());
    }

    #[test]
    fn test_command_failed_category() {
        let err = Error::CommandFailed {
            program: "useradd".to_string(),
            status: "exit status: 9".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ToolFailed);
        assert!(err.to_string().contains("useradd"));
    }

    #[test]
    fn test_timeout_does_not_fall_back() {
        let err = Error::Timeout {
            program: "useradd".to_string(),
            secs: 30,
        };
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(!err.triggers_fallback());
    }

    #[test]
    fn test_spawn_permission_denied() {
        let err = Error::Spawn {
            program: "useradd".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.category(), ErrorCategory::Permission);
        assert!(!err.triggers_fallback());
    }

    #[test]
    fn test_io_categories() {
        let err = Error::io("/etc/hostname", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = Error::io("/etc/hostname", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_invalid_mode_names_value() {
        let err = Error::InvalidMode {
            value: "xyz".to_string(),
            reason: "not an octal number".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
        assert!(err.to_string().contains("xyz"));
    }

    #[test]
    fn test_group_not_found_names_group() {
        let err = Error::GroupNotFound("wheel".to_string());
        assert_eq!(err.to_string(), "can't find group wheel");
    }
}
