//! Well-known paths used by firstboot
//!
//! Every path here can be overridden from the command line or environment
//! (see `cli.rs`), which is how the tests point the provisioner at a sandbox.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Default configuration document
pub const DEFAULT_CONFIG_PATH: &str = "./var/config.yaml";

/// Directory holding one marker per provisioned instance id
pub const DEFAULT_MARKER_DIR: &str = "/var/cloud";

/// Persisted hostname record
pub const DEFAULT_HOSTNAME_FILE: &str = "/etc/hostname";

/// Parent of default home directories
pub const HOME_ROOT: &str = "/home";

/// Login shell used when a user does not declare one
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Check that an instance id can name a marker file directly inside the
/// marker directory.
pub fn check_instance_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("instance-id is empty");
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\0') {
        bail!("instance-id {id:?} is not a valid file name");
    }
    Ok(())
}

/// Marker file for `id` inside `marker_dir`
pub fn marker_path(marker_dir: &Path, id: &str) -> Result<PathBuf> {
    check_instance_id(id)?;
    Ok(marker_dir.join(id))
}

/// Default home directory for `user`
pub fn default_home(user: &str) -> PathBuf {
    Path::new(HOME_ROOT).join(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_path() {
        let path = marker_path(Path::new("/var/cloud"), "i-0abc123").unwrap();
        assert_eq!(path, PathBuf::from("/var/cloud/i-0abc123"));
    }

    #[test]
    fn test_marker_path_rejects_traversal() {
        let dir = Path::new("/var/cloud");
        assert!(marker_path(dir, "").is_err());
        assert!(marker_path(dir, ".").is_err());
        assert!(marker_path(dir, "..").is_err());
        assert!(marker_path(dir, "../etc/passwd").is_err());
        assert!(marker_path(dir, "a\0b").is_err());
    }

    #[test]
    fn test_default_home() {
        assert_eq!(default_home("alice"), PathBuf::from("/home/alice"));
    }
}
