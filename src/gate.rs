//! Once-per-instance marker
//!
//! A marker file named after the instance id lives in the marker directory.
//! Its existence means the machine was already provisioned. Markers are
//! created with an exclusive create so two concurrent runs cannot both win,
//! and are never removed by firstboot.

use anyhow::{Context, Result};
use hostkit::{Backend, FileMode};
use std::path::{Path, PathBuf};

use crate::paths;

/// Marker directory is private to root
const MARKER_DIR_MODE: u32 = 0o700;
const MARKER_FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone)]
pub struct Gate {
    dir: PathBuf,
}

impl Gate {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn marker_path(&self, instance_id: &str) -> Result<PathBuf> {
        paths::marker_path(&self.dir, instance_id)
    }

    /// Claim `instance_id`.
    ///
    /// Returns `true` if this call created the marker, `false` if it already
    /// existed. Any filesystem failure is an error.
    pub fn acquire(&self, host: &dyn Backend, instance_id: &str) -> Result<bool> {
        let marker = self.marker_path(instance_id)?;

        host.create_dir_all(&self.dir, FileMode::from_bits(MARKER_DIR_MODE))
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        host.create_new(
            &marker,
            instance_id.as_bytes(),
            FileMode::from_bits(MARKER_FILE_MODE),
        )
        .with_context(|| format!("Failed to create marker {}", marker.display()))
    }

    /// Check for the marker without creating anything
    pub fn is_marked(&self, host: &dyn Backend, instance_id: &str) -> Result<bool> {
        let marker = self.marker_path(instance_id)?;
        host.exists(&marker)
            .with_context(|| format!("Failed to check marker {}", marker.display()))
    }
}
