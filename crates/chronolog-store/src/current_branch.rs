//! The current-branch marker: a repository-local file naming which branch
//! new revisions are credited to (spec.md §3, §6). Deliberately a plain
//! file rather than a database row, matching the external filesystem
//! layout the spec documents.

use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::MAIN_BRANCH;
use crate::{Result, StoreError};

pub struct CurrentBranchMarker {
    path: PathBuf,
}

impl CurrentBranchMarker {
    pub fn new(metadata_dir: impl AsRef<Path>) -> Self {
        Self {
            path: metadata_dir.as_ref().join("current_branch"),
        }
    }

    /// Initialize the marker to `main` if it does not already exist.
    pub fn init(&self) -> Result<()> {
        if !self.path.exists() {
            self.set(MAIN_BRANCH)?;
        }
        Ok(())
    }

    pub fn get(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MAIN_BRANCH.to_string()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub fn set(&self, branch: &str) -> Result<()> {
        fs::write(&self.path, format!("{branch}\n"))?;
        Ok(())
    }
}
