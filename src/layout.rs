//! The destination tree.
//!
//! ```text
//! <dest>/
//!   individual/   density-normalised, portrait cards
//!   vertical/     4-up strips built from individual/
//!   horizontal/   2-up sheets built from vertical/
//!   pdfs/         one PDF per horizontal sheet
//! ```
//!
//! Each stage owns one subdirectory and only the next stage reads it.

use crate::error::CgcError;
use crate::pipeline::merge::Axis;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths of every stage directory under one destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestLayout {
    root: PathBuf,
    individual: PathBuf,
    vertical: PathBuf,
    horizontal: PathBuf,
    pdfs: PathBuf,
}

impl DestLayout {
    /// Compute the layout. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            individual: root.join("individual"),
            vertical: root.join(Axis::Vertical.dir_name()),
            horizontal: root.join(Axis::Horizontal.dir_name()),
            pdfs: root.join("pdfs"),
            root,
        }
    }

    /// Create every stage directory. Safe to call on an existing tree.
    pub fn ensure_layout(&self) -> Result<(), CgcError> {
        for dir in self.stage_dirs() {
            std::fs::create_dir_all(dir).map_err(|source| CgcError::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        debug!("Destination tree ready at {}", self.root.display());
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn individual(&self) -> &Path {
        &self.individual
    }

    pub fn vertical(&self) -> &Path {
        &self.vertical
    }

    pub fn horizontal(&self) -> &Path {
        &self.horizontal
    }

    pub fn pdfs(&self) -> &Path {
        &self.pdfs
    }

    /// Output directory of a merge pass along `axis`.
    pub fn axis_dir(&self, axis: Axis) -> &Path {
        match axis {
            Axis::Vertical => &self.vertical,
            Axis::Horizontal => &self.horizontal,
        }
    }

    fn stage_dirs(&self) -> [&Path; 4] {
        [
            &self.individual,
            &self.vertical,
            &self.horizontal,
            &self.pdfs,
        ]
    }
}
