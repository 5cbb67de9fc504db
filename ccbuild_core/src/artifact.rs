#![deny(clippy::unwrap_used)]

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::error::FatalError;

/// A declared source file. Declared sources must exist; a failing stat here
/// is an invariant violation, not a user error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn last_updated(&self) -> Result<SystemTime, FatalError> {
        let metadata = std::fs::metadata(&self.path).map_err(|source| FatalError::Stat {
            path: self.path.clone(),
            source,
        })?;
        metadata.modified().map_err(|source| FatalError::Stat {
            path: self.path.clone(),
            source,
        })
    }
}

/// A compiler output. A missing object has age "never", which forces a
/// rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectFile {
    pub path: PathBuf,
}

impl ObjectFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }
}

/// Derives the object file for a source: path separators become `-`, the
/// `.c`/`.cc` suffix becomes the platform object suffix, and the result
/// lands in the flat output directory. Distinct sources must derive distinct
/// object names; the graph builder rejects collisions.
pub fn object_for_source(source: &SourceFile, out_dir: &Path, suffix: &str) -> ObjectFile {
    let flat = source.path.to_string_lossy().replace(['/', '\\'], "-");
    let stem = flat
        .strip_suffix(".cc")
        .or_else(|| flat.strip_suffix(".c"))
        .unwrap_or(&flat);
    ObjectFile::new(out_dir.join(format!("{stem}{suffix}")))
}
