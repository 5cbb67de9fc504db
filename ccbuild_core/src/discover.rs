#![deny(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::{artifact::SourceFile, error::ConfigError, platform::HostOs};

/// Enumerates source trees, applying the platform suffix conventions. The
/// engine trusts the returned lists.
pub struct SourceDiscovery {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

/// A binary target discovered under the binaries directory.
#[derive(Debug)]
pub struct BinarySpec {
    pub name: String,
    pub sources: Vec<SourceFile>,
    pub local_include_dir: Option<PathBuf>,
}

impl SourceDiscovery {
    pub fn host() -> Self {
        Self::for_os(HostOs::current())
    }

    pub fn for_os(os: HostOs) -> Self {
        let (includes, excludes) = os.source_patterns();
        Self { includes, excludes }
    }

    fn matches(&self, file_name: &str) -> bool {
        if self.excludes.iter().any(|p| p.is_match(file_name)) {
            return false;
        }
        self.includes.iter().any(|p| p.is_match(file_name))
    }

    /// All matching sources under `dir`, recursively, in a stable order.
    pub fn files_for(&self, dir: &Path) -> Result<Vec<SourceFile>, ConfigError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| ConfigError::SourceWalk {
                dir: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if self.matches(&entry.file_name().to_string_lossy()) {
                files.push(SourceFile::new(entry.into_path()));
            }
        }
        Ok(files)
    }

    /// Expands the binaries directory: every subdirectory becomes a binary
    /// named after it (with the subdirectory as local include dir), every
    /// loose matching source becomes a single-file binary named after its
    /// stem.
    pub fn binaries_in(&self, dir: &Path) -> Result<Vec<BinarySpec>, ConfigError> {
        let read_dir = |dir: &Path| {
            std::fs::read_dir(dir).map_err(|source| ConfigError::BinaryDir {
                dir: dir.to_path_buf(),
                source,
            })
        };
        let mut entries = Vec::new();
        for entry in read_dir(dir)? {
            let entry = entry.map_err(|source| ConfigError::BinaryDir {
                dir: dir.to_path_buf(),
                source,
            })?;
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.file_name());

        let mut specs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if path.is_dir() {
                specs.push(BinarySpec {
                    name: file_name.into_owned(),
                    sources: self.files_for(&path)?,
                    local_include_dir: Some(path),
                });
            } else if self.matches(&file_name) {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.into_owned());
                specs.push(BinarySpec {
                    name,
                    sources: vec![SourceFile::new(path)],
                    local_include_dir: None,
                });
            }
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn write(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, "").expect("write");
    }

    #[test]
    fn files_for_filters_by_platform_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(&root.join("a.cc"));
        write(&root.join("b.c"));
        write(&root.join("net.linux.cc"));
        write(&root.join("net.windows.cc"));
        write(&root.join("net.macos.cc"));
        write(&root.join("readme.md"));
        write(&root.join("sub/deep.cc"));

        let discovery = SourceDiscovery::for_os(HostOs::Linux);
        let files = discovery.files_for(root).expect("walk");
        let names: Vec<_> = files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, ["a.cc", "b.c", "net.linux.cc", "sub/deep.cc"]);
    }

    #[test]
    fn missing_dir_is_a_config_error() {
        let discovery = SourceDiscovery::for_os(HostOs::Linux);
        let err = discovery.files_for(Path::new("does/not/exist"));
        assert!(matches!(err, Err(ConfigError::SourceWalk { .. })));
    }

    #[test]
    fn binaries_in_expands_dirs_and_loose_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(&root.join("viewer/main.cc"));
        write(&root.join("viewer/scene.cc"));
        write(&root.join("convert.cc"));
        write(&root.join("convert.windows.cc"));
        write(&root.join("notes.txt"));

        let discovery = SourceDiscovery::for_os(HostOs::Linux);
        let specs = discovery.binaries_in(root).expect("read dir");

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "convert");
        assert_eq!(specs[0].sources.len(), 1);
        assert!(specs[0].local_include_dir.is_none());
        assert_eq!(specs[1].name, "viewer");
        assert_eq!(specs[1].sources.len(), 2);
        assert_eq!(
            specs[1].local_include_dir.as_deref(),
            Some(root.join("viewer").as_path())
        );
    }
}
