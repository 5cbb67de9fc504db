#![deny(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    artifact::SourceFile, discover::SourceDiscovery, error::ConfigError, graph::Builder,
};

/// The declarative build description, read from `ccbuild.toml`.
///
/// Libraries are declared in file order; a library may only depend on
/// libraries declared above it. The optional `[binaries]` section names a
/// directory whose entries are expanded into binary targets.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    output_dir: Option<PathBuf>,
    #[serde(default)]
    pkg_config: Vec<String>,
    /// Static `.lib` arguments for the Windows link line, where pkg-config
    /// is unavailable.
    #[serde(default)]
    windows_libs: Vec<String>,
    #[serde(default, rename = "library")]
    libraries: Vec<LibraryDecl>,
    binaries: Option<BinariesDecl>,
}

#[derive(Debug, Deserialize)]
struct LibraryDecl {
    name: String,
    dirs: Vec<PathBuf>,
    #[serde(default)]
    includes: Vec<PathBuf>,
    #[serde(default)]
    deps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BinariesDecl {
    dir: PathBuf,
    #[serde(default)]
    deps: Vec<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("build"))
    }

    pub fn pkg_config(&self) -> &[String] {
        &self.pkg_config
    }

    pub fn windows_libs(&self) -> &[String] {
        &self.windows_libs
    }

    /// Declares every target on the builder, discovering sources through
    /// `discovery`.
    pub fn declare_targets(
        &self,
        builder: &mut Builder,
        discovery: &SourceDiscovery,
    ) -> Result<(), ConfigError> {
        for library in &self.libraries {
            let mut sources: Vec<SourceFile> = Vec::new();
            for dir in &library.dirs {
                sources.extend(discovery.files_for(dir)?);
            }
            builder.library(
                &library.name,
                library.includes.clone(),
                sources,
                &library.deps,
            )?;
        }
        if let Some(binaries) = &self.binaries {
            for spec in discovery.binaries_in(&binaries.dir)? {
                builder.binary(
                    &spec.name,
                    spec.sources,
                    spec.local_include_dir,
                    &binaries.deps,
                )?;
            }
        }
        Ok(())
    }
}
