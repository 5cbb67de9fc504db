#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-time failures. No task has run when one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target {0:?} is declared twice")]
    DuplicateTarget(String),
    #[error("target {target:?}: unknown dependency {dep:?}")]
    UnknownDependency { target: String, dep: String },
    #[error("target {target:?}: dependency {dep:?} is not a library")]
    WrongDependencyKind { target: String, dep: String },
    #[error("target {target:?}: source {} does not exist", .source_path.display())]
    MissingSource {
        target: String,
        source_path: PathBuf,
    },
    #[error(
        "sources {} and {} both map to object file {}",
        .first.display(),
        .second.display(),
        .object.display()
    )]
    ObjectCollision {
        first: PathBuf,
        second: PathBuf,
        object: PathBuf,
    },
    #[error("failed to walk source directory {}: {source}", .dir.display())]
    SourceWalk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read binary directory {}: {source}", .dir.display())]
    BinaryDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read manifest {}: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Broken I/O invariants. These abort the whole build immediately, unlike
/// task failures which only cancel the downstream cone.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for {program:?}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pkg-config failed: {detail}")]
    PkgConfig { detail: String },
}

/// A subprocess exited non-zero. Recorded by the driver; descendants are
/// cancelled but independent subgraphs keep building.
#[derive(Debug, Clone, Error)]
#[error("{task}: {detail}")]
pub struct TaskFailure {
    pub task: String,
    pub detail: String,
}

/// Result of a single task execution.
#[derive(Debug)]
pub enum ExecError {
    /// User code failed to compile or link. The build continues elsewhere.
    Failure(String),
    /// An I/O invariant broke. The build aborts.
    Fatal(FatalError),
}

/// Aggregate build outcome.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build failed with {} task failure(s)", .failures.len())]
    Failed { failures: Vec<TaskFailure> },
    #[error(transparent)]
    Fatal(#[from] FatalError),
}
