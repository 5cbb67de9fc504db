//! Build engine for a small self-hosted C++ build driver.
//!
//! Declared libraries and binaries are translated into a DAG of compile and
//! link tasks ([`graph::Builder`]), executed in parallel on a worker pool
//! sized to the machine ([`schedule`]), with mtime-based incremental
//! rebuilds ([`stale`]). Host specifics live behind the [`Toolchain`],
//! [`ProcessRunner`] and [`SourceDiscovery`] seams.

pub mod artifact;
pub mod discover;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod options;
pub mod platform;
pub mod process;
pub mod registry;
pub mod schedule;
pub mod stale;
pub mod task;
pub mod toolchain;

pub use artifact::{ObjectFile, SourceFile};
pub use discover::SourceDiscovery;
pub use error::{BuildError, ConfigError, FatalError, TaskFailure};
pub use graph::Builder;
pub use manifest::Manifest;
pub use options::BuildOptions;
pub use platform::HostOs;
pub use process::{CommandLine, HostRunner, ProcessRunner, RunResult};
pub use schedule::BuildSummary;
pub use toolchain::{Toolchain, host_toolchain};
