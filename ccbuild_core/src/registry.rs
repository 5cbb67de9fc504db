#![deny(clippy::unwrap_used)]

use std::{collections::HashMap, path::PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Library,
    Binary,
}

/// A declared target. Only libraries export include directories; a binary's
/// artifact is its executable.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub name: String,
    pub kind: TargetKind,
    pub artifact: PathBuf,
    pub exported_includes: Vec<PathBuf>,
}

/// Declared targets by name. Dependencies must be declared before their
/// dependents, which makes cycles structurally impossible.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: HashMap<String, TargetRecord>,
}

impl TargetRegistry {
    pub fn declare(&mut self, record: TargetRecord) -> Result<(), ConfigError> {
        if self.targets.contains_key(&record.name) {
            return Err(ConfigError::DuplicateTarget(record.name));
        }
        self.targets.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&TargetRecord> {
        self.targets.get(name)
    }

    /// Resolves a dependency list for `target`, requiring every entry to be
    /// an already-declared library.
    pub fn resolve_library_deps(
        &self,
        target: &str,
        deps: &[String],
    ) -> Result<Vec<&TargetRecord>, ConfigError> {
        let mut records = Vec::with_capacity(deps.len());
        for dep in deps {
            let record = self
                .resolve(dep)
                .ok_or_else(|| ConfigError::UnknownDependency {
                    target: target.to_string(),
                    dep: dep.clone(),
                })?;
            if record.kind != TargetKind::Library {
                return Err(ConfigError::WrongDependencyKind {
                    target: target.to_string(),
                    dep: dep.clone(),
                });
            }
            records.push(record);
        }
        Ok(records)
    }
}
