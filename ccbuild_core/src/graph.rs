#![deny(clippy::unwrap_used)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};

use crate::{
    artifact::SourceFile,
    error::{BuildError, ConfigError, FatalError},
    options::BuildOptions,
    process::ProcessRunner,
    registry::{TargetKind, TargetRecord, TargetRegistry},
    schedule::{self, BuildSummary},
    task::{self, ExecContext, Task, TaskImpl},
    toolchain::Toolchain,
};

/// Translates declared targets into the task graph and hands it to the
/// scheduler.
///
/// Per target the builder creates one head barrier, one compile task per
/// source, and one tail (archive or link). The head waits on the tails of
/// the target's dependencies; every compile waits on the head; the tail
/// waits on every compile. Declaring a target only against already-declared
/// targets keeps the graph acyclic by construction.
pub struct Builder {
    options: BuildOptions,
    out_dir: PathBuf,
    toolchain: Arc<dyn Toolchain>,
    runner: Arc<dyn ProcessRunner>,
    registry: TargetRegistry,
    tasks: Vec<Task>,
    tails: HashMap<String, usize>,
    objects_seen: HashMap<PathBuf, PathBuf>,
}

impl Builder {
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        runner: Arc<dyn ProcessRunner>,
        options: BuildOptions,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            options,
            out_dir: out_dir.into(),
            toolchain,
            runner,
            registry: TargetRegistry::default(),
            tasks: Vec::new(),
            tails: HashMap::new(),
            objects_seen: HashMap::new(),
        }
    }

    /// Declares a library: an archive built from `sources`, exporting
    /// `include_dirs` to dependents.
    pub fn library(
        &mut self,
        name: &str,
        include_dirs: Vec<PathBuf>,
        sources: Vec<SourceFile>,
        deps: &[String],
    ) -> Result<&mut Self, ConfigError> {
        let dep_records = self.check_target(name, &sources, deps)?;
        let objects = self.objects_for(&sources)?;

        let artifact = self.toolchain.library_artifact(name, &self.out_dir);
        self.registry.declare(TargetRecord {
            name: name.to_string(),
            kind: TargetKind::Library,
            artifact,
            exported_includes: include_dirs.clone(),
        })?;

        let mut effective_includes = include_dirs;
        effective_includes.extend(
            dep_records
                .iter()
                .flat_map(|record| record.exported_includes.iter().cloned()),
        );

        let tail = Task::new(
            format!("[lib] ==> {name}:link"),
            TaskImpl::LinkLibrary {
                name: name.to_string(),
                objects,
            },
        );
        self.wire_target(name, "lib", sources, effective_includes, deps, tail);
        Ok(self)
    }

    /// Declares a binary: an executable built from `sources` and linked
    /// against the artifacts of `deps` in declaration order.
    pub fn binary(
        &mut self,
        name: &str,
        sources: Vec<SourceFile>,
        local_include_dir: Option<PathBuf>,
        deps: &[String],
    ) -> Result<&mut Self, ConfigError> {
        let dep_records = self.check_target(name, &sources, deps)?;
        let objects = self.objects_for(&sources)?;
        let mut effective_includes: Vec<PathBuf> = dep_records
            .iter()
            .flat_map(|record| record.exported_includes.iter().cloned())
            .collect();
        let libraries: Vec<PathBuf> = dep_records
            .iter()
            .map(|record| record.artifact.clone())
            .collect();

        let artifact = self.toolchain.binary_artifact(name, &self.out_dir);
        self.registry.declare(TargetRecord {
            name: name.to_string(),
            kind: TargetKind::Binary,
            artifact,
            exported_includes: Vec::new(),
        })?;

        if let Some(dir) = local_include_dir {
            effective_includes.push(dir);
        }

        let tail = Task::new(
            format!("[bin] ==> {name}:link"),
            TaskImpl::LinkBinary {
                name: name.to_string(),
                objects,
                libraries,
            },
        );
        self.wire_target(name, "bin", sources, effective_includes, deps, tail);
        Ok(self)
    }

    /// Runs the graph. Creates the output directory, then schedules every
    /// task across the worker pool.
    pub async fn build(self) -> Result<BuildSummary, BuildError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| FatalError::OutputDir {
            path: self.out_dir.clone(),
            source,
        })?;
        let workers = self.options.worker_count();
        let ctx = Arc::new(ExecContext {
            options: self.options,
            out_dir: self.out_dir,
            toolchain: self.toolchain,
            runner: self.runner,
        });
        schedule::execute(self.tasks, ctx, workers).await
    }

    /// Shared validation, run before any state is touched: the name is
    /// free, dependencies resolve to already-declared libraries, declared
    /// sources exist. Returns the dependency records in declaration order.
    fn check_target(
        &self,
        name: &str,
        sources: &[SourceFile],
        deps: &[String],
    ) -> Result<Vec<TargetRecord>, ConfigError> {
        if self.registry.resolve(name).is_some() {
            return Err(ConfigError::DuplicateTarget(name.to_string()));
        }
        let dep_records = self
            .registry
            .resolve_library_deps(name, deps)?
            .into_iter()
            .cloned()
            .collect();
        for source in sources {
            if !source.path.is_file() {
                return Err(ConfigError::MissingSource {
                    target: name.to_string(),
                    source_path: source.path.clone(),
                });
            }
        }
        Ok(dep_records)
    }

    fn objects_for(
        &mut self,
        sources: &[SourceFile],
    ) -> Result<Vec<crate::artifact::ObjectFile>, ConfigError> {
        let mut objects = Vec::with_capacity(sources.len());
        for source in sources {
            let object = self.toolchain.object_file(source, &self.out_dir);
            if let Some(previous) = self
                .objects_seen
                .insert(object.path.clone(), source.path.clone())
            {
                return Err(ConfigError::ObjectCollision {
                    first: previous,
                    second: source.path.clone(),
                    object: object.path,
                });
            }
            objects.push(object);
        }
        Ok(objects)
    }

    /// Creates the head, compiles and tail for one target and wires all
    /// edges: dependency tails → head → compiles → tail.
    fn wire_target(
        &mut self,
        name: &str,
        kind: &str,
        sources: Vec<SourceFile>,
        effective_includes: Vec<PathBuf>,
        deps: &[String],
        mut tail: Task,
    ) {
        let mut head = Task::new(format!("[{kind}] {name}:head"), TaskImpl::Noop);
        for dep in deps {
            // Validation already resolved every dependency, and a declared
            // target always has a tail.
            let tail_index = *self
                .tails
                .get(dep)
                .expect("declared dependency should have a tail task");
            task::connect(&mut self.tasks[tail_index], &mut head);
        }

        let mut compiles = Vec::with_capacity(sources.len());
        for source in sources {
            let mut compile = Task::new(
                format!("[{kind}] {name}:{}", source.path.display()),
                TaskImpl::Compile {
                    source,
                    include_dirs: effective_includes.clone(),
                },
            );
            task::connect(&mut head, &mut compile);
            task::connect(&mut compile, &mut tail);
            compiles.push(compile);
        }
        if compiles.is_empty() {
            // Keep the tail ordered behind the dependencies even with no
            // sources to compile.
            task::connect(&mut head, &mut tail);
        }

        self.tasks.push(head);
        self.tasks.append(&mut compiles);
        self.tasks.push(tail);
        self.tails.insert(name.to_string(), self.tasks.len() - 1);
    }

    #[cfg(test)]
    pub(crate) fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::platform::HostOs;
    use crate::process::HostRunner;
    use crate::task::TaskImpl;
    use crate::toolchain::UnixToolchain;

    fn write_source(root: &Path, rel: &str) -> SourceFile {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, "").expect("write");
        SourceFile::new(path)
    }

    fn builder(root: &Path) -> Builder {
        Builder::new(
            Arc::new(UnixToolchain::new(HostOs::Linux, "c++")),
            Arc::new(HostRunner),
            BuildOptions::default(),
            root.join("build"),
        )
    }

    #[test]
    fn library_creates_head_compiles_and_tail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = write_source(dir.path(), "lib/a.cc");
        let mut b = builder(dir.path());
        b.library("lib", vec![dir.path().join("lib")], vec![source], &[])
            .expect("declare");

        let names: Vec<_> = b.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "[lib] lib:head");
        assert!(names[1].starts_with("[lib] lib:"));
        assert_eq!(names[2], "[lib] ==> lib:link");
    }

    #[test]
    fn unknown_dependency_fails_before_any_task_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = write_source(dir.path(), "bin/p.cc");
        let mut b = builder(dir.path());
        let err = b.binary("p", vec![source], None, &["q".to_string()]);
        assert!(matches!(err, Err(ConfigError::UnknownDependency { .. })));
        assert!(b.tasks().is_empty());
    }

    #[test]
    fn binary_cannot_depend_on_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = write_source(dir.path(), "bin/tool.cc");
        let app = write_source(dir.path(), "bin/app.cc");
        let mut b = builder(dir.path());
        b.binary("tool", vec![tool], None, &[]).expect("declare");
        let err = b.binary("app", vec![app], None, &["tool".to_string()]);
        assert!(matches!(err, Err(ConfigError::WrongDependencyKind { .. })));
    }

    #[test]
    fn missing_source_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut b = builder(dir.path());
        let err = b.library(
            "lib",
            vec![],
            vec![SourceFile::new(dir.path().join("lib/gone.cc"))],
            &[],
        );
        assert!(matches!(err, Err(ConfigError::MissingSource { .. })));
    }

    #[test]
    fn object_collision_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write_source(dir.path(), "lib/a/b.cc");
        let second = write_source(dir.path(), "lib/a-b.cc");
        let mut b = builder(dir.path());
        let err = b.library("lib", vec![], vec![first, second], &[]);
        assert!(matches!(err, Err(ConfigError::ObjectCollision { .. })));
    }

    fn compile_includes(task: &Task) -> Vec<String> {
        match task.work() {
            TaskImpl::Compile { include_dirs, .. } => include_dirs
                .iter()
                .map(|d| d.to_string_lossy().into_owned())
                .collect(),
            other => panic!("expected a compile task, got {other:?}"),
        }
    }

    #[test]
    fn includes_propagate_one_level_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_source(dir.path(), "a/a.cc");
        let b_src = write_source(dir.path(), "b/b.cc");
        let c = write_source(dir.path(), "bin/c.cc");
        let mut b = builder(dir.path());
        b.library("a", vec!["a".into()], vec![a], &[]).expect("a");
        b.library("b", vec!["b".into()], vec![b_src], &["a".to_string()])
            .expect("b");
        b.binary("c", vec![c], Some("bin".into()), &["b".to_string()])
            .expect("c");

        // b compiles with its own dir plus a's export.
        let b_compile = b
            .tasks()
            .iter()
            .find(|t| t.name.contains("b/b.cc"))
            .expect("b compile");
        assert_eq!(compile_includes(b_compile), ["b", "a"]);

        // c sees only b's export; a's is not re-exported. The local include
        // dir comes last.
        let c_compile = b
            .tasks()
            .iter()
            .find(|t| t.name.contains("bin/c.cc"))
            .expect("c compile");
        assert_eq!(compile_includes(c_compile), ["b", "bin"]);
    }

    #[test]
    fn binary_links_dep_artifacts_in_declaration_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_source(dir.path(), "a/a.cc");
        let b_src = write_source(dir.path(), "b/b.cc");
        let c = write_source(dir.path(), "bin/c.cc");
        let mut b = builder(dir.path());
        b.library("a", vec![], vec![a], &[]).expect("a");
        b.library("b", vec![], vec![b_src], &[]).expect("b");
        b.binary("c", vec![c], None, &["b".to_string(), "a".to_string()])
            .expect("c");

        let tail = b.tasks().last().expect("tail");
        match tail.work() {
            TaskImpl::LinkBinary { libraries, .. } => {
                let names: Vec<_> = libraries
                    .iter()
                    .map(|l| {
                        l.file_name()
                            .expect("file name")
                            .to_string_lossy()
                            .into_owned()
                    })
                    .collect();
                assert_eq!(names, ["libb.a", "liba.a"]);
            }
            other => panic!("expected a link task, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_target_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_source(dir.path(), "a/a.cc");
        let a2 = write_source(dir.path(), "a/a2.cc");
        let mut b = builder(dir.path());
        b.library("a", vec![], vec![a], &[]).expect("first");
        let err = b.library("a", vec![], vec![a2], &[]);
        assert!(matches!(err, Err(ConfigError::DuplicateTarget(_))));
    }

    #[test]
    fn failed_declaration_leaves_no_registry_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write_source(dir.path(), "bad/a/b.cc");
        let second = write_source(dir.path(), "bad/a-b.cc");
        let ok = write_source(dir.path(), "dep/dep.cc");
        let mut b = builder(dir.path());

        let err = b.library("bad", vec![], vec![first, second], &[]);
        assert!(matches!(err, Err(ConfigError::ObjectCollision { .. })));
        assert!(b.tasks().is_empty());

        // The failed target never registered, so depending on it is an
        // unknown-dependency error rather than a silently missing edge.
        let err = b.library("dep", vec![], vec![ok], &["bad".to_string()]);
        assert!(matches!(err, Err(ConfigError::UnknownDependency { .. })));
    }

    #[test]
    fn source_free_binary_still_orders_tail_behind_head() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_source(dir.path(), "a/a.cc");
        let mut b = builder(dir.path());
        b.library("a", vec![], vec![a], &[]).expect("a");
        b.binary("empty", vec![], None, &["a".to_string()])
            .expect("empty");

        let names: Vec<_> = b.tasks().iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"[bin] empty:head"));
        assert!(names.contains(&"[bin] ==> empty:link"));
    }
}
