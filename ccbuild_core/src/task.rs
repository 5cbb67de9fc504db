#![deny(clippy::unwrap_used)]

use std::{io::Write, path::PathBuf, sync::Arc};

use tokio::sync::oneshot;

use crate::{
    artifact::{ObjectFile, SourceFile},
    error::ExecError,
    options::BuildOptions,
    process::{CommandLine, ProcessRunner},
    stale::is_stale,
    toolchain::Toolchain,
};

/// What a task does when it runs.
#[derive(Debug)]
pub enum TaskImpl {
    Compile {
        source: SourceFile,
        include_dirs: Vec<PathBuf>,
    },
    LinkLibrary {
        name: String,
        objects: Vec<ObjectFile>,
    },
    LinkBinary {
        name: String,
        objects: Vec<ObjectFile>,
        libraries: Vec<PathBuf>,
    },
    /// Barrier at a target's head.
    Noop,
}

/// Everything a task needs at execution time, threaded explicitly instead
/// of read from globals.
pub struct ExecContext {
    pub options: BuildOptions,
    pub out_dir: PathBuf,
    pub toolchain: Arc<dyn Toolchain>,
    pub runner: Arc<dyn ProcessRunner>,
}

/// What a supervisor learns from its task's parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Proceed,
    Cancelled,
}

/// A unit of work in the execution graph. Edges are single-use boolean
/// signals: the parent sends "succeeded?", the child consumes it. All tasks
/// and edges are wired before execution starts; nothing is added afterwards.
pub struct Task {
    pub name: String,
    work: TaskImpl,
    parents: Vec<oneshot::Receiver<bool>>,
    children: Vec<oneshot::Sender<bool>>,
}

/// Wires a parent → child edge.
pub(crate) fn connect(parent: &mut Task, child: &mut Task) {
    let (tx, rx) = oneshot::channel();
    parent.children.push(tx);
    child.parents.push(rx);
}

impl Task {
    pub(crate) fn new(name: String, work: TaskImpl) -> Self {
        Self {
            name,
            work,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn work(&self) -> &TaskImpl {
        &self.work
    }

    /// Consumes every parent edge, even after seeing a failure, so no edge
    /// is left dangling. A dropped sender counts as failure.
    pub(crate) async fn await_parents(&mut self) -> Readiness {
        log::debug!(
            "task {:?} waiting for {} parent(s)",
            self.name,
            self.parents.len()
        );
        let mut readiness = Readiness::Proceed;
        for parent in self.parents.drain(..) {
            match parent.await {
                Ok(true) => {}
                Ok(false) | Err(_) => readiness = Readiness::Cancelled,
            }
        }
        readiness
    }

    /// Reports the outcome on every child edge exactly once.
    pub(crate) fn notify_children(&mut self, succeeded: bool) {
        for child in self.children.drain(..) {
            // A dropped receiver means the child is already gone; nothing
            // to signal.
            let _ = child.send(succeeded);
        }
    }

    pub(crate) async fn run(&self, ctx: &ExecContext) -> Result<(), ExecError> {
        match &self.work {
            TaskImpl::Noop => Ok(()),
            TaskImpl::Compile {
                source,
                include_dirs,
            } => {
                let object = ctx.toolchain.object_file(source, &ctx.out_dir);
                if !is_stale(source, &object, &ctx.options).map_err(ExecError::Fatal)? {
                    log::debug!("{:?} up to date", self.name);
                    return Ok(());
                }
                let command =
                    ctx.toolchain
                        .compile_command(source, &object, include_dirs, &ctx.options);
                self.run_tool(ctx, command).await
            }
            TaskImpl::LinkLibrary { name, objects } => {
                let archive = ctx.toolchain.library_artifact(name, &ctx.out_dir);
                let command = ctx.toolchain.archive_command(&archive, objects);
                self.run_tool(ctx, command).await
            }
            TaskImpl::LinkBinary {
                name,
                objects,
                libraries,
            } => {
                let binary = ctx.toolchain.binary_artifact(name, &ctx.out_dir);
                let command = ctx
                    .toolchain
                    .link_command(&binary, objects, libraries, &ctx.options);
                self.run_tool(ctx, command).await
            }
        }
    }

    async fn run_tool(&self, ctx: &ExecContext, command: CommandLine) -> Result<(), ExecError> {
        if ctx.options.verbose {
            log::info!("$ {command}");
        }
        let result = ctx.runner.run(&command).await.map_err(ExecError::Fatal)?;
        if result.success() {
            return Ok(());
        }
        // The tool's own diagnostics go out verbatim; they are the error.
        let _ = std::io::stdout().write_all(&result.stdout);
        let _ = std::io::stderr().write_all(&result.stderr);
        Err(ExecError::Failure(format!(
            "{} exited with code {}",
            command.program, result.exit_code
        )))
    }
}
