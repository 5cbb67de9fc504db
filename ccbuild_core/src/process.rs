#![deny(clippy::unwrap_used)]

use std::{ffi::OsString, fmt};

use async_trait::async_trait;

use crate::error::FatalError;

/// An opaque `(program, args)` pair ready to spawn. The engine never
/// inspects it beyond logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns external processes with captured output. Non-zero exit is a task
/// failure reported through [`RunResult`]; failing to spawn or wait at all
/// is fatal.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &CommandLine) -> Result<RunResult, FatalError>;
}

/// Runs commands on the host.
pub struct HostRunner;

#[async_trait]
impl ProcessRunner for HostRunner {
    async fn run(&self, command: &CommandLine) -> Result<RunResult, FatalError> {
        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|source| FatalError::Spawn {
                program: command.program.clone(),
                source,
            })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|source| FatalError::Wait {
                program: command.program.clone(),
                source,
            })?;
        Ok(RunResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
