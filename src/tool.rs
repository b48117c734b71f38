// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! External tool invocation
//!
//! The image builder, the flasher and the enumerator are separate programs.
//! The harness only runs them, captures what they print and interprets their
//! exit status. [`ToolInvoker`] is the seam that lets tests swap the real
//! processes for stubs.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::exit_code;
use crate::settings::ToolSpec;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand {
            program: program.to_owned(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Starts a command from a configured tool, keeping its leading arguments.
    pub fn from_spec(spec: &ToolSpec) -> Self {
        ToolCommand::new(&spec.program).args(&spec.args)
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Value following `flag` in the argument list, if any.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Text captured from a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr, as an operator would have seen it.
    pub fn combined(&self) -> String {
        combine(&self.stdout, &self.stderr)
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_owned(),
        (true, false) => stderr.to_owned(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessExecutionError {
    #[error("'{command}' exited with status {code}")]
    Failed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("'{command}' was terminated before it exited")]
    Terminated { command: String, output: String },

    #[error("failed to execute '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' succeeded but did not produce '{}'", .path.display())]
    MissingOutput { command: String, path: PathBuf },
}

impl ProcessExecutionError {
    /// The tool's own exit code when there is one, a sentinel otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessExecutionError::Failed { code, .. } => *code,
            ProcessExecutionError::Spawn { .. } => exit_code::SPAWN_FAILURE,
            ProcessExecutionError::Terminated { .. }
            | ProcessExecutionError::MissingOutput { .. } => exit_code::TOOL_FAILURE,
        }
    }

    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ProcessExecutionError::Failed { output, .. }
            | ProcessExecutionError::Terminated { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs external commands to completion.
///
/// Calls block the trial until the tool exits; there is no timeout.
#[async_trait]
pub trait ToolInvoker {
    async fn invoke(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessExecutionError>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {}

impl ProcessInvoker {
    pub fn new() -> Self {
        ProcessInvoker {}
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessExecutionError> {
        debug!(%command, "executing");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|source| ProcessExecutionError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return Ok(ToolOutput { stdout, stderr });
        }

        let captured = combine(&stdout, &stderr);
        Err(match output.status.code() {
            Some(code) => ProcessExecutionError::Failed {
                command: command.to_string(),
                code,
                output: captured,
            },
            None => ProcessExecutionError::Terminated {
                command: command.to_string(),
                output: captured,
            },
        })
    }
}
