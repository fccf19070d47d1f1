//! Scripted executor for tests.
//!
//! `ScriptedExecutor` answers every command with a canned response and
//! records what it was asked to run.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ProbeError, Result};
use crate::executor::{CommandOutput, CommandSpec, Executor};

#[derive(Debug, Clone)]
enum Response {
    Output { exit_code: i32, stdout: String, stderr: String },
    Missing,
    Interrupted,
}

/// Executor returning a fixed response and recording every call.
#[derive(Debug)]
pub struct ScriptedExecutor {
    name: String,
    response: Response,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    fn with_response(name: &str, response: Response) -> Self {
        Self {
            name: name.to_string(),
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Exit 0, printing `stdout`.
    pub fn printing(name: &str, stdout: &str) -> Self {
        Self::with_response(
            name,
            Response::Output {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Exit with `exit_code`, printing `stderr`.
    pub fn failing(name: &str, exit_code: i32, stderr: &str) -> Self {
        Self::with_response(
            name,
            Response::Output {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Exit 0, printing `stderr` and nothing on stdout.
    pub fn printing_stderr(name: &str, stderr: &str) -> Self {
        Self::with_response(
            name,
            Response::Output {
                exit_code: 0,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Behave as if the binary does not exist.
    pub fn missing(name: &str) -> Self {
        Self::with_response(name, Response::Missing)
    }

    /// Behave as if the command timed out.
    pub fn hanging(name: &str) -> Self {
        Self::with_response(name, Response::Interrupted)
    }

    /// Commands received so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        match &self.response {
            Response::Output {
                exit_code,
                stdout,
                stderr,
            } => Ok(CommandOutput {
                exit_code: *exit_code,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                duration_ms: 0,
            }),
            Response::Missing => Err(ProbeError::Io {
                command: command.display(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            }),
            Response::Interrupted => Err(ProbeError::Interrupted {
                command: command.display(),
                timeout_secs: command.timeout_secs,
            }),
        }
    }
}
