//! Command execution on the controller or a remote agent.
//!
//! An [`Executor`] is the execution context a build step dispatches work to.
//! [`LocalExecutor`] spawns the command on this machine; [`SshExecutor`]
//! ships the same [`CommandSpec`] to an agent over `ssh`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ProbeError, Result};

/// A command to run: program, arguments and an optional timeout.
///
/// Plain data, so it can be serialized and shipped to another machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Command to execute (first element is executable).
    pub argv: Vec<String>,

    /// Timeout in seconds (0 = wait forever).
    #[serde(default)]
    pub timeout_secs: u64,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            timeout_secs: 0,
        }
    }

    /// Split a whitespace separated command line.
    pub fn parse(line: &str) -> Self {
        Self::new(line.split_whitespace())
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// The command as a single display string.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout split into lines.
    pub fn stdout_lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

/// An execution context able to run a command and capture its output.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Node name used in logs and build metadata.
    fn name(&self) -> &str;

    /// Run `command` to completion.
    ///
    /// Spawn failures surface as [`ProbeError::Io`] and timeouts as
    /// [`ProbeError::Interrupted`]. A non-zero exit is not an error here;
    /// callers decide what a failing command means.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands on the local machine.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub const NAME: &'static str = "controller";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        spawn_and_wait(&command.argv, command.timeout_secs, &command.display()).await
    }
}

/// Remote agent address: `[user@]host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAddress {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl AgentAddress {
    pub fn parse(s: &str) -> Result<Self> {
        let (user, rest) = match s.split_once('@') {
            Some((u, r)) if !u.is_empty() => (Some(u.to_string()), r),
            Some(_) => return Err(ProbeError::InvalidAgent(s.to_string())),
            None => (None, s),
        };
        let (host, port) = match rest.rsplit_once(':') {
            Some((h, p)) => {
                let port = p
                    .parse::<u16>()
                    .map_err(|_| ProbeError::InvalidAgent(s.to_string()))?;
                (h, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() {
            return Err(ProbeError::InvalidAgent(s.to_string()));
        }
        Ok(Self {
            user,
            host: host.to_string(),
            port,
        })
    }

    /// `user@host` or `host`, as passed to `ssh`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl std::fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.destination())?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Runs commands on a remote agent through the `ssh` client.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    name: String,
    address: AgentAddress,
    identity_file: Option<String>,
}

impl SshExecutor {
    pub fn new(address: AgentAddress) -> Self {
        Self {
            name: address.host.clone(),
            address,
            identity_file: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// Full `ssh` argv for running `command` on the agent.
    pub fn ssh_argv(&self, command: &CommandSpec) -> Vec<String> {
        let mut argv = vec![
            "ssh".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(port) = self.address.port {
            argv.push("-p".to_string());
            argv.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            argv.push("-i".to_string());
            argv.push(identity.clone());
        }
        argv.push(self.address.destination());
        argv.push("--".to_string());
        argv.extend(command.argv.iter().cloned());
        argv
    }
}

#[async_trait]
impl Executor for SshExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        if command.argv.is_empty() {
            return Err(ProbeError::EmptyCommand);
        }
        let argv = self.ssh_argv(command);
        let label = format!("{} (on {})", command.display(), self.address);
        spawn_and_wait(&argv, command.timeout_secs, &label).await
    }
}

async fn spawn_and_wait(argv: &[String], timeout_secs: u64, label: &str) -> Result<CommandOutput> {
    let start = Instant::now();

    let (exe, args) = argv.split_first().ok_or(ProbeError::EmptyCommand)?;

    debug!(command = %label, "spawning");
    let child = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProbeError::Io {
            command: label.to_string(),
            source,
        })?;

    let waited = if timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Interrupted {
                command: label.to_string(),
                timeout_secs,
            })?
    } else {
        child.wait_with_output().await
    };
    let output = waited.map_err(|source| ProbeError::Io {
        command: label.to_string(),
        source,
    })?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
