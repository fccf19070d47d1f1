//! Job configuration.
//!
//! Loaded from a TOML file (default `buildprobe.toml`), then overridden by
//! `BUILDPROBE_*` environment variables. Every field is optional.
//!
//! ```toml
//! run_on_agents = true        # alias: runOnSlaves
//! steps = 2
//!
//! [agent]
//! address = "ci@build-07:22"
//! identity_file = "~/.ssh/ci"
//!
//! [probe]
//! command = "java -version"
//! timeout_secs = 30
//!
//! [health]
//! rule = "no_even_scores"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use buildprobe_state::DEFAULT_DB_PATH;

use crate::build::Node;
use crate::error::{ProbeError, Result};
use crate::executor::{AgentAddress, CommandSpec, SshExecutor};
use crate::health::HealthRuleKind;
use crate::probe::{JavaVersionProbe, DEFAULT_PROBE_COMMAND};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "buildprobe.toml";

/// Remote agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// `[user@]host[:port]`
    pub address: String,

    /// Node name; defaults to the host.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub identity_file: Option<String>,
}

impl AgentConfig {
    pub fn to_node(&self) -> Result<Node> {
        let mut executor = SshExecutor::new(AgentAddress::parse(&self.address)?);
        if let Some(name) = &self.name {
            executor = executor.with_name(name.clone());
        }
        if let Some(identity) = &self.identity_file {
            executor = executor.with_identity_file(identity.clone());
        }
        Ok(Node::new(Arc::new(executor)))
    }
}

/// Probe command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    pub command: String,

    /// 0 = no timeout.
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_PROBE_COMMAND.to_string(),
            timeout_secs: 0,
        }
    }
}

impl ProbeSettings {
    pub fn to_probe(&self) -> Result<JavaVersionProbe> {
        let command = CommandSpec::parse(&self.command).with_timeout(self.timeout_secs);
        if command.argv.is_empty() {
            return Err(ProbeError::Config("probe.command is empty".to_string()));
        }
        Ok(JavaVersionProbe::new(command))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Probe on the build's agent instead of the controller.
    #[serde(alias = "runOnSlaves")]
    pub run_on_agents: bool,

    /// Number of probe build steps per build.
    pub steps: usize,

    pub agent: Option<AgentConfig>,

    pub probe: ProbeSettings,

    pub health: HealthRuleKind,

    /// Local database directory used when `SURREALDB_URL` is not set.
    pub db_path: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            run_on_agents: false,
            steps: 1,
            agent: None,
            probe: ProbeSettings::default(),
            health: HealthRuleKind::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl ProbeConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ProbeError::Config(e.to_string()))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `buildprobe.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let config = match path {
            Some(p) => {
                debug!(path = %p.display(), "loading config");
                let text = std::fs::read_to_string(&p).map_err(|e| {
                    ProbeError::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `BUILDPROBE_*` overrides from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BUILDPROBE_RUN_ON_AGENTS") {
            self.run_on_agents = parse_bool(&v).ok_or_else(|| {
                ProbeError::Config(format!("BUILDPROBE_RUN_ON_AGENTS: not a boolean: {v}"))
            })?;
        }
        if let Some(address) = lookup("BUILDPROBE_AGENT") {
            self.agent = Some(AgentConfig {
                address,
                name: None,
                identity_file: lookup("BUILDPROBE_AGENT_IDENTITY"),
            });
        }
        if let Some(command) = lookup("BUILDPROBE_PROBE_COMMAND") {
            self.probe.command = command;
        }
        if let Some(v) = lookup("BUILDPROBE_TIMEOUT_SECS") {
            self.probe.timeout_secs = v.parse().map_err(|_| {
                ProbeError::Config(format!("BUILDPROBE_TIMEOUT_SECS: not a number: {v}"))
            })?;
        }
        Ok(self)
    }

    /// The assigned agent as a node, if configured.
    pub fn node(&self) -> Result<Option<Node>> {
        self.agent.as_ref().map(AgentConfig::to_node).transpose()
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
