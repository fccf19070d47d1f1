//! Probe build step.
//!
//! Probes the JVM either on the controller or on the build's agent and
//! appends the result to the build's record, creating the record on first
//! use.

use serde::{Deserialize, Serialize};
use tracing::debug;

use buildprobe_state::BuildRecord;

use crate::build::{Build, BuildListener};
use crate::error::{ProbeError, Result};
use crate::executor::Executor;
use crate::probe::JavaVersionProbe;

/// Where the probe runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Always on the controller, wherever the build itself runs.
    #[default]
    Local,
    /// On the agent the build is assigned to.
    Distributed,
}

impl ExecutionPolicy {
    pub fn from_run_on_agents(run_on_agents: bool) -> Self {
        if run_on_agents {
            ExecutionPolicy::Distributed
        } else {
            ExecutionPolicy::Local
        }
    }
}

/// Build step recording the Java version seen by the build.
#[derive(Debug, Clone, Default)]
pub struct ProbeBuilder {
    policy: ExecutionPolicy,
    probe: JavaVersionProbe,
}

impl ProbeBuilder {
    pub const DISPLAY_NAME: &'static str = "Probe Builder";

    pub fn new(run_on_agents: bool) -> Self {
        Self {
            policy: ExecutionPolicy::from_run_on_agents(run_on_agents),
            probe: JavaVersionProbe::default(),
        }
    }

    pub fn with_probe(mut self, probe: JavaVersionProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    pub fn run_on_agents(&self) -> bool {
        self.policy == ExecutionPolicy::Distributed
    }

    /// Run the step. Always returns `Ok(true)` (continue) unless the probe
    /// itself fails.
    pub async fn perform(&self, build: &mut Build, listener: &mut BuildListener) -> Result<bool> {
        listener.println(Self::DISPLAY_NAME);

        let target: Option<&dyn Executor> = match self.policy {
            ExecutionPolicy::Distributed => {
                let node = build.node().ok_or_else(|| ProbeError::NoAgentAssigned {
                    build: build.id().to_string(),
                })?;
                Some(node.executor())
            }
            ExecutionPolicy::Local => None,
        };
        debug!(build = %build.id(), policy = ?self.policy, "dispatching probe");

        let java_version = self.probe.probe(target).await?;
        listener.println(format!("Found this java version: {}", java_version));

        match build.record_mut() {
            Some(record) => {
                record.add_info(java_version);
            }
            None => build.attach_record(BuildRecord::with_info(java_version)),
        }

        Ok(true)
    }
}
