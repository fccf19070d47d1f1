//! Post-build step grading the probe record.

use std::sync::Arc;

use buildprobe_state::Outcome;
use tracing::info;

use crate::build::{Build, BuildListener};
use crate::error::Result;
use crate::health::{HealthRule, NoEvenScores};
use crate::project::ProjectProbeAction;

/// Marks a build unstable when its probe record fails the health rule.
#[derive(Clone)]
pub struct ProbeRecorder {
    rule: Arc<dyn HealthRule>,
}

impl Default for ProbeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProbeRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRecorder")
            .field("rule", &self.rule.describe())
            .finish()
    }
}

impl ProbeRecorder {
    pub const DISPLAY_NAME: &'static str = "Probe Recorder";

    /// Recorder using the default rule ([`NoEvenScores`]).
    pub fn new() -> Self {
        Self::with_rule(Arc::new(NoEvenScores))
    }

    pub fn with_rule(rule: Arc<dyn HealthRule>) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &dyn HealthRule {
        self.rule.as_ref()
    }

    /// Grade the build. A missing record is not an error. Always returns
    /// `Ok(true)`.
    pub async fn perform(&self, build: &mut Build, listener: &mut BuildListener) -> Result<bool> {
        let Some(record) = build.record() else {
            return Ok(true);
        };

        if !self.rule.is_healthy(record) {
            listener.println(format!(
                "Probe record failed health rule ({}), marking build unstable",
                self.rule.describe()
            ));
            info!(build = %build.id(), "marking build unstable");
            build.set_outcome(Outcome::Unstable);
        }

        Ok(true)
    }

    /// The project-level action this recorder contributes.
    pub fn project_action(&self, project: &str) -> ProjectProbeAction {
        ProjectProbeAction::new(project)
    }
}
