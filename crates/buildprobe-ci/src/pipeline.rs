//! Build lifecycle harness.
//!
//! Plays the orchestrator's role for one build: allocate the build, run the
//! probe builders in order, run the recorders, then persist the record and
//! final outcome.

use std::sync::Arc;
use std::time::Instant;

use buildprobe_state::{BuildId, BuildRecord, BuildStore, Outcome};
use tracing::{info, warn};

use crate::build::{Build, BuildListener, Node};
use crate::builder::ProbeBuilder;
use crate::error::Result;
use crate::recorder::ProbeRecorder;

/// Everything needed to run one build of a project.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Project the build belongs to.
    pub project: String,

    /// Agent the build is assigned to, if any.
    pub node: Option<Node>,

    /// Build steps, run in order.
    pub builders: Vec<ProbeBuilder>,

    /// Post-build steps, run after the build steps.
    pub recorders: Vec<ProbeRecorder>,
}

impl PipelineRequest {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            node: None,
            builders: Vec::new(),
            recorders: Vec::new(),
        }
    }

    pub fn on_node(mut self, node: Node) -> Self {
        self.node = Some(node);
        self
    }

    pub fn builder(mut self, builder: ProbeBuilder) -> Self {
        self.builders.push(builder);
        self
    }

    pub fn recorder(mut self, recorder: ProbeRecorder) -> Self {
        self.recorders.push(recorder);
        self
    }
}

/// Result of one build.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub build_id: BuildId,

    /// Final outcome as persisted.
    pub outcome: Outcome,

    /// Record attached by the builders, if any ran successfully.
    pub record: Option<BuildRecord>,

    /// Console lines written by the steps.
    pub log: Vec<String>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn entry_count(&self) -> usize {
        self.record.as_ref().map_or(0, BuildRecord::len)
    }
}

/// Runs builds against a [`BuildStore`].
pub struct ProbePipeline;

impl ProbePipeline {
    /// Run one build.
    ///
    /// A builder that errors or returns `false` fails the build and skips
    /// the remaining builders; a timed-out builder aborts it instead.
    /// Recorders always run. Only storage errors are returned; step failures
    /// end up in the outcome and the log. If the record cannot be stored the
    /// build is still completed, as a failure, before the error is returned.
    pub async fn run(store: Arc<dyn BuildStore>, request: PipelineRequest) -> Result<PipelineResult> {
        let start = Instant::now();

        let node_name = request.node.as_ref().map(|n| n.name().to_string());
        let info = store
            .create_build(&request.project, node_name.as_deref())
            .await?;
        info!(build = %info.id, node = ?node_name, "Starting build");

        let mut build = Build::new(info.id.clone(), request.node);
        let mut listener = BuildListener::new(&info.id);

        for builder in &request.builders {
            match builder.perform(&mut build, &mut listener).await {
                Ok(true) => {}
                Ok(false) => {
                    build.set_outcome(Outcome::Failure);
                    break;
                }
                Err(e) => {
                    warn!(build = %info.id, error = %e, "build step failed");
                    listener.println(format!("ERROR: {}", e));
                    build.set_outcome(e.build_outcome());
                    break;
                }
            }
        }

        for recorder in &request.recorders {
            if let Err(e) = recorder.perform(&mut build, &mut listener).await {
                warn!(build = %info.id, error = %e, "post-build step failed");
                listener.println(format!("ERROR: {}", e));
                build.set_outcome(Outcome::Failure);
            }
        }

        let outcome = build.outcome();
        listener.println(format!("Finished: {}", outcome.as_str().to_uppercase()));

        let record = build.into_record();
        if let Some(record) = &record {
            if let Err(e) = store.put_record(&info.id, record).await {
                warn!(build = %info.id, error = %e, "failed to persist probe record");
                // Never leave the build running.
                if let Err(close) = store.complete_build(&info.id, Outcome::Failure).await {
                    warn!(build = %info.id, error = %close, "failed to close build");
                }
                return Err(e.into());
            }
        }
        store.complete_build(&info.id, outcome).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(build = %info.id, %outcome, duration_ms, "Build completed");

        Ok(PipelineResult {
            build_id: info.id,
            outcome,
            record,
            log: listener.into_lines(),
            duration_ms,
        })
    }
}
