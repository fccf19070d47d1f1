//! buildprobe CI - build steps that probe the JVM of the executing node
//!
//! Provides:
//! - [`ProbeBuilder`]: build step appending a scored Java version entry to
//!   the build's [`BuildRecord`](buildprobe_state::BuildRecord)
//! - [`ProbeRecorder`]: post-build step marking unhealthy builds unstable
//! - [`ProjectProbeAction`]: latest record across a project's history
//! - [`ProbePipeline`]: runs one build end to end against a
//!   [`BuildStore`](buildprobe_state::BuildStore)

pub mod build;
pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod health;
pub mod pipeline;
pub mod probe;
pub mod project;
pub mod recorder;
pub mod telemetry;

pub use build::{Build, BuildListener, Node};
pub use builder::{ExecutionPolicy, ProbeBuilder};
pub use config::{AgentConfig, ProbeConfig, ProbeSettings, DEFAULT_CONFIG_FILE};
pub use error::{ProbeError, Result};
pub use executor::{
    AgentAddress, CommandOutput, CommandSpec, Executor, LocalExecutor, SshExecutor,
};
pub use health::{AlwaysHealthy, HealthRule, HealthRuleKind, MaxScore, NoEvenScores};
pub use pipeline::{PipelineRequest, PipelineResult, ProbePipeline};
pub use probe::{JavaVersionProbe, DEFAULT_PROBE_COMMAND};
pub use project::ProjectProbeAction;
pub use recorder::ProbeRecorder;
pub use telemetry::{default_level, init_tracing};
