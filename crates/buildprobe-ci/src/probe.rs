//! Java version probe.
//!
//! Runs `java -version` (or a configured replacement) on whichever executor
//! the build step picked and reports the first line it printed. The JVM
//! writes its version banner to stderr, so stderr is read when stdout is
//! empty.

use serde::{Deserialize, Serialize};
use tracing::debug;

use buildprobe_state::UNKNOWN_LABEL;

use crate::error::{ProbeError, Result};
use crate::executor::{CommandSpec, Executor, LocalExecutor};

/// Default probe command line.
pub const DEFAULT_PROBE_COMMAND: &str = "java -version";

/// The probe operation. Holds only its command, so it can be shipped anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaVersionProbe {
    command: CommandSpec,
}

impl Default for JavaVersionProbe {
    fn default() -> Self {
        Self::new(CommandSpec::parse(DEFAULT_PROBE_COMMAND))
    }
}

impl JavaVersionProbe {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Run the probe on `target`, or on the local machine when `None`.
    ///
    /// Returns the first stdout line, else the first stderr line, or
    /// `"Unknown"` when nothing was printed. A non-zero exit is reported as [`ProbeError::CommandFailed`].
    pub async fn probe(&self, target: Option<&dyn Executor>) -> Result<String> {
        let local = LocalExecutor::new();
        let executor: &dyn Executor = target.unwrap_or(&local);

        let output = executor.run(&self.command).await?;
        debug!(
            node = executor.name(),
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "probe finished"
        );

        if !output.success() {
            return Err(ProbeError::CommandFailed {
                command: self.command.display(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(first_line_or_unknown(&output.stdout, &output.stderr))
    }
}

fn first_line_or_unknown(stdout: &str, stderr: &str) -> String {
    let first = |text: &str| text.lines().next().map(|line| line.trim_end().to_string());

    first(stdout)
        .or_else(|| first(stderr))
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line_or_unknown("1.8.0_331\nextra\n", ""), "1.8.0_331");
        assert_eq!(first_line_or_unknown("", ""), "Unknown");
        assert_eq!(first_line_or_unknown("17.0.2\r\n", ""), "17.0.2");
    }

    #[test]
    fn test_stderr_used_when_stdout_empty() {
        let banner = "openjdk version \"17.0.2\" 2022-01-18\nOpenJDK Runtime Environment\n";
        assert_eq!(
            first_line_or_unknown("", banner),
            "openjdk version \"17.0.2\" 2022-01-18"
        );
        assert_eq!(first_line_or_unknown("1.8.0_331\n", banner), "1.8.0_331");
    }

    #[test]
    fn test_default_command() {
        let probe = JavaVersionProbe::default();
        assert_eq!(probe.command().argv, vec!["java", "-version"]);
    }

    #[tokio::test]
    async fn test_probe_returns_first_line() {
        let exec = ScriptedExecutor::printing("agent-1", "1.8.0_331\nOpenJDK\n");
        let version = JavaVersionProbe::default()
            .probe(Some(&exec))
            .await
            .unwrap();
        assert_eq!(version, "1.8.0_331");
        assert_eq!(exec.call_count(), 1);
    }

    #[tokio::test]
    async fn test_probe_empty_output_is_unknown() {
        let exec = ScriptedExecutor::printing("agent-1", "");
        let version = JavaVersionProbe::default()
            .probe(Some(&exec))
            .await
            .unwrap();
        assert_eq!(version, "Unknown");
    }

    #[tokio::test]
    async fn test_probe_reads_version_banner_from_stderr() {
        let exec = ScriptedExecutor::printing_stderr("agent-1", "java version \"1.8.0_331\"\n");
        let version = JavaVersionProbe::default()
            .probe(Some(&exec))
            .await
            .unwrap();
        assert_eq!(version, "java version \"1.8.0_331\"");
    }

    #[tokio::test]
    async fn test_default_probe_on_local_jvm() {
        // Only meaningful where a JVM is installed.
        if std::process::Command::new("java").arg("-version").output().is_err() {
            return;
        }
        let version = JavaVersionProbe::default().probe(None).await.unwrap();
        assert_ne!(version, "Unknown");
        assert!(version.contains("version"), "unexpected banner: {version}");
    }

    #[tokio::test]
    async fn test_probe_non_zero_exit_fails() {
        let exec = ScriptedExecutor::failing("agent-1", 127, "java: not found");
        let err = JavaVersionProbe::default()
            .probe(Some(&exec))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::CommandFailed { exit_code: 127, .. }));
    }

    #[tokio::test]
    async fn test_probe_missing_binary_propagates() {
        let exec = ScriptedExecutor::missing("agent-1");
        let err = JavaVersionProbe::default()
            .probe(Some(&exec))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Io { .. }));
    }

    #[tokio::test]
    async fn test_probe_runs_locally_without_target() {
        let probe = JavaVersionProbe::new(CommandSpec::new(["echo", "local-jvm"]));
        assert_eq!(probe.probe(None).await.unwrap(), "local-jvm");
    }

    #[test]
    fn test_probe_is_serializable() {
        let probe = JavaVersionProbe::new(CommandSpec::parse("java -version").with_timeout(30));
        let json = serde_json::to_string(&probe).unwrap();
        let back: JavaVersionProbe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, probe);
    }
}
