//! In-flight build state handed to build steps.

use std::fmt;
use std::sync::Arc;

use buildprobe_state::{BuildId, BuildRecord, Outcome};
use tracing::info;

use crate::executor::Executor;

/// A node a build can be assigned to.
#[derive(Clone)]
pub struct Node {
    name: String,
    executor: Arc<dyn Executor>,
}

impl Node {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            name: executor.name().to_string(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("name", &self.name).finish()
    }
}

/// One running build: identity, assigned node, outcome so far and the
/// attached probe record.
#[derive(Debug)]
pub struct Build {
    id: BuildId,
    node: Option<Node>,
    outcome: Outcome,
    record: Option<BuildRecord>,
}

impl Build {
    pub fn new(id: BuildId, node: Option<Node>) -> Self {
        Self {
            id,
            node,
            outcome: Outcome::Success,
            record: None,
        }
    }

    pub fn id(&self) -> &BuildId {
        &self.id
    }

    /// The remote node the build was assigned to, if any.
    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Record a new outcome. Outcomes only degrade; a better outcome than
    /// the current one is ignored.
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = self.outcome.combine(outcome);
    }

    pub fn record(&self) -> Option<&BuildRecord> {
        self.record.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut BuildRecord> {
        self.record.as_mut()
    }

    /// Attach a record. A build carries at most one; a second attach replaces it.
    pub fn attach_record(&mut self, record: BuildRecord) {
        self.record = Some(record);
    }

    pub fn into_record(self) -> Option<BuildRecord> {
        self.record
    }
}

/// Console log of one build. Lines are kept and mirrored to tracing.
#[derive(Debug, Default)]
pub struct BuildListener {
    build: String,
    lines: Vec<String>,
}

impl BuildListener {
    pub fn new(build: &BuildId) -> Self {
        Self {
            build: build.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn println(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(build = %self.build, "{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;

    #[test]
    fn test_outcome_only_degrades() {
        let mut build = Build::new(BuildId::new("alpha", 1), None);
        build.set_outcome(Outcome::Failure);
        build.set_outcome(Outcome::Unstable);
        assert_eq!(build.outcome(), Outcome::Failure);
    }

    #[test]
    fn test_attach_record() {
        let mut build = Build::new(BuildId::new("alpha", 1), None);
        assert!(build.record().is_none());
        build.attach_record(BuildRecord::with_info("17"));
        assert_eq!(build.record().map(BuildRecord::len), Some(1));
        build.record_mut().unwrap().add_info("21");
        assert_eq!(build.into_record().map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_node_takes_executor_name() {
        let node = Node::new(Arc::new(ScriptedExecutor::printing("agent-7", "")));
        assert_eq!(node.name(), "agent-7");
        assert_eq!(node.executor().name(), "agent-7");
    }

    #[test]
    fn test_listener_keeps_lines() {
        let mut listener = BuildListener::new(&BuildId::new("alpha", 2));
        listener.println("one");
        listener.println(String::from("two"));
        assert_eq!(listener.lines(), ["one", "two"]);
    }
}
