//! Health rules deciding whether a build record is acceptable.

use std::sync::Arc;

use buildprobe_state::BuildRecord;
use serde::{Deserialize, Serialize};

/// Decides whether a record is healthy. Unhealthy records make the
/// recorder mark the build unstable.
pub trait HealthRule: Send + Sync {
    fn is_healthy(&self, record: &BuildRecord) -> bool;

    fn describe(&self) -> String;
}

impl<F> HealthRule for F
where
    F: Fn(&BuildRecord) -> bool + Send + Sync,
{
    fn is_healthy(&self, record: &BuildRecord) -> bool {
        self(record)
    }

    fn describe(&self) -> String {
        "custom rule".to_string()
    }
}

/// Healthy iff no entry has an even score. Empty records are healthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvenScores;

impl HealthRule for NoEvenScores {
    fn is_healthy(&self, record: &BuildRecord) -> bool {
        record.is_healthy()
    }

    fn describe(&self) -> String {
        "no even scores".to_string()
    }
}

/// Healthy iff every score is at most `max`.
#[derive(Debug, Clone, Copy)]
pub struct MaxScore {
    pub max: u8,
}

impl HealthRule for MaxScore {
    fn is_healthy(&self, record: &BuildRecord) -> bool {
        record.entries().iter().all(|e| e.score <= self.max)
    }

    fn describe(&self) -> String {
        format!("all scores <= {}", self.max)
    }
}

/// Never degrades a build.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysHealthy;

impl HealthRule for AlwaysHealthy {
    fn is_healthy(&self, _record: &BuildRecord) -> bool {
        true
    }

    fn describe(&self) -> String {
        "always healthy".to_string()
    }
}

/// Configurable selection of the built-in rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum HealthRuleKind {
    #[default]
    NoEvenScores,
    MaxScore {
        max: u8,
    },
    AlwaysHealthy,
}

impl HealthRuleKind {
    pub fn into_rule(self) -> Arc<dyn HealthRule> {
        match self {
            HealthRuleKind::NoEvenScores => Arc::new(NoEvenScores),
            HealthRuleKind::MaxScore { max } => Arc::new(MaxScore { max }),
            HealthRuleKind::AlwaysHealthy => Arc::new(AlwaysHealthy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildprobe_state::ProbeResult;

    fn record(scores: &[u8]) -> BuildRecord {
        BuildRecord::from_entries(
            scores
                .iter()
                .map(|s| ProbeResult::with_score("17", *s))
                .collect(),
        )
    }

    #[test]
    fn test_no_even_scores() {
        assert!(NoEvenScores.is_healthy(&record(&[])));
        assert!(NoEvenScores.is_healthy(&record(&[3, 5, 7])));
        assert!(!NoEvenScores.is_healthy(&record(&[3, 4, 7])));
        assert!(!NoEvenScores.is_healthy(&record(&[10])));
    }

    #[test]
    fn test_max_score() {
        let rule = MaxScore { max: 5 };
        assert!(rule.is_healthy(&record(&[1, 5])));
        assert!(!rule.is_healthy(&record(&[1, 6])));
    }

    #[test]
    fn test_closure_rule() {
        let rule = |r: &BuildRecord| r.len() < 2;
        assert!(rule.is_healthy(&record(&[2])));
        assert!(!rule.is_healthy(&record(&[1, 3])));
    }

    #[test]
    fn test_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            health: HealthRuleKind,
        }
        let w: Wrapper = toml::from_str("[health]\nrule = \"max_score\"\nmax = 7\n").unwrap();
        assert_eq!(w.health, HealthRuleKind::MaxScore { max: 7 });
        assert!(w.health.into_rule().is_healthy(&record(&[7])));
    }

    #[test]
    fn test_default_kind() {
        let rule = HealthRuleKind::default().into_rule();
        assert_eq!(rule.describe(), "no even scores");
    }
}
