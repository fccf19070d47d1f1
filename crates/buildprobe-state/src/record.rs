//! Per-build probe record.
//!
//! A [`BuildRecord`] is the action attached to a single build. It holds the
//! ordered [`ProbeResult`]s appended by every probe step that ran during the
//! build. Entries are append-only: a probe never rewrites or drops an
//! earlier result.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive bounds of the score drawn for each probe result.
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Label used when the probe produced no output.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Icon shared by the build and project actions.
pub const ACTION_ICON: &str = "/plugin/buildprobe/images/64x64/probe-icon.png";

/// A single probe outcome: the reported version line plus a random score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// First line the probe command printed (or [`UNKNOWN_LABEL`]).
    pub label: String,
    /// Score in `[MIN_SCORE, MAX_SCORE]`, fixed at construction.
    pub score: u8,
    /// When the result was taken.
    pub recorded_at: DateTime<Utc>,
}

impl ProbeResult {
    /// Create a result with a score drawn from the thread-local RNG.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_rng(label, &mut rand::thread_rng())
    }

    /// Create a result drawing its score from `rng`.
    pub fn with_rng<R: Rng>(label: impl Into<String>, rng: &mut R) -> Self {
        Self {
            label: label.into(),
            score: rng.gen_range(MIN_SCORE..=MAX_SCORE),
            recorded_at: Utc::now(),
        }
    }

    /// Rebuild a result with a known score.
    ///
    /// Scores outside `[MIN_SCORE, MAX_SCORE]` are clamped into range.
    pub fn with_score(label: impl Into<String>, score: u8) -> Self {
        Self {
            label: label.into(),
            score: score.clamp(MIN_SCORE, MAX_SCORE),
            recorded_at: Utc::now(),
        }
    }

    /// Whether the score is even.
    pub fn has_even_score(&self) -> bool {
        self.score % 2 == 0
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Java version: {} - RandomNumber: {}", self.label, self.score)
    }
}

/// Ordered probe results attached to one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    entries: Vec<ProbeResult>,
}

impl BuildRecord {
    pub const DISPLAY_NAME: &'static str = "Probe Build Action";
    pub const URL_NAME: &'static str = "probebuildaction";

    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record holding a single fresh result for `label`.
    pub fn with_info(label: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.add_info(label);
        record
    }

    /// Rebuild a record from previously persisted entries.
    pub fn from_entries(entries: Vec<ProbeResult>) -> Self {
        Self { entries }
    }

    /// Append a fresh result for `label`.
    pub fn add_info(&mut self, label: impl Into<String>) -> &ProbeResult {
        self.push(ProbeResult::new(label))
    }

    /// Append an already constructed result.
    pub fn push(&mut self, result: ProbeResult) -> &ProbeResult {
        self.entries.push(result);
        &self.entries[self.entries.len() - 1]
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ProbeResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any entry carries an even score.
    pub fn has_even_score(&self) -> bool {
        self.entries.iter().any(ProbeResult::has_even_score)
    }

    /// Default health check: healthy iff no entry has an even score.
    ///
    /// An empty record is healthy.
    pub fn is_healthy(&self) -> bool {
        !self.has_even_score()
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&ProbeResult> {
        self.entries.last()
    }

    pub fn display_name(&self) -> &'static str {
        Self::DISPLAY_NAME
    }

    pub fn icon_file_name(&self) -> &'static str {
        ACTION_ICON
    }

    pub fn url_name(&self) -> &'static str {
        Self::URL_NAME
    }
}

impl fmt::Display for BuildRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
