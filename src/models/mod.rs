//! Core data types shared by the parser, validator, aggregator and writer.

use strum::Display;

/// Normalize a source identifier (URL or file path) before it is labelled or loaded.
pub fn normalize_source(source: &str) -> String {
    source.trim().to_string()
}

/// A channel parsed from a source playlist
///
/// `url` always starts with an HTTP scheme; the parser never emits anything
/// else. `source_label` is empty until the labeler attaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub logo: String,
    pub group: String,
    pub channel_name: String,
    pub url: String,
    pub source: String,
    pub source_label: String,
}

impl Candidate {
    /// Key used for cross-source deduplication
    pub fn dedup_key(&self) -> &str {
        self.url.trim()
    }
}

/// Terminal classification of a liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LivenessReason {
    Ok,
    HttpStatus,
    EmptyBody,
    RequestException,
    Unknown,
}

/// Result of probing one stream URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessOutcome {
    pub is_live: bool,
    pub status_code: Option<u16>,
    pub reason: LivenessReason,
    pub attempts: u32,
    pub error: String,
}

impl LivenessOutcome {
    pub fn live(status_code: u16, attempts: u32) -> Self {
        Self {
            is_live: true,
            status_code: Some(status_code),
            reason: LivenessReason::Ok,
            attempts,
            error: String::new(),
        }
    }

    pub fn dead(status_code: Option<u16>, reason: LivenessReason, attempts: u32) -> Self {
        Self {
            is_live: false,
            status_code,
            reason,
            attempts,
            error: String::new(),
        }
    }

    pub fn with_error<S: Into<String>>(mut self, error: S) -> Self {
        self.error = error.into();
        self
    }
}

/// A candidate paired with the outcome of probing its URL
#[derive(Debug, Clone)]
pub struct ProbedCandidate {
    pub candidate: Candidate,
    pub outcome: LivenessOutcome,
}
