//! Conversion job definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest correlation id accepted as a job id.
const MAX_JOB_ID_LEN: usize = 64;

/// Unique identifier for a conversion job.
///
/// Job ids name a directory on disk, so only `[A-Za-z0-9_-]` is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derive a job ID from a request correlation id.
    ///
    /// Falls back to a fresh UUID when the correlation id is empty, too long,
    /// or contains characters that are unsafe in a path component.
    pub fn from_correlation_id(id: &str) -> Self {
        let id = id.trim();
        if is_safe_job_id(id) {
            Self(id.to_string())
        } else {
            Self::new()
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_safe_job_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_JOB_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Query parameters of a conversion request.
///
/// All fields default to empty so that a request missing any of them still
/// deserializes and can be rejected in-band by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    /// Source video URL
    #[serde(default)]
    pub url: String,
    /// Title tag for the output file
    #[serde(default)]
    pub title: String,
    /// Artist tag for the output file
    #[serde(default)]
    pub artist: String,
}

impl ConvertRequest {
    pub fn new(url: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// True when url, title and artist are all present.
    pub fn has_required_fields(&self) -> bool {
        !self.url.trim().is_empty() && !self.title.trim().is_empty() && !self.artist.trim().is_empty()
    }
}

/// Pipeline stage a job is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Received,
    Validating,
    DurationChecked,
    Downloading,
    Embedding,
    Completed,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Validating => "validating",
            JobStage::DurationChecked => "duration_checked",
            JobStage::Downloading => "downloading",
            JobStage::Embedding => "embedding",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
