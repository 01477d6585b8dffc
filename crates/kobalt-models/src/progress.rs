//! Progress event types streamed to the client.
//!
//! Each event is serialized as one server-sent event frame:
//! `data: {"status":...,"message":...,"progress":...}`.

use serde::{Deserialize, Serialize};

/// Event status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Intermediate progress update
    Progress,
    /// Conversion finished successfully
    Completed,
    /// Conversion failed
    Error,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Progress => "progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Error => "error",
        }
    }
}

/// One unit of job status communicated over the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,

    pub message: String,

    /// Percentage (0-100), only on progress/completed events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    /// Stable error text, only on error events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Retrieval URL of the uploaded file, only on completed events when
    /// object storage is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ProgressEvent {
    /// Create a progress event (value clamped to 100).
    pub fn progress(value: u8, message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Progress,
            message: message.into(),
            progress: Some(value.min(100)),
            error: None,
            url: None,
        }
    }

    /// Create the terminal success event.
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Completed,
            message: message.into(),
            progress: Some(100),
            error: None,
            url: None,
        }
    }

    /// Create the terminal error event.
    ///
    /// The text goes into both `message` and `error`; older clients only read
    /// `message`.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: ProgressStatus::Error,
            error: Some(message.clone()),
            message,
            progress: None,
            url: None,
        }
    }

    /// Attach a retrieval URL to a completed event.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        if self.status == ProgressStatus::Completed {
            self.url = Some(url.into());
        }
        self
    }

    /// True for `completed` and `error` events.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ProgressStatus::Completed | ProgressStatus::Error)
    }
}
