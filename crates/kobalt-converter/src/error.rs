//! Conversion error types.
//!
//! Every variant maps to one stable client-facing message. Tool output,
//! paths and other internals stay in the wrapped source error and only reach
//! the logs.

use thiserror::Error;

use kobalt_media::MediaError;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing required query params")]
    MissingParams,

    #[error("invalid source link")]
    InvalidSource,

    #[error("duration probe failed: {0}")]
    DurationProbe(#[source] MediaError),

    #[error("video is {actual_secs}s long, limit is {limit_secs}s")]
    TooLong { actual_secs: u64, limit_secs: u64 },

    #[error("audio download failed: {0}")]
    AudioDownload(#[source] MediaError),

    #[error("thumbnail download failed: {0}")]
    ThumbnailDownload(#[source] MediaError),

    #[error("cover crop failed: {0}")]
    CoverCrop(#[source] MediaError),

    #[error("embedding failed: {0}")]
    Embed(#[source] MediaError),

    #[error("work directory unavailable: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("conversion cancelled")]
    Cancelled,
}

/// Coarse failure class, used for metrics labels and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Input,
    Source,
    Artifact,
    Embed,
    Resource,
    Cancellation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Source => "source",
            ErrorCategory::Artifact => "artifact",
            ErrorCategory::Embed => "embed",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Cancellation => "cancellation",
        }
    }
}

impl ConvertError {
    /// Text sent to the client in the terminal error event.
    pub fn client_message(&self) -> String {
        match self {
            ConvertError::MissingParams => "missing required query params".to_string(),
            ConvertError::InvalidSource => "invalid source link".to_string(),
            ConvertError::DurationProbe(_) => "error getting video duration".to_string(),
            ConvertError::TooLong { limit_secs, .. } => {
                format!("video is longer than {}", describe_limit(*limit_secs))
            }
            ConvertError::AudioDownload(_) => "error downloading audio".to_string(),
            ConvertError::ThumbnailDownload(_) => "error downloading thumbnail".to_string(),
            ConvertError::CoverCrop(_) => "error cropping thumbnail".to_string(),
            ConvertError::Embed(_) => "error embedding mp3 file".to_string(),
            ConvertError::WorkDir(_) => "failed to create temp directory".to_string(),
            ConvertError::Cancelled => "conversion cancelled".to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ConvertError::MissingParams | ConvertError::InvalidSource => ErrorCategory::Input,
            ConvertError::DurationProbe(_) | ConvertError::TooLong { .. } => ErrorCategory::Source,
            ConvertError::AudioDownload(_)
            | ConvertError::ThumbnailDownload(_)
            | ConvertError::CoverCrop(_) => ErrorCategory::Artifact,
            ConvertError::Embed(_) => ErrorCategory::Embed,
            ConvertError::WorkDir(_) => ErrorCategory::Resource,
            ConvertError::Cancelled => ErrorCategory::Cancellation,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConvertError::Cancelled)
    }
}

/// "5 minutes", "1 minute", "90 seconds".
fn describe_limit(secs: u64) -> String {
    match secs {
        60 => "1 minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}
