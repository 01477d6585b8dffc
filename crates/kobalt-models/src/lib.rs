//! Shared data models for the Kobalt conversion service.
//!
//! This crate provides Serde-serializable types for:
//! - Conversion jobs and their stages
//! - Progress events streamed to the client
//! - Source URL validation and duration/format parsing helpers

pub mod job;
pub mod progress;
pub mod utils;

// Re-export common types
pub use job::{ConvertRequest, JobId, JobStage};
pub use progress::{ProgressEvent, ProgressStatus};
pub use utils::{format_hint_from_url, is_valid_source_url, parse_duration, DurationParseError};
