//! Converter configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Converter configuration.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Base directory for per-job work directories
    pub work_dir: PathBuf,
    /// Longest accepted source video
    pub max_video_duration: Duration,
    /// Capacity of the per-job progress channel
    pub progress_buffer: usize,
    /// Lifetime of presigned download URLs
    pub presign_expiry: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("kobalt"),
            max_video_duration: Duration::from_secs(300), // 5 minutes
            progress_buffer: 32,
            presign_expiry: Duration::from_secs(300),
        }
    }
}

impl ConverterConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("KOBALT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_video_duration: std::env::var("MAX_VIDEO_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_video_duration),
            progress_buffer: std::env::var("PROGRESS_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.progress_buffer),
            presign_expiry: std::env::var("PRESIGN_EXPIRY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.presign_expiry),
        }
    }
}
