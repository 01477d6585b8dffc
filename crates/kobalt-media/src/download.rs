//! Source probing and audio extraction using yt-dlp.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use kobalt_models::parse_duration;

use crate::command::{first_line, last_line, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// yt-dlp invocations used by the conversion pipeline.
#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: String,
    runner: ToolRunner,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            bin: bin.into(),
            runner,
        }
    }

    /// Video duration as reported by `--get-duration`.
    pub async fn probe_duration(&self, url: &str) -> MediaResult<Duration> {
        let output = self
            .run(&["--get-duration".to_string(), url.to_string()])
            .await?;

        let raw = first_line(&output.stdout).unwrap_or_default();
        let duration = parse_duration(raw)?;
        debug!(url = %url, raw = %raw, secs = duration.as_secs(), "Probed video duration");

        Ok(duration)
    }

    /// Thumbnail URL as reported by `--get-thumbnail`.
    pub async fn resolve_thumbnail_url(&self, url: &str) -> MediaResult<String> {
        let output = self
            .run(&["--get-thumbnail".to_string(), url.to_string()])
            .await?;

        first_line(&output.stdout)
            .map(str::to_string)
            .ok_or_else(|| MediaError::download_failed("yt-dlp returned no thumbnail URL"))
    }

    /// Extract the best audio stream of `url` as MP3 into `output_path`.
    pub async fn extract_audio(&self, url: &str, output_path: &Path) -> MediaResult<()> {
        info!("Extracting audio from {} to {}", url, output_path.display());

        let args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "--no-keep-video".to_string(),
            "-o".to_string(),
            output_path.to_string_lossy().to_string(),
            url.to_string(),
        ];
        self.run(&args).await?;

        if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
            return Err(MediaError::download_failed("Output file not created"));
        }

        let size = tokio::fs::metadata(output_path).await?.len();
        info!(
            output = %output_path.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "Extracted audio successfully"
        );

        Ok(())
    }

    async fn run(&self, args: &[String]) -> MediaResult<crate::command::ToolOutput> {
        self.runner.run(&self.bin, args).await.map_err(|e| match e {
            MediaError::ToolFailed { stderr, .. } => {
                let stderr = stderr.unwrap_or_default();
                let is_rate_limited = stderr.contains("429")
                    || stderr.contains("Too Many Requests")
                    || stderr.contains("Sign in to confirm");
                if is_rate_limited {
                    warn!("YouTube rate limit detected");
                }
                MediaError::download_failed(format!(
                    "yt-dlp failed: {}",
                    last_line(&stderr).unwrap_or("Unknown error")
                ))
            }
            other => other,
        })
    }
}
