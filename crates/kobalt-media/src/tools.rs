//! The tool contract the conversion pipeline is written against.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use kobalt_models::is_valid_source_url;

use crate::command::ToolRunner;
use crate::download::YtDlp;
use crate::embed;
use crate::error::MediaResult;
use crate::fetch::HttpFetcher;

/// Inputs of the final tagging step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRequest {
    pub audio_path: PathBuf,
    pub cover_path: PathBuf,
    pub title: String,
    pub artist: String,
    pub output_path: PathBuf,
}

/// External media operations used by a conversion job.
///
/// Implementations must not leave child processes running once a returned
/// future is dropped.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Whether `url` is an accepted source link.
    fn validate_source_url(&self, url: &str) -> bool;

    /// Duration of the source video.
    async fn probe_duration(&self, url: &str) -> MediaResult<Duration>;

    /// Direct URL of the source video's thumbnail.
    async fn resolve_thumbnail_url(&self, url: &str) -> MediaResult<String>;

    /// Raw bytes behind `url`.
    async fn fetch_bytes(&self, url: &str) -> MediaResult<Vec<u8>>;

    /// Extract the audio track of `url` as MP3 into `output`.
    async fn extract_audio(&self, url: &str, output: &Path) -> MediaResult<()>;

    /// Tag the audio file and attach the cover.
    async fn embed_metadata(&self, request: &EmbedRequest) -> MediaResult<()>;
}

/// Media tool configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// yt-dlp executable name or path
    pub ytdlp_bin: String,
    /// ffmpeg executable name or path
    pub ffmpeg_bin: String,
    /// Upper bound for a single tool invocation
    pub tool_timeout: Duration,
    /// Largest accepted thumbnail body
    pub max_thumbnail_bytes: usize,
    /// Thumbnail HTTP request timeout
    pub fetch_timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            tool_timeout: Duration::from_secs(600),
            max_thumbnail_bytes: 10 * 1024 * 1024,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ytdlp_bin: std::env::var("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            tool_timeout: std::env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.tool_timeout),
            max_thumbnail_bytes: std::env::var("MAX_THUMBNAIL_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_thumbnail_bytes),
            fetch_timeout: std::env::var("THUMBNAIL_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        }
    }
}

/// [`MediaTools`] backed by yt-dlp, ffmpeg and reqwest.
#[derive(Debug, Clone)]
pub struct YtDlpTools {
    ytdlp: YtDlp,
    ffmpeg_bin: String,
    runner: ToolRunner,
    fetcher: HttpFetcher,
}

impl YtDlpTools {
    pub fn new(config: &MediaConfig) -> MediaResult<Self> {
        let runner = ToolRunner::new().with_timeout(config.tool_timeout.as_secs());
        Ok(Self {
            ytdlp: YtDlp::new(config.ytdlp_bin.clone(), runner.clone()),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            runner,
            fetcher: HttpFetcher::new(config.max_thumbnail_bytes, config.fetch_timeout)?,
        })
    }
}

#[async_trait]
impl MediaTools for YtDlpTools {
    fn validate_source_url(&self, url: &str) -> bool {
        is_valid_source_url(url)
    }

    async fn probe_duration(&self, url: &str) -> MediaResult<Duration> {
        self.ytdlp.probe_duration(url).await
    }

    async fn resolve_thumbnail_url(&self, url: &str) -> MediaResult<String> {
        self.ytdlp.resolve_thumbnail_url(url).await
    }

    async fn fetch_bytes(&self, url: &str) -> MediaResult<Vec<u8>> {
        self.fetcher.fetch(url).await
    }

    async fn extract_audio(&self, url: &str, output: &Path) -> MediaResult<()> {
        self.ytdlp.extract_audio(url, output).await
    }

    async fn embed_metadata(&self, request: &EmbedRequest) -> MediaResult<()> {
        embed::embed_metadata(&self.ffmpeg_bin, &self.runner, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MediaConfig::default();
        assert_eq!(config.ytdlp_bin, "yt-dlp");
        assert_eq!(config.ffmpeg_bin, "ffmpeg");
        assert_eq!(config.tool_timeout, Duration::from_secs(600));
        assert_eq!(config.max_thumbnail_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_source_url() {
        let tools = YtDlpTools::new(&MediaConfig::default()).unwrap();
        assert!(tools.validate_source_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!tools.validate_source_url("https://vimeo.com/123456789"));
    }
}
