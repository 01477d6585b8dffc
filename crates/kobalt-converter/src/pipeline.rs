//! The conversion pipeline.
//!
//! ```text
//! check params -> acquire work dir -> validate -> probe duration
//!          -> { extract audio || resolve thumbnail -> fetch -> crop }
//!          -> embed -> publish (optional) -> completed
//! ```
//!
//! Any failure ends the job with one error event. The work directory is
//! released after the terminal event on every path.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use kobalt_media::{crop_cover, EmbedRequest, MediaError, MediaResult, MediaTools};
use kobalt_models::{format_hint_from_url, ConvertRequest, JobId, JobStage, ProgressEvent};

use crate::config::ConverterConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::progress::ProgressStream;
use crate::publish::OutputPublisher;
use crate::workdir::WorkDirectory;

const MSG_VALIDATING_URL: &str = "Validating YouTube URL...";
const MSG_VALIDATING_DURATION: &str = "Validating video duration...";
const MSG_DOWNLOADING: &str = "Downloading audio and thumbnail...";
const MSG_EMBEDDING: &str = "Embedding mp3 file...";
const MSG_COMPLETED: &str = "Conversion completed";

/// Runs conversion jobs against a set of media tools.
pub struct Converter {
    tools: Arc<dyn MediaTools>,
    config: ConverterConfig,
    publisher: Option<Arc<dyn OutputPublisher>>,
}

/// State of one running job.
struct Job<'a> {
    id: &'a JobId,
    request: &'a ConvertRequest,
    stream: &'a ProgressStream,
    cancel: &'a CancellationToken,
    logger: JobLogger,
    stage: JobStage,
    workdir: Option<WorkDirectory>,
}

impl Job<'_> {
    fn enter(&mut self, stage: JobStage) {
        self.stage = stage;
    }

    async fn progress(&self, value: u8, message: &str) {
        self.logger.log_stage(self.stage, message);
        self.stream.emit(ProgressEvent::progress(value, message)).await;
    }

    fn ensure_active(&self) -> ConvertResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }
}

impl Converter {
    pub fn new(tools: Arc<dyn MediaTools>, config: ConverterConfig) -> Self {
        Self {
            tools,
            config,
            publisher: None,
        }
    }

    /// Publish finished files, e.g. to object storage.
    pub fn with_publisher(mut self, publisher: Arc<dyn OutputPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Run one job to completion and return its terminal event.
    ///
    /// Every event, the terminal one included, is pushed to `stream` before
    /// this returns. Cancelling `cancel` aborts the current stage, kills its
    /// child processes and removes the work directory.
    pub async fn run(
        &self,
        job_id: &JobId,
        request: &ConvertRequest,
        stream: &ProgressStream,
        cancel: CancellationToken,
    ) -> ProgressEvent {
        let logger = JobLogger::new(job_id, "convert");
        let span = logger.create_span();

        async {
            let started = Instant::now();
            metrics::record_conversion_started();
            logger.log_start(request.url.trim());

            let mut job = Job {
                id: job_id,
                request,
                stream,
                cancel: &cancel,
                logger: logger.clone(),
                stage: JobStage::Received,
                workdir: None,
            };

            let event = match self.execute(&mut job).await {
                Ok(url) => {
                    job.enter(JobStage::Completed);
                    metrics::record_conversion_completed();
                    logger.log_completion(started.elapsed().as_millis());
                    let event = ProgressEvent::completed(MSG_COMPLETED);
                    match url {
                        Some(url) => event.with_url(url),
                        None => event,
                    }
                }
                Err(err) => {
                    logger.log_failure(job.stage, &err);
                    job.enter(JobStage::Failed);
                    metrics::record_conversion_failed(err.category().as_str());
                    ProgressEvent::error(err.client_message())
                }
            };

            stream.emit(event.clone()).await;

            if let Some(dir) = job.workdir.take() {
                dir.release().await;
                logger.log_cleanup("work directory released");
            }

            event
        }
        .instrument(span)
        .await
    }

    /// All stages up to and including publishing. Returns the optional
    /// retrieval URL of the finished file.
    async fn execute(&self, job: &mut Job<'_>) -> ConvertResult<Option<String>> {
        job.enter(JobStage::Validating);
        if !job.request.has_required_fields() {
            return Err(ConvertError::MissingParams);
        }
        let url = job.request.url.trim();

        // The directory exists for the whole life of the job
        let dir = WorkDirectory::acquire(&self.config.work_dir, job.id, job.cancel).await?;
        job.workdir = Some(dir.clone());

        job.progress(10, MSG_VALIDATING_URL).await;
        if !self.tools.validate_source_url(url) {
            return Err(ConvertError::InvalidSource);
        }

        job.ensure_active()?;
        job.enter(JobStage::DurationChecked);
        job.progress(20, MSG_VALIDATING_DURATION).await;

        let stage_started = Instant::now();
        let duration = cancellable(
            job.cancel,
            self.tools.probe_duration(url),
            ConvertError::DurationProbe,
        )
        .await?;
        metrics::record_stage_duration("duration_probe", stage_started.elapsed().as_secs_f64());

        let limit = self.config.max_video_duration;
        if duration > limit {
            return Err(ConvertError::TooLong {
                actual_secs: duration.as_secs(),
                limit_secs: limit.as_secs(),
            });
        }

        job.ensure_active()?;
        job.enter(JobStage::Downloading);
        job.progress(70, MSG_DOWNLOADING).await;

        let stage_started = Instant::now();
        let fork = job.cancel.child_token();
        let (audio, cover) = tokio::join!(
            self.download_audio(url, &dir, &fork),
            self.download_cover(url, &dir, &fork)
        );
        join_branches(audio, cover)?;
        metrics::record_stage_duration("download", stage_started.elapsed().as_secs_f64());

        job.ensure_active()?;
        job.enter(JobStage::Embedding);
        job.progress(90, MSG_EMBEDDING).await;

        let embed = EmbedRequest {
            audio_path: dir.audio_path(),
            cover_path: dir.cover_path(),
            title: job.request.title.trim().to_string(),
            artist: job.request.artist.trim().to_string(),
            output_path: dir.output_path(),
        };
        let stage_started = Instant::now();
        cancellable(
            job.cancel,
            self.tools.embed_metadata(&embed),
            ConvertError::Embed,
        )
        .await?;
        metrics::record_stage_duration("embed", stage_started.elapsed().as_secs_f64());

        self.publish(job, &embed).await
    }

    /// Audio branch of the fork. Cancels `fork` on failure.
    async fn download_audio(
        &self,
        url: &str,
        dir: &WorkDirectory,
        fork: &CancellationToken,
    ) -> ConvertResult<()> {
        let output = dir.audio_path();
        let result = cancellable(
            fork,
            self.tools.extract_audio(url, &output),
            ConvertError::AudioDownload,
        )
        .await;

        if result.is_err() {
            fork.cancel();
        }
        result
    }

    /// Cover branch of the fork. Cancels `fork` on failure.
    async fn download_cover(
        &self,
        url: &str,
        dir: &WorkDirectory,
        fork: &CancellationToken,
    ) -> ConvertResult<()> {
        let result = async {
            let thumbnail_url = cancellable(
                fork,
                self.tools.resolve_thumbnail_url(url),
                ConvertError::ThumbnailDownload,
            )
            .await?;

            let bytes = cancellable(
                fork,
                self.tools.fetch_bytes(&thumbnail_url),
                ConvertError::ThumbnailDownload,
            )
            .await?;

            let hint = format_hint_from_url(&thumbnail_url);
            let crop = tokio::task::spawn_blocking(move || crop_cover(&bytes, &hint));
            let jpeg = tokio::select! {
                biased;
                _ = fork.cancelled() => return Err(ConvertError::Cancelled),
                joined = crop => joined
                    .map_err(|e| ConvertError::CoverCrop(MediaError::ImageEncode(e.to_string())))?
                    .map_err(ConvertError::CoverCrop)?,
            };

            tokio::fs::write(dir.cover_path(), jpeg)
                .await
                .map_err(|e| ConvertError::CoverCrop(MediaError::Io(e)))
        }
        .await;

        if result.is_err() {
            fork.cancel();
        }
        result
    }

    async fn publish(&self, job: &Job<'_>, embed: &EmbedRequest) -> ConvertResult<Option<String>> {
        let Some(publisher) = &self.publisher else {
            return Ok(None);
        };

        let stage_started = Instant::now();
        let published = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => return Err(ConvertError::Cancelled),
            published = publisher.publish(job.id, &embed.title, &embed.output_path) => published,
        };
        metrics::record_stage_duration("publish", stage_started.elapsed().as_secs_f64());

        match published {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                // The file was produced; a failed upload only loses the URL
                metrics::record_upload_failed();
                job.logger.log_warning(&format!("upload failed: {}", e));
                Ok(None)
            }
        }
    }
}

/// Race a tool call against `cancel`. Dropping the losing tool future kills
/// its child process.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = MediaResult<T>>,
    wrap: fn(MediaError) -> ConvertError,
) -> ConvertResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConvertError::Cancelled),
        result = fut => result.map_err(wrap),
    }
}

/// Pick the error to report once both fork branches have finished.
///
/// A real failure beats a cancellation, and the audio branch beats the
/// cover branch.
fn join_branches(audio: ConvertResult<()>, cover: ConvertResult<()>) -> ConvertResult<()> {
    match (audio, cover) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(a), _) if !a.is_cancelled() => Err(a),
        (_, Err(c)) if !c.is_cancelled() => Err(c),
        (Err(a), _) => Err(a),
        (_, Err(c)) => Err(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use kobalt_models::{is_valid_source_url, ProgressStatus};
    use kobalt_storage::{StorageError, StorageResult};

    const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    const THUMBNAIL: &str = "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.png";

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    struct FakeTools {
        duration: Option<Duration>,
        audio: Behavior,
        thumbnail: Behavior,
        image: Vec<u8>,
        embed: Behavior,
        calls: Mutex<Vec<&'static str>>,
        workdirs: Mutex<Vec<PathBuf>>,
    }

    impl FakeTools {
        fn new() -> Self {
            Self {
                duration: Some(Duration::from_secs(225)),
                audio: Behavior::Succeed,
                thumbnail: Behavior::Succeed,
                image: png(640, 360),
                embed: Behavior::Succeed,
                calls: Mutex::new(Vec::new()),
                workdirs: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn workdirs(&self) -> Vec<PathBuf> {
            self.workdirs.lock().unwrap().clone()
        }
    }

    async fn behave(behavior: Behavior, what: &str) -> MediaResult<()> {
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(MediaError::download_failed(format!("{what} failed"))),
            Behavior::Hang => std::future::pending().await,
        }
    }

    #[async_trait]
    impl MediaTools for FakeTools {
        fn validate_source_url(&self, url: &str) -> bool {
            is_valid_source_url(url)
        }

        async fn probe_duration(&self, _url: &str) -> MediaResult<Duration> {
            self.record("probe_duration");
            self.duration
                .ok_or_else(|| MediaError::download_failed("no duration"))
        }

        async fn resolve_thumbnail_url(&self, _url: &str) -> MediaResult<String> {
            self.record("resolve_thumbnail_url");
            behave(self.thumbnail, "thumbnail").await?;
            Ok(THUMBNAIL.to_string())
        }

        async fn fetch_bytes(&self, _url: &str) -> MediaResult<Vec<u8>> {
            self.record("fetch_bytes");
            Ok(self.image.clone())
        }

        async fn extract_audio(&self, _url: &str, output: &Path) -> MediaResult<()> {
            self.record("extract_audio");
            if let Some(parent) = output.parent() {
                self.workdirs.lock().unwrap().push(parent.to_path_buf());
            }
            behave(self.audio, "audio").await?;
            tokio::fs::write(output, b"ID3audio").await?;
            Ok(())
        }

        async fn embed_metadata(&self, request: &EmbedRequest) -> MediaResult<()> {
            self.record("embed_metadata");
            assert!(request.audio_path.exists(), "audio must exist before embedding");
            assert!(request.cover_path.exists(), "cover must exist before embedding");
            behave(self.embed, "embed").await?;
            tokio::fs::write(&request.output_path, b"ID3tagged").await?;
            Ok(())
        }
    }

    struct FakePublisher {
        fail: bool,
    }

    #[async_trait]
    impl OutputPublisher for FakePublisher {
        async fn publish(&self, job_id: &JobId, _title: &str, path: &Path) -> StorageResult<String> {
            assert!(path.exists());
            if self.fail {
                return Err(StorageError::upload_failed("bucket unreachable"));
            }
            Ok(format!("https://bucket.example/{}/song.mp3", job_id))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([30, 60, 90]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn converter(tools: Arc<FakeTools>, base: &Path) -> Converter {
        let config = ConverterConfig {
            work_dir: base.to_path_buf(),
            ..ConverterConfig::default()
        };
        Converter::new(tools, config)
    }

    fn request() -> ConvertRequest {
        ConvertRequest::new(SOURCE, "Never Gonna Give You Up", "Rick Astley")
    }

    /// Run a job, optionally cancelling once the download stage is announced.
    async fn run_job(
        converter: &Converter,
        request: &ConvertRequest,
        cancel_at_download: bool,
    ) -> (ProgressEvent, Vec<ProgressEvent>) {
        let job_id = JobId::new();
        let (stream, mut rx) = ProgressStream::new(32);
        let cancel = CancellationToken::new();

        let collect = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                if cancel_at_download && event.progress == Some(70) {
                    cancel.cancel();
                }
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            events
        };

        let run = converter.run(&job_id, request, &stream, cancel.clone());
        let (terminal, events) = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::join!(run, collect)
        })
        .await
        .expect("job should finish");

        (terminal, events)
    }

    fn progress_values(events: &[ProgressEvent]) -> Vec<u8> {
        events.iter().filter_map(|e| e.progress).collect()
    }

    fn assert_no_workdirs_left(base: &Path) {
        let left: Vec<_> = std::fs::read_dir(base).unwrap().collect();
        assert!(left.is_empty(), "work directories left behind: {left:?}");
    }

    #[tokio::test]
    async fn test_successful_conversion_event_sequence() {
        let base = tempfile::tempdir().unwrap();
        let tools = Arc::new(FakeTools::new());
        let converter = converter(tools.clone(), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        let expected = [
            (ProgressStatus::Progress, MSG_VALIDATING_URL, 10),
            (ProgressStatus::Progress, MSG_VALIDATING_DURATION, 20),
            (ProgressStatus::Progress, MSG_DOWNLOADING, 70),
            (ProgressStatus::Progress, MSG_EMBEDDING, 90),
            (ProgressStatus::Completed, MSG_COMPLETED, 100),
        ];
        assert_eq!(events.len(), expected.len());
        for (event, (status, message, progress)) in events.iter().zip(expected) {
            assert_eq!(event.status, status);
            assert_eq!(event.message, message);
            assert_eq!(event.progress, Some(progress));
            assert!(event.error.is_none());
        }
        assert_eq!(terminal, events[4]);
        assert!(terminal.url.is_none());

        assert_eq!(tools.calls().last(), Some(&"embed_metadata"));
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_too_long_video_stops_before_download() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.duration = Some(Duration::from_secs(490));
        let tools = Arc::new(fake);
        let converter = converter(tools.clone(), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(progress_values(&events), [10, 20]);
        assert_eq!(events.len(), 3);
        assert_eq!(terminal.status, ProgressStatus::Error);
        assert_eq!(terminal.message, "video is longer than 5 minutes");
        assert_eq!(terminal.error.as_deref(), Some("video is longer than 5 minutes"));
        assert_eq!(tools.calls(), ["probe_duration"]);
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_duration_at_limit_is_accepted() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.duration = Some(Duration::from_secs(300));
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, _) = run_job(&converter, &request(), false).await;
        assert_eq!(terminal.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_params_is_the_only_event() {
        let base = tempfile::tempdir().unwrap();
        let tools = Arc::new(FakeTools::new());
        let converter = converter(tools.clone(), base.path());

        let request = ConvertRequest::new(SOURCE, "  ", "Rick Astley");
        let (terminal, events) = run_job(&converter, &request, false).await;

        assert_eq!(events, [terminal.clone()]);
        assert_eq!(terminal.message, "missing required query params");
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_source_halts_immediately() {
        let base = tempfile::tempdir().unwrap();
        let tools = Arc::new(FakeTools::new());
        let converter = converter(tools.clone(), base.path());

        let request = ConvertRequest::new("https://vimeo.com/123456789", "T", "A");
        let (terminal, events) = run_job(&converter, &request, false).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].progress, Some(10));
        assert_eq!(terminal.message, "invalid source link");
        assert!(tools.calls().is_empty());
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_duration_probe_failure() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.duration = None;
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(progress_values(&events), [10, 20]);
        assert_eq!(terminal.message, "error getting video duration");
    }

    #[tokio::test]
    async fn test_audio_failure_cancels_hanging_cover_branch() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.audio = Behavior::Fail;
        fake.thumbnail = Behavior::Hang;
        let tools = Arc::new(fake);
        let converter = converter(tools.clone(), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(progress_values(&events), [10, 20, 70]);
        assert_eq!(terminal.message, "error downloading audio");
        assert!(!tools.calls().contains(&"embed_metadata"));
        assert_eq!(tools.workdirs().len(), 1);
        assert!(!tools.workdirs()[0].exists());
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_thumbnail_failure_cancels_hanging_audio_branch() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.audio = Behavior::Hang;
        fake.thumbnail = Behavior::Fail;
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, _) = run_job(&converter, &request(), false).await;

        assert_eq!(terminal.message, "error downloading thumbnail");
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_both_branches_failing_reports_audio() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.audio = Behavior::Fail;
        fake.thumbnail = Behavior::Fail;
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, _) = run_job(&converter, &request(), false).await;
        assert_eq!(terminal.message, "error downloading audio");
    }

    #[tokio::test]
    async fn test_undecodable_thumbnail() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.image = b"<html>not an image</html>".to_vec();
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(progress_values(&events), [10, 20, 70]);
        assert_eq!(terminal.message, "error cropping thumbnail");
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_embed_failure() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.embed = Behavior::Fail;
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(progress_values(&events), [10, 20, 70, 90]);
        assert_eq!(terminal.message, "error embedding mp3 file");
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_cancellation_during_download() {
        let base = tempfile::tempdir().unwrap();
        let mut fake = FakeTools::new();
        fake.audio = Behavior::Hang;
        fake.thumbnail = Behavior::Hang;
        let converter = converter(Arc::new(fake), base.path());

        let (terminal, events) = run_job(&converter, &request(), true).await;

        assert_eq!(progress_values(&events), [10, 20, 70]);
        assert_eq!(terminal.message, "conversion cancelled");
        assert_eq!(events.last(), Some(&terminal));
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_work_directory_failure() {
        let base = tempfile::tempdir().unwrap();
        let blocker = base.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let tools = Arc::new(FakeTools::new());
        let converter = converter(tools.clone(), &blocker);

        let (terminal, events) = run_job(&converter, &request(), false).await;

        assert_eq!(events, [terminal.clone()]);
        assert_eq!(terminal.status, ProgressStatus::Error);
        assert_eq!(terminal.message, "failed to create temp directory");
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_work_directory_exists_before_first_stage() {
        let base = tempfile::tempdir().unwrap();
        let converter = converter(Arc::new(FakeTools::new()), base.path());
        let (stream, mut rx) = ProgressStream::new(32);
        let job_id = JobId::new();
        let request = request();

        let run = converter.run(&job_id, &request, &stream, CancellationToken::new());
        let first = async {
            let event = rx.recv().await.unwrap();
            let exists = base.path().join(job_id.as_str()).is_dir();
            while let Some(next) = rx.recv().await {
                if next.is_terminal() {
                    break;
                }
            }
            (event, exists)
        };
        let (terminal, (event, exists)) = tokio::join!(run, first);

        assert_eq!(event.progress, Some(10));
        assert!(exists, "work directory should exist when validation starts");
        assert_eq!(terminal.status, ProgressStatus::Completed);
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_published_url_on_completed_event() {
        let base = tempfile::tempdir().unwrap();
        let converter = converter(Arc::new(FakeTools::new()), base.path())
            .with_publisher(Arc::new(FakePublisher { fail: false }));

        let (terminal, _) = run_job(&converter, &request(), false).await;

        assert_eq!(terminal.status, ProgressStatus::Completed);
        let url = terminal.url.expect("completed event should carry the URL");
        assert!(url.starts_with("https://bucket.example/"));
        assert_no_workdirs_left(base.path());
    }

    #[tokio::test]
    async fn test_failed_upload_still_completes() {
        let base = tempfile::tempdir().unwrap();
        let converter = converter(Arc::new(FakeTools::new()), base.path())
            .with_publisher(Arc::new(FakePublisher { fail: true }));

        let (terminal, _) = run_job(&converter, &request(), false).await;

        assert_eq!(terminal.status, ProgressStatus::Completed);
        assert!(terminal.url.is_none());
    }

    #[tokio::test]
    async fn test_progress_is_non_decreasing() {
        let base = tempfile::tempdir().unwrap();
        let converter = converter(Arc::new(FakeTools::new()), base.path());

        let (_, events) = run_job(&converter, &request(), false).await;

        let values = progress_values(&events);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    }

    #[test]
    fn test_join_branches_priority() {
        let audio_err = || ConvertError::AudioDownload(MediaError::download_failed("a"));
        let cover_err = || ConvertError::ThumbnailDownload(MediaError::download_failed("c"));

        assert!(join_branches(Ok(()), Ok(())).is_ok());
        assert!(matches!(
            join_branches(Err(ConvertError::Cancelled), Err(cover_err())),
            Err(ConvertError::ThumbnailDownload(_))
        ));
        assert!(matches!(
            join_branches(Err(audio_err()), Err(ConvertError::Cancelled)),
            Err(ConvertError::AudioDownload(_))
        ));
        assert!(matches!(
            join_branches(Err(audio_err()), Err(cover_err())),
            Err(ConvertError::AudioDownload(_))
        ));
        assert!(matches!(
            join_branches(Ok(()), Err(ConvertError::Cancelled)),
            Err(ConvertError::Cancelled)
        ));
    }
}
