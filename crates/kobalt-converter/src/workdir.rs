//! Per-job work directory.
//!
//! The directory exists from [`WorkDirectory::acquire`] until the first
//! [`WorkDirectory::release`], which happens either at the end of the job or
//! as soon as the job's cancellation token fires. Both triggers share one
//! idempotent release.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use kobalt_models::JobId;

use crate::error::{ConvertError, ConvertResult};

const AUDIO_FILE: &str = "audio.mp3";
const COVER_FILE: &str = "cover.jpg";
const OUTPUT_FILE: &str = "output.mp3";

/// Scratch directory `<base>/<job id>/` owned by one job.
///
/// Cheap to clone; all clones refer to the same directory and release state.
#[derive(Debug, Clone)]
pub struct WorkDirectory {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    released: OnceCell<()>,
    /// Stops the cancellation watcher once the directory is gone
    done: CancellationToken,
}

impl WorkDirectory {
    /// Create the directory and arrange for its removal when `cancel` fires.
    pub async fn acquire(
        base: &Path,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> ConvertResult<Self> {
        tokio::fs::create_dir_all(base)
            .await
            .map_err(ConvertError::WorkDir)?;

        // The leaf must be new: two live jobs never share a directory
        let path = base.join(job_id.as_str());
        tokio::fs::create_dir(&path)
            .await
            .map_err(ConvertError::WorkDir)?;

        debug!(job_id = %job_id, path = %path.display(), "Created work directory");

        let dir = Self {
            inner: Arc::new(Inner {
                path,
                released: OnceCell::new(),
                done: CancellationToken::new(),
            }),
        };

        let watcher = Arc::downgrade(&dir.inner);
        let cancel = cancel.clone();
        let done = dir.inner.done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Some(inner) = watcher.upgrade() {
                        WorkDirectory { inner }.release().await;
                    }
                }
                _ = done.cancelled() => {}
            }
        });

        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn audio_path(&self) -> PathBuf {
        self.inner.path.join(AUDIO_FILE)
    }

    pub fn cover_path(&self) -> PathBuf {
        self.inner.path.join(COVER_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.inner.path.join(OUTPUT_FILE)
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.initialized()
    }

    /// Remove the directory and everything in it.
    ///
    /// Only the first call does the work; concurrent callers wait for it to
    /// finish. A directory that is already gone counts as released. Other
    /// failures are logged and swallowed.
    pub async fn release(&self) {
        self.inner
            .released
            .get_or_init(|| async {
                self.inner.done.cancel();
                match tokio::fs::remove_dir_all(&self.inner.path).await {
                    Ok(()) => debug!(path = %self.inner.path.display(), "Removed work directory"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(
                        path = %self.inner.path.display(),
                        error = %e,
                        "Failed to remove work directory"
                    ),
                }
            })
            .await;
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle gone without a release, e.g. the job task was aborted
        self.done.cancel();
        if !self.released.initialized() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
