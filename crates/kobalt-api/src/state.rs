//! Application state.

use std::sync::Arc;

use tracing::info;

use kobalt_converter::{Converter, ConverterConfig, S3Publisher};
use kobalt_media::{MediaConfig, YtDlpTools};
use kobalt_storage::S3Storage;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub media: MediaConfig,
    pub converter: Arc<Converter>,
}

impl AppState {
    /// Create application state from the environment.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let media = MediaConfig::from_env();
        let converter_config = ConverterConfig::from_env();

        tokio::fs::create_dir_all(&converter_config.work_dir).await?;
        info!(
            work_dir = %converter_config.work_dir.display(),
            max_duration_secs = converter_config.max_video_duration.as_secs(),
            "Converter configured"
        );

        let tools = Arc::new(YtDlpTools::new(&media)?);
        let mut converter = Converter::new(tools, converter_config.clone());

        if let Some(storage) = S3Storage::from_env().await? {
            let publisher = S3Publisher::new(storage, converter_config.presign_expiry);
            converter = converter.with_publisher(Arc::new(publisher));
        } else {
            info!("S3_BUCKET not set, finished files will not be uploaded");
        }

        Ok(Self::from_parts(config, media, converter))
    }

    /// Assemble state from prebuilt parts.
    pub fn from_parts(config: ApiConfig, media: MediaConfig, converter: Converter) -> Self {
        Self {
            config,
            media,
            converter: Arc::new(converter),
        }
    }
}
