//! Request-scoped conversion pipeline.
//!
//! A [`Converter`] runs one job from validation through the concurrent
//! audio/cover downloads to the final tagging step, pushing every
//! [`ProgressEvent`](kobalt_models::ProgressEvent) into a [`ProgressStream`].
//! Each job owns a [`WorkDirectory`] that is removed on every exit path.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod workdir;

pub use config::ConverterConfig;
pub use error::{ConvertError, ConvertResult, ErrorCategory};
pub use logging::JobLogger;
pub use pipeline::Converter;
pub use progress::ProgressStream;
pub use publish::{OutputPublisher, S3Publisher};
pub use workdir::WorkDirectory;
