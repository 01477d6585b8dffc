//! S3-compatible object storage for finished conversions.
//!
//! Upload is optional: [`S3Config::from_env`] returns `None` when no bucket
//! is configured and the service runs without it.

pub mod client;
pub mod error;

pub use client::{output_key, S3Config, S3Storage};
pub use error::{StorageError, StorageResult};
