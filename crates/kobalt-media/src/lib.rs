#![deny(unreachable_patterns)]
//! yt-dlp and FFmpeg CLI wrappers for audio conversion.
//!
//! This crate provides:
//! - The [`MediaTools`] contract the conversion pipeline is written against
//! - A subprocess-backed implementation ([`YtDlpTools`])
//! - Type-safe FFmpeg command building and a timeout-aware tool runner
//! - Center-square cover art cropping

pub mod command;
pub mod cover;
pub mod download;
pub mod embed;
pub mod error;
pub mod fetch;
pub mod tools;

pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, ToolOutput, ToolRunner};
pub use cover::{crop_cover, crop_region, COVER_JPEG_QUALITY};
pub use download::YtDlp;
pub use embed::embed_metadata;
pub use error::{MediaError, MediaResult};
pub use fetch::HttpFetcher;
pub use tools::{EmbedRequest, MediaConfig, MediaTools, YtDlpTools};
