//! Axum HTTP API server.
//!
//! This crate provides:
//! - The server-sent events conversion endpoint
//! - Per-IP rate limiting and security headers
//! - Health/readiness probes and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
