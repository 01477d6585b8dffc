//! Conversion metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const CONVERSIONS_STARTED_TOTAL: &str = "kobalt_conversions_started_total";
    pub const CONVERSIONS_COMPLETED_TOTAL: &str = "kobalt_conversions_completed_total";
    pub const CONVERSIONS_FAILED_TOTAL: &str = "kobalt_conversions_failed_total";
    pub const CONVERSIONS_ACTIVE: &str = "kobalt_conversions_active";
    pub const STAGE_DURATION_SECONDS: &str = "kobalt_stage_duration_seconds";
    pub const UPLOADS_FAILED_TOTAL: &str = "kobalt_uploads_failed_total";
}

pub fn record_conversion_started() {
    counter!(names::CONVERSIONS_STARTED_TOTAL).increment(1);
    gauge!(names::CONVERSIONS_ACTIVE).increment(1.0);
}

pub fn record_conversion_completed() {
    counter!(names::CONVERSIONS_COMPLETED_TOTAL).increment(1);
    gauge!(names::CONVERSIONS_ACTIVE).decrement(1.0);
}

pub fn record_conversion_failed(category: &str) {
    let labels = [("category", category.to_string())];
    counter!(names::CONVERSIONS_FAILED_TOTAL, &labels).increment(1);
    gauge!(names::CONVERSIONS_ACTIVE).decrement(1.0);
}

/// Record how long a pipeline stage took.
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_upload_failed() {
    counter!(names::UPLOADS_FAILED_TOTAL).increment(1);
}
