//! Utility functions for source URL validation and tool output parsing.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Accepted source links: youtube.com watch/embed/v URLs and youtu.be short
/// links carrying an 11-character video id.
static SOURCE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:m\.|www\.)?(?:youtu\.be/|youtube\.com/(?:embed/|v/|watch\?v=|watch\?.+&v=))(?:[\w-]{11})(?:\S+)?$",
    )
    .expect("source URL pattern is valid")
});

/// Check whether a URL matches the accepted source pattern.
pub fn is_valid_source_url(url: &str) -> bool {
    SOURCE_URL_PATTERN.is_match(url)
}

/// Errors returned by [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("unexpected duration format: {0}")]
    UnexpectedFormat(String),

    #[error("invalid number in duration: {0}")]
    InvalidNumber(String),
}

/// Parse a `[[H:]M:]S` duration as printed by `yt-dlp --get-duration`.
///
/// `"3:45"` is 225 seconds, `"1:02:03"` is 3723 seconds, `"45"` is 45 seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() > 3 {
        return Err(DurationParseError::UnexpectedFormat(raw.to_string()));
    }

    let mut seconds: u64 = 0;
    for part in parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(DurationParseError::InvalidNumber(part.to_string()));
        }
        let value: u64 = part
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(part.to_string()))?;
        seconds = seconds
            .checked_mul(60)
            .and_then(|s| s.checked_add(value))
            .ok_or_else(|| DurationParseError::InvalidNumber(part.to_string()))?;
    }

    Ok(Duration::from_secs(seconds))
}

/// Lowercased file extension of a URL's path, ignoring query and fragment.
///
/// Returns an empty string when the last path segment has no extension.
pub fn format_hint_from_url(raw: &str) -> String {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => {
            let without_query = raw.split('?').next().unwrap_or_default();
            without_query.split('#').next().unwrap_or_default().to_string()
        }
    };

    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}
