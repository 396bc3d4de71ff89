use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::MovieRecord;

/// Marker the provider uses in place of a value it does not know.
pub const MISSING: &str = "N/A";

/// Sentinel stored when a runtime cannot be read.
pub const UNKNOWN_RUNTIME: i32 = -1;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered but refused the lookup, e.g. "Movie not found!".
    #[error("{0}")]
    Rejected(String),
    #[error("\"{title}\" is not a movie")]
    NotAMovie { title: String },
    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn find_by_title(&self, title: &str) -> Result<MovieRecord, ProviderError>;

    async fn find_by_id(&self, imdb_id: &str) -> Result<MovieRecord, ProviderError>;
}

/// Reads the leading minute count of a duration such as `"148 min"`.
pub fn parse_runtime(raw: &str) -> i32 {
    match raw.split_whitespace().next().and_then(|n| n.parse::<i32>().ok()) {
        Some(minutes) => minutes,
        None => {
            debug!(runtime = %raw, "unreadable runtime, storing sentinel");
            UNKNOWN_RUNTIME
        },
    }
}

/// Maps a score to `None` when it is missing or unreadable, never to zero.
pub fn parse_score(field: &'static str, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MISSING {
        return None;
    }
    let score = raw.replace(',', "").parse::<f64>().ok();
    if score.is_none() {
        debug!(field, value = %raw, "unreadable score, storing null");
    }
    score
}

/// Takes the first four-digit year, so `"2010"` and `"2010–2012"` both give 2010.
pub fn parse_year(raw: &str) -> Result<i32, ProviderError> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return Err(ProviderError::Malformed { field: "year", value: raw.to_string() });
    }
    digits.parse().map_err(|_| ProviderError::Malformed { field: "year", value: raw.to_string() })
}

/// Splits a comma separated genre list, trimming names and dropping repeats.
pub fn split_genres(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim) {
        if name.is_empty() || name == MISSING || out.iter().any(|g| g == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}

/// Turns the provider's missing marker into an empty string.
pub fn text_or_empty(raw: Option<String>) -> String {
    raw.filter(|s| s.trim() != MISSING).unwrap_or_default()
}
