use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{error::AppResult, models::LookupKey};

/// A JSON object passed as the single argument of a call, e.g.
/// `IMDbReactInitialState.push({...});`.
static PAYLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\{.*\})\)").expect("payload pattern"));

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("no embedded watchlist payload found in page")]
    PayloadMissing,
    #[error("embedded watchlist payload is malformed: {0}")]
    PayloadMalformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WatchlistPayload {
    list: WatchlistList,
}

#[derive(Debug, Deserialize)]
struct WatchlistList {
    items: Vec<WatchlistItem>,
}

#[derive(Debug, Deserialize)]
struct WatchlistItem {
    #[serde(rename = "const")]
    id: String,
}

pub async fn fetch_watchlist(client: &reqwest::Client, url: &str) -> AppResult<Vec<LookupKey>> {
    info!(url = %url, "fetching watchlist");

    let resp = client.get(url).send().await?;
    info!(url = %url, status = %resp.status(), "fetched watchlist page");

    let html = resp.error_for_status()?.text().await?;
    debug!(bytes = html.len(), "watchlist response body");

    let ids = extract_watchlist_ids(&html)?;
    info!(titles = ids.len(), "extracted watchlist titles");

    Ok(ids.into_iter().map(LookupKey::ImdbId).collect())
}

/// Pulls the title ids out of the JSON object a watchlist page embeds in a
/// script call. Script elements are searched before the raw body.
pub fn extract_watchlist_ids(html: &str) -> Result<Vec<String>, WatchlistError> {
    let mut last_err = None;

    for candidate in payload_candidates(html) {
        match serde_json::from_str::<WatchlistPayload>(&candidate) {
            Ok(payload) => return Ok(payload.list.items.into_iter().map(|item| item.id).collect()),
            Err(err) => {
                debug!(error = %err, "skipping unusable payload candidate");
                last_err = Some(err);
            },
        }
    }

    Err(last_err.map(WatchlistError::PayloadMalformed).unwrap_or(WatchlistError::PayloadMissing))
}

fn payload_candidates(html: &str) -> Vec<String> {
    let mut out = Vec::new();

    let doc = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("script") {
        for script in doc.select(&selector) {
            let text: String = script.text().collect();
            out.extend(PAYLOAD_RE.captures_iter(&text).map(|c| c[1].to_string()));
        }
    }

    if out.is_empty() {
        out.extend(PAYLOAD_RE.captures_iter(html).map(|c| c[1].to_string()));
    }

    out
}
