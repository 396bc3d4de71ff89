use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    models::MovieRecord,
    provider::{self, MetadataProvider, ProviderError},
};

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, api_key, base_url, limiter }
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<MovieRecord, ProviderError> {
        self.limiter.until_ready().await;

        let resp: OmdbResponse = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("type", "movie")])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.into_record()
    }
}

#[async_trait]
impl MetadataProvider for OmdbClient {
    async fn find_by_title(&self, title: &str) -> Result<MovieRecord, ProviderError> {
        debug!(title = %title, "searching OMDb by title");
        self.call(&[("t", title)]).await
    }

    async fn find_by_id(&self, imdb_id: &str) -> Result<MovieRecord, ProviderError> {
        debug!(imdb_id = %imdb_id, "looking up OMDb id");
        self.call(&[("i", imdb_id)]).await
    }
}

/// Raw OMDb payload. Error responses carry only `Response` and `Error`, so
/// every other field is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OmdbResponse {
    response: String,
    error: Option<String>,
    title: Option<String>,
    year: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    language: Option<String>,
    awards: Option<String>,
    poster: Option<String>,
    metascore: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

impl OmdbResponse {
    pub(crate) fn into_record(self) -> Result<MovieRecord, ProviderError> {
        if self.response != "True" {
            return Err(ProviderError::Rejected(
                self.error.unwrap_or_else(|| "unknown OMDb error".to_string()),
            ));
        }

        let title = self.title.unwrap_or_default();
        if self.kind.as_deref() != Some("movie") {
            return Err(ProviderError::NotAMovie { title });
        }

        let imdb_id = self
            .imdb_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ProviderError::Malformed { field: "imdbID", value: String::new() })?;
        let year = provider::parse_year(self.year.as_deref().unwrap_or_default())?;

        Ok(MovieRecord {
            imdb_id,
            title,
            year,
            runtime: provider::parse_runtime(self.runtime.as_deref().unwrap_or_default()),
            language: provider::text_or_empty(self.language),
            awards: provider::text_or_empty(self.awards),
            poster: provider::text_or_empty(self.poster),
            imdb_rating: provider::parse_score(
                "imdbRating",
                self.imdb_rating.as_deref().unwrap_or_default(),
            ),
            metascore: provider::parse_score(
                "Metascore",
                self.metascore.as_deref().unwrap_or_default(),
            ),
            genres: provider::split_genres(self.genre.as_deref().unwrap_or_default()),
        })
    }
}

#[cfg(test)]
pub(crate) fn response_from_json(value: serde_json::Value) -> OmdbResponse {
    serde_json::from_value(value).expect("valid OMDb payload")
}
