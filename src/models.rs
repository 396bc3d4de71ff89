use std::fmt;

/// A key handed to the metadata provider: either a free-text title query or an
/// exact IMDb id.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum LookupKey {
    Title(String),
    ImdbId(String),
}

impl LookupKey {
    pub fn as_str(&self) -> &str {
        match self {
            LookupKey::Title(title) => title,
            LookupKey::ImdbId(id) => id,
        }
    }

    pub fn imdb_id(&self) -> Option<&str> {
        match self {
            LookupKey::Title(_) => None,
            LookupKey::ImdbId(id) => Some(id),
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusFlag {
    OnWatchlist,
    InStore,
}

impl StatusFlag {
    pub fn label(self) -> &'static str {
        match self {
            StatusFlag::OnWatchlist => "on watchlist",
            StatusFlag::InStore => "in store",
        }
    }
}

/// Provider-independent movie metadata, normalized right after fetch.
///
/// `runtime` is `-1` when the provider's duration could not be read, and the
/// two scores are `None` when the provider reported them as missing.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieRecord {
    pub imdb_id: String,
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub language: String,
    pub awards: String,
    pub poster: String,
    pub imdb_rating: Option<f64>,
    pub metascore: Option<f64>,
    pub genres: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
    Created,
    Marked,
}

#[derive(Clone, Debug, Default)]
pub struct MovieFilter {
    pub search: Option<String>,
    pub on_watchlist: bool,
    pub in_store: bool,
}
