use std::{str::FromStr, time::Duration};

use anyhow::{Context, bail};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub omdb_api_url: String,
    pub omdb_api_key: Option<String>,
    pub omdb_rps: u32,
    pub store_concurrency: usize,
    pub watchlist_concurrency: usize,
    pub http_timeout: Duration,
    pub fail_on_errors: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://mymdb.db?mode=rwc".to_string());

        let omdb_api_url = std::env::var("OMDB_API_URL")
            .unwrap_or_else(|_| "https://www.omdbapi.com/".to_string());

        let omdb_api_key =
            std::env::var("OMDB_API_KEY").ok().filter(|key| !key.trim().is_empty());

        Ok(Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 1)?,
            omdb_api_url,
            omdb_api_key,
            omdb_rps: env_or("OMDB_RPS", 10)?,
            store_concurrency: env_or("STORE_CONCURRENCY", 32)?,
            watchlist_concurrency: env_or("WATCHLIST_CONCURRENCY", 100)?,
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 30)?),
            fail_on_errors: flag_or("FAIL_ON_ERRORS", false)?,
        })
    }

    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.omdb_api_key.as_deref().context("OMDB_API_KEY must be set to import movies")
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().context(key.to_string()),
        _ => Ok(default),
    }
}

fn flag_or(key: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match parse_flag(&raw) {
            Some(value) => Ok(value),
            None => bail!("{key}: expected true/false, 1/0, yes/no or on/off, got {raw:?}"),
        },
        _ => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_flag_spellings() {
        for raw in ["true", "1", "YES", " on "] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["false", "0", "no", "Off"] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_flag("maybe"), None);
    }
}
