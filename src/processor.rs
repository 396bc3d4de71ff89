use futures::{StreamExt, stream};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};

use crate::{
    catalog::CatalogStore,
    error::{AppError, AppResult},
    models::{LookupKey, StatusFlag, UpsertOutcome},
    provider::{MetadataProvider, ProviderError},
    report::ImportReport,
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ProviderError),
    #[error("failed to save movie: {0}")]
    Store(#[from] AppError),
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub key: LookupKey,
    pub result: Result<UpsertOutcome, ImportError>,
}

/// Drops keys whose movie is already stored with `flag` set. Title queries have
/// no id yet and always pass through.
pub async fn filter_existing(
    catalog: &CatalogStore,
    keys: Vec<LookupKey>,
    flag: StatusFlag,
) -> AppResult<Vec<LookupKey>> {
    let ids: Vec<String> = keys.iter().filter_map(|k| k.imdb_id().map(str::to_string)).collect();
    if ids.is_empty() {
        return Ok(keys);
    }

    let existing = catalog.existing_keys(&ids, flag).await?;
    info!("{} already exist", existing.len());

    Ok(keys.into_iter().filter(|k| k.imdb_id().is_none_or(|id| !existing.contains(id))).collect())
}

/// Fetches and upserts every key with at most `max_concurrent` tasks in flight,
/// then reports once all of them have settled.
pub async fn import(
    catalog: &CatalogStore,
    provider: &dyn MetadataProvider,
    keys: Vec<LookupKey>,
    flag: StatusFlag,
    max_concurrent: usize,
) -> AppResult<ImportReport> {
    let candidates = keys.len();
    let keys = filter_existing(catalog, keys, flag).await?;
    let skipped = candidates - keys.len();
    let total = keys.len();

    info!(total, skipped, max_concurrent, "fetching data for each movie");

    let outcomes: Vec<TaskOutcome> = stream::iter(keys.into_iter().enumerate())
        .map(|(i, key)| {
            let span = info_span!("movie", key = %key);
            async move {
                debug!("[{}/{}] fetching \"{}\"", i + 1, total, key);
                let result = import_one(catalog, provider, &key, flag).await;
                if let Err(err) = &result {
                    error!(error = %err, "failed to import \"{}\"", key);
                }
                TaskOutcome { key, result }
            }
            .instrument(span)
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let report = ImportReport::from_outcomes(skipped, outcomes);
    report.log_summary();
    Ok(report)
}

async fn import_one(
    catalog: &CatalogStore,
    provider: &dyn MetadataProvider,
    key: &LookupKey,
    flag: StatusFlag,
) -> Result<UpsertOutcome, ImportError> {
    let record = match key {
        LookupKey::Title(title) => provider.find_by_title(title).await?,
        LookupKey::ImdbId(id) => provider.find_by_id(id).await?,
    };
    debug!(imdb_id = %record.imdb_id, title = %record.title, "fetched movie");

    Ok(catalog.upsert(&record, flag).await?)
}
