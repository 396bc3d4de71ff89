use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::{error::AppResult, models::LookupKey};

/// Lists every entry under `path` as a title query. Order follows the
/// filesystem and is not stable.
pub async fn list_directory(path: &Path) -> AppResult<Vec<LookupKey>> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("failed to read directory {}", path.display()))?;

    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let query = searchable_name(&name.to_string_lossy());
        debug!(entry = ?name, query = %query, "found library entry");
        keys.push(LookupKey::Title(query));
    }

    Ok(keys)
}

pub fn searchable_name(name: &str) -> String {
    name.replace('.', " ").to_lowercase()
}
