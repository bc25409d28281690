use anyhow::{Context, Result};
use log::info;
use sportsdb_api::places::Places;
use std::path::Path;

pub const DEFAULT_OUTPUT: &str = "local_sports_venues.json";

/// Look up stadiums around `address` and save them to `out`. Returns how
/// many venues were written; nothing is written when there are none.
pub async fn discover(places: &Places, address: &str, out: &Path) -> Result<usize> {
    let venues = places
        .search_local_venues(address)
        .await
        .with_context(|| format!("venue search for {address:?} failed"))?;

    if venues.is_empty() {
        info!("No venues found near {address:?}");
        return Ok(0);
    }

    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {} failed", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(&venues)?;
    std::fs::write(out, payload).with_context(|| format!("write {} failed", out.display()))?;

    info!("Saved {} venues near {address:?} to {}", venues.len(), out.display());
    Ok(venues.len())
}
