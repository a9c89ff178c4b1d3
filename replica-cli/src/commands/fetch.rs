//! Fetch once and print the response.

use anyhow::{Context, Result};

use super::{key_map, KeyArg, Target};
use crate::json;

/// Run the fetch command.
pub async fn run(target: &Target, keys: &[KeyArg]) -> Result<()> {
    let output = fetch_json(target, keys).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Fetch from `target` and render the response as JSON.
///
/// With no keys the whole store is requested.
pub async fn fetch_json(target: &Target, keys: &[KeyArg]) -> Result<serde_json::Value> {
    let client = target.client();
    let response = if keys.is_empty() {
        client.fetch_all().await
    } else {
        client.fetch_keys(key_map(keys)).await
    }
    .with_context(|| format!("Failed to fetch from {}", target.addr))?;

    tracing::debug!("Received {} entries", response.len());
    Ok(json::snapshot_to_json(&response))
}
