//! Sitemap discovery: resolves a documentation site's sitemap (and any
//! nested sitemap indexes) into the set of page URLs worth scraping.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sitemap::{
    reader::{SiteMapEntity, SiteMapReader},
    structs::{Location, UrlEntry},
};

/// Extracts URL entries from a sitemap, following nested sitemap
/// indexes breadth-first until all have been read.
///
/// # Arguments
///
/// * `sitemap_url` - The URL of the sitemap to process.
///
/// # Returns
///
/// A map from page URL to its sitemap entry (which carries the lastmod
/// used for incremental re-scraping).
///
/// # Errors
///
/// Returns an error if a sitemap cannot be fetched; entries that fail
/// to parse are skipped.
pub async fn extract_sitemap_url_entries(sitemap_url: &str) -> Result<HashMap<String, UrlEntry>> {
    let client = reqwest::Client::new();
    let mut entries = HashMap::new();
    let mut pending = vec![sitemap_url.to_string()];

    while let Some(current) = pending.pop() {
        let content = client
            .get(&current)
            .send()
            .await
            .with_context(|| format!("Failed to fetch sitemap {current}"))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read sitemap body {current}"))?;

        for entity in SiteMapReader::new(&*content) {
            match entity {
                SiteMapEntity::Url(url_entry) => {
                    if let Location::Url(ref url) = url_entry.loc {
                        entries.insert(url.to_string(), url_entry);
                    }
                }
                SiteMapEntity::SiteMap(sitemap_entry) => {
                    if let Location::Url(ref url) = sitemap_entry.loc {
                        pending.push(url.to_string());
                    }
                }
                SiteMapEntity::Err(_) => continue,
            }
        }
    }

    Ok(entries)
}
