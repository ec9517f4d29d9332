//! The digest module assembles selected fragments into the bounded text
//! blob handed to the LLM, and drives the classify/dedupe/assemble
//! pipeline over pages stored in the database.

use anyhow::Result;
use log::{error, info};

use crate::DigestTarget;
use crate::config::DigestConfig;
use crate::content::PageContent;
use crate::dedupe::{ExtractionRecord, dedupe};
use crate::storage::{Page, Storage};

/// The final bounded digest of one page. Sections appear in the fixed
/// assembly order regardless of where their fragments sat on the page,
/// and the cumulative size never exceeds the configured ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub text: String,
    /// Cumulative character count of headers and fragments, excluding
    /// the trailing size marker.
    pub size: usize,
}

impl Digest {
    /// A digest below the minimum informativeness threshold carries no
    /// mineable signal; the caller skips the page entirely.
    pub fn is_thin(&self, min_chars: usize) -> bool {
        self.size < min_chars
    }
}

/// Concatenates extraction records into a digest under the configured
/// ceiling.
///
/// Categories are processed in the fixed assembly order. A category
/// header is emitted only once a fragment of that category survives,
/// and headers count toward the budget like any other text. Within a
/// category, the first fragment that would overflow the ceiling is
/// dropped along with every later fragment of that category; later
/// categories still get whatever budget remains. Deterministic: the
/// same records and ceiling always produce byte-identical output.
pub fn assemble(records: &[ExtractionRecord], config: &DigestConfig) -> Digest {
    let mut text = String::new();
    let mut size = 0_usize;

    for category in &config.assembly_order {
        if size >= config.ceiling {
            break;
        }

        let header = format!("## {}\n", category.label());
        let header_size = header.chars().count();
        let mut header_written = false;

        for record in records.iter().filter(|record| record.category == *category) {
            let fragment_size = record.size + 1;
            let needed = if header_written {
                fragment_size
            } else {
                header_size + fragment_size
            };

            if size + needed > config.ceiling {
                // This fragment and all later ones in the category are
                // dropped silently.
                break;
            }

            if !header_written {
                text.push_str(&header);
                header_written = true;
            }
            text.push_str(&record.text);
            text.push('\n');
            size += needed;
        }
    }

    text.push_str(&format!("\n[digest size: {size} chars]\n"));

    Digest { text, size }
}

/// Runs the full core pipeline over one page's HTML.
pub fn digest_page(html: &str, config: &DigestConfig) -> (PageContent, Digest) {
    let content = PageContent::parse(html);
    let records = dedupe(&content, config);
    let digest = assemble(&records, config);
    (content, digest)
}

/// Digests stored pages and persists the result.
///
/// Pages whose digest falls below the informativeness threshold are
/// recorded as empty so downstream extraction skips them; the batch
/// continues past any single page.
///
/// # Arguments
///
/// * `db_path` - Path to the database file to read pages from
/// * `target` - The digest target (all pages or a specific page)
/// * `config` - Pipeline configuration (ceiling, windows, orders)
///
/// # Errors
///
/// Returns an error if database operations fail.
pub async fn digest_db_pages(
    db_path: &str,
    target: DigestTarget,
    config: &DigestConfig,
) -> Result<()> {
    let storage = Storage::new(db_path)?;

    match target {
        DigestTarget::All => {
            let urls = storage.list_urls()?;
            for url in urls {
                let page = match storage.get_page(&url)? {
                    Some(page) => page,
                    None => continue,
                };
                digest_stored_page(&storage, page, config)?;
            }
        }
        DigestTarget::Page { url } => {
            let page = match storage.get_page(&url)? {
                Some(page) => page,
                None => {
                    error!("Page not found: {url}");
                    return Ok(());
                }
            };
            digest_stored_page(&storage, page, config)?;
        }
    }

    Ok(())
}

fn digest_stored_page(storage: &Storage, mut page: Page, config: &DigestConfig) -> Result<()> {
    let url = page.url.clone();
    let (content, digest) = digest_page(&page.html, config);

    if digest.is_thin(config.min_chars) {
        info!("No relevant content on {url} ({} chars), skipping", digest.size);
        page.digest = Some(String::new());
    } else {
        info!("Digested {url}: {} chars", digest.size);
        page.digest = Some(digest.text);
    }

    if page.title.is_none() {
        page.title = content.title;
    }
    storage.upsert_page(&page)?;

    Ok(())
}
