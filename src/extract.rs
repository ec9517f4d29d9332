//! The extract module mines stored page digests for API commands using
//! an LLM model, runs every candidate through the mapping validator and
//! stores the accepted commands in the database.

use anyhow::{Result, bail};
use llm::builder::LLMBuilder;
use llm::chat::{ChatMessage, ChatMessageBuilder, ChatProvider};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;

use crate::ExtractTarget;
use crate::constants::{DEFAULT_EXTRACTION_PROMPT, THINK_STRIPPER};
use crate::mapping::{CommandCandidate, NormalizedCommand, Rejection, normalize};
use crate::storage::Storage;

use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};
use std::time::Duration;

static THINK_STRIPPER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(THINK_STRIPPER).expect("Failed to compile THINK_STRIPPER regex"));

/// Configuration containing shared data for extraction operations
pub struct ExtractContext<'a> {
    /// LLM model to use for extraction
    pub model: &'a dyn ChatProvider,
    /// Prompt template to use
    pub prompt_template: Option<&'a str>,
    /// Rate limiter for controlling request frequency
    pub rate_limiter: Option<&'a StdTokenBucket>,
}

/// What one page's extraction produced. Rejected candidates keep their
/// typed reason so the caller can re-prompt or surface them for human
/// review; this module never retries on its own.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub accepted: Vec<NormalizedCommand>,
    pub rejected: Vec<(CommandCandidate, Rejection)>,
}

/// Extracts commands from stored page digests and persists the accepted
/// ones. Pages are processed in batches to avoid overloading memory,
/// and a single page's failure never aborts the batch.
///
/// # Arguments
///
/// * `db_path` - Path to the database containing digested pages
/// * `llm_builder` - The LLM builder to create the model for extraction
/// * `prompt_template` - Optional prompt template override
/// * `target` - Which pages to extract from
/// * `rpm` - Rate limit: requests per minute (default: no limit)
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if any operation fails
///
/// # Errors
///
/// Returns an error if:
/// * The LLM model fails to build
/// * Database operations fail
/// * Pages were processed but not a single command was accepted from
///   any of them (total absence of extractable content)
pub async fn extract(
    db_path: &str,
    llm_builder: LLMBuilder,
    prompt_template: Option<&str>,
    target: ExtractTarget,
    rpm: Option<u32>,
) -> Result<()> {
    let model = llm_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build LLM model: {}", e))?;

    let rate_limiter: Option<StdTokenBucket> = rpm.and_then(|rpm| {
        let capacity = rpm.max(1) as u64;
        let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

        TokenBucketBuilder::builder()
            .capacity(capacity)
            .refill_amount(1_u64)
            .refill_every(refill_interval)
            .with_time(rate_guard::StdTimeSource::new())
            .with_precision::<rate_guard::Nanos>()
            .build()
            .ok()
    });

    let storage = Storage::new(db_path)?;

    let ctx = ExtractContext {
        model: model.as_ref(),
        prompt_template,
        rate_limiter: rate_limiter.as_ref(),
    };

    let totals = match &target {
        ExtractTarget::Unextracted => {
            info!("Extracting commands from pages in {db_path} without extracted commands...");
            extract_unextracted_pages(&ctx, &storage).await?
        }
        ExtractTarget::All => {
            info!("Extracting commands from ALL digested pages in {db_path}...");
            extract_all_pages(&ctx, &storage).await?
        }
        ExtractTarget::Page { url } => {
            info!("Extracting commands from page {url} in {db_path}...");
            extract_single_page(&ctx, &storage, url).await?
        }
    };

    if totals.pages == 0 {
        match &target {
            ExtractTarget::Unextracted => {
                info!("No pages to extract from. All digested pages already carry commands.");
            }
            ExtractTarget::All => {
                info!("No digested pages in the database.");
            }
            ExtractTarget::Page { url } => {
                info!("Page {url} not found or carries no digest.");
            }
        }
        return Ok(());
    }

    info!(
        "Extracted {} commands from {} pages ({} candidates rejected)",
        totals.accepted, totals.pages, totals.rejected
    );

    if totals.accepted == 0 {
        bail!("no API commands could be extracted from any page");
    }

    Ok(())
}

/// Running counts across one extraction run.
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    pages: u32,
    accepted: u32,
    rejected: u32,
}

impl Totals {
    fn absorb(&mut self, outcome: &ExtractionOutcome) {
        self.pages += 1;
        self.accepted += outcome.accepted.len() as u32;
        self.rejected += outcome.rejected.len() as u32;
    }
}

const FETCH_BATCH_SIZE: u32 = 100;

/// Extracts from pages that have a digest but no commands yet
async fn extract_unextracted_pages(ctx: &ExtractContext<'_>, storage: &Storage) -> Result<Totals> {
    extract_fetched_pages(ctx, storage, || {
        storage.fetch_unextracted_pages(FETCH_BATCH_SIZE)
    })
    .await
}

/// Extracts from ALL digested pages, regardless of existing commands
async fn extract_all_pages(ctx: &ExtractContext<'_>, storage: &Storage) -> Result<Totals> {
    let offset = RefCell::new(0);
    let has_more = RefCell::new(true);
    extract_fetched_pages(ctx, storage, || {
        if !*has_more.borrow() {
            return Ok(Vec::new());
        }

        let batch = storage.fetch_digested_pages(FETCH_BATCH_SIZE, *offset.borrow())?;
        let batch_size = batch.len();
        *offset.borrow_mut() += FETCH_BATCH_SIZE;
        if batch_size < FETCH_BATCH_SIZE as usize {
            *has_more.borrow_mut() = false;
        }

        Ok(batch)
    })
    .await
}

/// Extracts from a single page by URL
async fn extract_single_page(
    ctx: &ExtractContext<'_>,
    storage: &Storage,
    url: &str,
) -> Result<Totals> {
    let digest = match storage.fetch_page_digest(url)? {
        None => return Ok(Totals::default()),
        Some(digest) => digest,
    };
    let outcome = extract_page(url, &digest, ctx).await?;
    store_outcome(storage, url, &outcome)?;

    let mut totals = Totals::default();
    totals.absorb(&outcome);
    Ok(totals)
}

/// Generalized function to extract from pages using a fetcher callback
async fn extract_fetched_pages<F>(
    ctx: &ExtractContext<'_>,
    storage: &Storage,
    mut fetcher: F,
) -> Result<Totals>
where
    F: FnMut() -> Result<Vec<(String, String)>>,
{
    let mut totals = Totals::default();

    loop {
        let batch = fetcher()?;
        if batch.is_empty() {
            break;
        }

        for (url, digest) in batch {
            let outcome = extract_page(&url, &digest, ctx).await?;
            store_outcome(storage, &url, &outcome)?;
            totals.absorb(&outcome);
        }
    }

    Ok(totals)
}

fn store_outcome(storage: &Storage, url: &str, outcome: &ExtractionOutcome) -> Result<()> {
    for (candidate, rejection) in &outcome.rejected {
        warn!("Rejected candidate {:?} from {url}: {rejection}", candidate.name);
    }

    let commands = serde_json::to_string(&outcome.accepted)?;
    storage.update_page_commands(url, &commands)?;
    debug!(
        "Stored {} commands for {url} ({} rejected)",
        outcome.accepted.len(),
        outcome.rejected.len()
    );
    Ok(())
}

/// Mines a single page digest for API commands with the LLM model and
/// validates every candidate against the placeholder grammar.
///
/// # Arguments
///
/// * `url` - The URL the digest came from
/// * `digest` - The page digest
/// * `ctx` - Context containing model, prompt template, and rate limiter
///
/// # Returns
///
/// Returns the accepted and rejected candidates for the page
///
/// # Errors
///
/// Returns an error if the LLM chat operation fails. A reply that is
/// not valid JSON is not an error: it is logged and treated as an empty
/// result so the batch continues.
pub async fn extract_page(
    url: &str,
    digest: &str,
    ctx: &ExtractContext<'_>,
) -> Result<ExtractionOutcome> {
    let prompt_template = ctx.prompt_template.unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    let prompt = prompt_template
        .replace("{url}", url)
        .replace("{digest}", digest);

    let mut messages: Vec<ChatMessageBuilder> = vec![ChatMessage::user().content(prompt)];

    if !prompt_template.contains("{digest}") {
        messages.push(ChatMessage::user().content(digest));
    }

    let messages: Vec<ChatMessage> = messages
        .into_iter()
        .map(|message| message.build())
        .collect();

    if let Some(limiter) = ctx.rate_limiter {
        loop {
            match limiter.try_acquire(1) {
                Ok(()) => break,
                Err(_) => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    let response = ctx
        .model
        .chat(&messages)
        .await
        .map_err(|err| anyhow::anyhow!("LLM error: {err}."))?
        .to_string();

    let reply = THINK_STRIPPER_REGEX
        .replace_all(&response, "")
        .to_string()
        .trim()
        .to_owned();

    let mut outcome = ExtractionOutcome::default();
    for candidate in parse_candidates(url, &reply) {
        match normalize(&candidate) {
            Ok(command) => outcome.accepted.push(command),
            Err(rejection) => outcome.rejected.push((candidate, rejection)),
        }
    }

    Ok(outcome)
}

/// Parses the model reply into command candidates. Accepts a bare JSON
/// array or a `{"commands": [...]}` wrapper, with or without markdown
/// fences. Anything else is logged and yields no candidates.
fn parse_candidates(url: &str, reply: &str) -> Vec<CommandCandidate> {
    let body = strip_code_fences(reply);

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(parse_error) => {
            warn!("Malformed JSON from model for {url}: {parse_error}");
            return Vec::new();
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("commands") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                warn!("Unexpected JSON shape from model for {url}");
                Vec::new()
            }
        },
        _ => {
            warn!("Unexpected JSON shape from model for {url}");
            Vec::new()
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<CommandCandidate>(item).ok())
        .collect()
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
