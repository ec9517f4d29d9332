//! docforge is a CLI tool that turns API documentation sites into
//! connector definitions for an integration platform.
//!
//! The pipeline runs as separate commands over one local database:
//! 1. `scrape` - Scrapes a documentation site using its sitemap and saves pages locally
//! 2. `digest` - Reduces each page to a bounded, priority-ordered content digest
//! 3. `extract` - Mines digests for API commands with an LLM and validates the mappings
//! 4. `export` - Writes the accepted commands to a JSON file for review
//! 5. `push` - Creates the connector group and its endpoints on the platform

use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use llm::builder::{LLMBackend, LLMBuilder};
use log::{LevelFilter, info, warn};
use std::str::FromStr;
use url::Url;

use docforge::auth::AuthSpec;
use docforge::mapping::NormalizedCommand;
use docforge::platform::{CreateEndpointRequest, CreateGroupRequest, PlatformClient};
use docforge::storage::Storage;
use docforge::{
    DigestConfig, DigestTarget, ExtractTarget, constants::MODEL_API_KEY_ENV_NAME,
    digest::digest_db_pages, export::export, extract::extract, scrape::process_sitemap,
};

/// A CLI tool to build platform connectors from API documentation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a documentation site using sitemap and save pages to a local database
    Scrape {
        /// The sitemap URL to scrape
        url: String,
        /// Path to database file to store pages data
        db: String,
        /// Delay between requests in milliseconds (rate limiting)
        #[arg(long, short, default_value_t = 1000)]
        delay: u64,
        /// Number of concurrent requests (default: 1)
        #[arg(long, short, default_value_t = 1)]
        concurrency: usize,
    },
    /// Reduce stored pages to bounded content digests
    Digest {
        /// Path to database file to read pages from
        db: String,
        /// Target to digest: "all" (default) or specify an URL
        #[arg(long, short = 't', default_value = "all")]
        target: DigestTarget,
        /// Hard ceiling on digest size in characters
        #[arg(long, default_value_t = 20_000)]
        ceiling: usize,
        /// Digests below this size are treated as "no relevant content"
        #[arg(long, default_value_t = 100)]
        min_chars: usize,
    },
    /// Mine digests for API commands using an LLM model and store the accepted ones
    Extract {
        /// Path to database file to read pages from
        db: String,
        /// URL of the LLM model to use for extraction
        model: String,
        /// Path to the file with a prompt template
        #[arg(long, short = 'p')]
        prompt_file: Option<String>,
        /// Target to extract: "unextracted", "all" or specify an URL
        #[arg(long, short = 't', default_value = "unextracted")]
        target: ExtractTarget,
        /// Rate limit: requests per minute (default: no limit)
        #[arg(long, short = 'r')]
        rpm: Option<u32>,
    },
    /// Write extracted commands to a JSON file for review
    Export {
        /// Path to database file to read pages from
        db: String,
        /// Path to output file to write commands to
        output_file: String,
    },
    /// Create the connector group and its endpoints on the platform
    Push {
        /// Path to database file to read commands from
        db: String,
        /// Name for a new connector group (single word)
        #[arg(long, short = 'n')]
        group_name: Option<String>,
        /// Path to a JSON file with the group's auth configuration
        #[arg(long, short = 'a')]
        auth_file: Option<String>,
        /// Id of an existing connector group to push into
        #[arg(long, short = 'g')]
        group_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Scrape {
            db,
            url,
            delay,
            concurrency,
        } => {
            process_sitemap(
                Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid sitemap url: {}", e))?,
                &db,
                delay,
                concurrency,
            )
            .await
        }
        Command::Digest {
            db,
            target,
            ceiling,
            min_chars,
        } => {
            let config = DigestConfig::default()
                .with_ceiling(ceiling)
                .with_min_chars(min_chars);
            digest_db_pages(&db, target, &config).await
        }
        Command::Extract {
            db,
            model,
            prompt_file,
            target,
            rpm,
        } => handle_extract_command(db, model, prompt_file, target, rpm).await,
        Command::Export { db, output_file } => export(&db, &output_file).await,
        Command::Push {
            db,
            group_name,
            auth_file,
            group_id,
        } => handle_push_command(db, group_name, auth_file, group_id).await,
    }
}

async fn handle_extract_command(
    db: String,
    model: String,
    prompt_file: Option<String>,
    target: ExtractTarget,
    rpm: Option<u32>,
) -> Result<()> {
    let model_url = Url::parse(&model).map_err(|e| anyhow::anyhow!("Invalid model URL: {}", e))?;
    let llm_builder = LLMBuilder::new()
        .backend(
            LLMBackend::from_str(model_url.scheme())
                .map_err(|e| anyhow::anyhow!("Invalid LLM backend: {}", e))?,
        )
        .model(
            [
                model_url
                    .host_str()
                    .context("Specify model name as host URL.")?,
                model_url.username(),
            ]
            .iter()
            .filter(|x| !x.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(":"),
        );

    let llm_builder = match std::env::var(MODEL_API_KEY_ENV_NAME) {
        Ok(model_key) => llm_builder.api_key(model_key),
        Err(err) => {
            info!("{err} while providing api key");
            llm_builder
        }
    };

    let prompt_template = match prompt_file {
        Some(file) => {
            let content =
                fs::read_to_string(&file).context(format!("Failed to read prompt file: {file}"))?;
            Some(content)
        }
        None => None,
    };

    extract(&db, llm_builder, prompt_template.as_deref(), target, rpm).await
}

async fn handle_push_command(
    db: String,
    group_name: Option<String>,
    auth_file: Option<String>,
    group_id: Option<String>,
) -> Result<()> {
    let client = PlatformClient::from_env()?;
    let storage = Storage::new(&db)?;

    let group_id = match group_id {
        Some(id) => id,
        None => {
            let name =
                group_name.context("--group-name is required when no --group-id is given")?;
            let auth_path =
                auth_file.context("--auth-file is required when creating a connector group")?;
            let auth_raw = fs::read_to_string(&auth_path)
                .context(format!("Failed to read auth file: {auth_path}"))?;
            let auth: AuthSpec = serde_json::from_str(&auth_raw)
                .context(format!("Invalid auth configuration in {auth_path}"))?;

            client.create_group(&CreateGroupRequest { name, auth }).await?
        }
    };

    let mut pushed = 0_u32;
    let mut failed = 0_u32;
    for (url, commands_json) in storage.fetch_page_commands()? {
        let commands: Vec<NormalizedCommand> = match serde_json::from_str(&commands_json) {
            Ok(commands) => commands,
            Err(parse_error) => {
                warn!("Skipping {url}: stored commands are unreadable: {parse_error}");
                continue;
            }
        };

        for command in commands {
            let request = CreateEndpointRequest {
                name: command.name,
                curl: command.curl,
                connector_group_id: group_id.clone(),
            };
            match client.create_endpoint(&request).await {
                Ok(()) => pushed += 1,
                Err(push_error) => {
                    warn!("Failed to create endpoint {}: {push_error}", request.name);
                    failed += 1;
                }
            }
        }
    }

    if pushed == 0 && failed == 0 {
        info!("No extracted commands to push.");
    } else {
        info!("Pushed {pushed} endpoints ({failed} failed)");
    }
    Ok(())
}
