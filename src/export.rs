//! The export module writes extracted commands from the database to a
//! JSON file for review before anything is pushed to the platform.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

use crate::mapping::NormalizedCommand;
use crate::storage::Storage;

/// One exported command with the page it was mined from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCommand {
    pub source_url: String,
    pub name: String,
    pub method: String,
    pub url: String,
    pub curl: String,
}

/// Composes the output file by reading extracted commands from the
/// database and writing them as one flat JSON array.
///
/// Pages whose stored command list fails to deserialize are skipped
/// with a warning; a single bad row must not abort the export.
///
/// # Arguments
///
/// * `db_path` - Path to the database containing extracted commands
/// * `output_path` - Path to the output file
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if any operation fails
///
/// # Errors
///
/// Returns an error if:
/// * Database operations fail
/// * File operations fail
pub async fn export(db_path: &str, output_path: &str) -> Result<()> {
    let storage = Storage::new(db_path)?;

    info!("Exporting commands from database {db_path} to {output_path}...");

    let mut exported = Vec::new();
    for (url, commands_json) in storage.fetch_page_commands()? {
        let commands: Vec<NormalizedCommand> = match serde_json::from_str(&commands_json) {
            Ok(commands) => commands,
            Err(parse_error) => {
                warn!("Skipping {url}: stored commands are unreadable: {parse_error}");
                continue;
            }
        };

        for command in commands {
            exported.push(ExportedCommand {
                source_url: url.clone(),
                name: command.name,
                method: command.method,
                url: command.url,
                curl: command.curl,
            });
        }
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {output_path}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &exported)?;

    info!("Exported {} commands to {output_path}", exported.len());
    Ok(())
}
