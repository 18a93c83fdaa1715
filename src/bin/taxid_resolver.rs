use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;

use homolog_traits::error::Result;
use homolog_traits::lookup::{BacdiveClient, BACDIVE_BASE_URL};
use homolog_traits::resolver::{read_identifiers, resolve_batch, ResolutionTable, ResolverConfig};
use homolog_traits::Error;

/// Resolve BacDive strain IDs to NCBI taxonomy IDs.
///
/// Reads the `ID` column of INPUT_CSV and writes `<stem>_ncbi.csv` next to
/// it. Re-running appends to an existing table, so gaps left by failed
/// lookups can be filled by running again.
#[derive(Parser)]
#[command(name = "taxid-resolver")]
#[command(version)]
struct Args {
    /// CSV file with an `ID` column of BacDive strain IDs
    input_csv: PathBuf,

    /// Base URL of the BacDive API
    #[arg(long, env = "BACDIVE_BASE_URL", default_value = BACDIVE_BASE_URL)]
    base_url: String,

    /// Identifiers per batch; each batch is saved before the next starts
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Concurrent lookups per batch
    #[arg(long, default_value_t = 100)]
    workers: usize,
}

fn run(args: Args) -> Result<()> {
    if !args.input_csv.is_file() {
        return Err(Error::MissingInput(args.input_csv));
    }

    let identifiers = read_identifiers(&args.input_csv)?;
    if identifiers.is_empty() {
        log::info!("No valid numeric BacDive IDs found in column 'ID'.");
        return Ok(());
    }

    let config = ResolverConfig {
        batch_size: args.batch_size,
        workers: args.workers,
    };
    log::info!(
        "Processing {} numeric BacDive IDs ({} workers, batches of {}) ...",
        identifiers.len(),
        config.workers,
        config.batch_size
    );

    let client = BacdiveClient::new(&args.base_url)?;
    let table = ResolutionTable::for_input(&args.input_csv);

    let progress = ProgressBar::new(identifiers.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message("Resolving tax ids...");

    let summary = resolve_batch(&identifiers, &client, &table, &config, &progress)?;

    progress.finish_with_message(format!(
        "{} found, {} not found, {} without result, {} errors",
        summary.found, summary.not_found, summary.no_result, summary.errors
    ));
    log::info!("File saved -> {}", table.path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        process::exit(1);
    }
}
