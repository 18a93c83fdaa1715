//src/resolver.rs

use ahash::AHashSet;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, LookupError, Result};
use crate::extract::extract_tax_id;
use crate::lookup::{LookupClient, LookupSession};
use crate::record::TaxonRecord;
use crate::trait_sets::TRAIT_TABLE_SUFFIX;
use crate::types::ResolutionRow;

/// Column holding the taxonomic identifier in a resolution table.
pub const TAX_ID_COLUMN: &str = "tax_id";

/// Column of the input CSV holding query identifiers.
pub const ID_COLUMN: &str = "ID";

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Identifiers per batch; each batch is flushed before the next starts.
    pub batch_size: usize,
    /// Concurrent lookups within a batch.
    pub workers: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            workers: 100,
        }
    }
}

/// A persisted `tax_id,<trait>` table.
#[derive(Debug, Clone)]
pub struct ResolutionTable {
    pub path: PathBuf,
    pub trait_name: String,
}

impl ResolutionTable {
    /// `<dir>/<stem>.csv` resolves into `<dir>/<stem>_ncbi.csv` with trait `<stem>`.
    pub fn for_input(input: &Path) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: input.with_file_name(format!("{}{}", stem, TRAIT_TABLE_SUFFIX)),
            trait_name: stem,
        }
    }
}

/// How one identifier's lookup ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Found(u64),
    /// A record came back without any taxonomic identifier in it.
    NotFound,
    /// The service returned no records.
    NoResult,
    Error(&'static str),
}

impl Outcome {
    pub fn tax_id(&self) -> Option<u64> {
        match self {
            Outcome::Found(t) => Some(*t),
            _ => None,
        }
    }

    fn status(&self) -> String {
        match self {
            Outcome::Found(_) => "found".to_string(),
            Outcome::NotFound => "not found".to_string(),
            Outcome::NoResult => "no result".to_string(),
            Outcome::Error(kind) => format!("error: {}", kind),
        }
    }
}

/// Tallies for one resolver run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolveSummary {
    pub found: usize,
    pub not_found: usize,
    pub no_result: usize,
    pub errors: usize,
    /// Rows left in the table after cleanup.
    pub final_rows: usize,
}

impl ResolveSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Found(_) => self.found += 1,
            Outcome::NotFound => self.not_found += 1,
            Outcome::NoResult => self.no_result += 1,
            Outcome::Error(_) => self.errors += 1,
        }
    }
}

/// Search, then take the first record of the result set if there is one.
fn first_record<S: LookupSession + ?Sized>(
    session: &mut S,
    identifier: &str,
) -> std::result::Result<Option<TaxonRecord>, LookupError> {
    session.search(identifier)?;
    let mut records = session.retrieve()?;
    records.next().transpose()
}

/// Resolve one identifier through its own session of the shared client.
pub fn resolve_one<C: LookupClient + ?Sized>(client: &C, identifier: &str) -> Outcome {
    let mut session = client.session();
    let outcome = match first_record(session.as_mut(), identifier) {
        Ok(Some(record)) => match extract_tax_id(&record) {
            Some(tax_id) => Outcome::Found(tax_id),
            None => Outcome::NotFound,
        },
        Ok(None) => Outcome::NoResult,
        Err(e) => {
            log::warn!("Error for {}: {} {}", identifier, e.kind(), e);
            Outcome::Error(e.kind())
        }
    };

    let tax_id = outcome
        .tax_id()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "None".to_string());
    log::info!("{:>8} -> {} tax_id={}", identifier, outcome.status(), tax_id);
    outcome
}

/// Resolve `identifiers` into `table`, batch by batch.
///
/// An existing non-empty table is appended to; the header is written only
/// when the table is created. Each batch is flushed to disk before the next
/// one starts. When all batches are done the table is cleaned: rows without
/// a tax id are dropped and exact duplicates removed.
pub fn resolve_batch<C: LookupClient + ?Sized>(
    identifiers: &[String],
    client: &C,
    table: &ResolutionTable,
    config: &ResolverConfig,
    progress: &ProgressBar,
) -> Result<ResolveSummary> {
    let total = identifiers.len();
    let batch_size = config.batch_size.max(1);

    let table_existed = fs::metadata(&table.path)
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    if !table_existed {
        let file = File::create(&table.path).map_err(|e| Error::io(&table.path, e))?;
        let mut writer = csv::Writer::from_writer(&file);
        writer.write_record([TAX_ID_COLUMN, table.trait_name.as_str()])?;
        writer.flush().map_err(|e| Error::io(&table.path, e))?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()?;

    progress.set_length(total as u64);
    let processed = AtomicUsize::new(0);
    let mut summary = ResolveSummary::default();

    for (batch_no, batch) in identifiers.chunks(batch_size).enumerate() {
        let start = batch_no * batch_size;
        log::info!(
            "Starting batch {}-{} ({} items)",
            start + 1,
            start + batch.len(),
            batch.len()
        );

        let outcomes: Vec<Outcome> = pool.install(|| {
            batch
                .par_iter()
                .with_max_len(1)
                .map(|identifier| {
                    let outcome = resolve_one(client, identifier);
                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.inc(1);
                    log::info!("Progress: {}/{}", done, total);
                    outcome
                })
                .collect()
        });

        let rows: Vec<ResolutionRow> = outcomes
            .iter()
            .map(|outcome| {
                summary.record(outcome);
                ResolutionRow {
                    tax_id: outcome.tax_id(),
                    flag: true,
                }
            })
            .collect();
        append_rows(&table.path, &rows)?;

        log::info!(
            "Batch {}-{} saved ({} rows appended)",
            start + 1,
            start + batch.len(),
            rows.len()
        );
    }

    log::info!("Cleaning output file: removing empty tax_id rows and duplicates...");
    summary.final_rows = clean_table(&table.path)?;
    log::info!("Cleaning complete. Final rows: {}", summary.final_rows);

    Ok(summary)
}

/// Append rows and push them to durable storage.
fn append_rows(path: &Path, rows: &[ResolutionRow]) -> Result<()> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    {
        let mut writer = csv::Writer::from_writer(&file);
        for row in rows {
            writer.write_record(row.to_record())?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
    }
    file.sync_data().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Drop rows with an empty tax id and exact duplicates, keeping first
/// occurrences in order. Returns the number of rows left.
pub fn clean_table(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let tax_idx = headers
        .iter()
        .position(|h| h.trim() == TAX_ID_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: TAX_ID_COLUMN.to_string(),
        })?;

    let mut seen: AHashSet<Vec<String>> = AHashSet::new();
    let mut kept: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let tax_id = record.get(tax_idx).unwrap_or("").trim();
        if tax_id.is_empty() {
            continue;
        }
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if seen.insert(row.clone()) {
            kept.push(row);
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(&file);
        writer.write_record(&headers)?;
        for row in &kept {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| Error::io(&tmp_path, e))?;
        file.sync_data().map_err(|e| Error::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(kept.len())
}

/// Read query identifiers from the `ID` column of `path`.
///
/// Values are trimmed; blanks and non-decimal values are dropped and
/// duplicates removed, first occurrence first.
pub fn read_identifiers(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let id_idx = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == ID_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: ID_COLUMN.to_string(),
        })?;

    let mut seen = AHashSet::new();
    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record?;
        let raw = record.get(id_idx).unwrap_or("").trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        // "007" and "7" name the same strain
        let Ok(numeric) = raw.parse::<u64>() else {
            continue;
        };
        if seen.insert(numeric) {
            identifiers.push(numeric.to_string());
        }
    }
    Ok(identifiers)
}
