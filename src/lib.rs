// src/lib.rs
pub mod annotate;
pub mod error;
pub mod extract;
pub mod fasta;
pub mod hits;
pub mod lookup;
pub mod mmseqs;
pub mod record;
pub mod reshape;
pub mod resolver;
pub mod trait_sets;
pub mod types;

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::fasta::fasta_text;
use crate::hits::read_hits;
use crate::reshape::{annotate_and_reshape, tsv_text, write_tsv, LongTable, WideTable};
use crate::trait_sets::{load_trait_dir, TraitSets};
use crate::types::{AlignmentHit, FastaRecord};

pub use crate::error::Error;

/// Annotated views of one search run.
/// Holds structured rows only; text is rendered on demand.
pub struct AnnotationResults {
    /// Hits as parsed from the search output, in file order.
    pub hits: Vec<AlignmentHit>,

    /// One row per target with per-seed identity columns.
    pub wide: WideTable,

    /// One row per hit.
    pub long: LongTable,

    /// Input for the clustering stage, one entry per hit.
    pub fasta: Vec<FastaRecord>,

    pub trait_sets: TraitSets,
}

impl AnnotationResults {
    /// Build every view from already parsed hits.
    pub fn from_hits(hits: Vec<AlignmentHit>, trait_sets: TraitSets) -> Self {
        let reshaped = annotate_and_reshape(&hits, &trait_sets);
        Self {
            hits,
            wide: reshaped.wide,
            long: reshaped.long,
            fasta: reshaped.fasta,
            trait_sets,
        }
    }

    /// Wide table as TSV text
    pub fn get_wide_table(&self) -> Result<String> {
        tsv_text(&self.wide.header(), self.wide.records())
    }

    /// Long table as TSV text
    pub fn get_long_table(&self) -> Result<String> {
        tsv_text(&self.long.header(), self.long.records())
    }

    /// Clustering input as FASTA text
    pub fn get_hits_fasta(&self) -> String {
        fasta_text(&self.fasta)
    }

    pub fn write_wide_table(&self, path: &Path) -> Result<()> {
        write_tsv(path, &self.wide.header(), self.wide.records())
    }

    pub fn write_long_table(&self, path: &Path) -> Result<()> {
        write_tsv(path, &self.long.header(), self.long.records())
    }
}

/// Check that the seeds file exists, then make sure `output_dir` does.
///
/// Nothing is created when `input` is missing.
pub fn prepare_project(input: &Path, output_dir: &Path) -> Result<()> {
    if !input.is_file() {
        return Err(Error::MissingInput(input.to_path_buf()));
    }
    if output_dir.exists() {
        log::info!("Output directory already exists, files will be overwritten");
    } else {
        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
        log::info!("Created project directory {}", output_dir.display());
    }
    Ok(())
}

/// Read a search table, load trait tables from `traits_dir` (if any) and
/// build the annotated views.
pub fn annotate_search_results(
    hits_path: &Path,
    traits_dir: Option<&Path>,
) -> Result<AnnotationResults> {
    let hits = read_hits(hits_path)?;
    log::info!("Read {} hits from {}", hits.len(), hits_path.display());

    let trait_sets = load_trait_dir(traits_dir);
    if trait_sets.is_empty() {
        log::info!("No trait tables loaded; trait and Annotation columns are omitted");
    }

    Ok(AnnotationResults::from_hits(hits, trait_sets))
}
