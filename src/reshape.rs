//src/reshape.rs

use ahash::{AHashMap, AHashSet};
use std::fs::File;
use std::path::Path;

use crate::annotate::annotate_hits;
use crate::error::{Error, Result};
use crate::hits::format_identity;
use crate::trait_sets::TraitSets;
use crate::types::{AlignmentHit, AnnotatedHit, FastaRecord};

/// Leading columns of the wide table.
pub const WIDE_CORE_COLUMNS: [&str; 7] = [
    "Target",
    "Sequence",
    "Percent Identity",
    "Length",
    "TaxID",
    "Organism",
    "Lineage",
];

/// Leading columns of the long table.
pub const LONG_CORE_COLUMNS: [&str; 8] = [
    "Seed",
    "Target",
    "Sequence",
    "Percent Identity",
    "Length",
    "TaxID",
    "Organism",
    "Lineage",
];

pub const ANNOTATION_COLUMN: &str = "Annotation";
pub const SEED_COLUMN: &str = "Seed";

/// Wide-table column name carrying one seed's identities.
pub fn seed_column(hit: &AlignmentHit) -> String {
    format!("SeqID ({})", hit.seed_id())
}

/// One row per target: its best hit plus every seed's identity to it.
#[derive(Debug, Clone)]
pub struct WideRow {
    pub best: AnnotatedHit,
    /// Aligned with `WideTable::seed_columns`; `None` where the seed missed.
    pub identities: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct WideTable {
    pub trait_names: Vec<String>,
    /// `SeqID (<seed>)` names in first-seen order.
    pub seed_columns: Vec<String>,
    pub rows: Vec<WideRow>,
}

/// Every hit, annotated, in input order.
#[derive(Debug, Clone, Default)]
pub struct LongTable {
    pub trait_names: Vec<String>,
    pub rows: Vec<AnnotatedHit>,
}

/// Everything the reshaping stage produces.
#[derive(Debug, Clone, Default)]
pub struct Reshaped {
    pub wide: WideTable,
    pub long: LongTable,
    /// One entry per input hit, for the clustering stage.
    pub fasta: Vec<FastaRecord>,
}

fn bool_cell(flag: bool) -> String {
    let cell = if flag { "True" } else { "False" };
    cell.to_string()
}

/// Metadata cells shared by both tables, seed excluded.
fn hit_cells(hit: &AlignmentHit) -> [String; 7] {
    [
        hit.target_accession.clone(),
        hit.target_sequence.clone(),
        format_identity(hit.percent_identity),
        hit.target_length.to_string(),
        hit.taxonomic_id.map(|t| t.to_string()).unwrap_or_default(),
        hit.organism_name.clone(),
        hit.taxonomic_lineage.clone(),
    ]
}

/// Trait flags then the annotation; nothing at all when no traits are known.
fn trait_cells(row: &AnnotatedHit, with_traits: bool, out: &mut Vec<String>) {
    if with_traits {
        out.extend(row.traits.iter().map(|&flag| bool_cell(flag)));
        out.push(row.annotation.clone());
    }
}

fn trait_header(trait_names: &[String], out: &mut Vec<String>) {
    if !trait_names.is_empty() {
        out.extend(trait_names.iter().cloned());
        out.push(ANNOTATION_COLUMN.to_string());
    }
}

impl WideTable {
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = WIDE_CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
        trait_header(&self.trait_names, &mut header);
        header.extend(self.seed_columns.iter().cloned());
        header.push(SEED_COLUMN.to_string());
        header
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        let with_traits = !self.trait_names.is_empty();
        self.rows.iter().map(move |row| {
            let mut cells: Vec<String> = hit_cells(&row.best.hit).to_vec();
            trait_cells(&row.best, with_traits, &mut cells);
            cells.extend(
                row.identities
                    .iter()
                    .map(|id| id.map(format_identity).unwrap_or_default()),
            );
            cells.push(row.best.hit.seed_accession.clone());
            cells
        })
    }

    /// Row for `target`, if it was hit at all.
    pub fn row(&self, target: &str) -> Option<&WideRow> {
        self.rows
            .iter()
            .find(|row| row.best.hit.target_accession == target)
    }

    /// Identity of `seed_column` against `target`.
    pub fn identity(&self, target: &str, seed_column: &str) -> Option<f64> {
        let idx = self.seed_columns.iter().position(|c| c == seed_column)?;
        self.row(target)?.identities[idx]
    }
}

impl LongTable {
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = LONG_CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
        trait_header(&self.trait_names, &mut header);
        header
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        let with_traits = !self.trait_names.is_empty();
        self.rows.iter().map(move |row| {
            let mut cells = Vec::with_capacity(LONG_CORE_COLUMNS.len() + row.traits.len() + 1);
            cells.push(row.hit.seed_accession.clone());
            cells.extend(hit_cells(&row.hit));
            trait_cells(row, with_traits, &mut cells);
            cells
        })
    }
}

/// Indices of the best hit per target: highest identity first, ties kept
/// in input order.
pub fn best_hit_indices(rows: &[AnnotatedHit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        rows[b]
            .hit
            .percent_identity
            .total_cmp(&rows[a].hit.percent_identity)
    });

    let mut seen: AHashSet<&str> = AHashSet::new();
    order
        .into_iter()
        .filter(|&i| seen.insert(rows[i].hit.target_accession.as_str()))
        .collect()
}

/// Pivot identities per (target, seed) and attach them to each target's best hit.
pub fn build_wide(rows: &[AnnotatedHit], trait_names: &[String]) -> WideTable {
    let mut seed_columns: Vec<String> = Vec::new();
    let mut column_idx: AHashMap<String, usize> = AHashMap::new();
    // first occurrence of a (target, seed) pair wins
    let mut pivot: AHashMap<(&str, usize), f64> = AHashMap::new();

    for row in rows {
        let name = seed_column(&row.hit);
        let idx = match column_idx.get(&name) {
            Some(&idx) => idx,
            None => {
                let idx = seed_columns.len();
                column_idx.insert(name.clone(), idx);
                seed_columns.push(name);
                idx
            }
        };
        pivot
            .entry((row.hit.target_accession.as_str(), idx))
            .or_insert(row.hit.percent_identity);
    }

    let wide_rows = best_hit_indices(rows)
        .into_iter()
        .map(|i| {
            let best = &rows[i];
            let target = best.hit.target_accession.as_str();
            let identities = (0..seed_columns.len())
                .map(|idx| pivot.get(&(target, idx)).copied())
                .collect();
            WideRow {
                best: best.clone(),
                identities,
            }
        })
        .collect();

    WideTable {
        trait_names: trait_names.to_vec(),
        seed_columns,
        rows: wide_rows,
    }
}

pub fn build_long(rows: &[AnnotatedHit], trait_names: &[String]) -> LongTable {
    LongTable {
        trait_names: trait_names.to_vec(),
        rows: rows.to_vec(),
    }
}

/// FASTA entries for every hit, duplicates included.
pub fn hits_fasta(hits: &[AlignmentHit]) -> Vec<FastaRecord> {
    hits.iter()
        .map(|hit| FastaRecord {
            id: hit.target_accession.clone(),
            seq: hit.target_sequence.clone(),
        })
        .collect()
}

/// Tag, collapse and reshape `hits` into the wide and long views.
pub fn annotate_and_reshape(hits: &[AlignmentHit], sets: &TraitSets) -> Reshaped {
    let annotated = annotate_hits(hits, sets);
    let trait_names = sets.names();
    Reshaped {
        wide: build_wide(&annotated, trait_names),
        long: build_long(&annotated, trait_names),
        fasta: hits_fasta(hits),
    }
}

/// Render a header plus records as tab-separated text.
pub fn tsv_text<I>(header: &[String], records: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_tsv<I>(path: &Path, header: &[String], records: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    fn hit(seed: &str, target: &str, pident: f64, tax_id: u64) -> AlignmentHit {
        AlignmentHit {
            seed_accession: seed.into(),
            target_accession: target.into(),
            target_sequence: format!("SEQ{}", target),
            percent_identity: pident,
            target_length: 100,
            taxonomic_id: Some(tax_id),
            organism_name: format!("organism {}", tax_id),
            taxonomic_lineage: "d_Bacteria".into(),
        }
    }

    fn trait_sets() -> TraitSets {
        let mut sets = TraitSets::new();
        sets.insert("halophilic", [1u64, 2].into_iter().collect::<AHashSet<u64>>());
        sets.insert("alkaliphilic", [2u64].into_iter().collect::<AHashSet<u64>>());
        sets
    }

    #[test]
    fn test_two_seeds_one_target() {
        let hits = vec![hit("S1", "G1", 90.0, 1), hit("S2", "G1", 95.0, 2)];
        let out = annotate_and_reshape(&hits, &trait_sets());

        assert_eq!(out.wide.rows.len(), 1);
        assert_eq!(out.wide.identity("G1", "SeqID (S1)"), Some(90.0));
        assert_eq!(out.wide.identity("G1", "SeqID (S2)"), Some(95.0));

        let best = &out.wide.row("G1").unwrap().best;
        assert_eq!(best.hit.seed_accession, "S2");
        assert_eq!(best.hit.taxonomic_id, Some(2));
        assert_eq!(best.annotation, "alkaliphilic & halophilic");
    }

    #[test]
    fn test_best_hit_has_max_identity_ties_go_to_first() {
        let hits = vec![
            hit("S1", "G1", 50.0, 1),
            hit("S2", "G2", 70.0, 1),
            hit("S3", "G1", 80.0, 1),
            hit("S4", "G1", 80.0, 2),
            hit("S1", "G2", 60.0, 2),
        ];
        let annotated = annotate_hits(&hits, &TraitSets::new());
        let best = best_hit_indices(&annotated);
        assert_eq!(best, vec![2, 1]);

        let wide = build_wide(&annotated, &[]);
        for row in &wide.rows {
            let max = hits
                .iter()
                .filter(|h| h.target_accession == row.best.hit.target_accession)
                .map(|h| h.percent_identity)
                .fold(f64::MIN, f64::max);
            assert_eq!(row.best.hit.percent_identity, max);
        }
    }

    #[test]
    fn test_duplicate_pair_first_occurrence_wins() {
        let hits = vec![
            hit("S1 desc", "G1", 40.0, 1),
            hit("S1", "G1", 99.0, 1),
        ];
        let out = annotate_and_reshape(&hits, &TraitSets::new());
        assert_eq!(out.wide.seed_columns, vec!["SeqID (S1)".to_string()]);
        assert_eq!(out.wide.identity("G1", "SeqID (S1)"), Some(40.0));
        // the best row is still the 99% one
        assert_eq!(out.wide.rows[0].best.hit.percent_identity, 99.0);
    }

    #[test]
    fn test_row_counts() {
        let hits = vec![
            hit("S1", "G1", 90.0, 1),
            hit("S2", "G1", 91.0, 1),
            hit("S1", "G2", 30.0, 3),
            hit("S2", "G3", 35.0, 3),
        ];
        let out = annotate_and_reshape(&hits, &trait_sets());
        assert_eq!(out.long.rows.len(), 4);
        assert_eq!(out.long.records().count(), 4);
        assert_eq!(out.wide.rows.len(), 3);
        assert_eq!(out.fasta.len(), 4);
        assert_eq!(out.fasta.iter().filter(|r| r.id == "G1").count(), 2);
    }

    #[test]
    fn test_wide_column_order_and_cells() {
        let hits = vec![hit("S1", "G1", 90.0, 1), hit("S2", "G1", 95.0, 2), hit("S1", "G2", 30.0, 3)];
        let out = annotate_and_reshape(&hits, &trait_sets());

        assert_eq!(
            out.wide.header(),
            vec![
                "Target", "Sequence", "Percent Identity", "Length", "TaxID", "Organism",
                "Lineage", "halophilic", "alkaliphilic", "Annotation", "SeqID (S1)",
                "SeqID (S2)", "Seed",
            ]
        );

        let records: Vec<Vec<String>> = out.wide.records().collect();
        assert_eq!(
            records[0],
            vec![
                "G1", "SEQG1", "95.0", "100", "2", "organism 2", "d_Bacteria", "True", "True",
                "alkaliphilic & halophilic", "90.0", "95.0", "S2",
            ]
        );
        assert_eq!(
            records[1],
            vec![
                "G2", "SEQG2", "30.0", "100", "3", "organism 3", "d_Bacteria", "False",
                "False", "", "30.0", "", "S1",
            ]
        );
    }

    #[test]
    fn test_long_column_order_and_cells() {
        let hits = vec![hit("S1 seed one", "G1", 90.0, 1)];
        let out = annotate_and_reshape(&hits, &trait_sets());
        assert_eq!(
            out.long.header(),
            vec![
                "Seed", "Target", "Sequence", "Percent Identity", "Length", "TaxID",
                "Organism", "Lineage", "halophilic", "alkaliphilic", "Annotation",
            ]
        );
        let records: Vec<Vec<String>> = out.long.records().collect();
        assert_eq!(
            records[0],
            vec![
                "S1 seed one", "G1", "SEQG1", "90.0", "100", "1", "organism 1", "d_Bacteria",
                "True", "False", "halophilic",
            ]
        );
    }

    #[test]
    fn test_no_traits_omits_annotation_columns() {
        let hits = vec![hit("S1", "G1", 90.0, 1)];
        let out = annotate_and_reshape(&hits, &TraitSets::new());
        assert_eq!(out.long.header().len(), LONG_CORE_COLUMNS.len());
        assert!(!out.wide.header().contains(&ANNOTATION_COLUMN.to_string()));
        assert_eq!(out.wide.records().next().unwrap().len(), out.wide.header().len());
    }

    #[test]
    fn test_tsv_text() {
        let header = vec!["a".to_string(), "b".to_string()];
        let text = tsv_text(&header, vec![vec!["1".to_string(), "".to_string()]]).unwrap();
        assert_eq!(text, "a\tb\n1\t\n");
    }
}
