//src/types.rs

/// One row of the search tool's output: a seed (query) aligned to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    /// Raw query label as reported by the search tool.
    pub seed_accession: String,
    pub target_accession: String,
    pub target_sequence: String,
    pub percent_identity: f64,
    pub target_length: u64,
    /// `None` when the tool reports no usable taxid.
    pub taxonomic_id: Option<u64>,
    pub organism_name: String,
    pub taxonomic_lineage: String,
}

impl AlignmentHit {
    /// Seed identifier: the label up to the first whitespace.
    pub fn seed_id(&self) -> &str {
        self.seed_accession
            .split_whitespace()
            .next()
            .unwrap_or("")
    }
}

/// A hit with its trait membership flags and collapsed annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedHit {
    pub hit: AlignmentHit,
    /// One flag per known trait, in the trait-set order.
    pub traits: Vec<bool>,
    pub annotation: String,
}

/// A persisted `(tax_id, flag)` pair of a resolution table.
///
/// An empty `tax_id` marks a failed resolution; those never survive cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRow {
    pub tax_id: Option<u64>,
    pub flag: bool,
}

impl ResolutionRow {
    pub fn to_record(&self) -> [String; 2] {
        [
            self.tax_id.map(|t| t.to_string()).unwrap_or_default(),
            if self.flag { "TRUE".to_string() } else { String::new() },
        ]
    }
}

/// A minimal two-line FASTA entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FastaRecord {
    pub id: String,
    pub seq: String,
}
