//src/hits.rs

use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fasta::open_text;
use crate::types::AlignmentHit;

/// Column order of the search output, also used as its header.
pub const HIT_COLUMNS: [&str; 8] = [
    "query",
    "target",
    "tseq",
    "pident",
    "tlen",
    "taxid",
    "taxname",
    "taxlineage",
];

/// Parse a headerless tab-separated search table.
///
/// `#` lines are comments. A missing lineage column is read as empty; fewer
/// than seven columns, or a non-numeric identity or length, is an error.
pub fn read_hits(path: &Path) -> Result<Vec<AlignmentHit>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .from_reader(open_text(path)?);

    let mut hits = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| Error::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        if record.len() < 7 {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                HIT_COLUMNS.len(),
                record.len()
            )));
        }

        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let percent_identity: f64 = field(3)
            .parse()
            .map_err(|_| malformed(format!("invalid pident '{}'", field(3))))?;
        let target_length: u64 = field(4)
            .parse()
            .map_err(|_| malformed(format!("invalid tlen '{}'", field(4))))?;

        hits.push(AlignmentHit {
            seed_accession: field(0).to_string(),
            target_accession: field(1).to_string(),
            target_sequence: field(2).to_string(),
            percent_identity,
            target_length,
            taxonomic_id: field(5).parse().ok(),
            organism_name: field(6).to_string(),
            taxonomic_lineage: field(7).to_string(),
        });
    }
    Ok(hits)
}

/// Write hits back out as a tab-separated table with a header row.
pub fn write_hits(path: &Path, hits: &[AlignmentHit]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(file);
    writer.write_record(HIT_COLUMNS)?;
    for hit in hits {
        writer.write_record([
            hit.seed_accession.clone(),
            hit.target_accession.clone(),
            hit.target_sequence.clone(),
            format_identity(hit.percent_identity),
            hit.target_length.to_string(),
            hit.taxonomic_id.map(|t| t.to_string()).unwrap_or_default(),
            hit.organism_name.clone(),
            hit.taxonomic_lineage.clone(),
        ])?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Identity with at least one decimal: `90.0`, `87.25`.
pub fn format_identity(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TABLE: &str = "# mmseqs easy-search\n\
        S1\tG1\tMKVL\t90.0\t120\t562\tEscherichia coli\t-_cellular organisms;d_Bacteria\n\
        S2 extra words\tG1\tMKVL\t95.5\t120\t\tunknown\t\n\
        S1\tG2\tMKQQ\t41\t98\t1423\tBacillus subtilis\n";

    #[test]
    fn test_read_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alnRes.m8");
        fs::write(&path, TABLE).unwrap();

        let hits = read_hits(&path).unwrap();
        assert_eq!(hits.len(), 3);

        assert_eq!(hits[0].seed_accession, "S1");
        assert_eq!(hits[0].target_accession, "G1");
        assert_eq!(hits[0].percent_identity, 90.0);
        assert_eq!(hits[0].taxonomic_id, Some(562));
        assert_eq!(hits[0].taxonomic_lineage, "-_cellular organisms;d_Bacteria");

        assert_eq!(hits[1].seed_id(), "S2");
        assert_eq!(hits[1].taxonomic_id, None);

        assert_eq!(hits[2].target_length, 98);
        assert_eq!(hits[2].taxonomic_lineage, "");
    }

    #[test]
    fn test_short_row_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alnRes.m8");
        fs::write(&path, "S1\tG1\tMKV\t90\n").unwrap();
        assert!(matches!(read_hits(&path), Err(Error::MalformedRow { .. })));

        fs::write(&path, "S1\tG1\tMKV\tabc\t1\t2\tx\ty\n").unwrap();
        assert!(matches!(read_hits(&path), Err(Error::MalformedRow { .. })));
    }

    #[test]
    fn test_write_hits_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.m8");
        let out = dir.path().join("out.m8");
        fs::write(&src, TABLE).unwrap();

        let hits = read_hits(&src).unwrap();
        write_hits(&out, &hits).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("query\ttarget\ttseq\tpident\ttlen\ttaxid\ttaxname\ttaxlineage")
        );
        assert_eq!(
            lines.next(),
            Some("S1\tG1\tMKVL\t90.0\t120\t562\tEscherichia coli\t-_cellular organisms;d_Bacteria")
        );
        // the header row is not data
        assert!(read_hits(&out).unwrap_err().to_string().contains("pident"));
    }

    #[test]
    fn test_format_identity() {
        assert_eq!(format_identity(90.0), "90.0");
        assert_eq!(format_identity(87.25), "87.25");
        assert_eq!(format_identity(0.0), "0.0");
    }
}
