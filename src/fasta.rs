use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{Error, Result};
use crate::types::FastaRecord;

/// Open a text file for reading; paths ending in ".gz" are decompressed.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Render records as two lines each: `>id` then the sequence.
pub fn fasta_text(records: &[FastaRecord]) -> String {
    let mut out = String::with_capacity(records.iter().map(|r| r.id.len() + r.seq.len() + 3).sum());
    for record in records {
        out.push('>');
        out.push_str(&record.id);
        out.push('\n');
        out.push_str(&record.seq);
        out.push('\n');
    }
    out
}

pub fn write_fasta(path: &Path, records: &[FastaRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(fasta_text(records).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| Error::io(path, e))
}
