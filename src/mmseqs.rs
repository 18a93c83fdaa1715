//src/mmseqs.rs

use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::hits::HIT_COLUMNS;

/// Header written onto the clustering tool's membership table.
pub const CLUSTER_COLUMNS: [&str; 2] = ["representative", "member"];

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub min_seq_id: f64,
    pub max_seqs: u64,
    pub split_memory_limit: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            min_seq_id: 0.25,
            max_seqs: 100_000_000_000,
            split_memory_limit: "90G".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterParams {
    pub min_seq_id: f64,
    pub coverage: f64,
    pub cov_mode: u8,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_seq_id: 0.6,
            coverage: 0.8,
            cov_mode: 0,
        }
    }
}

/// Locate `name`, either as an absolute path or on `PATH`.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() && path.exists() {
        return Ok(path.to_path_buf());
    }

    if let Ok(paths) = env::var("PATH") {
        for dir in env::split_paths(&paths) {
            let full_path = dir.join(name);
            if full_path.is_file() {
                return Ok(full_path);
            }
        }
    }

    Err(Error::MissingExecutable(name.to_string()))
}

/// Thin driver around the `mmseqs` binary.
pub struct Mmseqs {
    binary: PathBuf,
    tmp_dir: PathBuf,
}

impl Mmseqs {
    pub fn locate(tmp_dir: &Path) -> Result<Self> {
        Ok(Self {
            binary: find_executable("mmseqs")?,
            tmp_dir: tmp_dir.to_path_buf(),
        })
    }

    pub fn search_args(
        &self,
        query: &Path,
        database: &Path,
        out: &Path,
        params: &SearchParams,
    ) -> Vec<String> {
        vec![
            "easy-search".to_string(),
            query.display().to_string(),
            database.display().to_string(),
            out.display().to_string(),
            self.tmp_dir.display().to_string(),
            "--format-output".to_string(),
            HIT_COLUMNS.join(","),
            "--min-seq-id".to_string(),
            params.min_seq_id.to_string(),
            "--max-seqs".to_string(),
            params.max_seqs.to_string(),
            "--split-memory-limit".to_string(),
            params.split_memory_limit.clone(),
        ]
    }

    pub fn cluster_args(
        &self,
        fasta: &Path,
        database: &Path,
        prefix: &Path,
        params: &ClusterParams,
    ) -> Vec<String> {
        vec![
            "easy-linclust".to_string(),
            fasta.display().to_string(),
            database.display().to_string(),
            prefix.display().to_string(),
            self.tmp_dir.display().to_string(),
            "--min-seq-id".to_string(),
            params.min_seq_id.to_string(),
            "-c".to_string(),
            params.coverage.to_string(),
            "--cov-mode".to_string(),
            params.cov_mode.to_string(),
        ]
    }

    /// `easy-search` of `query` against `database`, writing the hit table to `out`.
    pub fn search(
        &self,
        query: &Path,
        database: &Path,
        out: &Path,
        params: &SearchParams,
    ) -> Result<()> {
        self.run(&self.search_args(query, database, out, params))
    }

    /// `easy-linclust` of `fasta`; returns the membership table path.
    pub fn cluster(
        &self,
        fasta: &Path,
        database: &Path,
        prefix: &Path,
        params: &ClusterParams,
    ) -> Result<PathBuf> {
        self.run(&self.cluster_args(fasta, database, prefix, params))?;
        Ok(cluster_table_path(prefix))
    }

    fn run(&self, args: &[String]) -> Result<()> {
        log::info!("Running {} {}", self.binary.display(), args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| Error::io(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ToolFailed {
                tool: format!("mmseqs {}", args.first().map(String::as_str).unwrap_or("")),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// `<prefix>_cluster.tsv`, as written by `easy-linclust`.
pub fn cluster_table_path(prefix: &Path) -> PathBuf {
    let mut name = prefix
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push("_cluster.tsv");
    prefix.with_file_name(name)
}

/// Rewrite a headerless membership table with a header; rows are unchanged.
/// Returns the number of rows.
pub fn add_cluster_header(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .from_path(path)?;
    let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

    let tmp_path = path.with_extension("tsv.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .flexible(true)
            .from_writer(file);
        writer.write_record(CLUSTER_COLUMNS)?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| Error::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(rows.len())
}
