//src/trait_sets.rs

use ahash::{AHashMap, AHashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fasta::open_text;
use crate::resolver::TAX_ID_COLUMN;

/// Suffix of a trait table; the rest of the file name is the trait.
pub const TRAIT_TABLE_SUFFIX: &str = "_ncbi.csv";

/// Flag values that mark membership (compared case-insensitively).
pub const TRUTHY: [&str; 4] = ["TRUE", "T", "YES", "1"];

/// Trait name -> member tax ids, plus the traits in load order.
#[derive(Debug, Default, Clone)]
pub struct TraitSets {
    names: Vec<String>,
    members: AHashMap<String, AHashSet<u64>>,
}

impl TraitSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trait; a name seen before replaces the earlier set in place.
    pub fn insert(&mut self, name: &str, members: AHashSet<u64>) {
        if self.members.insert(name.to_string(), members).is_none() {
            self.names.push(name.to_string());
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn members(&self, name: &str) -> Option<&AHashSet<u64>> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str, tax_id: u64) -> bool {
        self.members
            .get(name)
            .map(|set| set.contains(&tax_id))
            .unwrap_or(false)
    }
}

/// Trait name for a table path, or `None` if the name lacks the suffix.
pub fn trait_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let base = file_name
        .strip_suffix(".gz")
        .unwrap_or(file_name)
        .strip_suffix(TRAIT_TABLE_SUFFIX)?;
    let name = base.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Trait tables under `dir`, sorted by file name.
pub fn discover_trait_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.is_file() && trait_name(&path).is_some() {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load every trait table in `dir`, or nothing if no directory is given.
///
/// An unreadable directory loads no traits.
pub fn load_trait_dir(dir: Option<&Path>) -> TraitSets {
    let Some(dir) = dir else {
        return TraitSets::new();
    };
    match discover_trait_files(dir) {
        Ok(files) => load(&files),
        Err(e) => {
            log::warn!("Cannot read traits directory: {}", e);
            TraitSets::new()
        }
    }
}

/// Build trait sets from `files`, in order.
///
/// A file that does not hold a `tax_id` column plus exactly one flag column
/// is skipped; it never stops the other files from loading.
pub fn load(files: &[PathBuf]) -> TraitSets {
    let mut sets = TraitSets::new();
    for path in files {
        let Some(name) = trait_name(path) else {
            log::debug!("Skipping {}: not a trait table", path.display());
            continue;
        };
        match read_trait_table(path) {
            Ok(members) => {
                log::info!("Loaded trait {} ({} taxa)", name, members.len());
                sets.insert(&name, members);
            }
            Err(e) => log::debug!("Skipping trait table {}: {}", path.display(), e),
        }
    }
    sets
}

fn is_truthy(flag: &str) -> bool {
    let flag = flag.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(flag))
}

/// Member tax ids of one table.
fn read_trait_table(path: &Path) -> Result<AHashSet<u64>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(open_text(path)?);
    let headers = reader.headers()?.clone();
    if headers.len() != 2 {
        return Err(Error::MalformedRow {
            path: path.to_path_buf(),
            line: 1,
            reason: format!("expected 2 columns, found {}", headers.len()),
        });
    }
    let tax_idx = headers
        .iter()
        .position(|h| h.trim() == TAX_ID_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: TAX_ID_COLUMN.to_string(),
        })?;
    let flag_idx = 1 - tax_idx;

    let mut members = AHashSet::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let tax_id = record.get(tax_idx).unwrap_or("").trim();
        if tax_id.is_empty() {
            continue;
        }
        let tax_id: u64 = tax_id.parse().map_err(|_| Error::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason: format!("invalid tax_id '{}'", tax_id),
        })?;
        if is_truthy(record.get(flag_idx).unwrap_or("")) {
            members.insert(tax_id);
        }
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_trait_name_from_file_name() {
        assert_eq!(
            trait_name(Path::new("/x/halophilic_ncbi.csv")),
            Some("halophilic".to_string())
        );
        assert_eq!(
            trait_name(Path::new(" thermophilic _ncbi.csv.gz")),
            Some("thermophilic".to_string())
        );
        assert_eq!(trait_name(Path::new("halophilic.csv")), None);
        assert_eq!(trait_name(Path::new("_ncbi.csv")), None);
    }

    #[test]
    fn test_truthy_flags() {
        for flag in ["TRUE", "true", " t ", "Yes", "1"] {
            assert!(is_truthy(flag), "{}", flag);
        }
        for flag in ["", "FALSE", "0", "no", "y"] {
            assert!(!is_truthy(flag), "{}", flag);
        }
    }

    #[test]
    fn test_load_skips_bad_tables() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        fs::write(d.join("halophilic_ncbi.csv"), "tax_id,halophilic\n1,TRUE\n2,\n3,yes\n,TRUE\n")
            .unwrap();
        fs::write(d.join("acidophilic_ncbi.csv"), "acidophilic,tax_id\nT,9\nF,10\n").unwrap();
        // three columns
        fs::write(d.join("psychrophilic_ncbi.csv"), "tax_id,a,b\n1,TRUE,TRUE\n").unwrap();
        // no tax_id column
        fs::write(d.join("thermophilic_ncbi.csv"), "taxon,thermophilic\n1,TRUE\n").unwrap();
        // non-numeric tax id
        fs::write(d.join("alkaliphilic_ncbi.csv"), "tax_id,alkaliphilic\nabc,TRUE\n").unwrap();
        fs::write(d.join("notes.txt"), "tax_id,x\n1,TRUE\n").unwrap();

        let files = discover_trait_files(d).unwrap();
        assert_eq!(files.len(), 5);

        let sets = load(&files);
        assert_eq!(sets.names(), &["acidophilic".to_string(), "halophilic".to_string()]);
        assert!(sets.contains("halophilic", 1));
        assert!(!sets.contains("halophilic", 2));
        assert!(sets.contains("halophilic", 3));
        assert!(sets.contains("acidophilic", 9));
        assert!(!sets.contains("acidophilic", 10));
        assert!(sets.members("thermophilic").is_none());
    }

    #[test]
    fn test_gzipped_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halophilic_ncbi.csv.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"tax_id,halophilic\n42,TRUE\n").unwrap();
        enc.finish().unwrap();

        let sets = load(&[path]);
        assert!(sets.contains("halophilic", 42));
    }

    #[test]
    fn test_no_directory_means_no_traits() {
        assert!(load_trait_dir(None).is_empty());
        let dir = tempfile::tempdir().unwrap();
        assert!(load_trait_dir(Some(dir.path())).is_empty());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_traits");
        assert!(discover_trait_files(&missing).is_err());
        assert!(load_trait_dir(Some(&missing)).is_empty());
    }
}
