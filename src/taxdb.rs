//src/taxdb.rs

use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;

use crate::error::{io_err, ReportError, Result};
use crate::table::open_reader;
use crate::types::TaxId;

/// What the mapping file says about one clade name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub tax_id: TaxId,
    /// Columns between the name and the taxon ID, kept as-is.
    pub aux: Vec<String>,
}

/// Clade name -> taxon ID lookup, loaded once and then only read.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyMap {
    entries: AHashMap<String, TaxonomyEntry>,
}

impl TaxonomyMap {
    /// Parses a mapping file in the format:
    /// ```text
    /// <name>[\t|]<aux>...[\t|]<taxid>
    /// ```
    /// Tabs and pipes are both field separators. The first column is the
    /// name and the last is the taxon ID. A first line whose ID column is not
    /// numeric is taken to be a header. Blank lines are skipped. When a name
    /// appears twice the later line wins.
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let path = filepath.as_ref();
        let reader = open_reader(path)?;
        let map = Self::from_reader(reader, path)?;
        log::info!("Loaded {} taxonomy names from {}", map.len(), path.display());
        Ok(map)
    }

    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut entries = AHashMap::new();

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(io_err(path))?;
            let line_no = idx as u64 + 1;
            if line.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = line
                .split(|c: char| c == '\t' || c == '|')
                .map(str::trim)
                .collect();
            if parts.len() < 2 {
                return Err(ReportError::parse(
                    path,
                    line_no,
                    format!("expected at least 2 fields, found {}", parts.len()),
                ));
            }

            let name = parts[0];
            let id_str = parts[parts.len() - 1];
            let tax_id = match id_str.parse::<u64>() {
                Ok(id) => TaxId::Known(id),
                Err(_) if line_no == 1 => {
                    log::debug!("Treating first line of {} as a header", path.display());
                    continue;
                }
                Err(_) => {
                    return Err(ReportError::parse(
                        path,
                        line_no,
                        format!("taxon ID '{}' is not a number", id_str),
                    ))
                }
            };

            let aux = parts[1..parts.len() - 1]
                .iter()
                .map(|s| s.to_string())
                .collect();
            entries.insert(name.to_string(), TaxonomyEntry { tax_id, aux });
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&TaxonomyEntry> {
        self.entries.get(name)
    }

    /// Taxon ID for `name`, or `TaxId::Unresolved` if the name is unknown.
    pub fn lookup(&self, name: &str) -> TaxId {
        self.get(name)
            .map(|entry| entry.tax_id)
            .unwrap_or(TaxId::Unresolved)
    }

    /// First name among `candidates` that resolves.
    pub fn lookup_any(&self, candidates: &[&str]) -> TaxId {
        candidates
            .iter()
            .map(|name| self.lookup(name))
            .find(TaxId::is_resolved)
            .unwrap_or(TaxId::Unresolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<TaxonomyMap> {
        TaxonomyMap::from_reader(Cursor::new(text.as_bytes()), Path::new("taxmap.tsv"))
    }

    #[test]
    fn test_tab_and_pipe_delimiters() {
        let map = parse("Escherichia coli\tGCF_000005845\t562\nBacteroides|GCF_1|816\n").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup("Escherichia coli"), TaxId::Known(562));
        assert_eq!(map.lookup("Bacteroides"), TaxId::Known(816));
        assert_eq!(map.get("Bacteroides").unwrap().aux, vec!["GCF_1".to_string()]);
    }

    #[test]
    fn test_missing_name_is_unresolved() {
        let map = parse("Escherichia coli\t562\n").unwrap();
        assert_eq!(map.lookup("Salmonella enterica"), TaxId::Unresolved);
        assert_eq!(
            map.lookup_any(&["Salmonella enterica", "Escherichia coli"]),
            TaxId::Known(562)
        );
    }

    #[test]
    fn test_header_line_is_skipped_and_later_duplicates_win() {
        let map = parse("name\tgenome\ttaxid\n\nA\tx\t1\nA\ty\t2\n").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup("A"), TaxId::Known(2));
    }

    #[test]
    fn test_single_column_row_is_fatal() {
        let err = parse("A\t1\nlonely\n").unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_non_numeric_id_after_first_line_is_fatal() {
        let err = parse("A\t1\nB\tabc\n").unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }
}
