//src/table.rs

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::StringRecord;
use flate2::read::MultiGzDecoder;

use crate::error::{csv_err, io_err, Result};
use crate::types::UnifiedRecord;

/// Identity columns shared by every standardized table.
pub const IDENTITY_COLUMNS: [&str; 3] = ["classifier", "clade", "tax_id"];

/// A per-rank table in the unified schema: identity columns plus one
/// abundance column per sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbundanceTable {
    pub samples: Vec<String>,
    pub rows: Vec<UnifiedRecord>,
}

impl AbundanceTable {
    pub fn new(samples: Vec<String>, rows: Vec<UnifiedRecord>) -> Self {
        Self { samples, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Vec<&str> {
        IDENTITY_COLUMNS
            .iter()
            .copied()
            .chain(self.samples.iter().map(String::as_str))
            .collect()
    }

    /// Write the table as CSV. The header row is always written, even when
    /// there are no data rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.header())?;
        for row in &self.rows {
            let mut fields = vec![
                row.classifier.to_string(),
                row.clade.clone(),
                row.tax_id.to_string(),
            ];
            fields.extend(row.abundances.iter().map(|&v| format_float(v)));
            wtr.write_record(&fields)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(io_err(path))?;
        self.write_csv(BufWriter::new(file)).map_err(csv_err(path))?;
        log::debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Collapse records sharing a clade name into one row.
///
/// Abundances are summed per sample (missing values count as 0); every other
/// field comes from the first record seen for that clade. Output is ordered
/// by clade name.
pub fn aggregate_by_clade(records: Vec<UnifiedRecord>) -> Vec<UnifiedRecord> {
    let mut groups: BTreeMap<String, UnifiedRecord> = BTreeMap::new();

    for mut record in records {
        match groups.entry(record.clade.clone()) {
            Entry::Vacant(slot) => {
                for value in record.abundances.iter_mut() {
                    if value.is_nan() {
                        *value = 0.0;
                    }
                }
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                for (total, value) in acc.abundances.iter_mut().zip(&record.abundances) {
                    if !value.is_nan() {
                        *total += value;
                    }
                }
            }
        }
    }

    groups.into_values().collect()
}

/// Shortest round-trip float text, always with a fractional part or an
/// exponent, and exponents written as sign plus at least two digits
/// (`0.0`, `0.5`, `1e-05`, `1.5e+16`). Missing values are written empty.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// Open a text file, transparently decompressing it if it ends in `.gz`.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path).map_err(io_err(path))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Tab-separated reader with no quoting. Column counts are checked by the
/// callers so they can report the offending line.
pub fn tsv_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true)
        .quoting(false)
        .from_reader(reader)
}

/// 1-based line number of a record within its reader.
pub fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classifier, Rank, TaxId};

    fn record(clade: &str, tax_id: TaxId, values: &[f64]) -> UnifiedRecord {
        UnifiedRecord {
            rank: Rank::Genus,
            classifier: Classifier::MetaPhlAn,
            clade: clade.to_string(),
            tax_id,
            abundances: values.to_vec(),
        }
    }

    #[test]
    fn test_format_float_matches_default_float_text() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(12.0), "12.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1.5e16), "1.5e+16");
        assert_eq!(format_float(f64::NAN), "");
    }

    #[test]
    fn test_aggregate_sums_and_keeps_first_identity() {
        let rows = vec![
            record("Bacteroides", TaxId::Known(816), &[0.3]),
            record("Alistipes", TaxId::Known(239759), &[0.1]),
            record("Bacteroides", TaxId::Known(999), &[0.2]),
        ];
        let agg = aggregate_by_clade(rows);

        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].clade, "Alistipes");
        assert_eq!(agg[1].clade, "Bacteroides");
        assert_eq!(agg[1].tax_id, TaxId::Known(816));
        assert!((agg[1].abundances[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_treats_missing_as_zero() {
        let rows = vec![
            record("Prevotella", TaxId::Unresolved, &[f64::NAN, 0.4]),
            record("Prevotella", TaxId::Unresolved, &[0.2, f64::NAN]),
        ];
        let agg = aggregate_by_clade(rows);
        assert_eq!(agg[0].abundances, vec![0.2, 0.4]);
    }

    #[test]
    fn test_write_csv_header_only_when_empty() {
        let table = AbundanceTable::new(vec!["s1".to_string()], Vec::new());
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "classifier,clade,tax_id,s1\n");
    }

    #[test]
    fn test_write_csv_rows() {
        let table = AbundanceTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![record("Escherichia", TaxId::Unresolved, &[0.25, 0.0])],
        );
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "classifier,clade,tax_id,a,b\nmetaphlan,Escherichia,NaN,0.25,0.0\n"
        );
    }
}
