//src/merge.rs

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use csv::StringRecord;

use crate::error::{csv_err, io_err, ReportError, Result};
use crate::table::IDENTITY_COLUMNS;

/// Fill for a missing abundance cell.
const MISSING_ABUNDANCE: &str = "0.0";
/// Fill for a missing identity cell (only when the last table is the shortest).
const MISSING_IDENTITY: &str = "0";

/// Empty cells and `NaN` (an unresolved taxon ID) count as missing.
fn present(cell: &str) -> Option<&str> {
    match cell {
        "" | "NaN" => None,
        v => Some(v),
    }
}

/// A single-sample (or few-sample) standardized table read back from CSV.
#[derive(Debug, Clone)]
struct InputTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl InputTable {
    fn read(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path).map_err(csv_err(path))?;
        let headers = rdr.headers().map_err(csv_err(path))?.clone();
        if headers.len() < IDENTITY_COLUMNS.len() {
            return Err(ReportError::parse(
                path,
                1,
                format!(
                    "expected at least {} columns, found {}",
                    IDENTITY_COLUMNS.len(),
                    headers.len()
                ),
            ));
        }
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_err(path))?;
        Ok(Self { headers, rows })
    }

    fn abundance_headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().skip(IDENTITY_COLUMNS.len())
    }

    fn abundance_width(&self) -> usize {
        self.headers.len() - IDENTITY_COLUMNS.len()
    }
}

/// Merge standardized tables into one multi-sample table at `output`.
///
/// A single input is copied byte for byte. Otherwise tables are joined by
/// row position: row `i` of the output holds row `i` of every input. Only
/// the last table's identity columns are kept. Missing cells, including
/// those past the end of a shorter table, are filled with zero.
pub fn merge_tables<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<()> {
    match inputs {
        [] => Err(ReportError::Config("no tables to merge".to_string())),
        [single] => {
            let single = single.as_ref();
            fs::copy(single, output).map_err(io_err(single))?;
            log::info!("Copied single table {} to {}", single.display(), output.display());
            Ok(())
        }
        _ => {
            let tables = inputs
                .iter()
                .map(|p| InputTable::read(p.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            let file = File::create(output).map_err(io_err(output))?;
            write_positional_join(&tables, BufWriter::new(file)).map_err(csv_err(output))?;
            log::info!("Merged {} tables into {}", tables.len(), output.display());
            Ok(())
        }
    }
}

fn write_positional_join<W: std::io::Write>(tables: &[InputTable], writer: W) -> csv::Result<()> {
    let Some(last) = tables.last() else {
        return Ok(());
    };
    let n_rows = tables.iter().map(|t| t.rows.len()).max().unwrap_or(0);

    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = last.headers.iter().take(IDENTITY_COLUMNS.len()).collect();
    for table in tables {
        header.extend(table.abundance_headers());
    }
    wtr.write_record(&header)?;

    for i in 0..n_rows {
        let mut fields: Vec<&str> = match last.rows.get(i) {
            Some(row) => (0..IDENTITY_COLUMNS.len())
                .map(|c| row.get(c).and_then(present).unwrap_or(MISSING_IDENTITY))
                .collect(),
            None => vec![MISSING_IDENTITY; IDENTITY_COLUMNS.len()],
        };
        for table in tables {
            let width = table.abundance_width();
            match table.rows.get(i) {
                Some(row) => fields.extend(
                    (IDENTITY_COLUMNS.len()..IDENTITY_COLUMNS.len() + width)
                        .map(|c| row.get(c).and_then(present).unwrap_or(MISSING_ABUNDANCE)),
                ),
                None => fields.extend(std::iter::repeat(MISSING_ABUNDANCE).take(width)),
            }
        }
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_input_is_copied_verbatim() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("a.csv");
        let text = "classifier,clade,tax_id,a\nmetaphlan,X,1,0.5\n";
        fs::write(&input, text).unwrap();
        let output = tmp.path().join("out.csv");

        merge_tables(&[&input], &output).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), text);
    }

    #[test]
    fn test_positional_join_keeps_last_identity() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        fs::write(
            &a,
            "classifier,clade,tax_id,a\nmetaphlan,X,1,0.5\nmetaphlan,Y,2,0.25\n",
        )
        .unwrap();
        fs::write(&b, "classifier,clade,tax_id,b\nmetaphlan,Z,3,0.75\n").unwrap();
        let output = tmp.path().join("out.csv");

        merge_tables(&[&a, &b], &output).unwrap();
        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "classifier,clade,tax_id,a,b\n\
             metaphlan,Z,3,0.5,0.75\n\
             0,0,0,0.25,0.0\n"
        );
    }

    #[test]
    fn test_unresolved_tax_id_is_filled_with_zero() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        fs::write(&a, "classifier,clade,tax_id,a\nxtree,Escherichia,NaN,0.5\n").unwrap();
        fs::write(&b, "classifier,clade,tax_id,b\nxtree,Escherichia,NaN,0.8\n").unwrap();
        let output = tmp.path().join("out.csv");

        merge_tables(&[&a, &b], &output).unwrap();
        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "classifier,clade,tax_id,a,b\nxtree,Escherichia,0,0.5,0.8\n"
        );
    }

    #[test]
    fn test_no_inputs_is_an_error() {
        let tmp = tempdir().unwrap();
        let inputs: Vec<&Path> = Vec::new();
        assert!(matches!(
            merge_tables(&inputs, &tmp.path().join("out.csv")),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_header_only_inputs_merge_to_header_only() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        fs::write(&a, "classifier,clade,tax_id,a\n").unwrap();
        fs::write(&b, "classifier,clade,tax_id,b\n").unwrap();
        let output = tmp.path().join("out.csv");

        merge_tables(&[a, b], &output).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "classifier,clade,tax_id,a,b\n");
    }
}
