//src/unclassified.rs

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{csv_err, io_err, ReportError, Result};
use crate::table::{line_of, open_reader, tsv_reader};

/// Status flag of an unclassified read in a per-read classification report.
pub const UNCLASSIFIED_FLAG: &str = "U";

/// Write the read ID (second column) of every row flagged `U`, one per line,
/// in input order. Returns how many IDs were written.
pub fn extract_unclassified_reads<R: Read, W: Write>(
    reader: R,
    mut writer: W,
    path: &Path,
) -> Result<usize> {
    let mut count = 0;
    for result in tsv_reader(reader, false).into_records() {
        let record = result.map_err(csv_err(path))?;
        if record.len() < 2 {
            return Err(ReportError::parse(
                path,
                line_of(&record),
                format!("expected at least 2 fields, found {}", record.len()),
            ));
        }
        if &record[0] == UNCLASSIFIED_FLAG {
            writeln!(writer, "{}", &record[1]).map_err(io_err(path))?;
            count += 1;
        }
    }
    writer.flush().map_err(io_err(path))?;
    Ok(count)
}

/// File-to-file wrapper around [`extract_unclassified_reads`].
pub fn extract_unclassified(report: &Path, output: &Path) -> Result<usize> {
    let reader = open_reader(report)?;
    let file = File::create(output).map_err(io_err(output))?;
    let count = extract_unclassified_reads(reader, BufWriter::new(file), report)?;
    log::info!(
        "Extracted {} unclassified read IDs from {}",
        count,
        report.display()
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unclassified_ids_in_order() {
        let input = "U\tread1\nC\tread2\nU\tread3\n";
        let mut out = Vec::new();
        let n = extract_unclassified_reads(input.as_bytes(), &mut out, Path::new("k.out")).unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "read1\nread3\n");
    }

    #[test]
    fn test_full_kraken_output_lines() {
        let input = "C\tr1\t562\t150\t562:116\nU\tr2\t0\t150\t0:116\n";
        let mut out = Vec::new();
        extract_unclassified_reads(input.as_bytes(), &mut out, Path::new("k.out")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "r2\n");
    }

    #[test]
    fn test_empty_report_gives_empty_output() {
        let mut out = Vec::new();
        let n = extract_unclassified_reads("".as_bytes(), &mut out, Path::new("k.out")).unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_column_row_is_fatal() {
        let mut out = Vec::new();
        let err = extract_unclassified_reads("U\tr1\nU\n".as_bytes(), &mut out, Path::new("k.out"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }
}
