//src/kraken_report.rs

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{csv_err, io_err, ReportError, Result};
use crate::table::{format_float, open_reader};

pub const CLEAN_REPORT_HEADER: [&str; 6] = [
    "domain",
    "taxon",
    "taxonID",
    "numReadsClade",
    "numReadsDirect",
    "pct",
];

/// Domain name used until the first `D`/`K` row is seen.
const ROOT_DOMAIN: &str = "root";

/// A structured representation of one row in a Kraken2 report.
/// For example:
///  pct  reads_clade  reads_direct  rank  taxID  taxName
#[derive(Debug, Clone, PartialEq)]
pub struct KrakenReportLine {
    pub pct: f64,
    pub reads_clade: String,
    pub reads_direct: String,
    pub rank: String,
    pub tax_id: String,
    /// Indentation stripped and commas removed.
    pub taxon: String,
}

impl KrakenReportLine {
    /// Domain (`D`) and kingdom (`K`) rows set the domain for what follows.
    pub fn is_domain(&self) -> bool {
        self.rank == "D" || self.rank == "K"
    }
}

/// Keeps rows of one rank code at or above a percentage threshold, each
/// prefixed with the most recent domain/kingdom name.
#[derive(Debug)]
pub struct KrakenReportFilter {
    threshold: f64,
    taxlevel: String,
    collapse: Regex,
}

impl KrakenReportFilter {
    pub fn new(threshold: f64, taxlevel: &str) -> Self {
        Self {
            threshold,
            taxlevel: taxlevel.to_string(),
            collapse: Regex::new(r"\s\s+").expect("Invalid whitespace pattern"),
        }
    }

    /// Parse one report line. Runs of two or more whitespace characters
    /// separate fields; single spaces belong to the taxon name.
    pub fn parse_line(&self, line: &str, path: &Path, line_no: u64) -> Result<KrakenReportLine> {
        let collapsed = self.collapse.replace_all(line.trim(), "\t");
        let fields: Vec<&str> = collapsed.split('\t').collect();
        let [pct, reads_clade, reads_direct, rank, tax_id, taxon] = fields.as_slice() else {
            return Err(ReportError::parse(
                path,
                line_no,
                format!("expected 6 fields, found {}", fields.len()),
            ));
        };
        let pct: f64 = pct.parse().map_err(|_| {
            ReportError::parse(path, line_no, format!("percentage '{}' is not a number", pct))
        })?;

        Ok(KrakenReportLine {
            pct,
            reads_clade: reads_clade.to_string(),
            reads_direct: reads_direct.to_string(),
            rank: rank.to_string(),
            tax_id: tax_id.to_string(),
            taxon: taxon.replace(',', ""),
        })
    }

    /// Filter a whole report into comma-separated output. Blank lines are
    /// skipped. Returns the number of rows written.
    pub fn filter<R: BufRead, W: Write>(&self, reader: R, writer: W, path: &Path) -> Result<usize> {
        let mut wtr = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        wtr.write_record(CLEAN_REPORT_HEADER).map_err(csv_err(path))?;

        let mut domain = ROOT_DOMAIN.to_string();
        let mut kept = 0;
        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(io_err(path))?;
            if line.trim().is_empty() {
                continue;
            }
            let row = self.parse_line(&line, path, idx as u64 + 1)?;

            if row.is_domain() {
                domain = row.taxon.clone();
            }
            if row.rank == self.taxlevel && row.pct >= self.threshold {
                wtr.write_record([
                    domain.as_str(),
                    row.taxon.as_str(),
                    row.tax_id.as_str(),
                    row.reads_clade.as_str(),
                    row.reads_direct.as_str(),
                    format_float(row.pct).as_str(),
                ])
                .map_err(csv_err(path))?;
                kept += 1;
            }
        }
        wtr.flush().map_err(io_err(path))?;
        Ok(kept)
    }
}

/// Sample name of a report: its file name up to the first `.`.
pub fn sample_name(report: &Path) -> String {
    report
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Output file name. The threshold is used exactly as given on the command
/// line, and the `.tsv` suffix is kept even though the content is CSV.
pub fn clean_report_file_name(threshold: &str, taxlevel: &str, sample: &str) -> String {
    format!(
        "krakenReportClean.threshold{}.taxlevel{}.{}.tsv",
        threshold, taxlevel, sample
    )
}

/// Filter `report` (gzip if it ends in `.gz`) into `out_dir`, returning the
/// written path.
pub fn clean_kraken_report(
    report: &Path,
    threshold: &str,
    taxlevel: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    let threshold_value: f64 = threshold.trim().parse().map_err(|_| {
        ReportError::Config(format!("threshold '{}' is not a number", threshold))
    })?;
    let filter = KrakenReportFilter::new(threshold_value, taxlevel);

    let output = out_dir.join(clean_report_file_name(threshold, taxlevel, &sample_name(report)));
    let file = File::create(&output).map_err(io_err(&output))?;
    let kept = filter.filter(open_reader(report)?, BufWriter::new(file), report)?;
    log::info!(
        "Kept {} rank-{} rows at or above {} from {}",
        kept,
        taxlevel,
        threshold,
        report.display()
    );
    Ok(output)
}
