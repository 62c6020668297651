use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::error::{io_err, Result};
use crate::table::open_reader;

/// Copy FASTQ text, replacing every line that starts with `+` by a bare `+`.
///
/// Returns the number of lines rewritten.
pub fn scrub_captions<R: BufRead, W: Write>(mut reader: R, mut writer: W, path: &Path) -> Result<usize> {
    let mut line = String::new();
    let mut rewritten = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(io_err(path))? == 0 {
            break; // EOF
        }

        if line.starts_with('+') {
            writer.write_all(b"+\n").map_err(io_err(path))?;
            rewritten += 1;
        } else {
            writer.write_all(line.as_bytes()).map_err(io_err(path))?;
        }
    }

    writer.flush().map_err(io_err(path))?;
    Ok(rewritten)
}

/// Scrub a FASTQ file (plain or `.gz`) into an uncompressed copy.
pub fn scrub_fastq_captions(input: &Path, output: &Path) -> Result<usize> {
    let reader = open_reader(input)?;
    let file = File::create(output).map_err(io_err(output))?;
    let rewritten = scrub_captions(reader, BufWriter::new(file), input)?;
    log::info!(
        "Scrubbed {} captions from {} into {}",
        rewritten,
        input.display(),
        output.display()
    );
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_every_plus_line_is_blanked() {
        let input = "@r1 desc\nACGT\n+r1 desc\n+III\n@r2\nTTTT\n+\nIIII\n";
        let mut out = Vec::new();
        let n = scrub_captions(input.as_bytes(), &mut out, Path::new("r.fq")).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@r1 desc\nACGT\n+\n+\n@r2\nTTTT\n+\nIIII\n"
        );
    }

    #[test]
    fn test_quality_line_starting_with_plus_is_rewritten() {
        let mut out = Vec::new();
        scrub_captions("@r1\nACGT\n+r1\n+III\n".as_bytes(), &mut out, Path::new("r.fq")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "@r1\nACGT\n+\n+\n");
    }

    #[test]
    fn test_gzipped_input_is_written_plain() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("s1_1.fastq.gz");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"@r1\nAC\n+r1\nII\n").unwrap();
        fs::write(&input, enc.finish().unwrap()).unwrap();
        let output = tmp.path().join("s1_1.fastq");

        assert_eq!(scrub_fastq_captions(&input, &output).unwrap(), 1);
        assert_eq!(fs::read_to_string(output).unwrap(), "@r1\nAC\n+\nII\n");
    }
}
