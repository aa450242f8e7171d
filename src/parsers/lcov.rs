/// Parser for the line records of the LCOV `.info` format.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Records used:
///   SF:<path to source file>
///   DA:<line number>,<execution count>[,<checksum>]
///   end_of_record
///
/// Everything else (TN, FN, FNDA, BRDA, LF, LH, ...) is skipped, as are
/// records that do not parse. Malformed input never fails the parse.
use std::io::BufRead;

use crate::error::Result;
use crate::model::{FileCoverage, LineCoverage};

/// Counters for records that were dropped while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub sections: usize,
    pub malformed_records: usize,
    pub orphan_records: usize,
}

/// Parse LCOV data held in memory.
pub fn parse(input: &[u8]) -> (Vec<FileCoverage>, ParseStats) {
    let mut files = Vec::new();
    let stats = parse_streaming(&mut &*input, &mut |file| files.push(file))
        .unwrap_or_default();
    (files, stats)
}

/// Streaming LCOV parser: calls `emit` once per section, when the section
/// is closed by `end_of_record`, by the next `SF:` record, or by EOF.
///
/// Only I/O errors from `reader` are returned. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn parse_streaming(
    reader: &mut dyn BufRead,
    emit: &mut dyn FnMut(FileCoverage),
) -> Result<ParseStats> {
    let mut stats = ParseStats::default();
    let mut current_file: Option<FileCoverage> = None;

    let mut raw_line = Vec::new();
    loop {
        raw_line.clear();
        let n = reader.read_until(b'\n', &mut raw_line)?;
        if n == 0 {
            break; // EOF
        }

        let decoded = String::from_utf8_lossy(&raw_line);
        let line = decoded.trim();
        if line.is_empty() {
            continue;
        }

        if line == "end_of_record" {
            if let Some(file) = current_file.take() {
                stats.sections += 1;
                emit(file);
            }
            continue;
        }

        // Split on first ':'
        let Some((tag, value)) = line.split_once(':') else {
            continue; // Skip lines we don't understand
        };

        match tag {
            "SF" => {
                if let Some(file) = current_file.take() {
                    stats.sections += 1;
                    emit(file);
                }
                current_file = Some(FileCoverage::new(value.trim().to_string()));
            }
            "DA" => {
                let Some(file) = current_file.as_mut() else {
                    stats.orphan_records += 1;
                    continue;
                };
                match parse_da(value) {
                    Some(record) => file.lines.push(record),
                    None => stats.malformed_records += 1,
                }
            }
            _ => {}
        }
    }

    // Handle case where file ends without end_of_record
    if let Some(file) = current_file.take() {
        stats.sections += 1;
        emit(file);
    }

    Ok(stats)
}

/// `DA:<line_number>,<execution_count>[,<checksum>]`
///
/// Some instrumenters use negative counts (e.g. -1) to mark lines as not
/// instrumentable; those are rejected along with anything unparsable.
fn parse_da(value: &str) -> Option<LineCoverage> {
    let mut parts = value.splitn(3, ',');
    let line_number = parts.next()?.trim().parse::<u32>().ok()?;
    let hit_count = parts.next()?.trim().parse::<u64>().ok()?;
    Some(LineCoverage {
        line_number,
        hit_count,
    })
}
