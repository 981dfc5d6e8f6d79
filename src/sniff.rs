//! CSV import probing: guess the field delimiter and text encoding of a
//! file before reading it, using string scanning only.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::errors::{StepError, StepResult};

pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const FALLBACK_ENCODING: &str = "latin-1";

const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// What probing learned about a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvProbe {
    pub delimiter: char,
    /// Encoding label as it appears in generated read_csv calls.
    pub encoding: String,
}

/// Probes a CSV file for its delimiter and encoding. Directories and
/// missing paths surface as typed resource errors; a file that is not
/// valid UTF-8 is retried as Latin-1 before anything fails.
pub fn probe_csv(path: &Path) -> StepResult<CsvProbe> {
    if path.is_dir() {
        return Err(StepError::IsDirectory(path.to_path_buf()));
    }
    if !path.exists() {
        return Err(StepError::FileNotFound(path.to_path_buf()));
    }

    let first_line = read_first_line(path)?;
    let encoding = match std::str::from_utf8(&first_line) {
        Ok(_) => DEFAULT_ENCODING.to_string(),
        // Every byte sequence decodes as Latin-1, so the retry cannot fail;
        // it only changes how the bytes are interpreted.
        Err(_) => FALLBACK_ENCODING.to_string(),
    };
    let line: String = first_line.iter().map(|&b| b as char).collect();
    Ok(CsvProbe {
        delimiter: guess_delimiter(&line),
        encoding,
    })
}

/// Picks the candidate delimiter occurring most often in the first line.
/// Ties and absence fall back to a comma.
pub fn guess_delimiter(first_line: &str) -> char {
    let mut best = DEFAULT_DELIMITER;
    let mut best_count = 0;
    for candidate in DELIMITER_CANDIDATES {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn read_first_line(path: &Path) -> StepResult<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file).take(64 * 1024);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(line)
}
