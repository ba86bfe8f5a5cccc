use crate::error::{IngestError, Result};
use crate::process::resolve::EncodingGuess;
use crate::process::utils::{clean_str, header_key};
use csv::{ReaderBuilder, StringRecord};
use std::{collections::HashSet, fs, path::Path};
use tracing::{debug, instrument, warn};

/// A data row whose field count did not match the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAnomaly {
    /// Zero-based index into `RawTable::rows`.
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names as the file spells them (trimmed).
    pub headers: Vec<String>,
    /// Each data row, always exactly `headers.len()` cells long.
    pub rows: Vec<Vec<String>>,
    /// Rows that had to be padded or truncated to fit the header.
    pub anomalies: Vec<RowAnomaly>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first header whose alias key matches one of `aliases`,
    /// trying aliases in order.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        let keys: Vec<String> = self
            .headers
            .iter()
            .map(|h| header_key(h))
            .collect();
        aliases
            .iter()
            .find_map(|alias| keys.iter().position(|k| k == alias))
    }
}

/// Load `path` fully, decode it with `guess`, and align every row to the header.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read<P: AsRef<Path>>(path: P, guess: EncodingGuess) -> Result<RawTable> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let text = guess
        .encoding
        .decode(&bytes, true)
        .ok_or_else(|| IngestError::UnreadableFile {
            path: path.to_path_buf(),
            reason: format!("{} decoding failed past the sampled prefix", guess.encoding),
        })?;
    parse_text(path, &text, guess.delimiter)
}

/// Split decoded text into a `RawTable`. `path` is only used for error messages.
pub fn parse_text(path: &Path, text: &str, delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = rdr.records().peekable();

    let header_record = match records.next() {
        Some(rec) => rec.map_err(|e| IngestError::MalformedHeader {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?,
        None => {
            return Err(IngestError::EmptyFile {
                path: path.to_path_buf(),
            })
        }
    };
    let mut headers: Vec<String> = header_record.iter().map(clean_str).collect();
    let flattened = match records.peek() {
        Some(Ok(second)) => flatten_two_row_header(&headers, second),
        _ => None,
    };
    if let Some(flat) = flattened {
        debug!(top = ?headers, flat = ?flat, "flattened two-row header");
        records.next();
        headers = flat;
    }
    check_header(path, &headers)?;

    let width = headers.len();
    let mut table = RawTable {
        headers,
        ..RawTable::default()
    };

    for (idx, result) in records.enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // undecodable record: keep it as an all-empty row so it is
                // accounted for downstream
                warn!(row = idx, error = %e, "unparseable record");
                table.anomalies.push(RowAnomaly {
                    row: idx,
                    expected: width,
                    found: 0,
                });
                table.rows.push(vec![String::new(); width]);
                continue;
            }
        };

        let found = record.len();
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        if found != width {
            warn!(row = idx, expected = width, found, "field count mismatch");
            row.resize(width, String::new());
            table.anomalies.push(RowAnomaly {
                row: idx,
                expected: width,
                found,
            });
        }
        table.rows.push(row);
    }

    debug!(
        columns = width,
        rows = table.rows.len(),
        anomalies = table.anomalies.len(),
        "read table"
    );
    Ok(table)
}

/// Unit label under each year column in the two-row statistics export.
const STACKED_UNIT: &str = "rundvekt (tonn)";

/// The statistics export stacks two header rows: years on top (blank above
/// the id columns) and `Landingsmåned, Art…, Rundvekt (tonn)…` below. Under a
/// unit label the top cell names the column, elsewhere the bottom cell does.
/// Returns `None` for an ordinary single header.
fn flatten_two_row_header(top: &[String], second: &StringRecord) -> Option<Vec<String>> {
    if !top.iter().any(|h| h.is_empty()) {
        return None;
    }
    let bottom: Vec<String> = second.iter().map(clean_str).collect();
    if !bottom.iter().any(|b| header_key(b) == STACKED_UNIT) {
        return None;
    }
    let width = top.len().max(bottom.len());
    let flat = (0..width)
        .map(|i| {
            let upper = top.get(i).map(String::as_str).unwrap_or_default();
            let lower = bottom.get(i).map(String::as_str).unwrap_or_default();
            if header_key(lower) == STACKED_UNIT {
                upper.to_string()
            } else {
                lower.to_string()
            }
        })
        .collect();
    Some(flat)
}

fn check_header(path: &Path, headers: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(IngestError::MalformedHeader {
                path: path.to_path_buf(),
                reason: format!("column {} has an empty name", idx),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(IngestError::MalformedHeader {
                path: path.to_path_buf(),
                reason: format!("duplicate column `{}`", name),
            });
        }
    }
    Ok(())
}
