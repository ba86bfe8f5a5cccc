// src/process/mod.rs
pub mod aggregate;
pub mod date_parser;
pub mod normalize;
pub mod raw_table;
pub mod reshape;
pub mod resolve;
pub mod utils;

use crate::error::{IngestError, Result};
use std::{fs, path::Path};
use tracing::{info, warn};

pub use aggregate::{aggregate, MonthlyAggregate};
pub use normalize::{
    normalize, normalize_with, CanonicalRecord, DatasetKind, FailureReason, NormalizeOptions,
    Normalized,
};
pub use raw_table::{RawTable, RowAnomaly};
pub use resolve::{resolve, resolve_with, Candidates, EncodingGuess, TextEncoding};

/// Resolve encoding + delimiter for `path`, then read it into a `RawTable`.
///
/// The guess comes from a bounded prefix. When that encoding then fails on
/// the whole file, the remaining candidate encodings are tried against the
/// full contents before the file is given up on.
///
/// Both steps are fatal for the file: an unreadable file or a broken header
/// comes back as an error, everything row-level is recorded in the table.
#[tracing::instrument(level = "info", skip(path, candidates), fields(path = %path.as_ref().display()))]
pub fn load_landings_csv<P: AsRef<Path>>(
    path: P,
    candidates: &Candidates,
) -> Result<(EncodingGuess, RawTable)> {
    let path = path.as_ref();
    let sampled = resolve_with(path, candidates)?;
    let bytes = fs::read(path).map_err(|e| IngestError::io(path, e))?;

    let (guess, text) = match sampled.encoding.decode(&bytes, true) {
        Some(text) => (sampled, text),
        None => {
            warn!(
                encoding = %sampled.encoding,
                "sampled encoding fails past the prefix, retrying on the whole file"
            );
            let (guess, text) = resolve::resolve_after(&bytes, sampled.encoding, candidates)
                .ok_or_else(|| IngestError::UnreadableFile {
                    path: path.to_path_buf(),
                    reason: format!(
                        "{} decoding failed past the sampled prefix and no later encoding decodes the file",
                        sampled.encoding
                    ),
                })?;
            info!(encoding = %guess.encoding, delimiter = ?(guess.delimiter as char), "re-resolved");
            (guess, text)
        }
    };

    let table = raw_table::parse_text(path, &text, guess.delimiter)?;
    Ok((guess, table))
}
