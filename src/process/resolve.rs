use crate::error::{IngestError, Result};
use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::{fmt, fs::File, io::Read, path::Path};
use tracing::{debug, info, instrument};

/// Default bound on how much of a file is decoded per trial.
pub const DEFAULT_SAMPLE_BYTES: usize = 64 * 1024;

/// Text encodings the landings exports are known to come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-8, with the byte-order mark removed when present.
    Utf8Sig,
    /// UTF-16, endianness from the byte-order mark, little-endian without one.
    Utf16,
    /// The Windows 8-bit default for Norwegian locales.
    Windows1252,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Pick the concrete decoder and skip any byte-order mark it owns.
    fn split_bom<'a>(&self, bytes: &'a [u8]) -> (&'static Encoding, &'a [u8]) {
        match self {
            TextEncoding::Utf8Sig => match Encoding::for_bom(bytes) {
                Some((enc, len)) if enc == UTF_8 => (UTF_8, &bytes[len..]),
                _ => (UTF_8, bytes),
            },
            TextEncoding::Utf16 => match Encoding::for_bom(bytes) {
                Some((enc, len)) if enc == UTF_16LE || enc == UTF_16BE => (enc, &bytes[len..]),
                _ => (UTF_16LE, bytes),
            },
            TextEncoding::Windows1252 => (WINDOWS_1252, bytes),
        }
    }

    /// Strict decode: any malformed sequence yields `None`.
    ///
    /// With `last == false` the input is a prefix, so an incomplete sequence
    /// at the very end is not treated as malformed.
    pub fn decode(&self, bytes: &[u8], last: bool) -> Option<String> {
        let (encoding, body) = self.split_bom(bytes);
        let mut decoder = encoding.new_decoder_without_bom_handling();
        let capacity = decoder.max_utf8_buffer_length_without_replacement(body.len())?;
        let mut out = String::with_capacity(capacity);
        let (result, read) = decoder.decode_to_string_without_replacement(body, &mut out, last);
        match result {
            DecoderResult::InputEmpty if read == body.len() => Some(out),
            _ => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The encoding + delimiter pair one reader invocation is parameterised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingGuess {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl fmt::Display for EncodingGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.encoding, self.delimiter as char)
    }
}

/// Ordered trial list. Encoding is the outer loop, delimiter the inner one.
#[derive(Debug, Clone)]
pub struct Candidates {
    pub encodings: Vec<TextEncoding>,
    pub delimiters: Vec<u8>,
    pub sample_bytes: usize,
}

impl Default for Candidates {
    fn default() -> Self {
        Candidates {
            encodings: vec![
                TextEncoding::Utf8Sig,
                TextEncoding::Utf16,
                TextEncoding::Windows1252,
            ],
            delimiters: vec![b';', b'\t', b','],
            sample_bytes: DEFAULT_SAMPLE_BYTES,
        }
    }
}

impl Candidates {
    pub fn with_sample_bytes(mut self, sample_bytes: usize) -> Self {
        self.sample_bytes = sample_bytes.max(1);
        self
    }
}

/// Resolve `path` against the default candidate list.
pub fn resolve<P: AsRef<Path>>(path: P) -> Result<EncodingGuess> {
    resolve_with(path, &Candidates::default())
}

#[instrument(level = "debug", skip(path, candidates), fields(path = %path.as_ref().display()))]
pub fn resolve_with<P: AsRef<Path>>(path: P, candidates: &Candidates) -> Result<EncodingGuess> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let mut prefix = Vec::with_capacity(candidates.sample_bytes);
    file.take(candidates.sample_bytes as u64)
        .read_to_end(&mut prefix)
        .map_err(|e| IngestError::io(path, e))?;
    let complete = prefix.len() < candidates.sample_bytes;

    match resolve_bytes(&prefix, complete, candidates) {
        Some(guess) => {
            info!(path = %path.display(), encoding = %guess.encoding, delimiter = ?(guess.delimiter as char), "resolved");
            Ok(guess)
        }
        None => Err(IngestError::UnreadableFile {
            path: path.to_path_buf(),
            reason: format!(
                "tried {} encodings x {} delimiters on the first {} bytes",
                candidates.encodings.len(),
                candidates.delimiters.len(),
                prefix.len()
            ),
        }),
    }
}

/// Pure trial loop over an in-memory prefix.
/// `complete` says whether `prefix` is the whole file.
pub fn resolve_bytes(prefix: &[u8], complete: bool, candidates: &Candidates) -> Option<EncodingGuess> {
    candidates.encodings.iter().find_map(|&encoding| {
        let Some(text) = encoding.decode(prefix, complete) else {
            debug!(%encoding, "decode failed");
            return None;
        };
        pick_delimiter(encoding, &text, candidates).map(|delimiter| EncodingGuess {
            encoding,
            delimiter,
        })
    })
}

/// Resume the trial loop on the whole file after `failed` decoded the sampled
/// prefix but not the rest. Only encodings listed after `failed` are tried,
/// and the decoded text of the winner is returned with it.
pub fn resolve_after(
    bytes: &[u8],
    failed: TextEncoding,
    candidates: &Candidates,
) -> Option<(EncodingGuess, String)> {
    candidates
        .encodings
        .iter()
        .skip_while(|&&e| e != failed)
        .skip(1)
        .find_map(|&encoding| {
            let Some(text) = encoding.decode(bytes, true) else {
                debug!(%encoding, "full decode failed");
                return None;
            };
            let delimiter = pick_delimiter(encoding, &text, candidates)?;
            Some((
                EncodingGuess {
                    encoding,
                    delimiter,
                },
                text,
            ))
        })
}

/// First delimiter that splits the first line of `text` into 2+ fields.
fn pick_delimiter(encoding: TextEncoding, text: &str, candidates: &Candidates) -> Option<u8> {
    let first_line = text.split('\n').next().unwrap_or_default().trim_end_matches('\r');
    if first_line.chars().any(|c| c.is_control() && c != '\t') {
        debug!(%encoding, "first line has control characters");
        return None;
    }
    candidates.delimiters.iter().copied().find(|&delimiter| {
        let fields = first_line.split(delimiter as char).count();
        debug!(%encoding, delimiter = ?(delimiter as char), fields, "trial");
        fields >= 2
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    fn write_tmp(bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        Ok(tmp)
    }

    #[test]
    fn utf16_tab_file_resolves_to_utf16_tab() -> Result<()> {
        let bytes = utf16le_with_bom("År\tMåned\tRundvekt\n2023\t1\t10,5\n");
        let tmp = write_tmp(&bytes)?;
        let guess = resolve(tmp.path())?;
        assert_eq!(
            guess,
            EncodingGuess {
                encoding: TextEncoding::Utf16,
                delimiter: b'\t'
            }
        );
        Ok(())
    }

    #[test]
    fn binary_garbage_is_unreadable() -> Result<()> {
        let bytes: Vec<u8> = [0x00, 0x01, 0x02, 0x03, 0xC3, 0x28, 0x9F, 0x07]
            .iter()
            .cycle()
            .take(4096)
            .copied()
            .collect();
        let tmp = write_tmp(&bytes)?;
        let err = resolve(tmp.path()).unwrap_err();
        assert!(matches!(err, IngestError::UnreadableFile { .. }), "{err}");
        Ok(())
    }

    #[test]
    fn semicolon_wins_over_comma_within_utf8() -> Result<()> {
        let tmp = write_tmp("\u{feff}landingsdato;rundvekt\n2023-01-02;1,5\n".as_bytes())?;
        let guess = resolve(tmp.path())?;
        assert_eq!(guess.encoding, TextEncoding::Utf8Sig);
        assert_eq!(guess.delimiter, b';');
        Ok(())
    }

    #[test]
    fn latin1_file_falls_through_to_windows_1252() -> Result<()> {
        // "måned;vekt" with å as a single 0xE5 byte
        let bytes = b"m\xE5ned;vekt\n1;2\n".to_vec();
        let tmp = write_tmp(&bytes)?;
        let guess = resolve(tmp.path())?;
        assert_eq!(guess.encoding, TextEncoding::Windows1252);
        assert_eq!(guess.delimiter, b';');
        Ok(())
    }

    #[test]
    fn single_column_file_is_unreadable() -> Result<()> {
        let tmp = write_tmp(b"justonecolumn\n1\n2\n")?;
        assert!(matches!(
            resolve(tmp.path()),
            Err(IngestError::UnreadableFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn truncated_prefix_is_not_a_decode_error() {
        // 'å' is two bytes in UTF-8; cut the sample in the middle of it
        let text = "år,vekt\n2023,1\n".as_bytes();
        let candidates = Candidates::default().with_sample_bytes(1);
        let guess = resolve_bytes(&text[..1], false, &candidates);
        // the cut prefix has no delimiter, so nothing resolves, but UTF-8 must
        // not be rejected for the split character
        assert!(TextEncoding::Utf8Sig.decode(&text[..1], false).is_some());
        assert!(TextEncoding::Utf8Sig.decode(&text[..1], true).is_none());
        assert_eq!(guess, None);
    }

    #[test]
    fn injected_candidates_change_the_tie_break() {
        let candidates = Candidates {
            encodings: vec![TextEncoding::Utf8Sig],
            delimiters: vec![b',', b';'],
            sample_bytes: DEFAULT_SAMPLE_BYTES,
        };
        let guess = resolve_bytes(b"a;b,c\n", true, &candidates).expect("resolves");
        assert_eq!(guess.delimiter, b',');
    }

    #[test]
    fn full_file_retry_skips_the_failed_encoding() {
        let bytes = b"art;vekt\nR\xF8dspette;1\n";
        let (guess, text) =
            resolve_after(bytes, TextEncoding::Utf8Sig, &Candidates::default()).expect("resolves");
        assert_eq!(guess.encoding, TextEncoding::Windows1252);
        assert_eq!(guess.delimiter, b';');
        assert!(text.contains("Rødspette"));

        // nothing comes after the last candidate
        assert_eq!(
            resolve_after(bytes, TextEncoding::Windows1252, &Candidates::default()),
            None
        );
    }
}
