use std::borrow::Cow;
use std::fmt;

use csv::{ErrorKind, ReaderBuilder};
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::Serialize;
use tracing::debug;

use crate::error::{DecodeError, RejectedCandidate};
use crate::table::TabularDataset;

/// Bytes with no assigned character in the cp1252 code page.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    Utf8,
    Utf16,
    Latin1,
    Iso8859_1,
    Cp1252,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Iso8859_1 => "iso-8859-1",
            TextEncoding::Cp1252 => "cp1252",
        }
    }

    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .ok_or_else(|| "invalid utf-8 byte sequence".to_string())
            }
            TextEncoding::Utf16 => decode_utf16(bytes),
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Ok(encoding_rs::mem::decode_latin1(bytes))
            }
            TextEncoding::Cp1252 => {
                if let Some(pos) = bytes.iter().position(|b| CP1252_UNDEFINED.contains(b)) {
                    return Err(format!(
                        "byte 0x{:02x} at position {pos} is undefined in cp1252",
                        bytes[pos]
                    ));
                }
                WINDOWS_1252
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .ok_or_else(|| "invalid cp1252 byte sequence".to_string())
            }
        }
    }
}

fn decode_utf16(bytes: &[u8]) -> Result<Cow<'_, str>, String> {
    let (encoding, body) = if let Some(body) = bytes.strip_prefix(b"\xFF\xFE") {
        (UTF_16LE, body)
    } else if let Some(body) = bytes.strip_prefix(b"\xFE\xFF") {
        (UTF_16BE, body)
    } else {
        return Err("missing utf-16 byte-order mark".to_string());
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| "invalid utf-16 code unit sequence".to_string())
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl Candidate {
    pub const fn new(encoding: TextEncoding, delimiter: u8) -> Self {
        Self {
            encoding,
            delimiter,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delimiter = match self.delimiter {
            b'\t' => "\\t".to_string(),
            other => (other as char).to_string(),
        };
        write!(f, "{} with '{}'", self.encoding, delimiter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeProfile {
    candidates: Vec<Candidate>,
}

impl DecodeProfile {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn comma() -> Self {
        Self::new(
            [
                TextEncoding::Utf8,
                TextEncoding::Latin1,
                TextEncoding::Iso8859_1,
                TextEncoding::Cp1252,
            ]
            .into_iter()
            .map(|encoding| Candidate::new(encoding, b','))
            .collect(),
        )
    }

    pub fn tab() -> Self {
        Self::new(
            [
                TextEncoding::Utf16,
                TextEncoding::Utf8,
                TextEncoding::Latin1,
            ]
            .into_iter()
            .map(|encoding| Candidate::new(encoding, b'\t'))
            .collect(),
        )
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

enum Attempt {
    Parsed(TabularDataset),
    Rejected(String),
}

pub fn decode(bytes: &[u8], profile: &DecodeProfile) -> Result<TabularDataset, DecodeError> {
    let mut attempted = Vec::with_capacity(profile.candidates().len());
    for candidate in profile.candidates() {
        match attempt(bytes, candidate)? {
            Attempt::Parsed(dataset) => {
                debug!(
                    candidate = %candidate,
                    rows = dataset.row_count(),
                    columns = dataset.width(),
                    "parsed upload"
                );
                return Ok(dataset);
            }
            Attempt::Rejected(reason) => {
                debug!(candidate = %candidate, %reason, "candidate rejected");
                attempted.push(RejectedCandidate {
                    candidate: *candidate,
                    reason,
                });
            }
        }
    }
    Err(DecodeError::Exhausted { attempted })
}

fn attempt(bytes: &[u8], candidate: &Candidate) -> Result<Attempt, DecodeError> {
    let text = match candidate.encoding.decode(bytes) {
        Ok(text) => text,
        Err(reason) => return Ok(Attempt::Rejected(reason)),
    };
    parse_delimited(&text, candidate.delimiter)
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<Attempt, DecodeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        Err(err) => return classify(err),
    };
    if headers.is_empty() {
        return Err(DecodeError::Empty);
    }
    let width = headers.len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => return classify(err),
        };
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Ok(Attempt::Rejected(format!(
                "expected {width} fields in line {line}, saw {}",
                record.len()
            )));
        }
        rows.push(record.iter().map(|f| f.to_string()).collect::<Vec<_>>());
    }
    match TabularDataset::from_rows(headers, rows) {
        Ok(dataset) => Ok(Attempt::Parsed(dataset)),
        Err(err) => Ok(Attempt::Rejected(err.to_string())),
    }
}

fn classify(err: csv::Error) -> Result<Attempt, DecodeError> {
    match err.kind() {
        ErrorKind::Io(_) => Err(DecodeError::Io(err.to_string())),
        _ => Ok(Attempt::Rejected(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn comma_profile_reads_utf8() {
        let dataset = decode(
            "Account Name,Account Owner\nAcme,Jo\n".as_bytes(),
            &DecodeProfile::comma(),
        )
        .unwrap();
        assert_eq!(dataset.column_names(), vec!["Account Name", "Account Owner"]);
        assert_eq!(dataset.row_count(), 1);
    }

    #[test]
    fn comma_profile_falls_back_to_latin1() {
        let bytes = b"Account Name,City\nCaf\xe9 Ltd,M\xfcnchen\n";
        let dataset = decode(bytes, &DecodeProfile::comma()).unwrap();
        assert_eq!(
            dataset.column("Account Name").unwrap().cells[0].as_str(),
            Some("Café Ltd")
        );
        assert_eq!(
            dataset.column("City").unwrap().cells[0].as_str(),
            Some("München")
        );
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let dataset = decode(b"\xEF\xBB\xBFname,value\na,1\n", &DecodeProfile::comma()).unwrap();
        assert_eq!(dataset.column_names(), vec!["name", "value"]);
    }

    #[test]
    fn tab_profile_reads_utf16_with_bom() {
        let bytes = utf16le("Name\tOwner\r\nZoë\tKim\r\n");
        let dataset = decode(&bytes, &DecodeProfile::tab()).unwrap();
        assert_eq!(dataset.column_names(), vec!["Name", "Owner"]);
        assert_eq!(dataset.column("Name").unwrap().cells[0].as_str(), Some("Zoë"));
    }

    #[test]
    fn tab_profile_reads_plain_utf8() {
        let dataset = decode(b"Name\tOwner\nA\tB\n", &DecodeProfile::tab()).unwrap();
        assert_eq!(dataset.column_names(), vec!["Name", "Owner"]);
    }

    #[test]
    fn utf16_without_bom_is_rejected() {
        let err = TextEncoding::Utf16.decode(b"a\x00b\x00").unwrap_err();
        assert!(err.contains("byte-order mark"));
    }

    #[test]
    fn cp1252_rejects_undefined_bytes() {
        assert!(TextEncoding::Cp1252.decode(b"ok\x81").is_err());
        assert_eq!(TextEncoding::Cp1252.decode(b"\x80").unwrap(), "€");
    }

    #[test]
    fn long_rows_reject_every_candidate() {
        let bytes = b"a,b\n1,2,3\n";
        let err = decode(bytes, &DecodeProfile::comma()).unwrap_err();
        let attempted: Vec<_> = err
            .attempted()
            .iter()
            .map(|rejected| rejected.candidate)
            .collect();
        assert_eq!(attempted, DecodeProfile::comma().candidates().to_vec());
        assert!(err.to_string().contains("cp1252"));
    }

    #[test]
    fn empty_input_propagates_without_fallback() {
        let err = decode(b"", &DecodeProfile::comma()).unwrap_err();
        assert_eq!(err, DecodeError::Empty);
    }

    #[test]
    fn encoding_failures_are_listed() {
        let profile = DecodeProfile::new(vec![Candidate::new(TextEncoding::Utf8, b',')]);
        let err = decode(b"name\n\xff\n", &profile).unwrap_err();
        assert_eq!(err.attempted().len(), 1);
        assert!(err.attempted()[0].reason.contains("utf-8"));
    }
}
