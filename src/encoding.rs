use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// How many leading bytes the heuristic scan looks at.
pub const SCAN_LIMIT: usize = 1000;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Ascii,
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1; decodes every byte value.
    Latin1,
}

impl Encoding {
    /// The `encoding_rs` decoder backing this classification.
    ///
    /// Latin-1 resolves the way the WHATWG `iso-8859-1` label does, to
    /// windows-1252, so 0x80..=0x9F decode to printable punctuation.
    pub fn as_encoding_rs(self) -> &'static encoding_rs::Encoding {
        match self {
            Encoding::Ascii | Encoding::Utf8 => encoding_rs::UTF_8,
            Encoding::Utf16Le => encoding_rs::UTF_16LE,
            Encoding::Utf16Be => encoding_rs::UTF_16BE,
            Encoding::Latin1 => encoding_rs::WINDOWS_1252,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Ascii => "ASCII",
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Latin1 => "ISO-8859-1",
        };
        f.write_str(name)
    }
}

/// An uploaded file as received, tagged with its detected encoding.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Bytes,
    encoding: Encoding,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let encoding = detect(&bytes);
        Self { bytes, encoding }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Classify a byte buffer. BOMs win; otherwise the first [`SCAN_LIMIT`]
/// bytes are checked for well-formed UTF-8 multi-byte sequences, falling
/// back to Latin-1 which never fails to decode.
pub fn detect(bytes: &[u8]) -> Encoding {
    if bytes.starts_with(UTF8_BOM) {
        return Encoding::Utf8;
    }
    if bytes.starts_with(UTF16LE_BOM) {
        return Encoding::Utf16Le;
    }
    if bytes.starts_with(UTF16BE_BOM) {
        return Encoding::Utf16Be;
    }

    let scan = &bytes[..bytes.len().min(SCAN_LIMIT)];
    if scan.is_ascii() {
        return Encoding::Ascii;
    }

    let (valid, invalid) = count_utf8_sequences(bytes, scan.len());
    if (valid > 0 && invalid == 0) || valid > invalid {
        Encoding::Utf8
    } else {
        Encoding::Latin1
    }
}

/// Counts multi-byte sequences starting before `limit`. Continuation bytes
/// may be read past `limit` so a sequence straddling the scan window is not
/// penalised.
fn count_utf8_sequences(bytes: &[u8], limit: usize) -> (usize, usize) {
    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut i = 0usize;

    while i < limit {
        let b = bytes[i];
        if b <= 0x7F {
            i += 1;
            continue;
        }
        let continuation = match b {
            b if b & 0xE0 == 0xC0 => 1,
            b if b & 0xF0 == 0xE0 => 2,
            b if b & 0xF8 == 0xF0 => 3,
            _ => 0,
        };
        let well_formed = continuation > 0
            && bytes
                .get(i + 1..i + 1 + continuation)
                .is_some_and(|tail| tail.iter().all(|c| c & 0xC0 == 0x80));
        if well_formed {
            valid += 1;
            i += 1 + continuation;
        } else {
            invalid += 1;
            i += 1;
        }
    }

    (valid, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boms_take_precedence() {
        assert_eq!(detect(b"\xEF\xBB\xBFnome"), Encoding::Utf8);
        assert_eq!(detect(b"\xFF\xFEn\x00"), Encoding::Utf16Le);
        assert_eq!(detect(b"\xFE\xFF\x00n"), Encoding::Utf16Be);
    }

    #[test]
    fn plain_ascii() {
        assert_eq!(detect(b"Nome,Email\nAna,ana@x.com\n"), Encoding::Ascii);
        assert_eq!(detect(b""), Encoding::Ascii);
    }

    #[test]
    fn utf8_without_bom() {
        let text = "Nome,Cidade\nJoão,São Paulo\n";
        assert_eq!(detect(text.as_bytes()), Encoding::Utf8);
    }

    #[test]
    fn latin1_bytes() {
        // "João,São" encoded as ISO-8859-1
        let bytes = b"Jo\xE3o,S\xE3o Paulo\n";
        assert_eq!(detect(bytes), Encoding::Latin1);
    }

    #[test]
    fn high_bytes_past_scan_window_are_ignored() {
        let mut bytes = vec![b'a'; SCAN_LIMIT];
        bytes.extend_from_slice(b"\xE3\xE3");
        assert_eq!(detect(&bytes), Encoding::Ascii);
    }

    #[test]
    fn mostly_valid_utf8_wins() {
        let mut bytes = "ção ção ção".as_bytes().to_vec();
        bytes.push(0xE9);
        assert_eq!(detect(&bytes), Encoding::Utf8);
    }

    #[test]
    fn raw_document_keeps_bytes_and_tag() {
        let doc = RawDocument::new(b"a,b\n1,2\n".to_vec());
        assert_eq!(doc.encoding(), Encoding::Ascii);
        assert_eq!(doc.len(), 8);
        assert!(!doc.is_empty());
    }
}
