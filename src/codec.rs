use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

use crate::encoding::{Encoding, RawDocument};
use crate::normalize::normalize;

/// Transcodes bytes of a detected [`Encoding`] into UTF-8.
///
/// Malformed input becomes U+FFFD, so transcoding never fails. A BOM
/// matching the encoding is dropped.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
}

impl Transcoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            decoder: encoding.as_encoding_rs().new_decoder_with_bom_removal(),
        }
    }

    /// Returns the number of input bytes consumed and the decoded text.
    fn transcode(&mut self, src: &[u8], last: bool) -> (usize, String) {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or_else(|| src.len() * 3 + 4);
        let mut out = String::with_capacity(capacity);
        let (_result, bytes_read, _had_errors) = self.decoder.decode_to_string(src, &mut out, last);
        (bytes_read, out)
    }
}

impl Decoder for Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let (bytes_read, out) = self.transcode(&src[..], false);
        src.advance(bytes_read);

        if out.is_empty() {
            return Ok(None);
        }
        Ok(Some(BytesMut::from(out.as_bytes())))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (_bytes_read, out) = self.transcode(&buf[..], true);
        buf.clear();

        if out.is_empty() {
            Ok(None)
        } else {
            Ok(Some(BytesMut::from(out.as_bytes())))
        }
    }
}

/// Document text after transcoding and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText(String);

impl DecodedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Decode the whole document in one pass and normalize the result.
pub fn decode_document(doc: &RawDocument) -> DecodedText {
    let mut transcoder = Transcoder::new(doc.encoding());
    let (_bytes_read, text) = transcoder.transcode(doc.bytes(), true);
    DecodedText(normalize(&text))
}
