//! Parse configuration and the character-decoding hook.

use std::fmt;
use std::io::{self, Read};

use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;

/// Maps input declared in some encoding to a UTF-8 byte stream.
///
/// The tokenizer calls [`CharsetDecoder::decode`] when the XML declaration
/// names an encoding other than UTF-8. Everything after the declaration is
/// read through the returned reader.
pub trait CharsetDecoder {
    /// Wrap `input`, declared as `label`, in a reader producing UTF-8.
    ///
    /// # Errors
    ///
    /// Implementations return an error for labels they cannot handle.
    fn decode<'r>(&self, label: &str, input: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>>;
}

/// Treats every input as UTF-8, whatever the declaration says.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDecoder;

impl CharsetDecoder for IdentityDecoder {
    fn decode<'r>(&self, _label: &str, input: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(input)
    }
}

/// Decodes any label the WHATWG Encoding Standard knows, through `encoding_rs`.
///
/// Labels resolve the way browsers resolve them, so `ISO-8859-1` and
/// `US-ASCII` both read as windows-1252.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingDecoder;

impl CharsetDecoder for EncodingDecoder {
    fn decode<'r>(&self, label: &str, input: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported encoding `{label}`"),
            )
        })?;
        Ok(Box::new(
            DecodeReaderBytesBuilder::new()
                .encoding(Some(encoding))
                .build(input),
        ))
    }
}

/// Options for the parse entry points.
pub struct ParseOptions {
    /// Decoder applied to input declaring a non-UTF-8 encoding.
    /// Defaults to [`IdentityDecoder`].
    pub charset_decoder: Box<dyn CharsetDecoder>,
    /// Maximum element nesting depth; `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl ParseOptions {
    /// Default options: identity decoding, no depth limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `decoder` for non-UTF-8 input.
    #[must_use]
    pub fn with_charset_decoder(mut self, decoder: impl CharsetDecoder + 'static) -> Self {
        self.charset_decoder = Box::new(decoder);
        self
    }

    /// Reject documents nested deeper than `limit` elements.
    #[must_use]
    pub const fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            charset_decoder: Box::new(IdentityDecoder),
            max_depth: None,
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &dyn CharsetDecoder, label: &str, bytes: &[u8]) -> io::Result<String> {
        let mut out = String::new();
        let _ = decoder.decode(label, Box::new(bytes))?.read_to_string(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_identity_passes_bytes_through() {
        assert_eq!(decode_all(&IdentityDecoder, "koi8-r", b"plain").unwrap(), "plain");
    }

    #[test]
    fn test_latin1_label_maps_high_bytes() {
        assert_eq!(decode_all(&EncodingDecoder, "ISO-8859-1", b"caf\xe9").unwrap(), "café");
    }

    #[test]
    fn test_windows_1252_label() {
        let text = decode_all(&EncodingDecoder, "windows-1252", b"\x80 5 \x93q\x94").unwrap();
        assert_eq!(text, "€ 5 “q”");
    }

    #[test]
    fn test_other_single_byte_encoding() {
        assert_eq!(decode_all(&EncodingDecoder, "koi8-r", b"\xc1").unwrap(), "а");
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = decode_all(&EncodingDecoder, "EBCDIC", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
