use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read};

use arbor_common::warning::warn_once;
use arbor_dom::{Attribute, QName, XMLNS_SPACE};
use quick_xml::NsReader;
use quick_xml::escape::{EscapeError, unescape};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::ResolveResult;

use super::token::{Token, TokenSource};
use crate::error::StreamError;
use crate::options::{CharsetDecoder, IdentityDecoder};

static IDENTITY: IdentityDecoder = IdentityDecoder;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DECLARATION_START: &[u8] = b"<?xml";

type Input<'a> = BufReader<Box<dyn Read + 'a>>;

/// Strict, streaming XML tokenizer over a [`quick_xml::NsReader`].
///
/// The reader does the lexing and namespace scoping; this type adds what the
/// tree builder relies on: every end tag closes the innermost open start tag,
/// names are valid XML names, and the input cannot end with elements still
/// open.
///
/// A UTF-8 byte order mark and the XML declaration are consumed when the
/// tokenizer is created. A declared `encoding` other than UTF-8 is handed to
/// the [`CharsetDecoder`]. Comments, processing instructions and DOCTYPE
/// declarations are dropped.
pub struct XmlTokenizer<'a> {
    reader: NsReader<Input<'a>>,
    buf: Vec<u8>,
    /// 1-based line of the next event.
    line: usize,
    /// Raw (unresolved) names of open elements.
    open: Vec<String>,
    /// End tag owed for a `<name/>` start tag.
    pending_end: Option<QName>,
    /// Failure while reading the declaration, returned by the first call.
    failure: Option<StreamError>,
}

impl<'a> XmlTokenizer<'a> {
    /// Tokenize `reader`, assuming UTF-8 whatever the declaration says.
    pub fn new<R: Read + 'a>(reader: R) -> Self {
        Self::with_decoder(reader, &IDENTITY)
    }

    /// Tokenize `reader`, decoding declared non-UTF-8 input with `decoder`.
    pub fn with_decoder<R: Read + 'a>(reader: R, decoder: &dyn CharsetDecoder) -> Self {
        let (input, line, failure): (Box<dyn Read + 'a>, usize, Option<StreamError>) =
            match open_input(Box::new(reader), decoder) {
                Ok((input, line)) => (input, line, None),
                Err(err) => (Box::new(io::empty()), 1, Some(err)),
            };
        let mut reader = NsReader::from_reader(BufReader::new(input));
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        Self {
            reader,
            buf: Vec::new(),
            line,
            open: Vec::new(),
            pending_end: None,
            failure,
        }
    }

    /// Line of the next unread event.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Drain the stream into a list, including the final [`Token::EndOfFile`].
    ///
    /// # Errors
    ///
    /// The first [`StreamError`] encountered.
    pub fn collect_tokens(mut self) -> Result<Vec<Token>, StreamError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Resolve an element name, start or end, against the bindings in scope.
    fn element_name(
        &self,
        raw: quick_xml::name::QName<'_>,
        line: usize,
    ) -> Result<QName, StreamError> {
        let (result, local) = self.reader.resolve_element(raw);
        Ok(QName::new(namespace(result, line)?, utf8(local.as_ref(), line)?))
    }

    /// Raw name, resolved name and attributes of a start tag.
    fn start_tag(
        &self,
        start: &BytesStart<'_>,
        line: usize,
    ) -> Result<(String, QName, Vec<Attribute>), StreamError> {
        let raw = checked_name(start.name().as_ref(), line)?.to_string();
        let name = self.element_name(start.name(), line)?;

        let mut attributes = Vec::new();
        for attribute in start.attributes().with_checks(false) {
            let attribute = attribute.map_err(|err| syntax(line, err.to_string()))?;
            let key = checked_name(attribute.key.as_ref(), line)?;
            // Declarations keep their raw form; only `xmlns:p` moves to the xmlns space.
            let name = if key == "xmlns" {
                QName::local(key)
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                QName::new(XMLNS_SPACE, prefix)
            } else {
                let (result, local) = self.reader.resolve_attribute(attribute.key);
                QName::new(namespace(result, line)?, utf8(local.as_ref(), line)?)
            };
            let value = utf8(&attribute.value, line)?;
            if value.contains('<') {
                return Err(syntax(line, format!("'<' in value of attribute `{key}`")));
            }
            attributes.push(Attribute::new(name, unescaped(value, line)?));
        }
        Ok((raw, name, attributes))
    }

    fn end_tag(&mut self, end: &BytesEnd<'_>, line: usize) -> Result<Token, StreamError> {
        let qname = end.name();
        let raw = utf8(qname.as_ref(), line)?;
        let Some(open) = self.open.pop() else {
            return Err(StreamError::UnexpectedEndTag {
                line,
                found: raw.to_string(),
            });
        };
        if open != raw {
            return Err(StreamError::MismatchedEndTag {
                line,
                expected: open,
                found: raw.to_string(),
            });
        }
        Ok(Token::EndTag {
            name: self.element_name(end.name(), line)?,
        })
    }
}

impl TokenSource for XmlTokenizer<'_> {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        if let Some(name) = self.pending_end.take() {
            return Ok(Token::EndTag { name });
        }

        loop {
            let line = self.line;
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| reader_error(line, source))?
                .into_owned();
            self.line += newlines(&event);

            match event {
                Event::Start(start) => {
                    let (raw, name, attributes) = self.start_tag(&start, line)?;
                    self.open.push(raw);
                    return Ok(Token::StartTag { name, attributes });
                }
                Event::Empty(start) => {
                    let (_, name, attributes) = self.start_tag(&start, line)?;
                    self.pending_end = Some(name.clone());
                    return Ok(Token::StartTag { name, attributes });
                }
                Event::End(end) => return self.end_tag(&end, line),
                Event::Text(text) => {
                    return Ok(Token::Text(unescaped(utf8(&text, line)?, line)?));
                }
                Event::CData(data) => return Ok(Token::Text(utf8(&data, line)?.to_string())),
                Event::Decl(_) => {
                    return Err(syntax(
                        line,
                        "XML declaration is only allowed at the start of the document",
                    ));
                }
                Event::DocType(_) => {
                    warn_once("XML", "DOCTYPE and other <!...> declarations are skipped");
                }
                Event::Comment(_) | Event::PI(_) => {}
                Event::Eof => {
                    return match self.open.pop() {
                        Some(name) => Err(StreamError::UnclosedElement { name }),
                        None => Ok(Token::EndOfFile),
                    };
                }
            }
        }
    }
}

/// Strip a UTF-8 byte order mark and consume the XML declaration, if any.
///
/// Returns the rest of the input, decoded when the declaration names an
/// encoding other than UTF-8, and the line the rest starts on.
fn open_input<'a>(
    input: Box<dyn Read + 'a>,
    decoder: &dyn CharsetDecoder,
) -> Result<(Box<dyn Read + 'a>, usize), StreamError> {
    let mut input = BufReader::new(input);
    let mut head = Vec::new();
    let _ = input.by_ref().take(UTF8_BOM.len() as u64).read_to_end(&mut head)?;
    if head == UTF8_BOM {
        head.clear();
    }
    // `<?xml` and the whitespace after it; `<?xml-stylesheet` is an ordinary PI.
    let wanted = DECLARATION_START.len() + 1 - head.len();
    let _ = input.by_ref().take(wanted as u64).read_to_end(&mut head)?;
    let is_declaration = head.starts_with(DECLARATION_START)
        && head
            .get(DECLARATION_START.len())
            .is_some_and(u8::is_ascii_whitespace);
    if !is_declaration {
        return Ok((Box::new(io::Cursor::new(head).chain(input)), 1));
    }

    let _ = input.read_until(b'>', &mut head)?;
    let declaration = utf8(&head, 1)?;
    let Some(body) = declaration.strip_suffix("?>") else {
        return Err(syntax(1, "unterminated XML declaration"));
    };
    let line = 1 + newlines(body.as_bytes());
    match pseudo_attribute(body, "encoding") {
        Some(label) if !label.eq_ignore_ascii_case("utf-8") => {
            let decoded = decoder
                .decode(label, Box::new(input))
                .map_err(|source| StreamError::Charset {
                    label: label.to_string(),
                    source,
                })?;
            Ok((decoded, line))
        }
        _ => Ok((Box::new(input), line)),
    }
}

/// Value of `key="..."` (or single-quoted) inside a declaration body.
fn pseudo_attribute<'b>(body: &'b str, key: &str) -> Option<&'b str> {
    let start = body.find(key)? + key.len();
    let rest = body[start..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|&c| c == '"' || c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|end| &value[..end])
}

fn syntax(line: usize, message: impl Into<String>) -> StreamError {
    StreamError::Syntax {
        line,
        message: message.into(),
    }
}

fn reader_error(line: usize, source: quick_xml::Error) -> StreamError {
    match source {
        quick_xml::Error::Syntax(err) => syntax(line, err.to_string()),
        source => StreamError::Xml { line, source },
    }
}

/// Namespace name of a resolved prefix; no namespace is the empty string.
fn namespace(result: ResolveResult<'_>, line: usize) -> Result<String, StreamError> {
    match result {
        ResolveResult::Bound(ns) => Ok(utf8(ns.0, line)?.to_string()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(StreamError::UnboundPrefix {
            line,
            prefix: String::from_utf8_lossy(&prefix).into_owned(),
        }),
    }
}

fn newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

fn utf8(bytes: &[u8], line: usize) -> Result<&str, StreamError> {
    std::str::from_utf8(bytes).map_err(|_| StreamError::InvalidUtf8 { line })
}

/// Replace entity and character references.
fn unescaped(raw: &str, line: usize) -> Result<String, StreamError> {
    unescape(raw).map(Cow::into_owned).map_err(|err| match err {
        EscapeError::UnrecognizedEntity(_, entity) => StreamError::UnknownEntity { line, entity },
        other => syntax(line, other.to_string()),
    })
}

/// `raw` as a string, if it is an XML name with at most one colon between
/// a non-empty prefix and local part.
fn checked_name(raw: &[u8], line: usize) -> Result<&str, StreamError> {
    let name = utf8(raw, line)?;
    let mut chars = name.chars();
    let is_name = chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char);
    let is_qualified = name.split_once(':').is_none_or(|(prefix, local)| {
        !prefix.is_empty() && !local.is_empty() && !local.contains(':')
    });
    if is_name && is_qualified {
        Ok(name)
    } else {
        Err(syntax(line, format!("invalid name `{name}`")))
    }
}

/// `NameStartChar` of XML 1.0 (fifth edition).
const fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

const fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}
