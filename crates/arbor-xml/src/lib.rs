//! XML tree building and serialization for Arbor.
//!
//! # Scope
//!
//! This crate implements:
//! - **Tokenizer** ([`XmlTokenizer`]): strict, streaming, namespace-resolving,
//!   built on `quick_xml::NsReader`
//!   - Start/end tags, attributes, text, CDATA sections
//!   - Predefined entities and numeric character references
//!   - Byte order mark and XML declaration, with a pluggable
//!     [`CharsetDecoder`] ([`EncodingDecoder`] covers the `encoding_rs` labels)
//!
//! - **Tree Builder** ([`TreeBuilder`]): recursive descent over any
//!   [`TokenSource`] into an [`arbor_dom::ElementTree`]
//!
//! - **Encoder** ([`Encoder`]): namespace discovery, prefix assignment and
//!   pretty or compact output to any [`std::io::Write`]
//!
//! # Not Modeled
//!
//! - Comments, processing instructions and DOCTYPE declarations (skipped)
//! - Mixed content: only the last non-blank text of an element is kept
//! - Schema or DTD validation

/// Tree construction from a token stream.
pub mod builder;
/// Error types.
pub mod error;
/// Parse configuration.
pub mod options;
/// Namespace-aware serialization.
pub mod serializer;
/// Tokenization of XML input.
pub mod tokenizer;

use std::io::Read;

use arbor_dom::Document;

pub use builder::{Forest, TreeBuilder};
pub use error::{ParseError, StreamError};
pub use options::{CharsetDecoder, EncodingDecoder, IdentityDecoder, ParseOptions};
pub use serializer::{
    Encoder, NamespaceResolver, document_to_string, to_bytes, to_compact_string, to_string,
};
pub use tokenizer::{Token, TokenKind, TokenList, TokenSource, XmlTokenizer};

/// Build the top-level elements of any token stream.
///
/// # Errors
///
/// See [`TreeBuilder::build`].
pub fn build_elements<S: TokenSource + ?Sized>(
    source: &mut S,
    options: &ParseOptions,
) -> Result<Forest, ParseError> {
    TreeBuilder::new(source)
        .with_max_depth(options.max_depth)
        .build()
}

/// Parse every top-level element in `reader`, treating the input as UTF-8.
///
/// Several top-level elements are fine here; see [`parse`] for documents.
///
/// # Errors
///
/// Malformed or truncated input.
pub fn parse_elements<R: Read>(reader: R) -> Result<Forest, ParseError> {
    parse_elements_with_options(reader, &ParseOptions::default())
}

/// Like [`parse_elements`], with options.
///
/// # Errors
///
/// Malformed or truncated input, decoder failures, or exceeding
/// [`ParseOptions::max_depth`].
pub fn parse_elements_with_options<R: Read>(
    reader: R,
    options: &ParseOptions,
) -> Result<Forest, ParseError> {
    let mut tokenizer = XmlTokenizer::with_decoder(reader, options.charset_decoder.as_ref());
    build_elements(&mut tokenizer, options)
}

/// Parse a document: at most one top-level element.
///
/// # Errors
///
/// [`ParseError::TooManyRootElements`] for several top-level elements, and
/// everything [`parse_elements`] reports.
pub fn parse<R: Read>(reader: R) -> Result<Document, ParseError> {
    parse_with_options(reader, &ParseOptions::default())
}

/// Like [`parse`], with options.
///
/// # Errors
///
/// See [`parse`] and [`parse_elements_with_options`].
pub fn parse_with_options<R: Read>(reader: R, options: &ParseOptions) -> Result<Document, ParseError> {
    parse_elements_with_options(reader, options)?.into_document()
}

/// Parse a document held in a string.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_str(xml: &str) -> Result<Document, ParseError> {
    parse(xml.as_bytes())
}
