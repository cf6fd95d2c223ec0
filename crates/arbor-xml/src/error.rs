//! Error types for tokenizing and tree building.

use std::io;

use arbor_dom::{QName, TreeError};
use thiserror::Error;

/// The token source failed to produce a token.
///
/// Line numbers are 1-based and refer to the decoded input.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The underlying reader failed.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// Bytes that are not valid UTF-8 after charset decoding.
    #[error("line {line}: invalid UTF-8")]
    InvalidUtf8 {
        /// Line of the offending text.
        line: usize,
    },

    /// Malformed markup.
    #[error("line {line}: {message}")]
    Syntax {
        /// Line where the problem was detected.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// An end tag that does not close the innermost open element.
    #[error("line {line}: element <{expected}> closed by </{found}>")]
    MismatchedEndTag {
        /// Line of the end tag.
        line: usize,
        /// Raw name of the innermost open element.
        expected: String,
        /// Raw name in the end tag.
        found: String,
    },

    /// An end tag with no open element.
    #[error("line {line}: unexpected end tag </{found}>")]
    UnexpectedEndTag {
        /// Line of the end tag.
        line: usize,
        /// Raw name in the end tag.
        found: String,
    },

    /// Input ended while an element was still open.
    #[error("unexpected end of input: <{name}> is not closed")]
    UnclosedElement {
        /// Raw name of the innermost open element.
        name: String,
    },

    /// A prefix with no `xmlns:prefix` binding in scope.
    #[error("line {line}: unbound namespace prefix `{prefix}`")]
    UnboundPrefix {
        /// Line of the name.
        line: usize,
        /// The unbound prefix.
        prefix: String,
    },

    /// An entity or character reference that cannot be resolved.
    #[error("line {line}: unknown entity `&{entity};`")]
    UnknownEntity {
        /// Line of the reference.
        line: usize,
        /// Text between `&` and `;`.
        entity: String,
    },

    /// Any other failure reported by the XML reader.
    #[error("line {line}: {source}")]
    Xml {
        /// Line where the reader stopped.
        line: usize,
        /// Reader failure.
        source: quick_xml::Error,
    },

    /// The charset decoder rejected the declared encoding.
    #[error("cannot decode input declared as `{label}`: {source}")]
    Charset {
        /// Encoding label from the XML declaration.
        label: String,
        /// Decoder failure.
        source: io::Error,
    },
}

/// Failure to build elements or a document from a token stream.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The token source failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The stream ended inside an element.
    #[error("end of stream inside <{element}>")]
    UnexpectedEndOfStream {
        /// Name of the element left open.
        element: QName,
    },

    /// More than one top-level element where a document was requested.
    #[error("more than one root element not allowed")]
    TooManyRootElements,

    /// Nesting exceeded the configured depth limit.
    #[error("elements nested deeper than {limit} levels")]
    NestingTooDeep {
        /// The configured limit.
        limit: usize,
    },

    /// The tree rejected an operation while assembling the result.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
