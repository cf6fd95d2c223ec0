use std::fmt;

use arbor_dom::{Attribute, QName};
use strum_macros::Display;

use crate::error::StreamError;

/// The events the tree builder consumes.
///
/// Names are already namespace-resolved: a `p:item` start tag inside the
/// scope of `xmlns:p="urn:x"` arrives as `QName { space: "urn:x", local: "item" }`.
/// `xmlns:p` declarations themselves arrive as attributes in the `xmlns` space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An opening tag with its attributes in source order.
    StartTag {
        /// Resolved element name.
        name: QName,
        /// Attributes, including namespace declarations.
        attributes: Vec<Attribute>,
    },

    /// A closing tag. `<a/>` produces a start tag followed by an end tag.
    EndTag {
        /// Resolved element name.
        name: QName,
    },

    /// Character data with references decoded; CDATA sections arrive here too.
    Text(String),

    /// No more tokens.
    EndOfFile,
}

/// Discriminant of a [`Token`], for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TokenKind {
    /// [`Token::StartTag`]
    StartTag,
    /// [`Token::EndTag`]
    EndTag,
    /// [`Token::Text`]
    Text,
    /// [`Token::EndOfFile`]
    EndOfFile,
}

impl Token {
    /// Which kind of token this is.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        match self {
            Self::StartTag { .. } => TokenKind::StartTag,
            Self::EndTag { .. } => TokenKind::EndTag,
            Self::Text(_) => TokenKind::Text,
            Self::EndOfFile => TokenKind::EndOfFile,
        }
    }

    /// Returns true if this is an end-of-file token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    /// Shorthand for a start tag in no namespace without attributes.
    #[must_use]
    pub fn start(local: &str) -> Self {
        Self::StartTag {
            name: QName::local(local),
            attributes: Vec::new(),
        }
    }

    /// Shorthand for an end tag in no namespace.
    #[must_use]
    pub fn end(local: &str) -> Self {
        Self::EndTag {
            name: QName::local(local),
        }
    }

    /// Shorthand for a text token.
    #[must_use]
    pub fn text(data: &str) -> Self {
        Self::Text(data.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTag { name, attributes } => {
                write!(f, "<{name}")?;
                for attr in attributes {
                    write!(f, " {}=\"{}\"", attr.name, attr.value)?;
                }
                write!(f, ">")
            }
            Self::EndTag { name } => write!(f, "</{name}>"),
            Self::Text(data) => {
                // Show whitespace explicitly
                let display = data.replace('\n', "\\n").replace('\t', "\\t");
                write!(f, "Text(\"{display}\")")
            }
            Self::EndOfFile => write!(f, "EOF"),
        }
    }
}

/// A pull-based token stream.
///
/// Sources must emit balanced start/end tags. The tree builder trusts the
/// nesting it is given and does not match end tag names.
pub trait TokenSource {
    /// Produce the next token. After [`Token::EndOfFile`] a source keeps
    /// returning it.
    ///
    /// # Errors
    ///
    /// Any failure to produce a token, which aborts the parse.
    fn next_token(&mut self) -> Result<Token, StreamError>;
}

impl<S: TokenSource + ?Sized> TokenSource for &mut S {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        (**self).next_token()
    }
}

/// A token source over a prepared list of tokens.
///
/// Yields [`Token::EndOfFile`] once the list is exhausted, whether or not the
/// list ends with one.
#[derive(Debug, Clone)]
pub struct TokenList {
    tokens: std::vec::IntoIter<Token>,
}

impl TokenList {
    /// Create a source that replays `tokens`.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl From<Vec<Token>> for TokenList {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl TokenSource for TokenList {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        Ok(self.tokens.next().unwrap_or(Token::EndOfFile))
    }
}
