//! XML tokenizer module.
//!
//! Turns a byte stream into the [`Token`] stream the tree builder consumes.
//! The builder only depends on the [`TokenSource`] trait; [`XmlTokenizer`] is
//! the bundled strict implementation and [`TokenList`] replays prepared tokens.

/// Streaming tokenizer over `quick_xml`.
pub mod core;
/// Token types and the token source trait.
pub mod token;

pub use self::core::XmlTokenizer;
pub use token::{Token, TokenKind, TokenList, TokenSource};
