use arbor_dom::{Attribute, Document, ElementId, ElementTree, QName};

use crate::error::ParseError;
use crate::tokenizer::{Token, TokenSource};

/// The top-level elements of a parse, in document order, and the arena
/// holding them.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    /// Arena holding every parsed element.
    pub tree: ElementTree,
    /// Parentless elements produced by the outermost loop.
    pub roots: Vec<ElementId>,
}

impl Forest {
    /// Number of top-level elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the stream held no element at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Wrap the result in a [`Document`].
    ///
    /// # Errors
    ///
    /// [`ParseError::TooManyRootElements`] when there is more than one
    /// top-level element.
    pub fn into_document(self) -> Result<Document, ParseError> {
        match self.roots.as_slice() {
            [] => Ok(Document::from_tree(self.tree, None)?),
            &[root] => Ok(Document::from_tree(self.tree, Some(root))?),
            _ => Err(ParseError::TooManyRootElements),
        }
    }
}

/// Recursive-descent tree builder over a [`TokenSource`].
///
/// Each start tag opens a recursion frame that consumes tokens until an end
/// tag arrives at the same frame. End tag names are not compared with the
/// start tag; the source guarantees balanced nesting.
pub struct TreeBuilder<'s, S: TokenSource + ?Sized> {
    source: &'s mut S,
    tree: ElementTree,
    max_depth: Option<usize>,
}

impl<'s, S: TokenSource + ?Sized> TreeBuilder<'s, S> {
    /// Create a builder pulling from `source`.
    pub const fn new(source: &'s mut S) -> Self {
        Self {
            source,
            tree: ElementTree::new(),
            max_depth: None,
        }
    }

    /// Fail with [`ParseError::NestingTooDeep`] past `limit` levels.
    #[must_use]
    pub const fn with_max_depth(mut self, limit: Option<usize>) -> Self {
        self.max_depth = limit;
        self
    }

    /// Consume the whole stream.
    ///
    /// Text and stray end tags at the outermost level are ignored.
    ///
    /// # Errors
    ///
    /// Stream errors, end of stream inside an element, or exceeding the depth
    /// limit. Nothing built so far is returned.
    pub fn build(mut self) -> Result<Forest, ParseError> {
        let mut roots = Vec::new();
        loop {
            match self.source.next_token()? {
                Token::StartTag { name, attributes } => {
                    roots.push(self.build_element(name, attributes, 1)?);
                }
                Token::EndOfFile => {
                    return Ok(Forest {
                        tree: self.tree,
                        roots,
                    });
                }
                Token::EndTag { .. } | Token::Text(_) => {}
            }
        }
    }

    fn build_element(
        &mut self,
        name: QName,
        attributes: Vec<Attribute>,
        depth: usize,
    ) -> Result<ElementId, ParseError> {
        if let Some(limit) = self.max_depth
            && depth > limit
        {
            return Err(ParseError::NestingTooDeep { limit });
        }

        let id = self.tree.create_element(name);
        self.tree[id].attributes = attributes;

        loop {
            match self.source.next_token()? {
                Token::StartTag { name, attributes } => {
                    let child = self.build_element(name, attributes, depth + 1)?;
                    self.tree.add_child(id, child)?;
                }
                Token::Text(text) => {
                    // Last non-blank segment wins
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        self.tree[id].content = Some(trimmed.to_string());
                    }
                }
                Token::EndTag { .. } => return Ok(id),
                Token::EndOfFile => {
                    return Err(ParseError::UnexpectedEndOfStream {
                        element: self.tree[id].name.clone(),
                    });
                }
            }
        }
    }
}
