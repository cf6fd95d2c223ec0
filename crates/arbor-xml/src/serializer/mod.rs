//! Namespace-aware XML serialization.

/// The encoder writing elements to a byte sink.
pub mod encoder;
/// Character data escaping.
pub mod escape;
/// Prefix assignment for namespace URIs.
pub mod namespaces;

use std::io;

use arbor_dom::{Document, ElementId, ElementTree};

pub use encoder::Encoder;
pub use escape::escape_text;
pub use namespaces::NamespaceResolver;

/// Pretty-printed encoding of the subtree at `id`, using a fresh encoder.
///
/// # Errors
///
/// [`io::ErrorKind::InvalidInput`] if `id` is not in `tree`.
pub fn to_bytes(tree: &ElementTree, id: ElementId) -> io::Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new()).pretty();
    encoder.encode(tree, id)?;
    encoder.flush()?;
    Ok(encoder.into_inner())
}

/// Pretty-printed encoding of the subtree at `id` as a string.
///
/// # Errors
///
/// See [`to_bytes`].
pub fn to_string(tree: &ElementTree, id: ElementId) -> io::Result<String> {
    String::from_utf8(to_bytes(tree, id)?).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Compact encoding of the subtree at `id` as a string.
///
/// # Errors
///
/// See [`to_bytes`].
pub fn to_compact_string(tree: &ElementTree, id: ElementId) -> io::Result<String> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(tree, id)?;
    String::from_utf8(encoder.into_inner()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Pretty-printed encoding of a document; empty for a document without root.
///
/// # Errors
///
/// See [`to_bytes`].
pub fn document_to_string(document: &Document) -> io::Result<String> {
    document
        .root()
        .map_or_else(|| Ok(String::new()), |root| to_string(document.tree(), root))
}
