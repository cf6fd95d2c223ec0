use std::io::{self, Write};

use arbor_dom::{Document, ElementId, ElementTree};

use super::escape::escape_text;
use super::namespaces::NamespaceResolver;

/// Indentation written per nesting level in pretty mode.
const INDENT: &[u8] = b"  ";

/// Writes element trees as XML to a byte sink.
///
/// The first element encoded carries the `xmlns:` declarations for every
/// namespace used below it; nothing nested re-declares. An encoder therefore
/// serves exactly one tree: create a new one for every unrelated root.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    writer: W,
    namespaces: NamespaceResolver,
    /// Declarations have been written.
    started: bool,
    depth: usize,
    pretty: bool,
}

impl<W: Write> Encoder<W> {
    /// Create a compact encoder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            namespaces: NamespaceResolver::new(),
            started: false,
            depth: 0,
            pretty: false,
        }
    }

    /// Switch to pretty mode: one element per line, indented by depth.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Whether pretty mode is on.
    #[must_use]
    pub const fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// The namespace prefixes assigned so far.
    #[must_use]
    pub const fn namespaces(&self) -> &NamespaceResolver {
        &self.namespaces
    }

    fn spaces(&mut self) -> io::Result<()> {
        if self.pretty {
            for _ in 0..self.depth {
                self.writer.write_all(INDENT)?;
            }
        }
        Ok(())
    }

    fn pretty_end(&mut self) -> io::Result<()> {
        if self.pretty {
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Encode the element `id` and its subtree.
    ///
    /// Attribute values are written as they are; callers keep them free of
    /// `"`, `<` and `&`. Content is escaped.
    ///
    /// # Errors
    ///
    /// Errors from the sink, or [`io::ErrorKind::InvalidInput`] if `id` is
    /// not in `tree`.
    ///
    /// # Panics
    ///
    /// Panics if a name uses a namespace that discovery did not register,
    /// which cannot happen for trees discovered by this encoder.
    pub fn encode(&mut self, tree: &ElementTree, id: ElementId) -> io::Result<()> {
        let element = tree.get(id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("element {id} does not exist in this tree"),
            )
        })?;

        let write_namespaces = !self.started;
        if write_namespaces {
            self.namespaces.discover(tree, id);
            self.started = true;
        }

        self.spaces()?;
        let name = self.namespaces.qualified_name(&element.name);
        write!(self.writer, "<{name}")?;
        for attribute in &element.attributes {
            if attribute.name.is_namespace_declaration() {
                continue;
            }
            let attribute_name = self.namespaces.qualified_name(&attribute.name);
            write!(self.writer, " {attribute_name}=\"{}\"", attribute.value)?;
        }
        if write_namespaces {
            for (prefix, uri) in self.namespaces.declarations() {
                write!(self.writer, " xmlns:{prefix}=\"{uri}\"")?;
            }
        }

        if element.is_empty_element() {
            let close: &[u8] = if self.pretty { b"/>\n" } else { b"/>" };
            return self.writer.write_all(close);
        }

        self.writer.write_all(b">")?;
        if let Some(content) = element.content.as_deref().filter(|c| !c.is_empty()) {
            self.writer.write_all(escape_text(content).as_bytes())?;
        }
        if !element.children().is_empty() {
            self.depth += 1;
            self.pretty_end()?;
            for &child in element.children() {
                self.encode(tree, child)?;
            }
            self.depth -= 1;
            self.spaces()?;
        }
        write!(self.writer, "</{name}>")?;
        self.pretty_end()
    }

    /// Encode the document element, if there is one.
    ///
    /// # Errors
    ///
    /// See [`Self::encode`].
    pub fn encode_document(&mut self, document: &Document) -> io::Result<()> {
        match document.root() {
            Some(root) => self.encode(document.tree(), root),
            None => Ok(()),
        }
    }

    /// Flush the sink.
    ///
    /// # Errors
    ///
    /// Errors from the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
