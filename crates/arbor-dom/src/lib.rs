//! Element tree implementation for the Arbor XML toolkit.
//!
//! This crate provides an arena-based tree of XML elements. Unlike a
//! full-fledged XML DOM there are no separate text nodes: every element carries
//! a single optional `content` string next to its children.
//!
//! # Design
//!
//! The tree uses arena allocation with [`ElementId`] indices for all
//! relationships, providing O(1) access and traversal without borrow checker
//! issues. The parent link is a plain index and never owns anything; a subtree
//! removed from its parent stays in the arena, parentless and reusable.

use std::fmt;
use std::ops::{Index, IndexMut};

use thiserror::Error;

/// Reserved namespace of namespace-declaration attributes (`xmlns:p="..."`).
pub const XMLNS_SPACE: &str = "xmlns";

/// The namespace bound to the `xml` prefix by definition.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified name: namespace URI (possibly empty) plus local name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI, or the empty string for "no namespace".
    pub space: String,
    /// Local part of the name.
    pub local: String,
}

impl QName {
    /// Create a name in the given namespace.
    #[must_use]
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Create a name in no namespace.
    #[must_use]
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(String::new(), local)
    }

    /// Whether this name carries no namespace.
    #[must_use]
    pub fn is_unqualified(&self) -> bool {
        self.space.is_empty()
    }

    /// Whether this is an `xmlns:prefix` declaration name.
    #[must_use]
    pub fn is_namespace_declaration(&self) -> bool {
        self.space == XMLNS_SPACE
    }
}

/// Clark notation: `{uri}local`, or just `local` without a namespace.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.space, self.local)
        }
    }
}

/// An attribute of an element. Duplicates are allowed on one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Qualified attribute name.
    pub name: QName,
    /// Attribute value, unescaped.
    pub value: String,
}

impl Attribute {
    /// Create a new attribute with the given name and value.
    #[must_use]
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A type-safe index into an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The id does not belong to this tree.
    #[error("element {0} does not exist in this tree")]
    UnknownElement(ElementId),
    /// Inserting `child` under `parent` would make an element its own ancestor.
    #[error("cannot insert {child} under {parent}: the element would become its own ancestor")]
    HierarchyRequest {
        /// The requested new parent.
        parent: ElementId,
        /// The element being inserted.
        child: ElementId,
    },
}

/// A node of the tree.
///
/// `parent` and `children` are only changed through [`ElementTree`], which
/// keeps them consistent: `child.parent == Some(p)` exactly when `p`'s
/// children contain `child`, once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The element's qualified name.
    pub name: QName,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Trimmed character data. Later text replaces earlier text.
    pub content: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            content: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The parent element, if attached.
    #[must_use]
    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Child elements in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Whether the element carries non-empty content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Whether the element renders as `<name/>`.
    #[must_use]
    pub fn is_empty_element(&self) -> bool {
        self.children.is_empty() && !self.has_content()
    }

    /// Value of the first attribute with this name.
    #[must_use]
    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Value of the first attribute with this local name in no namespace.
    #[must_use]
    pub fn attribute_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is_unqualified() && a.name.local == local)
            .map(|a| a.value.as_str())
    }
}

/// Arena of elements with O(1) access by [`ElementId`].
///
/// A tree may hold several independent subtrees at once: the top-level
/// elements of a parse, elements created but not yet attached, and subtrees
/// removed from their parent. Slots are never reused; they are released when
/// the arena is dropped.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    elements: Vec<Element>,
}

impl ElementTree {
    /// Create an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Number of elements ever allocated in this arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether `id` refers to an element of this arena.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        id.0 < self.elements.len()
    }

    /// Allocate a new, parentless, empty element.
    pub fn create_element(&mut self, name: QName) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Element::new(name));
        id
    }

    /// Allocate an element with a simple name in no namespace.
    pub fn create_local(&mut self, local: &str) -> ElementId {
        self.create_element(QName::local(local))
    }

    /// Get an element by its ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Get a mutable reference to an element by its ID.
    ///
    /// Only the name, attributes and content are reachable this way; the tree
    /// structure changes through [`Self::add_child`] and [`Self::remove_child`].
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    fn check(&self, id: ElementId) -> Result<(), TreeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TreeError::UnknownElement(id))
        }
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// If `child` already has a parent it is detached from it first, so an
    /// element never appears under two parents.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownElement`] for ids outside the arena and
    /// [`TreeError::HierarchyRequest`] when `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.check(parent)?;
        self.check(child)?;
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(TreeError::HierarchyRequest { parent, child });
        }

        let _ = self.detach(child);
        self.elements[parent.0].children.push(child);
        self.elements[child.0].parent = Some(parent);
        Ok(())
    }

    /// Make `parent` the new parent of `child`. Same as [`Self::add_child`].
    ///
    /// # Errors
    ///
    /// See [`Self::add_child`].
    pub fn set_parent(&mut self, child: ElementId, parent: ElementId) -> Result<(), TreeError> {
        self.add_child(parent, child)
    }

    /// Remove `child` from `parent`'s children.
    ///
    /// Returns the removed element, or `None` if `child` was not a child of
    /// `parent`. The subtree below `child` is left intact.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Option<ElementId> {
        let siblings = &mut self.elements.get_mut(parent.0)?.children;
        let position = siblings.iter().position(|&c| c == child)?;
        let _ = siblings.remove(position);
        self.elements[child.0].parent = None;
        Some(child)
    }

    /// Detach `id` from its parent, if it has one. Returns the former parent.
    pub fn detach(&mut self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent(id)?;
        self.remove_child(parent, id).map(|_| parent)
    }

    /// Append an attribute. No duplicate check is done.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownElement`] for ids outside the arena.
    pub fn add_attribute(&mut self, id: ElementId, attribute: Attribute) -> Result<(), TreeError> {
        let element = self.get_mut(id).ok_or(TreeError::UnknownElement(id))?;
        element.attributes.push(attribute);
        Ok(())
    }

    /// Replace the element's content.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownElement`] for ids outside the arena.
    pub fn set_content(&mut self, id: ElementId, content: impl Into<String>) -> Result<(), TreeError> {
        let element = self.get_mut(id).ok_or(TreeError::UnknownElement(id))?;
        element.content = Some(content.into());
        Ok(())
    }

    /// Get the parent of an element.
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(Element::parent)
    }

    /// Get all children of an element.
    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map_or(&[][..], Element::children)
    }

    /// Get the next sibling of an element.
    #[must_use]
    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&c| c == id)?;
        siblings.get(position + 1).copied()
    }

    /// Get the previous sibling of an element.
    #[must_use]
    pub fn prev_sibling(&self, id: ElementId) -> Option<ElementId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&c| c == id)?;
        position.checked_sub(1).map(|p| siblings[p])
    }

    /// Check if `descendant` is a descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: ElementId, ancestor: ElementId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of an element, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: ElementId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterate over `id` and everything below it, in document order.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> DescendantIterator<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        DescendantIterator { tree: self, stack }
    }

    /// Structural equality of two subtrees, possibly from different arenas.
    ///
    /// Compares names, attributes, content and children in order; ids and
    /// parents of the two roots are ignored.
    #[must_use]
    pub fn same_subtree(&self, id: ElementId, other: &Self, other_id: ElementId) -> bool {
        let (Some(a), Some(b)) = (self.get(id), other.get(other_id)) else {
            return false;
        };
        a.name == b.name
            && a.attributes == b.attributes
            && a.content == b.content
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(&x, &y)| self.same_subtree(x, other, y))
    }
}

/// Panics on ids that do not belong to the arena, like slice indexing.
impl Index<ElementId> for ElementTree {
    type Output = Element;

    fn index(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }
}

impl IndexMut<ElementId> for ElementTree {
    fn index_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0]
    }
}

/// Iterator over ancestors of an element.
pub struct AncestorIterator<'a> {
    tree: &'a ElementTree,
    current: Option<ElementId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct DescendantIterator<'a> {
    tree: &'a ElementTree,
    stack: Vec<ElementId>,
}

impl Iterator for DescendantIterator<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// A document: an element arena with at most one root element.
#[derive(Debug, Clone, Default)]
pub struct Document {
    tree: ElementTree,
    root: Option<ElementId>,
}

impl Document {
    /// Create a document with no root.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree: ElementTree::new(),
            root: None,
        }
    }

    /// Wrap an existing arena, using `root` (if any) as the document element.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownElement`] if `root` is not in `tree`.
    pub fn from_tree(tree: ElementTree, root: Option<ElementId>) -> Result<Self, TreeError> {
        let mut document = Self { tree, root: None };
        if let Some(id) = root {
            let _ = document.set_root(id)?;
        }
        Ok(document)
    }

    /// The document element.
    #[must_use]
    pub const fn root(&self) -> Option<ElementId> {
        self.root
    }

    /// The document element's data.
    #[must_use]
    pub fn root_element(&self) -> Option<&Element> {
        self.root.and_then(|id| self.tree.get(id))
    }

    /// Replace the document element and return the previous one.
    ///
    /// The new root is detached from any parent it had.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownElement`] if `id` is not in this document's arena.
    pub fn set_root(&mut self, id: ElementId) -> Result<Option<ElementId>, TreeError> {
        if !self.tree.contains(id) {
            return Err(TreeError::UnknownElement(id));
        }
        let _ = self.tree.detach(id);
        Ok(self.root.replace(id))
    }

    /// The element arena.
    #[must_use]
    pub const fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Mutable access to the element arena.
    pub const fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    /// Split into arena and root.
    #[must_use]
    pub fn into_parts(self) -> (ElementTree, Option<ElementId>) {
        (self.tree, self.root)
    }
}
