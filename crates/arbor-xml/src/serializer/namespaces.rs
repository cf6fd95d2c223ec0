//! Namespace discovery and prefix assignment for one serialization.

use std::collections::{HashMap, HashSet};

use arbor_dom::{ElementId, ElementTree, QName, XML_NAMESPACE, XMLNS_SPACE};

/// Assigns one prefix per namespace URI for a whole serialization call.
///
/// The first registration of a URI wins. Explicit `xmlns:p` declarations in
/// the tree are honored when registered before the URI is otherwise seen;
/// any other URI gets a generated prefix `ns1`, `ns2`, ... that is not
/// already in use.
#[derive(Debug, Clone)]
pub struct NamespaceResolver {
    /// URI to prefix.
    prefixes: HashMap<String, String>,
    /// Prefixes in use, including `xml`.
    used: HashSet<String>,
    /// `(prefix, uri)` to declare, in registration order.
    declarations: Vec<(String, String)>,
    counter: usize,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver {
    /// A resolver knowing only the predefined `xml` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::from([(XML_NAMESPACE.to_string(), "xml".to_string())]),
            used: HashSet::from(["xml".to_string(), XMLNS_SPACE.to_string()]),
            declarations: Vec::new(),
            counter: 0,
        }
    }

    /// Register `uri`, preferring `requested` as its prefix.
    ///
    /// A no-op for the empty namespace, the `xmlns` space and URIs that
    /// already have a prefix. A requested prefix that is empty or taken by
    /// another URI is ignored and a fresh one is generated.
    pub fn register(&mut self, uri: &str, requested: Option<&str>) {
        if uri.is_empty() || uri == XMLNS_SPACE || self.prefixes.contains_key(uri) {
            return;
        }
        let prefix = match requested {
            Some(p) if !p.is_empty() && !self.used.contains(p) => p.to_string(),
            _ => self.fresh_prefix(),
        };
        let _ = self.used.insert(prefix.clone());
        let _ = self.prefixes.insert(uri.to_string(), prefix.clone());
        self.declarations.push((prefix, uri.to_string()));
    }

    fn fresh_prefix(&mut self) -> String {
        loop {
            self.counter += 1;
            let candidate = format!("ns{}", self.counter);
            if !self.used.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Register every namespace used in the subtree rooted at `id`.
    ///
    /// Per element: its `xmlns:p` declarations first (with their prefixes),
    /// then its own name, then its attribute names; then the children in order.
    pub fn discover(&mut self, tree: &ElementTree, id: ElementId) {
        let Some(element) = tree.get(id) else {
            return;
        };
        for attribute in &element.attributes {
            if attribute.name.is_namespace_declaration() {
                self.register(&attribute.value, Some(&attribute.name.local));
            }
        }
        self.register(&element.name.space, None);
        for attribute in &element.attributes {
            self.register(&attribute.name.space, None);
        }
        for &child in element.children() {
            self.discover(tree, child);
        }
    }

    /// The prefix bound to `uri`.
    #[must_use]
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.prefixes.get(uri).map(String::as_str)
    }

    /// `(prefix, uri)` pairs to declare, in registration order.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }

    /// Render `name` as it appears in markup.
    ///
    /// # Panics
    ///
    /// Panics if `name` is in a namespace that was never registered. Discovery
    /// visits every name emission renders, so this is a broken invariant rather
    /// than bad input.
    #[must_use]
    pub fn qualified_name(&self, name: &QName) -> String {
        if name.space.is_empty() {
            return name.local.clone();
        }
        if name.space == XMLNS_SPACE {
            return format!("{XMLNS_SPACE}:{}", name.local);
        }
        let Some(prefix) = self.prefix(&name.space) else {
            panic!(
                "no prefix found in {:?} for namespace {}",
                self.declarations, name.space
            );
        };
        format!("{prefix}:{}", name.local)
    }
}
