//! Namespace-qualified field lookup for parsed NFe documents.

use std::fmt;

use anyhow::{Result, anyhow};
use roxmltree::{Document, Node};

/// Default XML namespace of a document, discovered from its root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    uri: String,
}

/// Tag name bound to a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedName<'a> {
    namespace: &'a str,
    local: &'a str,
}

impl Namespace {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Read the namespace of the root element.
    ///
    /// # Errors
    /// Returns an error if the root element is not in any namespace.
    pub fn from_root(document: &Document) -> Result<Self> {
        let root = document.root_element();
        root.tag_name().namespace().map(Self::new).ok_or_else(|| {
            anyhow!(
                "Root element <{}> has no namespace",
                root.tag_name().name()
            )
        })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Bind a local tag name to this namespace.
    #[must_use]
    pub fn qualify<'a>(&'a self, local: &'a str) -> QualifiedName<'a> {
        QualifiedName {
            namespace: &self.uri,
            local,
        }
    }
}

/// Brace-delimited form, for example `{http://www.portalfiscal.inf.br/nfe}`.
impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.uri)
    }
}

impl QualifiedName<'_> {
    /// True if the node is an element with exactly this namespace and local name.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        node.is_element() && node.has_tag_name((self.namespace, self.local))
    }
}

impl fmt::Display for QualifiedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

/// Text of the first matching element that has non-blank text.
#[must_use]
pub fn get_first(document: &Document, namespace: &Namespace, tag: &str) -> Option<String> {
    let name = namespace.qualify(tag);
    document
        .descendants()
        .filter(|node| name.matches(node))
        .find_map(|node| element_text(&node))
}

/// Text of every matching element with non-blank text, in document order.
#[must_use]
pub fn get_all(document: &Document, namespace: &Namespace, tag: &str) -> Vec<String> {
    let name = namespace.qualify(tag);
    document
        .descendants()
        .filter(|node| name.matches(node))
        .filter_map(|node| element_text(&node))
        .collect()
}

/// Whitespace-only text counts as missing.
fn element_text(node: &Node) -> Option<String> {
    node.text()
        .filter(|text| !text.trim().is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod test_namespace {
    use super::*;

    #[test]
    fn reads_default_namespace_from_root() {
        let doc = Document::parse(r#"<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe"><NFe/></nfeProc>"#)
            .expect("valid xml");
        let namespace = Namespace::from_root(&doc).expect("has namespace");
        assert_eq!(namespace.uri(), "http://www.portalfiscal.inf.br/nfe");
        assert_eq!(namespace.to_string(), "{http://www.portalfiscal.inf.br/nfe}");
    }

    #[test]
    fn reads_prefixed_root_namespace() {
        let doc = Document::parse(r#"<n:nfeProc xmlns:n="urn:test"><n:NFe/></n:nfeProc>"#).expect("valid xml");
        let namespace = Namespace::from_root(&doc).expect("has namespace");
        assert_eq!(namespace.uri(), "urn:test");
    }

    #[test]
    fn root_without_namespace_is_an_error() {
        let doc = Document::parse("<nfeProc><nNF>1</nNF></nfeProc>").expect("valid xml");
        let error = Namespace::from_root(&doc).expect_err("should fail");
        assert!(error.to_string().contains("nfeProc"));
    }

    #[test]
    fn qualified_name_display() {
        let namespace = Namespace::new("urn:test");
        assert_eq!(namespace.qualify("nDup").to_string(), "{urn:test}nDup");
    }
}
