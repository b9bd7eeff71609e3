//! Owned XML element tree for WS-Management responses.
//!
//! Responses are parsed once into [`Document`] and then queried by
//! `(namespace, local name)`. Field lookups follow the DRAC conventions:
//! required fields must be present and non-empty, nullable fields may be
//! absent or carry `xsi:nil="true"`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{DracError, Result};
use crate::uris::NS_XML_SCHEMA_INSTANCE;

/// An XML attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlAttribute {
    namespace: Option<String>,
    name: String,
    value: String,
}

/// A namespace-resolved XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<XmlAttribute>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    fn open(reader: &NsReader<&[u8]>, namespace: Option<String>, start: &BytesStart<'_>) -> Result<Self> {
        let mut element = Self {
            namespace,
            name: lossy(start.local_name().as_ref()),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        };

        for attr in start.attributes() {
            let attr = attr.map_err(|e| DracError::Xml(e.to_string()))?;
            let (ns, local) = reader.resolve_attribute(attr.key);
            let namespace = resolved_namespace(&ns);
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push(XmlAttribute {
                namespace,
                name: lossy(local.as_ref()),
                value,
            });
        }

        Ok(element)
    }

    /// Local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI, if the element is qualified.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Text content, `None` when the element has no text at all.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Direct children.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Value of the attribute with the given local name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// True when the element carries `xsi:nil="true"`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.attributes.iter().any(|a| {
            a.name == "nil"
                && a.value == "true"
                && a.namespace.as_deref().is_none_or(|ns| ns == NS_XML_SCHEMA_INSTANCE)
        })
    }

    /// True when this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// First descendant (depth-first, document order) with the given name.
    #[must_use]
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.is(namespace, name) {
                return Some(child);
            }
            if let Some(found) = child.find(namespace, name) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, namespace: &str, name: &str) -> Option<&mut Element> {
        for child in &mut self.children {
            if child.is(namespace, name) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(namespace, name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant with the given name, in document order.
    #[must_use]
    pub fn find_all(&self, namespace: &str, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect(namespace, name, &mut found);
        found
    }

    fn collect<'a>(&'a self, namespace: &str, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.is(namespace, name) {
                found.push(child);
            }
            child.collect(namespace, name, found);
        }
    }

    /// Append a child element.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Remove and return all children.
    pub fn take_children(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.children)
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }
}

/// A parsed response document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a response body.
    ///
    /// # Errors
    /// Returns [`DracError::Xml`] when the body is not well-formed or has no
    /// root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            let namespace = resolved_namespace(&ns);

            match event {
                Event::Start(start) => {
                    let element = Element::open(&reader, namespace, &start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = Element::open(&reader, namespace, &start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DracError::Xml("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DracError::Xml("unclosed element at end of input".to_string()));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| DracError::Xml("document has no root element".to_string()))
    }

    /// Root element.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable root element.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// First element with the given name, including the root itself.
    #[must_use]
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Element> {
        if self.root.is(namespace, name) {
            return Some(&self.root);
        }
        self.root.find(namespace, name)
    }

    /// Every element with the given name, including the root itself.
    #[must_use]
    pub fn find_all(&self, namespace: &str, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        if self.root.is(namespace, name) {
            found.push(&self.root);
        }
        found.extend(self.root.find_all(namespace, name));
        found
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(DracError::Xml("more than one root element".to_string()));
    }
    *root = Some(element);
    Ok(())
}

fn resolved_namespace(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(namespace) => Some(lossy(namespace.as_ref())),
        _ => None,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Text of a required field below `element`.
///
/// # Errors
/// [`DracError::MissingField`] when the field is absent,
/// [`DracError::EmptyField`] when it is nil or has no text.
pub fn find_value(element: &Element, namespace: &str, name: &str) -> Result<String> {
    let field = element.find(namespace, name).ok_or_else(|| DracError::MissingField {
        field: name.to_string(),
    })?;

    match field.text() {
        Some(text) if !field.is_nil() => Ok(text.trim().to_string()),
        _ => Err(DracError::EmptyField {
            field: name.to_string(),
        }),
    }
}

/// Text of a nullable field below `element`.
///
/// Absent and `xsi:nil` fields are `None`; a present element without text is
/// `Some("")`.
#[must_use]
pub fn find_nullable_value(element: &Element, namespace: &str, name: &str) -> Option<String> {
    let field = element.find(namespace, name)?;
    if field.is_nil() {
        return None;
    }
    Some(field.text().map(str::trim).unwrap_or_default().to_string())
}

/// Parse a required integer field.
///
/// # Errors
/// Same as [`find_value`], plus [`DracError::InvalidResponse`] when the text is
/// not an integer.
pub fn find_integer(element: &Element, namespace: &str, name: &str) -> Result<i64> {
    let value = find_value(element, namespace, name)?;
    value.parse().map_err(|_| {
        DracError::InvalidResponse(format!("field '{name}' is not an integer: '{value}'"))
    })
}
