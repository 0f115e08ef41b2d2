//! A small, lenient XML tree for RSS and Atom payloads.
//!
//! A lone child element parses as a scalar and repeated siblings as a
//! [`XmlNode::List`], so readers go through [`ensure_array`] when a field
//! can repeat. Attributes, text and CDATA are kept apart.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::app::{ConfluenceError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Element holding nothing but text (or nothing at all).
    Text(String),
    Element(XmlElement),
    List(Vec<XmlNode>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub attributes: BTreeMap<String, String>,
    pub children: BTreeMap<String, XmlNode>,
    pub text: Option<String>,
    pub cdata: Option<String>,
}

impl XmlElement {
    pub fn get(&self, name: &str) -> Option<&XmlNode> {
        self.children.get(name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn push_child(&mut self, name: String, node: XmlNode) {
        match self.children.remove(&name) {
            None => {
                self.children.insert(name, node);
            }
            Some(XmlNode::List(mut nodes)) => {
                nodes.push(node);
                self.children.insert(name, XmlNode::List(nodes));
            }
            Some(existing) => {
                self.children.insert(name, XmlNode::List(vec![existing, node]));
            }
        }
    }

    fn into_node(self) -> XmlNode {
        if self.attributes.is_empty() && self.children.is_empty() && self.cdata.is_none() {
            XmlNode::Text(self.text.unwrap_or_default())
        } else {
            XmlNode::Element(self)
        }
    }
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::List(nodes) => nodes.first().and_then(XmlNode::as_element),
            XmlNode::Text(_) => None,
        }
    }

    /// Child lookup that tolerates text-only nodes.
    pub fn get(&self, name: &str) -> Option<&XmlNode> {
        self.as_element().and_then(|el| el.get(name))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|el| el.attr(name))
    }
}

/// Parse an XML document. The returned element is the document itself;
/// its only child is the root element (`rss`, `feed`, `rdf:RDF`, ...).
pub fn parse_xml(text: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, XmlElement)> = vec![(String::new(), XmlElement::default())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let (name, element) = open_element(&start);
                stack.push((name, element));
            }
            Ok(Event::Empty(start)) => {
                let (name, element) = open_element(&start);
                if let Some((_, parent)) = stack.last_mut() {
                    parent.push_child(name, element.into_node());
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(ConfluenceError::Parse("unbalanced closing tag".into()));
                }
                if let Some((name, element)) = stack.pop() {
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.push_child(name, element.into_node());
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                if let Some((_, current)) = stack.last_mut() {
                    append(&mut current.text, &value);
                }
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some((_, current)) = stack.last_mut() {
                    append(&mut current.cdata, &value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ConfluenceError::Parse(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    if stack.len() != 1 {
        return Err(ConfluenceError::Parse("unexpected end of document".into()));
    }
    let (_, document) = stack.remove(0);
    if document.children.is_empty() {
        return Err(ConfluenceError::Parse("document has no root element".into()));
    }
    Ok(document)
}

fn open_element(start: &BytesStart<'_>) -> (String, XmlElement) {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::default();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attributes.insert(key, value);
    }
    (name, element)
}

fn append(slot: &mut Option<String>, value: &str) {
    match slot {
        Some(existing) => existing.push_str(value),
        None => *slot = Some(value.to_string()),
    }
}

/// Best plain string for a node: CDATA, then text, then the text of its
/// descendants (xhtml content wraps everything in a `<div>`).
pub fn extract_text(node: Option<&XmlNode>) -> String {
    match node {
        None => String::new(),
        Some(XmlNode::Text(text)) => text.clone(),
        Some(XmlNode::Element(el)) => el
            .cdata
            .clone()
            .or_else(|| el.text.clone())
            .unwrap_or_else(|| {
                let mut parts = Vec::new();
                collect_descendant_text(el, &mut parts);
                parts.join(" ")
            }),
        Some(XmlNode::List(nodes)) => extract_text(nodes.first()),
    }
}

fn collect_descendant_text(el: &XmlElement, parts: &mut Vec<String>) {
    for child in el.children.values() {
        collect_node_text(child, parts);
    }
}

fn collect_node_text(node: &XmlNode, parts: &mut Vec<String>) {
    match node {
        XmlNode::Text(text) => push_trimmed(text, parts),
        XmlNode::Element(el) => {
            for text in [&el.cdata, &el.text].into_iter().flatten() {
                push_trimmed(text, parts);
            }
            collect_descendant_text(el, parts);
        }
        XmlNode::List(nodes) => nodes.iter().for_each(|n| collect_node_text(n, parts)),
    }
}

fn push_trimmed(text: &str, parts: &mut Vec<String>) {
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

/// URL of the `alternate` (or rel-less) link; falls back to the first link.
pub fn extract_link(node: Option<&XmlNode>) -> String {
    match node {
        None => String::new(),
        Some(XmlNode::Text(text)) => text.trim().to_string(),
        Some(XmlNode::Element(el)) => link_href(el),
        Some(XmlNode::List(nodes)) => {
            let preferred = nodes.iter().find(|node| match node {
                XmlNode::Element(el) => matches!(el.attr("rel"), None | Some("alternate")),
                _ => true,
            });
            extract_link(preferred.or_else(|| nodes.first()))
        }
    }
}

fn link_href(el: &XmlElement) -> String {
    el.attr("href")
        .map(str::to_string)
        .or_else(|| el.text.clone())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Normalize the one-or-many ambiguity into a slice of nodes.
pub fn ensure_array(node: Option<&XmlNode>) -> Vec<&XmlNode> {
    match node {
        None => Vec::new(),
        Some(XmlNode::List(nodes)) => nodes.iter().collect(),
        Some(other) => vec![other],
    }
}
