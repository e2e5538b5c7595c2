//! Minimal owned element tree for signature placement.
//!
//! The serializers are event-based, but sibling-after insertion and Id
//! bookkeeping need random access to the tree, so the signing pass works on
//! this small DOM and re-serializes when done. Comments and processing
//! instructions are dropped on parse — the signed payload never carries them.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

use crate::core::NfseError;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written (prefix kept).
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// Local part of a possibly-prefixed tag name.
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(pair) = self.attrs.iter_mut().find(|(k, _)| k == name) {
            pair.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Depth-first search by local name, self included.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        if local_name(&self.name) == local {
            return Some(self);
        }
        self.children.iter().find_map(|c| match c {
            XmlNode::Element(e) => e.find(local),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct child element by local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|c| match c {
            XmlNode::Element(e) if local_name(&e.name) == local => Some(e),
            _ => None,
        })
    }

    /// Count descendant elements (self included) with the given local name.
    pub fn count(&self, local: &str) -> usize {
        let own = usize::from(local_name(&self.name) == local);
        own + self
            .children
            .iter()
            .map(|c| match c {
                XmlNode::Element(e) => e.count(local),
                XmlNode::Text(_) => 0,
            })
            .sum::<usize>()
    }

    /// Remove every descendant element with the given local name.
    pub fn strip(&mut self, local: &str) {
        self.children
            .retain(|c| !matches!(c, XmlNode::Element(e) if local_name(&e.name) == local));
        for child in &mut self.children {
            if let XmlNode::Element(e) = child {
                e.strip(local);
            }
        }
    }

    /// Collect every `Id` attribute value in document order, self included.
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        if let Some(id) = self.attr("Id") {
            out.push(id.to_string());
        }
        for child in &self.children {
            if let XmlNode::Element(e) = child {
                e.collect_ids(out);
            }
        }
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement, NfseError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| NfseError::MalformedXml(format!("non-UTF-8 tag name: {err}")))?
        .to_string();
    let mut elem = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| NfseError::MalformedXml(format!("bad attribute: {err}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| NfseError::MalformedXml(format!("non-UTF-8 attribute: {err}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| NfseError::MalformedXml(format!("bad attribute value: {err}")))?
            .to_string();
        elem.attrs.push((key, value));
    }
    Ok(elem)
}

/// Parse a document (or fragment with a single root) into an element tree.
pub fn parse_element(xml: &str) -> Result<XmlElement, NfseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    fn attach(
        node: XmlElement,
        stack: &mut Vec<XmlElement>,
        root: &mut Option<XmlElement>,
    ) -> Result<(), NfseError> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(XmlNode::Element(node));
            Ok(())
        } else if root.is_none() {
            *root = Some(node);
            Ok(())
        } else {
            Err(NfseError::MalformedXml("more than one root element".into()))
        }
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let elem = element_from_start(e)?;
                attach(elem, &mut stack, &mut root)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| NfseError::MalformedXml(format!("bad text: {err}")))?
                    .to_string();
                if !text.is_empty() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text));
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::End(_)) => {
                let elem = stack.pop().ok_or_else(|| {
                    NfseError::MalformedXml("unbalanced end tag".into())
                })?;
                attach(elem, &mut stack, &mut root)?;
            }
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_))
            | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(NfseError::MalformedXml(format!(
                    "parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if !stack.is_empty() {
        return Err(NfseError::MalformedXml("unclosed element".into()));
    }
    root.ok_or_else(|| NfseError::MalformedXml("document has no root element".into()))
}

fn write_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    el: &XmlElement,
) -> Result<(), NfseError> {
    let io = |e: std::io::Error| NfseError::Xml(format!("XML write error: {e}"));
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(io)?;
        return Ok(());
    }
    writer.write_event(Event::Start(start)).map_err(io)?;
    for child in &el.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => {
                writer
                    .write_event(Event::Text(BytesText::new(t)))
                    .map_err(io)?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(io)?;
    Ok(())
}

/// Serialize an element subtree without an XML declaration (signing input).
pub fn to_fragment_string(el: &XmlElement) -> Result<String, NfseError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_element(&mut writer, el)?;
    let buf = writer.into_inner().into_inner();
    String::from_utf8(buf).map_err(|e| NfseError::Xml(format!("XML UTF-8 error: {e}")))
}

/// Serialize a full document with the UTF-8 declaration.
pub fn to_document_string(root: &XmlElement) -> Result<String, NfseError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            None,
        )))
        .map_err(|e| NfseError::Xml(format!("XML write error: {e}")))?;
    write_element(&mut writer, root)?;
    let buf = writer.into_inner().into_inner();
    String::from_utf8(buf).map_err(|e| NfseError::Xml(format!("XML UTF-8 error: {e}")))
}
