//! Minimal owned element tree for config.xml documents.
//!
//! The polymorphic parts of a job document can only be resolved after the
//! `class` attribute of an element has been seen, so documents are first read
//! into this tree and the typed model is built from it.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::jenkins::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value of `key` if present, appends it otherwise.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the named child, empty when the child is missing.
    pub fn child_text(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }

    pub fn child_text_opt(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    /// Missing or empty elements read as `false`.
    pub fn child_bool(&self, name: &str) -> Result<bool> {
        match self.child(name).map(|c| c.text.as_str()) {
            None | Some("") | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(Error::InvalidValue {
                element: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn child_bool_opt(&self, name: &str) -> Result<Option<bool>> {
        match self.child(name) {
            Some(_) => self.child_bool(name).map(Some),
            None => Ok(None),
        }
    }

    pub fn push(&mut self, child: Element) -> &mut Self {
        self.children.push(child);
        self
    }

    pub fn push_text(&mut self, name: &str, text: &str) -> &mut Self {
        self.push(Element::new(name).with_text(text))
    }

    pub fn push_text_opt(&mut self, name: &str, text: Option<&str>) -> &mut Self {
        if let Some(text) = text {
            self.push_text(name, text);
        }
        self
    }

    pub fn push_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.push_text(name, if value { "true" } else { "false" })
    }

    pub fn push_bool_opt(&mut self, name: &str, value: Option<bool>) -> &mut Self {
        if let Some(value) = value {
            self.push_bool(name, value);
        }
        self
    }
}

/// Reads a whole document. Syntax errors from the reader are returned as is.
///
/// Leaf text is kept verbatim. Blank text between child elements is dropped.
pub fn parse(bytes: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(bytes);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open(&start)?;
                check_single_root(&element, &stack, &root)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open(&start)?;
                check_single_root(&element, &stack, &root)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    close(element, &mut stack, &mut root);
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(Error::TrailingContent(text.trim().to_string())),
                }
            }
            Event::CData(data) => {
                let data = String::from_utf8(data.into_inner().into_owned())?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&data),
                    None => return Err(Error::TrailingContent(data)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = stack.pop() {
        return Err(Error::UnexpectedEof(unclosed.name));
    }
    root.ok_or(Error::NoRoot)
}

fn open(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8(start.name().as_ref().to_vec())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn check_single_root(element: &Element, stack: &[Element], root: &Option<Element>) -> Result<()> {
    if stack.is_empty() && root.is_some() {
        return Err(Error::TrailingContent(format!("<{}>", element.name)));
    }
    Ok(())
}

fn close(mut element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    if !element.children.is_empty() && element.text.trim().is_empty() {
        element.text.clear();
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Serializes `root` behind an xml declaration. `indent == 0` writes compact output.
pub fn write(root: &Element, indent: usize) -> Result<Vec<u8>> {
    let mut writer = if indent == 0 {
        Writer::new(Vec::new())
    } else {
        Writer::new_with_indent(Vec::new(), b' ', indent)
    };
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
