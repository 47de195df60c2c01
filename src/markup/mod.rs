//! Tolerant parser for the server-delivered banner markup dialect.
//!
//! The dialect is XML-shaped but allows a handful of inline formatting tags
//! (`<br>`, `<b>`, `<u>`, ...) to appear unpaired inside text content. A strict
//! tree parser would reject those, so every literal occurrence is masked with a
//! sentinel token sequence before structural parsing and restored inside text
//! nodes afterwards.

use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Inline formatting tags that may appear unpaired inside text content.
const INLINE_TAGS: [&str; 9] = ["br", "b", "/b", "u", "/u", "i", "/i", "strong", "/strong"];

/// Sentinel that cannot collide with real tag syntax.
const SENTINEL: &str = "!@#";

/// Errors produced by [`parse`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("markup is not well formed: {0}")]
    Invalid(String),

    #[error("markup produced no root element")]
    Empty,
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        ParseError::Invalid(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ParseError::Invalid(e.to_string())
    }
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(e: std::str::Utf8Error) -> Self {
        ParseError::Invalid(e.to_string())
    }
}

/// A single element of the parsed markup tree.
///
/// Built bottom-up during parsing and immutable afterwards. Children are
/// reference-counted so later pipeline stages can hold on to their source
/// element without cloning the subtree.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Arc<Element>>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element { name: name.into(), ..Default::default() }
    }

    /// Raw attribute lookup. Style resolution on top of this lives in
    /// [`crate::style`].
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

fn mask_inline_tags(markup: &str) -> String {
    let mut masked = markup.to_string();
    for tag in INLINE_TAGS {
        masked = masked.replace(&format!("<{tag}>"), &format!("{SENTINEL}{tag}{SENTINEL}"));
    }
    masked
}

fn unmask_inline_tags(text: &str) -> String {
    let mut restored = text.to_string();
    for tag in INLINE_TAGS {
        restored = restored.replace(&format!("{SENTINEL}{tag}{SENTINEL}"), &format!("<{tag}>"));
    }
    restored
}

/// Parses a markup string into an [`Element`] tree.
///
/// The first opened tag becomes the document root. Character data is appended
/// to the innermost open element: whitespace-only runs are dropped, the first
/// run is trimmed of surrounding whitespace and continuation runs are trimmed
/// of newlines only. Unknown tags are kept in the tree; deciding what they
/// mean is the classifier's job.
pub fn parse(markup: &str) -> Result<Element, ParseError> {
    let masked = mask_inline_tags(markup);
    let mut reader = Reader::from_reader(masked.as_bytes());
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                stack.push(element_from_start(&e, &reader)?);
            }
            XmlEvent::Empty(e) => {
                let element = element_from_start(&e, &reader)?;
                attach(element, &mut stack, &mut root)?;
            }
            XmlEvent::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref())?;
                let text = quick_xml::escape::unescape(raw)
                    .map_err(|e| ParseError::Invalid(e.to_string()))?;
                if text.trim().is_empty() {
                    continue;
                }
                let Some(current) = stack.last_mut() else {
                    continue;
                };
                let restored = unmask_inline_tags(&text);
                match &mut current.text {
                    Some(existing) => existing.push_str(restored.trim_matches('\n')),
                    None => current.text = Some(restored.trim().to_string()),
                }
            }
            XmlEvent::End(_) => {
                // Name mismatches are already rejected by the reader.
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Invalid("closing tag without opener".into()))?;
                attach(element, &mut stack, &mut root)?;
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Invalid(format!(
            "unclosed tag <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or(ParseError::Empty)
}

fn element_from_start(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Element, ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| ParseError::Invalid(e.to_string()))?
            .into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

/// Attaches a completed element to its parent, or promotes it to document
/// root when the stack is empty.
fn attach(
    element: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Arc::new(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(ParseError::Invalid("multiple root elements".into()))
    }
}
