//! Schema extraction over sidecar and container XML documents.
//!
//! Sidecar XML is small, so every parser works against an owned element
//! tree built from the `quick-xml` event stream. The lookup primitives
//! mirror the upstream tag-tree conventions: slash-separated paths, text of
//! the final element, and "no match" always meaning empty, never an error.

use quick_xml::events::Event;
use quick_xml::Reader;

/// One element of a parsed document.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// First immediate child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First descendant with the given name, depth-first in document order.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn trimmed_text(&self) -> String {
        self.text.trim().to_string()
    }
}

/// Parse failure with the byte offset where the reader stopped, used by the
/// NFO trailing-line recovery.
#[derive(Debug)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl From<ParseError> for reelmeta_common::Error {
    fn from(err: ParseError) -> Self {
        reelmeta_common::Error::malformed(format!("{} at byte {}", err.message, err.offset))
    }
}

/// Parse a document into a synthetic root element whose children are the
/// document's top-level elements.
pub fn parse(text: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        let event = reader.read_event().map_err(|e| ParseError {
            offset: reader.buffer_position() as usize,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(start) => {
                stack.push(element_from_start(&start));
            }
            Event::Empty(start) => {
                let element = element_from_start(&start);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    let element = stack.pop().expect("non-empty stack");
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| ParseError {
                    offset: reader.buffer_position() as usize,
                    message: e.to_string(),
                })?;
                // Non-whitespace text outside any element is not XML; NFO
                // sidecars commonly carry a trailing scraper URL here.
                if stack.len() == 1 && !text.trim().is_empty() {
                    return Err(ParseError {
                        offset: reader.buffer_position() as usize,
                        message: "content outside document element".to_string(),
                    });
                }
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => {
                if stack.len() > 1 {
                    return Err(ParseError {
                        offset: reader.buffer_position() as usize,
                        message: format!(
                            "unclosed element {}",
                            stack.last().map(|e| e.name.as_str()).unwrap_or("")
                        ),
                    });
                }
                break;
            }
            _ => {}
        }
    }

    let mut root = stack.swap_remove(0);
    if root.children.is_empty() {
        return Err(ParseError {
            offset: 0,
            message: "no root element".to_string(),
        });
    }
    root.text.clear();
    Ok(root)
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if let Ok(value) = attr.unescape_value() {
            attrs.push((key, value.into_owned()));
        }
    }
    Element {
        name,
        attrs,
        ..Default::default()
    }
}

/// Follow a slash-separated path of immediate child names and return the
/// text of the final element, or empty when any segment is absent.
pub fn tag_data(element: &Element, path: &str) -> String {
    let mut current = element;
    for segment in path.split('/') {
        match current.child(segment) {
            Some(child) => current = child,
            None => return String::new(),
        }
    }
    current.trimmed_text()
}

/// Resolve a slash-separated path by first matching descendant per segment,
/// then collect the text of every `element` child beneath the final node.
pub fn vtag_data(element: &Element, path: &str) -> Vec<String> {
    let mut current = element;
    for segment in path.split('/') {
        match current.find(segment) {
            Some(found) => current = found,
            None => return Vec::new(),
        }
    }
    current
        .find_all("element")
        .into_iter()
        .map(Element::trimmed_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Resolve a slash-separated path by expanding every matching descendant
/// per segment, returning the text of each terminal element.
pub fn vtag_data_alternate(element: &Element, path: &str) -> Vec<String> {
    let mut frontier = vec![element];
    for segment in path.split('/') {
        let mut next = Vec::new();
        for el in frontier {
            next.extend(el.find_all(segment));
        }
        frontier = next;
    }
    frontier
        .into_iter()
        .map(|el| el.trimmed_text())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Integer formed from the `value` attribute of the first descendant with
/// the given tag name.
pub fn tag_value(element: &Element, tag: &str) -> Option<i64> {
    element
        .find(tag)?
        .attr("value")?
        .trim()
        .parse::<i64>()
        .ok()
}
