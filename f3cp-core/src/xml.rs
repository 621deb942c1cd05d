//! Small helpers over `quick_xml` for the flat XML documents a Fedora
//! repository serves (object and datastream profiles, listings, search
//! results, simple metadata streams).

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml syntax: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("xml attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("xml ended with unclosed element <{0}>")]
    Unclosed(String),
}

/// Text of one element, keyed by its local (unprefixed) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub name: String,
    pub text: String,
}

/// Every element carrying non-blank text, in document order of their
/// closing tags. Text is trimmed; nested element text is not merged into
/// the parent.
pub fn leaf_texts(xml: &str) -> Result<Vec<Leaf>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<(String, String)> = Vec::new();
    let mut leaves = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => open.push((local_name(&e), String::new())),
            Event::Text(t) => {
                if let Some((_, text)) = open.last_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = open.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if let Some((name, text)) = open.pop() {
                    let text = text.trim();
                    if !text.is_empty() {
                        leaves.push(Leaf {
                            name,
                            text: text.to_string(),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((name, _)) = open.pop() {
        return Err(XmlError::Unclosed(name));
    }
    Ok(leaves)
}

/// Text of the first leaf named `name`, if any.
pub fn first_text<'a>(leaves: &'a [Leaf], name: &str) -> Option<&'a str> {
    leaves
        .iter()
        .find(|leaf| leaf.name == name)
        .map(|leaf| leaf.text.as_str())
}

/// Values of attribute `attr` on every element named `element`, matched by
/// local names.
pub fn attribute_values(xml: &str, element: &str, attr: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut values = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                if local_name(&e) == element {
                    if let Some(value) = attribute(&e, attr)? {
                        values.push(value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(values)
}

/// Local name of an element, without any namespace prefix.
pub fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Unescaped value of the attribute whose local name is `name`.
pub fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
