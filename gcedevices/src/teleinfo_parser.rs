//! Tag-prefix text extraction for `teleinfoN.xml` and `status.xml`.
//!
//! The gateway documents are flat lists of elements whose text is the value:
//!
//! ```xml
//! <response>
//!   <T1_ADCO>021528603314</T1_ADCO>
//!   <T1_OPTARIF>HC..</T1_OPTARIF>
//!   <T1_HCHC>011747072</T1_HCHC>
//! </response>
//! ```
//!
//! [`extract`] collects the text of every element whose name starts with a
//! prefix. Accumulation uses a single buffer slot, not a stack: opening any
//! matching element restarts it, and the first end tag seen while it is open
//! stores it under that end tag's own name. Nested matching elements
//! therefore only report the innermost one.

use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::{Error as XmlError, Reader};
use thiserror::Error;
use tracing::trace;

/// Element name to element text.
pub type FieldMapping = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Xml(#[from] XmlError),

    #[error("Unknown entity reference &{0};")]
    UnknownEntity(String),

    #[error("Element <{0}> is not closed at end of document")]
    UnclosedElement(String),

    #[error("Content outside of any element: {0:?}")]
    TextOutsideElement(String),

    #[error("Document has no element")]
    NoElement,
}

/// Accumulation state over the XML event stream.
#[derive(Debug)]
struct TeleinfoHandler<'p> {
    prefix: &'p str,
    values: FieldMapping,
    data: Option<String>,
}

impl<'p> TeleinfoHandler<'p> {
    fn new(prefix: &'p str) -> Self {
        Self {
            prefix,
            values: FieldMapping::new(),
            data: None,
        }
    }

    fn start_element(&mut self, name: &str) {
        if name.starts_with(self.prefix) {
            self.data = Some(String::new());
        }
    }

    fn characters(&mut self, content: &str) {
        if let Some(data) = self.data.as_mut() {
            data.push_str(content);
        }
    }

    fn end_element(&mut self, name: &str) {
        if let Some(data) = self.data.take() {
            self.values.insert(name.to_string(), data);
        }
    }
}

/// Extracts the text of the elements whose name starts with `prefix`.
///
/// An empty prefix matches every element. Text is kept verbatim, whitespace
/// included.
pub fn extract(text: &str, prefix: &str) -> Result<FieldMapping, ExtractError> {
    extract_from_reader(text.as_bytes(), prefix)
}

/// Same as [`extract`] over a streamed document.
pub fn extract_from_reader<R: BufRead>(
    source: R,
    prefix: &str,
) -> Result<FieldMapping, ExtractError> {
    let mut reader = Reader::from_reader(source);
    let mut handler = TeleinfoHandler::new(prefix);
    let mut open: Vec<String> = Vec::new();
    let mut seen_element = false;
    let mut seen_markup = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                handler.start_element(&name);
                open.push(name);
                seen_element = true;
            }
            Event::Empty(e) => {
                seen_element = true;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                handler.start_element(&name);
                handler.end_element(&name);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                handler.end_element(&name);
                open.pop();
            }
            Event::Text(e) => {
                let text = e.decode().map_err(XmlError::Encoding)?;
                if open.is_empty() {
                    // Only whitespace may sit between top-level elements.
                    let stray = text.trim();
                    if !stray.is_empty() {
                        return Err(ExtractError::TextOutsideElement(stray.to_string()));
                    }
                } else {
                    handler.characters(&text);
                }
            }
            Event::CData(e) => {
                let text = e.decode().map_err(XmlError::Encoding)?;
                if open.is_empty() {
                    return Err(ExtractError::TextOutsideElement(text.into_owned()));
                }
                handler.characters(&text);
            }
            Event::GeneralRef(e) => {
                if open.is_empty() {
                    let entity = e.decode().map_err(XmlError::Encoding)?;
                    return Err(ExtractError::TextOutsideElement(format!("&{entity};")));
                }
                if let Some(ch) = e.resolve_char_ref()? {
                    handler.characters(ch.encode_utf8(&mut [0u8; 4]));
                } else {
                    let entity = e.decode().map_err(XmlError::Encoding)?;
                    match resolve_predefined_entity(&entity) {
                        Some(resolved) => handler.characters(resolved),
                        None => return Err(ExtractError::UnknownEntity(entity.into_owned())),
                    }
                }
            }
            Event::Eof => break,
            other => {
                seen_markup = true;
                trace!("Skipping XML event {:?}", other);
            }
        }
        buf.clear();
    }

    if let Some(name) = open.pop() {
        return Err(ExtractError::UnclosedElement(name));
    }
    if seen_markup && !seen_element {
        return Err(ExtractError::NoElement);
    }

    Ok(handler.values)
}
