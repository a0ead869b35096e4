use super::{create_target, open_source, scalar_text, DocumentFormat};
use crate::error::{ConvertError, Result};
use crate::types::ConvertOptions;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

const NAME: &str = "xml";

static INVALID_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w.\-]").unwrap());

static VALID_NAME_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}_]").unwrap());

/// XML documents: one root element whose children are records
///
/// Reading maps each child of the root to an object; leaf elements become
/// their text and elements with children become nested objects.
/// Attributes, comments and namespace prefixes are ignored.
pub struct XmlFormat;

impl DocumentFormat for XmlFormat {
    fn read(&self, path: &Path, _options: &ConvertOptions) -> Result<Value> {
        let mut file = open_source(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|err| ConvertError::unknown(path, err))?;

        parse_document(&content).map_err(|message| ConvertError::parse(NAME, path, message))
    }

    fn write(&self, value: &Value, path: &Path, options: &ConvertOptions) -> Result<()> {
        let target = create_target(path)?;
        let mut emitter = Emitter {
            writer: Writer::new_with_indent(target, b' ', 2),
            options,
        };

        emitter
            .document(value)
            .map_err(|err| ConvertError::write(path, err))?;

        emitter
            .writer
            .into_inner()
            .flush()
            .map_err(|err| ConvertError::write(path, err))
    }
}

/// An element being read
struct Frame {
    name: String,
    fields: Map<String, Value>,
    records: Vec<Value>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn new(name: String) -> Self {
        Frame {
            name,
            fields: Map::new(),
            records: Vec::new(),
            text: String::new(),
            has_children: false,
        }
    }

    fn into_value(self) -> Value {
        if self.has_children {
            Value::Object(self.fields)
        } else if self.text.is_empty() {
            Value::Null
        } else {
            Value::String(self.text)
        }
    }

    /// Children of the root are always objects
    fn into_record(self) -> Value {
        let name = self.name.clone();
        match self.into_value() {
            Value::Object(fields) => Value::Object(fields),
            leaf => {
                let mut fields = Map::new();
                fields.insert(name, leaf);
                Value::Object(fields)
            }
        }
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn parse_document(content: &str) -> std::result::Result<Value, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event().map_err(|err| err.to_string())? {
            Event::Start(start) => {
                open(&stack, &root)?;
                stack.push(Frame::new(element_name(&start)));
            }
            Event::Empty(start) => {
                open(&stack, &root)?;
                stack.push(Frame::new(element_name(&start)));
                close(&mut stack, &mut root)?;
            }
            Event::End(_) => close(&mut stack, &mut root)?,
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape().map_err(|err| err.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        return Err(format!("unexpected end of document inside <{}>", frame.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn open(stack: &[Frame], root: &Option<Value>) -> std::result::Result<(), String> {
    if stack.is_empty() && root.is_some() {
        return Err("document has more than one root element".to_string());
    }
    Ok(())
}

fn close(stack: &mut Vec<Frame>, root: &mut Option<Value>) -> std::result::Result<(), String> {
    let frame = stack
        .pop()
        .ok_or_else(|| "closing tag without opening tag".to_string())?;
    let depth = stack.len();

    match stack.last_mut() {
        None => *root = Some(Value::Array(frame.records)),
        Some(parent) if depth == 1 => parent.records.push(frame.into_record()),
        Some(parent) => {
            parent.has_children = true;
            let name = frame.name.clone();
            parent.fields.insert(name, frame.into_value());
        }
    }
    Ok(())
}

/// Turn an arbitrary key into a well-formed element name
fn sanitize_name(key: &str) -> Cow<'_, str> {
    let mut name = INVALID_NAME_CHARS.replace_all(key, "_");
    if !VALID_NAME_START.is_match(&name) {
        name = Cow::Owned(format!("_{}", name));
    }
    if name != key {
        warn!(key, element = %name, "key is not a valid XML name, renamed");
    }
    name
}

struct Emitter<'a, W: Write> {
    writer: Writer<W>,
    options: &'a ConvertOptions,
}

type EmitResult = std::result::Result<(), String>;

impl<W: Write> Emitter<'_, W> {
    fn emit(&mut self, event: Event<'_>) -> EmitResult {
        self.writer.write_event(event).map_err(|err| err.to_string())
    }

    fn document(&mut self, value: &Value) -> EmitResult {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let root = sanitize_name(&self.options.xml_root).into_owned();
        self.emit(Event::Start(BytesStart::new(root.as_str())))?;
        match value {
            Value::Array(items) => {
                let item_name = sanitize_name(&self.options.xml_item).into_owned();
                for item in items {
                    self.element(&item_name, item)?;
                }
            }
            Value::Object(fields) => self.fields(fields)?,
            scalar => self.text(scalar)?,
        }
        self.emit(Event::End(BytesEnd::new(root.as_str())))
    }

    fn fields(&mut self, fields: &Map<String, Value>) -> EmitResult {
        for (key, value) in fields {
            match value {
                Value::Array(items) => {
                    for (idx, item) in items.iter().enumerate() {
                        let name = format!("{}{}{}", key, self.options.separator, idx);
                        self.element(&name, item)?;
                    }
                }
                other => self.element(key, other)?,
            }
        }
        Ok(())
    }

    fn element(&mut self, key: &str, value: &Value) -> EmitResult {
        let name = sanitize_name(key).into_owned();

        if value.is_null() || value.as_object().is_some_and(Map::is_empty) {
            return self.emit(Event::Empty(BytesStart::new(name.as_str())));
        }

        self.emit(Event::Start(BytesStart::new(name.as_str())))?;
        match value {
            Value::Object(fields) => self.fields(fields)?,
            Value::Array(items) => {
                let item_name = self.options.xml_item.clone();
                for item in items {
                    self.element(&item_name, item)?;
                }
            }
            scalar => self.text(scalar)?,
        }
        self.emit(Event::End(BytesEnd::new(name.as_str())))
    }

    fn text(&mut self, scalar: &Value) -> EmitResult {
        let text = scalar_text(scalar);
        if text.is_empty() {
            return Ok(());
        }
        self.emit(Event::Text(BytesText::new(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn read_str(content: &str) -> Result<Value> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.xml");
        std::fs::write(&path, content).unwrap();
        XmlFormat.read(&path, &ConvertOptions::default())
    }

    fn write_value(value: &Value) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        XmlFormat.write(value, &path, &ConvertOptions::default()).unwrap();
        std::fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn test_read_records() {
        let value = read_str(
            r#"<?xml version="1.0"?>
            <people>
              <person id="1"><name>Alice</name><city>X &amp; Y</city></person>
              <person><name>Bob</name><city/><address><zip>1</zip></address></person>
            </people>"#,
        )
        .unwrap();

        assert_eq!(
            value,
            json!([
                {"name": "Alice", "city": "X & Y"},
                {"name": "Bob", "city": null, "address": {"zip": "1"}}
            ])
        );
    }

    #[test]
    fn test_leaf_record_keeps_its_text() {
        let value = read_str("<tags><tag>a</tag><tag><![CDATA[<b>]]></tag></tags>").unwrap();

        assert_eq!(value, json!([{"tag": "a"}, {"tag": "<b>"}]));
    }

    #[test]
    fn test_malformed_is_parse_error() {
        for content in ["<a><b></a>", "<a><b>", "", "<a/><b/>"] {
            let err = read_str(content).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Parse, "content {:?}", content);
        }
    }

    #[test]
    fn test_write_array_of_records() {
        let text = write_value(&json!([
            {"name": "Alice", "tags": ["a", "b"], "address": {"city": "X"}},
            {"name": "Bob & co", "note": null}
        ]));

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<root>"));
        assert!(text.contains("<name>Alice</name>"));
        assert!(text.contains("<tags_0>a</tags_0>"));
        assert!(text.contains("<tags_1>b</tags_1>"));
        assert!(text.contains("<city>X</city>"));
        assert!(text.contains("<name>Bob &amp; co</name>"));
        assert!(text.contains("<note/>"));
        assert_eq!(text.matches("<item>").count(), 2);
    }

    #[test]
    fn test_write_object_directly_under_root() {
        let text = write_value(&json!({"a": 1, "b": true}));

        assert!(text.contains("<root>"));
        assert!(text.contains("<a>1</a>"));
        assert!(text.contains("<b>true</b>"));
        assert!(!text.contains("<item>"));
    }

    #[test]
    fn test_invalid_names_are_sanitized() {
        assert_eq!(sanitize_name("city"), "city");
        assert_eq!(sanitize_name("0"), "_0");
        assert_eq!(sanitize_name("first name"), "first_name");
        assert_eq!(sanitize_name(""), "_");

        let text = write_value(&json!([{"tags": {"0": "a"}}]));
        assert!(text.contains("<_0>a</_0>"));
    }

    #[test]
    fn test_write_then_read() {
        let value = json!([{"name": "Alice", "address": {"city": "X", "zip": "1"}}]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.xml");

        XmlFormat.write(&value, &path, &ConvertOptions::default()).unwrap();
        let back = XmlFormat.read(&path, &ConvertOptions::default()).unwrap();

        assert_eq!(back, value);
    }
}
