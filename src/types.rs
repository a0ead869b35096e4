use serde::Serialize;
use serde_json::{Map, Value};

/// One flat row: ordered key -> scalar mapping
///
/// Keys are unique and keep their first insertion position. Values are
/// always scalars; nested objects or arrays handed to [`Record::insert`]
/// are stored as their compact JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Map::new() }
    }

    /// Upsert a field, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let value = match value {
            Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
            scalar => scalar,
        };
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Ordered sequence of records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordSet(pub Vec<Record>);

impl RecordSet {
    pub fn new() -> Self {
        RecordSet(Vec::new())
    }

    pub fn push(&mut self, record: Record) {
        self.0.push(record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    /// Column names for tabular output
    ///
    /// `FirstRecord` takes the first record's keys, so keys that only
    /// appear in later records are dropped from the output.
    pub fn header(&self, mode: HeaderMode) -> Vec<String> {
        match mode {
            HeaderMode::FirstRecord => self
                .0
                .first()
                .map(|record| record.keys().cloned().collect())
                .unwrap_or_default(),
            HeaderMode::Union => {
                let mut seen = Map::new();
                for record in &self.0 {
                    for key in record.keys() {
                        if !seen.contains_key(key) {
                            seen.insert(key.clone(), Value::Null);
                        }
                    }
                }
                seen.into_iter().map(|(key, _)| key).collect()
            }
        }
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        RecordSet(records)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        RecordSet(iter.into_iter().collect())
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether a format carries nested documents or flat tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Hierarchical,
    Tabular,
}

/// Data moving through one conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Document(Value),
    Table(RecordSet),
}

impl Data {
    pub fn shape(&self) -> Shape {
        match self {
            Data::Document(_) => Shape::Hierarchical,
            Data::Table(_) => Shape::Tabular,
        }
    }

    /// Number of records for tables, top-level items for documents
    pub fn record_count(&self) -> usize {
        match self {
            Data::Table(records) => records.len(),
            Data::Document(Value::Array(items)) => items.len(),
            Data::Document(_) => 1,
        }
    }
}

/// How tabular writers choose their columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Columns come from the first record only
    #[default]
    FirstRecord,
    /// Columns are every key seen, in first-seen order
    Union,
}

/// Configuration for a conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Separator joining key-path segments
    pub separator: String,

    /// Column selection for tabular output
    pub header_mode: HeaderMode,

    /// Root element name for XML output
    pub xml_root: String,

    /// Element name wrapping each array item in XML output
    pub xml_item: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            separator: String::from("_"),
            header_mode: HeaderMode::FirstRecord,
            xml_root: String::from("root"),
            xml_item: String::from("item"),
            pretty: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut rec = Record::new();
        rec.insert("a", json!(1));
        rec.insert("b", json!(2));
        rec.insert("a", json!(3));

        let keys: Vec<_> = rec.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(rec.get("a"), Some(&json!(3)));
    }

    #[test]
    fn test_nested_values_are_stringified() {
        let mut rec = Record::new();
        rec.insert("list", json!([1, 2]));
        rec.insert("obj", json!({"x": true}));

        assert_eq!(rec.get("list"), Some(&json!("[1,2]")));
        assert_eq!(rec.get("obj"), Some(&json!("{\"x\":true}")));
    }

    #[test]
    fn test_header_from_first_record() {
        let set = RecordSet::from(vec![
            record(json!({"a": 1, "b": 2})),
            record(json!({"a": 3, "c": 4})),
        ]);

        assert_eq!(set.header(HeaderMode::FirstRecord), vec!["a", "b"]);
        assert_eq!(set.header(HeaderMode::Union), vec!["a", "b", "c"]);
        assert!(RecordSet::new().header(HeaderMode::FirstRecord).is_empty());
    }
}
