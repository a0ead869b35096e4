use crate::types::{Record, RecordSet};
use serde_json::{Map, Value};

/// Field name given to a scalar that has no key of its own
pub const SCALAR_KEY: &str = "value";

/// Flattens nested documents into records by key-path concatenation
#[derive(Debug, Clone)]
pub struct Flattener {
    separator: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new("_")
    }
}

impl Flattener {
    pub fn new(separator: impl Into<String>) -> Self {
        Flattener {
            separator: separator.into(),
        }
    }

    /// Flatten a value into a record set
    ///
    /// A top-level array yields one record per element; anything else
    /// yields exactly one record.
    pub fn flatten(&self, value: Value) -> RecordSet {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.flatten_record(item))
                .collect(),
            other => RecordSet::from(vec![self.flatten_record(other)]),
        }
    }

    /// Flatten one value into a single record
    pub fn flatten_record(&self, value: Value) -> Record {
        let mut record = Record::new();
        match value {
            Value::Object(obj) => self.flatten_object(obj, "", &mut record),
            Value::Array(items) => self.flatten_array(items, "", &mut record),
            scalar => record.insert(SCALAR_KEY, scalar),
        }
        record
    }

    fn flatten_object(&self, obj: Map<String, Value>, parent_key: &str, record: &mut Record) {
        for (key, value) in obj.into_iter() {
            let new_key = self.join(parent_key, &key);
            match value {
                Value::Object(nested) => self.flatten_object(nested, &new_key, record),
                Value::Array(items) => self.flatten_array(items, &new_key, record),
                scalar => record.insert(new_key, scalar),
            }
        }
    }

    /// Array elements become `key_0`, `key_1`, ...; only object elements
    /// are descended into, everything else is assigned as-is.
    fn flatten_array(&self, items: Vec<Value>, parent_key: &str, record: &mut Record) {
        for (idx, item) in items.into_iter().enumerate() {
            let item_key = self.join(parent_key, &idx.to_string());
            match item {
                Value::Object(nested) => self.flatten_object(nested, &item_key, record),
                other => record.insert(item_key, other),
            }
        }
    }

    fn join(&self, parent_key: &str, key: &str) -> String {
        if parent_key.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", parent_key, self.separator, key)
        }
    }
}

/// Flatten with the default `_` separator
pub fn flatten(value: Value) -> RecordSet {
    Flattener::default().flatten(value)
}
