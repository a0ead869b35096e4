use crate::types::{Record, RecordSet};
use serde_json::{Map, Value};
use tracing::warn;

/// Rebuilds nested objects from flat records by splitting key paths
///
/// Index segments such as `tags_0` are not turned back into arrays: they
/// become an object `tags` with a key `"0"`.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    separator: String,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Reconstructor::new("_")
    }
}

impl Reconstructor {
    pub fn new(separator: impl Into<String>) -> Self {
        Reconstructor {
            separator: separator.into(),
        }
    }

    /// Reconstruct one record into an object
    pub fn reconstruct(&self, record: &Record) -> Value {
        let mut root = Map::new();
        for (key, value) in record.iter() {
            self.place(&mut root, key, value.clone());
        }
        Value::Object(root)
    }

    /// Reconstruct every record, wrapped in one array
    pub fn reconstruct_all(&self, records: &RecordSet) -> Value {
        Value::Array(records.iter().map(|record| self.reconstruct(record)).collect())
    }

    fn place(&self, root: &mut Map<String, Value>, key: &str, value: Value) {
        let segments: Vec<&str> = if self.separator.is_empty() {
            vec![key]
        } else {
            key.split(self.separator.as_str()).collect()
        };
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        insert_path(root, key, parents, last, value);
    }
}

/// Walk `parents` from `node`, creating objects as needed, and set `last`
fn insert_path(node: &mut Map<String, Value>, key: &str, parents: &[&str], last: &str, value: Value) {
    let Some((segment, rest)) = parents.split_first() else {
        if node.get(last).is_some_and(Value::is_object) {
            warn!(key, "nested object replaced by scalar during reconstruction");
        }
        node.insert(last.to_string(), value);
        return;
    };

    let slot = node
        .entry(segment.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(child) => insert_path(child, key, rest, last, value),
        scalar => {
            warn!(key, segment, "scalar replaced by nested object during reconstruction");
            let mut child = Map::new();
            insert_path(&mut child, key, rest, last, value);
            *scalar = Value::Object(child);
        }
    }
}

/// Reconstruct with the default `_` separator
pub fn reconstruct(record: &Record) -> Value {
    Reconstructor::default().reconstruct(record)
}
