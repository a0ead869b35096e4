use super::{create_target, open_source, DocumentFormat};
use crate::error::{ConvertError, Result};
use crate::types::ConvertOptions;
use serde_json::Value;
use std::io::{BufReader, Write};
use std::path::Path;

const NAME: &str = "yaml";

/// YAML documents
///
/// Parsing follows YAML 1.2 core schema rules: plain `yes`/`no`/`on`/`off`
/// stay strings rather than YAML 1.1 booleans. Scalar mapping keys such as
/// `1` or `true` are read as their string form.
pub struct YamlFormat;

impl DocumentFormat for YamlFormat {
    fn read(&self, path: &Path, _options: &ConvertOptions) -> Result<Value> {
        let file = open_source(path)?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|err| ConvertError::parse(NAME, path, err))
    }

    fn write(&self, value: &Value, path: &Path, _options: &ConvertOptions) -> Result<()> {
        let mut writer = create_target(path)?;
        serde_yaml::to_writer(&mut writer, value).map_err(|err| ConvertError::write(path, err))?;
        writer.flush().map_err(|err| ConvertError::write(path, err))
    }
}
