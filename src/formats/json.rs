use super::{create_target, open_source, DocumentFormat};
use crate::error::{ConvertError, Result};
use crate::types::ConvertOptions;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const NAME: &str = "json";

/// JSON documents, UTF-8 text
pub struct JsonFormat;

impl DocumentFormat for JsonFormat {
    fn read(&self, path: &Path, _options: &ConvertOptions) -> Result<Value> {
        let mut file = open_source(path)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|err| ConvertError::unknown(path, err))?;

        parse(&content).map_err(|err| ConvertError::parse(NAME, path, err))
    }

    fn write(&self, value: &Value, path: &Path, options: &ConvertOptions) -> Result<()> {
        let mut writer = create_target(path)?;

        if options.pretty {
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|err| ConvertError::write(path, err))?;
        } else {
            serde_json::to_writer(&mut writer, value).map_err(|err| ConvertError::write(path, err))?;
        }

        writeln!(writer).map_err(|err| ConvertError::write(path, err))?;
        writer.flush().map_err(|err| ConvertError::write(path, err))
    }
}

/// Parse with SIMD acceleration, falling back to serde_json for anything
/// simd-json rejects so that errors carry line and column.
fn parse(content: &[u8]) -> std::result::Result<Value, serde_json::Error> {
    // simd-json parses in place, so it gets its own copy
    let mut scratch = content.to_vec();
    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!(error = %err, "simd-json rejected input, retrying with serde_json");
            serde_json::from_slice(content)
        }
    }
}
