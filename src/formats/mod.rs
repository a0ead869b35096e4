//! Format adapters
//!
//! Each format implements one of two capability traits: [`DocumentFormat`]
//! for hierarchical formats that read and write a [`Value`] tree, or
//! [`TableFormat`] for tabular formats that read and write a [`RecordSet`].
//! Adapters are looked up by name through a [`FormatRegistry`]; adding a
//! format means registering another [`FormatSpec`].

pub mod csv;
pub mod excel;
pub mod json;
pub mod xml;
pub mod yaml;

use crate::error::{ConvertError, Result};
use crate::types::{ConvertOptions, Data, RecordSet, Shape};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

pub use self::csv::CsvFormat;
pub use self::excel::ExcelFormat;
pub use self::json::JsonFormat;
pub use self::xml::XmlFormat;
pub use self::yaml::YamlFormat;

/// Read/write capability for hierarchical formats
pub trait DocumentFormat: Send + Sync {
    fn read(&self, path: &Path, options: &ConvertOptions) -> Result<Value>;
    fn write(&self, value: &Value, path: &Path, options: &ConvertOptions) -> Result<()>;
}

/// Read/write capability for tabular formats
pub trait TableFormat: Send + Sync {
    fn read(&self, path: &Path, options: &ConvertOptions) -> Result<RecordSet>;
    fn write(&self, records: &RecordSet, path: &Path, options: &ConvertOptions) -> Result<()>;
}

/// A registered adapter, tagged with the shape of data it handles
pub enum Adapter {
    Document(Box<dyn DocumentFormat>),
    Table(Box<dyn TableFormat>),
}

impl Adapter {
    pub fn shape(&self) -> Shape {
        match self {
            Adapter::Document(_) => Shape::Hierarchical,
            Adapter::Table(_) => Shape::Tabular,
        }
    }

    pub fn read(&self, path: &Path, options: &ConvertOptions) -> Result<Data> {
        match self {
            Adapter::Document(format) => format.read(path, options).map(Data::Document),
            Adapter::Table(format) => format.read(path, options).map(Data::Table),
        }
    }

    /// Write data whose shape must already match the adapter
    pub fn write(&self, data: &Data, path: &Path, options: &ConvertOptions) -> Result<()> {
        match (self, data) {
            (Adapter::Document(format), Data::Document(value)) => format.write(value, path, options),
            (Adapter::Table(format), Data::Table(records)) => format.write(records, path, options),
            (adapter, data) => Err(ConvertError::write(
                path,
                format!(
                    "{:?} adapter cannot write {:?} data",
                    adapter.shape(),
                    data.shape()
                ),
            )),
        }
    }
}

/// A format known to the registry
pub struct FormatSpec {
    /// Canonical name, e.g. "excel"
    pub name: String,

    /// Canonical file extension without the dot, e.g. "xlsx"
    pub extension: String,

    /// Other names accepted on lookup
    pub aliases: Vec<String>,

    pub adapter: Adapter,
}

impl FormatSpec {
    pub fn new(name: impl Into<String>, extension: impl Into<String>, adapter: Adapter) -> Self {
        FormatSpec {
            name: name.into(),
            extension: extension.into(),
            aliases: Vec::new(),
            adapter,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn shape(&self) -> Shape {
        self.adapter.shape()
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Maps format names to adapters
pub struct FormatRegistry {
    formats: Vec<FormatSpec>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry::with_defaults()
    }
}

impl FormatRegistry {
    /// An empty registry
    pub fn new() -> Self {
        FormatRegistry { formats: Vec::new() }
    }

    /// Registry with json, yaml, xml, csv and excel
    pub fn with_defaults() -> Self {
        let mut registry = FormatRegistry::new();
        registry.register(FormatSpec::new("json", "json", Adapter::Document(Box::new(JsonFormat))));
        registry.register(
            FormatSpec::new("yaml", "yaml", Adapter::Document(Box::new(YamlFormat))).with_alias("yml"),
        );
        registry.register(FormatSpec::new("xml", "xml", Adapter::Document(Box::new(XmlFormat))));
        registry.register(FormatSpec::new("csv", "csv", Adapter::Table(Box::new(CsvFormat))));
        registry.register(
            FormatSpec::new("excel", "xlsx", Adapter::Table(Box::new(ExcelFormat))).with_alias("xlsx"),
        );
        registry
    }

    /// Add a format, replacing any format registered under the same name
    pub fn register(&mut self, spec: FormatSpec) {
        self.formats.retain(|existing| !existing.name.eq_ignore_ascii_case(&spec.name));
        self.formats.push(spec);
    }

    /// Look up a format by name or alias, ignoring case
    pub fn get(&self, name: &str) -> Result<&FormatSpec> {
        self.formats
            .iter()
            .find(|spec| spec.answers_to(name.trim()))
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                name: name.to_string(),
                supported: self.names().join(", "),
            })
    }

    /// Find the format that owns a file extension
    pub fn by_extension(&self, extension: &str) -> Option<&FormatSpec> {
        self.formats.iter().find(|spec| {
            spec.extension.eq_ignore_ascii_case(extension) || spec.answers_to(extension)
        })
    }

    /// Canonical names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.formats.iter().map(|spec| spec.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatSpec> {
        self.formats.iter()
    }
}

/// Open a source file, mapping a missing path to `NotFound`
pub(crate) fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ConvertError::NotFound(path.to_path_buf()),
        _ => ConvertError::unknown(path, err),
    })
}

/// Fail with `NotFound` unless the path is an existing file
pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConvertError::NotFound(path.to_path_buf()))
    }
}

/// Create (or truncate) a destination file
pub(crate) fn create_target(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| ConvertError::write(path, err))
}

/// Render a scalar as cell or element text
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
