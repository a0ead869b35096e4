//! Conversion pipeline: read, reshape, write
//!
//! A conversion moves through `Idle -> Reading -> Transforming -> Writing ->
//! Done`. Any failure stops the pipeline and is reported as
//! [`Outcome::Failed`] together with the stage it happened in; nothing is
//! retried. Progress is reported through a callback instead of shared
//! state, so any front end can render it.

use crate::error::{ConvertError, ErrorKind, Result};
use crate::flatten::{Flattener, Reconstructor};
use crate::formats::FormatRegistry;
use crate::types::{ConvertOptions, Data, Shape};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pipeline stage of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Reading,
    Transforming,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::Idle => "preparing",
            Stage::Reading => "reading source file",
            Stage::Transforming => "transforming data",
            Stage::Writing => "writing output file",
            Stage::Done => "finished",
        };
        f.write_str(text)
    }
}

/// What to convert, from which format, to which format
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,

    /// Destination; derived from `input` when omitted
    pub output: Option<PathBuf>,

    pub from: String,
    pub to: String,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, from: impl Into<String>, to: impl Into<String>) -> Self {
        ConversionRequest {
            input: input.into(),
            output: None,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Result of one conversion
#[derive(Debug)]
pub enum Outcome {
    Done {
        output: PathBuf,
        records: usize,
    },
    Failed {
        stage: Stage,
        error: ConvertError,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Done { .. })
    }

    /// Error kind of a failed conversion
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Done { .. } => None,
            Outcome::Failed { error, .. } => Some(error.kind()),
        }
    }

    /// Status line for the user
    pub fn message(&self) -> String {
        match self {
            Outcome::Done { output, .. } => {
                format!("Data successfully converted to {}", output.display())
            }
            Outcome::Failed { stage, error } => {
                format!("Conversion failed while {}: {}", stage, error)
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Runs conversions against a format registry
pub struct Converter {
    registry: FormatRegistry,
    options: ConvertOptions,
}

impl Default for Converter {
    fn default() -> Self {
        Converter::new(FormatRegistry::with_defaults(), ConvertOptions::default())
    }
}

impl Converter {
    pub fn new(registry: FormatRegistry, options: ConvertOptions) -> Self {
        Converter { registry, options }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn convert(&self, request: &ConversionRequest) -> Outcome {
        self.convert_with(request, |_| {})
    }

    /// Convert, reporting each stage transition to `on_stage`
    pub fn convert_with<F: FnMut(Stage)>(&self, request: &ConversionRequest, mut on_stage: F) -> Outcome {
        let mut current = Stage::Idle;
        let mut enter = |stage: Stage| {
            debug!(%stage, "conversion stage");
            current = stage;
            on_stage(stage);
        };

        let result = self.run(request, &mut enter);
        match result {
            Ok((output, records)) => {
                info!(output = %output.display(), records, "conversion completed");
                Outcome::Done { output, records }
            }
            Err(error) => Outcome::Failed {
                stage: current,
                error,
            },
        }
    }

    fn run(&self, request: &ConversionRequest, enter: &mut dyn FnMut(Stage)) -> Result<(PathBuf, usize)> {
        let source = self.registry.get(&request.from)?;
        let target = self.registry.get(&request.to)?;
        let output = resolve_output(&request.input, request.output.as_deref(), &target.extension);

        enter(Stage::Reading);
        if !request.input.is_file() {
            return Err(ConvertError::NotFound(request.input.clone()));
        }
        let data = source.adapter.read(&request.input, &self.options)?;

        enter(Stage::Transforming);
        let data = self.reshape(data, target.shape());
        let records = data.record_count();

        enter(Stage::Writing);
        target.adapter.write(&data, &output, &self.options)?;

        enter(Stage::Done);
        Ok((output, records))
    }

    /// Flatten documents for tabular targets, rebuild them for hierarchical ones
    fn reshape(&self, data: Data, target: Shape) -> Data {
        match (data, target) {
            (Data::Document(value), Shape::Tabular) => {
                Data::Table(Flattener::new(self.options.separator.as_str()).flatten(value))
            }
            (Data::Table(records), Shape::Hierarchical) => {
                Data::Document(Reconstructor::new(self.options.separator.as_str()).reconstruct_all(&records))
            }
            (data, _) => data,
        }
    }
}

/// Destination path for a conversion
///
/// Without an explicit output the input's extension is replaced by the
/// target's; an explicit output without any extension gets one appended.
pub fn resolve_output(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    match output {
        Some(path) if path.as_os_str().is_empty() => input.with_extension(extension),
        Some(path) if path.extension().is_none() => {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(extension);
            PathBuf::from(name)
        }
        Some(path) => path.to_path_buf(),
        None => input.with_extension(extension),
    }
}
