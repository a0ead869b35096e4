use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading, transforming or writing data
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source path does not exist
    #[error("file {} not found", .0.display())]
    NotFound(PathBuf),

    /// The content is malformed for the declared format
    #[error("error parsing {format} from {}: {message}", .path.display())]
    Parse {
        format: &'static str,
        path: PathBuf,
        message: String,
    },

    /// The format name is not registered
    #[error("unsupported format `{name}` (supported: {supported})")]
    UnsupportedFormat { name: String, supported: String },

    /// I/O or encode failure on the destination
    #[error("error writing to {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    /// A tabular write was requested with zero records or zero columns
    #[error("no data to write to {format}")]
    EmptyData { format: &'static str },

    /// Any other decode failure
    #[error("error reading {}: {message}", .path.display())]
    Unknown { path: PathBuf, message: String },
}

/// Discriminant of [`ConvertError`], carried by failed outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Parse,
    UnsupportedFormat,
    Write,
    EmptyData,
    Unknown,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::NotFound(_) => ErrorKind::NotFound,
            ConvertError::Parse { .. } => ErrorKind::Parse,
            ConvertError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ConvertError::Write { .. } => ErrorKind::Write,
            ConvertError::EmptyData { .. } => ErrorKind::EmptyData,
            ConvertError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub(crate) fn parse(format: &'static str, path: &Path, err: impl std::fmt::Display) -> Self {
        ConvertError::Parse {
            format,
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        ConvertError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn unknown(path: &Path, err: impl std::fmt::Display) -> Self {
        ConvertError::Unknown {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
