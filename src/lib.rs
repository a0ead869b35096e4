//! # Smelt - Data Format Conversion Toolkit
//!
//! Converts structured data between hierarchical formats (JSON, YAML, XML)
//! and tabular formats (CSV, spreadsheets) through a common intermediate
//! representation.
//!
//! ## Modules
//!
//! - **flatten**: flatten nested documents into records and rebuild them
//! - **formats**: per-format read/write adapters and the format registry
//! - **convert**: the read -> reshape -> write pipeline
//!
//! ## Quick Start
//!
//! ### Flattening
//!
//! ```rust
//! use smelt::flatten::{flatten, reconstruct};
//! use serde_json::json;
//!
//! let records = flatten(json!({
//!     "name": "Alice",
//!     "address": {"city": "X", "zip": "1"},
//!     "tags": ["a", "b"]
//! }));
//!
//! let keys: Vec<_> = records.0[0].keys().cloned().collect();
//! assert_eq!(keys, ["name", "address_city", "address_zip", "tags_0", "tags_1"]);
//!
//! // arrays do not come back as arrays
//! let rebuilt = reconstruct(&records.0[0]);
//! assert_eq!(rebuilt["tags"], json!({"0": "a", "1": "b"}));
//! ```
//!
//! ### Converting files
//!
//! ```rust,no_run
//! use smelt::convert::{ConversionRequest, Converter};
//!
//! let outcome = Converter::default().convert(&ConversionRequest::new("data.json", "json", "csv"));
//! println!("{}", outcome); // writes data.csv
//! ```

pub mod convert;
pub mod error;
pub mod flatten;
pub mod formats;
pub mod types;

// Re-export commonly used types for convenience
pub use convert::{resolve_output, ConversionRequest, Converter, Outcome, Stage};
pub use error::{ConvertError, ErrorKind, Result};
pub use flatten::{flatten, reconstruct, Flattener, Reconstructor};
pub use formats::{Adapter, DocumentFormat, FormatRegistry, FormatSpec, TableFormat};
pub use types::{ConvertOptions, Data, HeaderMode, Record, RecordSet, Shape};

use std::path::Path;

/// Main entry point: convert one file with the default formats and options
pub fn convert_file(input: &Path, output: Option<&Path>, from: &str, to: &str) -> Outcome {
    let mut request = ConversionRequest::new(input, from, to);
    request.output = output.map(Path::to_path_buf);
    Converter::default().convert(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "- id: 1\n  user:\n    name: Alice\n- id: 2\n  user:\n    name: Bob\n").unwrap();

        let outcome = convert_file(&input, Some(&output), "yaml", "csv");

        assert!(outcome.is_success(), "{}", outcome);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "id,user_name\n1,Alice\n2,Bob\n"
        );
    }
}
