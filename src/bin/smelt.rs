//! smelt: Convert structured data between JSON, YAML, XML, CSV and Excel
//!
//! Nested documents are flattened into columns when written to a tabular
//! format and rebuilt from column names when written to a hierarchical one.
//!
//! Usage:
//!   # JSON to CSV, output path derived from the input (data.csv)
//!   smelt data.json --to csv
//!
//!   # Explicit formats and destination
//!   smelt export.dat --from xml --to excel -o report.xlsx
//!
//!   # Keep columns that only appear in later records
//!   smelt events.yaml --to csv --union-headers

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{anyhow, Result};
use clap::Parser;
use smelt::{ConversionRequest, ConvertOptions, Converter, FormatRegistry, HeaderMode, Shape};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "smelt")]
#[command(about = "Convert structured data between JSON, YAML, XML, CSV and Excel", long_about = None)]
struct Args {
    /// Source file
    #[arg(value_name = "FILE", required_unless_present = "list_formats")]
    input: Option<PathBuf>,

    /// Source format (guessed from the file extension if omitted)
    #[arg(long)]
    from: Option<String>,

    /// Destination format
    #[arg(long, required_unless_present = "list_formats")]
    to: Option<String>,

    /// Destination file (defaults to the source path with the destination extension)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Separator joining nested keys into column names (default: "_")
    #[arg(long)]
    separator: Option<String>,

    /// Use every key seen as a column instead of only the first record's keys
    #[arg(long)]
    union_headers: bool,

    /// Root element name for XML output (default: "root")
    #[arg(long)]
    xml_root: Option<String>,

    /// Element name for each record in XML output (default: "item")
    #[arg(long)]
    xml_item: Option<String>,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Print the registered formats and exit
    #[arg(long)]
    list_formats: bool,

    /// Log each pipeline stage
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let registry = FormatRegistry::with_defaults();
    if args.list_formats {
        for spec in registry.iter() {
            let shape = match spec.shape() {
                Shape::Hierarchical => "hierarchical",
                Shape::Tabular => "tabular",
            };
            println!("{:<8} .{:<6} {}", spec.name, spec.extension, shape);
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Build config
    let mut options = ConvertOptions::default();
    if let Some(sep) = args.separator {
        options.separator = sep;
    }
    if args.union_headers {
        options.header_mode = HeaderMode::Union;
    }
    if let Some(root) = args.xml_root {
        options.xml_root = root;
    }
    if let Some(item) = args.xml_item {
        options.xml_item = item;
    }
    options.pretty = !args.compact;

    let input = args.input.ok_or_else(|| anyhow!("missing input file"))?;
    let to = args.to.ok_or_else(|| anyhow!("missing destination format"))?;
    let from = match args.from {
        Some(from) => from,
        None => guess_format(&registry, &input)?,
    };

    let mut request = ConversionRequest::new(input, from, to);
    request.output = args.output;

    let converter = Converter::new(registry, options);
    let outcome = converter.convert_with(&request, |stage| info!("{}...", stage));

    if outcome.is_success() {
        println!("{}", outcome);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Error: {}", outcome);
        Ok(ExitCode::FAILURE)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "smelt=debug" } else { "smelt=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn guess_format(registry: &FormatRegistry, input: &std::path::Path) -> Result<String> {
    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| anyhow!("cannot guess the format of {}, pass --from", input.display()))?;

    registry
        .by_extension(extension)
        .map(|spec| spec.name.clone())
        .ok_or_else(|| anyhow!("no format registered for .{} files, pass --from", extension))
}
