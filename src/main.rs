use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::{info, LevelFilter};
use portfolio_report_metrics::{
    expand_patterns, process_files, BatchSummary, ExtractionConfig, WorkbookReport,
};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Parser)]
#[command(
    name = "portfolio-metrics",
    about = "Classify portfolio workbooks and compute their monthly KPIs."
)]
struct Args {
    /// Workbook paths or glob patterns (e.g. `reports/**/*.xlsx`).
    #[arg(required_unless_present = "print_schema")]
    paths: Vec<String>,

    /// JSON extraction config; keys that are left out keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format written to stdout after the status lines.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also write the JSON batch report to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write `<stem>.series.csv` for every successfully extracted workbook;
    /// repeated stems get a `-2`, `-3` suffix.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Print the JSON Schema of the per-file report and exit.
    #[arg(long)]
    print_schema: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace). `RUST_LOG` also works.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

/// Returns `false` when at least one file failed.
fn run() -> Result<bool> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.print_schema {
        let schema = WorkbookReport::generate_json_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(true);
    }

    let config = match &args.config {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };

    let paths = expand_patterns(&args.paths)?;
    if paths.is_empty() {
        bail!("no workbooks matched {}", args.paths.join(", "));
    }

    let batch = process_files(&paths, &config);

    for file in &batch.files {
        println!("{}", file.status_line());
    }

    match args.format {
        OutputFormat::Text => println!("{}", batch.summary_line()),
        OutputFormat::Json => println!("{}", batch.to_json()?),
        OutputFormat::Markdown => println!("{}", batch.to_markdown()),
    }

    if let Some(output) = &args.output {
        std::fs::write(output, batch.to_json()?)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    if let Some(dir) = &args.csv_dir {
        write_csv_exports(&batch, dir)?;
    }

    Ok(!batch.has_failures())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    builder.init();
}

fn write_csv_exports(batch: &BatchSummary, dir: &Path) -> Result<()> {
    let written = batch
        .write_series_csvs(dir)
        .with_context(|| format!("writing series CSVs to {}", dir.display()))?;
    info!("Wrote {} series CSV file(s) to {}", written.len(), dir.display());
    Ok(())
}
