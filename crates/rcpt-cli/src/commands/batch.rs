//! Batch command - export many raw model responses as one sheet CSV.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use rcpt_core::sheet::headers;
use rcpt_core::usage::{Clock, SystemClock};
use rcpt_core::{Actor, InvoiceNormalizer, SheetRow, SheetRowProjector};

use super::{load_config, read_raw};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching raw response files
    #[arg(required = true)]
    input: String,

    /// Output CSV file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// User ID written into the sheet rows
    #[arg(long, default_value = "cli")]
    user_id: String,

    /// User name written into the sheet rows
    #[arg(long, default_value = "")]
    user_name: String,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    receipt_id: Option<String>,
    rows: usize,
    warnings: usize,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let normalizer = InvoiceNormalizer::new();
    let projector = SheetRowProjector::from_config(&config.sheet);
    let actor = Actor::new(args.user_id.as_str(), args.user_name.as_str());

    let mut all_rows: Vec<SheetRow> = Vec::new();
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match read_raw(&path) {
            Ok((raw, warnings)) => {
                for warning in &warnings {
                    warn!(file = %path.display(), "{}", warning);
                }

                let invoice = normalizer.normalize(&raw);
                let projection = projector.project(&invoice, "", SystemClock.now(), &actor);

                results.push(FileResult {
                    path,
                    receipt_id: Some(projection.receipt_id),
                    rows: projection.rows.len(),
                    warnings: warnings.len(),
                    error: None,
                });
                all_rows.extend(projection.rows);
            }
            Err(e) => {
                let error_msg = format!("{:#}", e);
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        receipt_id: None,
                        rows: 0,
                        warnings: 0,
                        error: Some(error_msg),
                    });
                } else {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    let csv = format_csv(&all_rows)?;
    match &args.output {
        Some(output_path) => {
            fs::write(output_path, csv)?;
            eprintln!(
                "{} Rows written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        None => print!("{}", csv),
    }

    print_summary(&results, start);

    Ok(())
}

fn format_csv(rows: &[SheetRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(headers())?;
    for row in rows {
        wtr.write_record(row.to_strings())?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn print_summary(results: &[FileResult], start: Instant) {
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let rows: usize = results.iter().map(|r| r.rows).sum();

    eprintln!();
    for result in results.iter().filter(|r| r.error.is_none()) {
        eprintln!(
            "  {} {}: {} row(s){}",
            result.receipt_id.as_deref().unwrap_or("-"),
            file_name(&result.path),
            result.rows,
            if result.warnings > 0 {
                format!(", {} warning(s)", result.warnings)
            } else {
                String::new()
            }
        );
    }

    eprintln!(
        "{} Processed {} files ({} rows) in {:?}",
        style("✓").green(),
        results.len(),
        rows,
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}
