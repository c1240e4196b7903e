//! Normalize command - turn one raw model response into a canonical invoice.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{debug, info};

use rcpt_core::sheet::headers;
use rcpt_core::usage::{Clock, SystemClock};
use rcpt_core::{Actor, Invoice, InvoiceNormalizer, RcptConfig, SheetRowProjector};

use super::{load_config, read_raw};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Raw model response (JSON, code fences allowed)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Image URL written into the sheet rows
    #[arg(long, default_value = "")]
    image_url: String,

    /// User ID written into the sheet rows
    #[arg(long, default_value = "cli")]
    user_id: String,

    /// User name written into the sheet rows
    #[arg(long, default_value = "")]
    user_name: String,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Canonical invoice JSON
    Json,
    /// Sheet rows with header
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: NormalizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Normalizing {}", args.input.display());

    let (raw, warnings) = read_raw(&args.input)?;
    if !warnings.is_empty() {
        eprintln!("{}", style("Validation warnings:").yellow());
        for warning in &warnings {
            eprintln!("  - {}", warning);
        }
    }

    let invoice = InvoiceNormalizer::new().normalize(&raw);
    debug!(items = invoice.line_items.len(), "Normalized invoice");

    let actor = Actor::new(args.user_id.as_str(), args.user_name.as_str());
    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&invoice)?,
        OutputFormat::Csv => format_rows(&invoice, &config, &args.image_url, &actor)?,
        OutputFormat::Text => format_text(&invoice),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    Ok(())
}

fn format_rows(
    invoice: &Invoice,
    config: &RcptConfig,
    image_url: &str,
    actor: &Actor,
) -> anyhow::Result<String> {
    let projector = SheetRowProjector::from_config(&config.sheet);
    let projection = projector.project(invoice, image_url, SystemClock.now(), actor);

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(headers())?;
    for row in &projection.rows {
        wtr.write_record(row.to_strings())?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

/// Human-readable summary of an invoice.
pub fn format_text(invoice: &Invoice) -> String {
    let mut output = String::new();

    output.push_str(invoice.document_type.as_str());
    if let Some(number) = &invoice.invoice_number {
        output.push_str(&format!(" {}", number));
    }
    output.push('\n');

    if let Some(date) = &invoice.invoice_date {
        output.push_str(&format!("Date: {}\n", date));
    }
    output.push_str(&format!("Category: {}\n", invoice.expense_category.as_str()));
    output.push('\n');

    output.push_str("Seller:\n");
    output.push_str(&format!("  {}\n", invoice.seller_name.as_deref().unwrap_or("-")));
    if let Some(tax_id) = &invoice.seller_tax_id {
        output.push_str(&format!("  Tax ID: {}\n", tax_id));
    }
    output.push('\n');

    if !invoice.line_items.is_empty() {
        output.push_str("Items:\n");
        for item in &invoice.line_items {
            output.push_str(&format!(
                "  {:>2}. [{}] {} x{} = {}\n",
                item.item_number,
                item.line_type.as_str(),
                item.description,
                item.quantity,
                item.amount
            ));
        }
        output.push('\n');
    }

    if let Some(subtotal) = invoice.subtotal {
        output.push_str(&format!("  Subtotal: {}\n", subtotal));
    }
    if let Some(vat) = invoice.vat_amount {
        output.push_str(&format!("  VAT:      {}\n", vat));
    }
    output.push_str(&format!("  Total:    {}\n", invoice.grand_total));
    output.push_str(&format!("  Confidence: {}\n", invoice.confidence));

    let notes = invoice.review_notes();
    if !notes.is_empty() {
        output.push_str("\nReview:\n");
        for note in notes {
            output.push_str(&format!("  - {}\n", note));
        }
    }

    output
}
