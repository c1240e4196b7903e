//! Usage command - monthly extraction counts in a JSON-file ledger.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use console::style;

use rcpt_core::usage::{Availability, SystemClock};
use rcpt_core::{JsonFileUsageStore, UsageLedger};

use super::load_config;

/// Arguments for the usage command.
#[derive(Args)]
pub struct UsageArgs {
    #[command(subcommand)]
    command: UsageCommand,

    /// Ledger file (default: usage.ledger_path from config)
    #[arg(short, long, global = true)]
    ledger: Option<PathBuf>,
}

#[derive(Subcommand)]
enum UsageCommand {
    /// Show this month's usage against the limit
    Show {
        /// Print the availability as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record one successful extraction
    Record,
}

pub async fn run(args: UsageArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let path = args
        .ledger
        .unwrap_or_else(|| config.usage.ledger_path.clone());

    let store = Arc::new(JsonFileUsageStore::new(&path));
    let ledger = UsageLedger::from_config(store.clone(), Arc::new(SystemClock), &config.usage);

    match args.command {
        UsageCommand::Show { json } => {
            let availability = ledger.check_availability().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&availability)?);
                return Ok(());
            }

            print_availability(&ledger.current_period(), &availability);

            let history = store.load().await?;
            if history.len() > 1 {
                println!();
                println!("History:");
                for (period, count) in &history {
                    println!("  {}  {}", period, count);
                }
            }
        }
        UsageCommand::Record => {
            let count = ledger.increment().await;
            println!(
                "{} Recorded extraction {} for {}",
                style("✓").green(),
                count,
                ledger.current_period()
            );
            if count >= ledger.limit() {
                println!(
                    "{} Monthly limit of {} reached",
                    style("!").yellow(),
                    ledger.limit()
                );
            }
        }
    }

    Ok(())
}

fn print_availability(period: &str, availability: &Availability) {
    let status = if availability.allowed {
        style("open").green()
    } else {
        style("closed").red()
    };

    println!("Period:    {}", period);
    println!("Used:      {}/{}", availability.used, availability.limit);
    println!("Remaining: {}", availability.remaining);
    println!("Status:    {}", status);
    if let Some(message) = &availability.message {
        println!("{} {}", style("ℹ").blue(), message);
    }
}
