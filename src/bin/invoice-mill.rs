//! Invoice Mill CLI tool
//!
//! Batch-generates one PDF per invoice from two input spreadsheets and a
//! pair of PDF templates, plus a reference spreadsheet for reconciliation.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use invoice_mill::config::Config;
use invoice_mill::pdf::{count_pages, Template};
use invoice_mill::run::Pipeline;

/// Invoice Mill - generate invoice PDFs from spreadsheet data
#[derive(Parser)]
#[command(name = "invoice-mill")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Generate all invoices
    invoice-mill generate --config config.json --invoices input.xlsx --backups backup.xlsx

    # Generate into a different output directory
    invoice-mill generate -c config.json -i input.xlsx -b backup.xlsx --output /tmp/run1

    # Validate config and templates without generating anything
    invoice-mill check --config config.json")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one PDF per invoice plus the reference spreadsheet
    Generate {
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Invoice input spreadsheet (.xlsx)
        #[arg(short, long)]
        invoices: PathBuf,

        /// Backup detail spreadsheet (.xlsx)
        #[arg(short, long)]
        backups: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and both templates
    Check {
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate { config, invoices, backups, output } => {
            cmd_generate(config, invoices, backups, output)
        }
        Commands::Check { config } => cmd_check(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Run the full batch
fn cmd_generate(
    config_path: PathBuf,
    invoices: PathBuf,
    backups: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(output) = output {
        config.paths.output = output;
    }

    let mut pipeline = Pipeline::new(config).context("opening templates")?;
    pipeline
        .load_invoices(&invoices)
        .with_context(|| format!("loading invoices from {}", invoices.display()))?;
    pipeline
        .load_backups(&backups)
        .with_context(|| format!("loading backup data from {}", backups.display()))?;

    let summary = pipeline.generate_all()?;

    eprintln!(
        "Done: {} generated, {} failed, {} rows total",
        summary.generated_count(),
        summary.failed_count(),
        summary.len()
    );

    Ok(())
}

/// Validate config and templates without generating anything
fn cmd_check(config_path: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    for path in [config.front_page_template(), config.backup_page_template()] {
        Template::load(&path)?;
        let pages = count_pages(&path)?;
        println!("{}: OK ({pages} page)", path.display());
    }
    println!(
        "rows_per_backup_page: {}, {} text positions",
        config.pdf_settings.rows_per_backup_page,
        config.text_positions.len()
    );

    Ok(())
}
