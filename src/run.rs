//! Run orchestration
//!
//! Drives one batch: for each loaded invoice, group -> paginate -> render
//! front and backup pages -> assemble, recording the outcome per invoice.
//! A failure inside one invoice is caught here and the loop continues;
//! failures in shared prerequisites (config, templates) abort construction
//! before any invoice is touched. The accumulated `RunSummary` is exported
//! as the reference spreadsheet at the end of the run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::data::{self, BackupRecord, InvoiceRecord, RowSkip};
use crate::error::{Error, Result};
use crate::format::format_currency;
use crate::matcher::group_backups;
use crate::paginate::paginate;
use crate::pdf::{assemble, backup_page_spans, front_page_spans, Template};

/// File name of the reference spreadsheet written next to the invoices
pub const SUMMARY_FILE_NAME: &str = "QT_Fillable_data.csv";

/// Per-invoice outcome
#[derive(Debug, Clone)]
pub enum Outcome {
    Generated { path: PathBuf },
    Failed { reason: String },
    /// Input row never became an invoice (schema or parse problem)
    Skipped { reason: String },
}

impl Outcome {
    fn status(&self) -> &'static str {
        match self {
            Outcome::Generated { .. } => "generated",
            Outcome::Failed { .. } => "failed",
            Outcome::Skipped { .. } => "skipped",
        }
    }

    fn detail(&self) -> String {
        match self {
            Outcome::Generated { path } => path.display().to_string(),
            Outcome::Failed { reason } | Outcome::Skipped { reason } => reason.clone(),
        }
    }
}

/// One reference-spreadsheet row
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub invoice_number: String,
    pub outcome: Outcome,
    pub backup_rows: usize,
    pub net_amount: Option<f64>,
}

/// Accumulated outcomes for the whole run, in processing order
#[derive(Debug, Default)]
pub struct RunSummary {
    rows: Vec<SummaryRow>,
}

impl RunSummary {
    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn generated_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Generated { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
            .count()
    }

    /// Export as the reference spreadsheet
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "Invoice Number",
            "Status",
            "Output / Error",
            "Backup Rows",
            "Net Amount",
        ])?;
        for row in &self.rows {
            writer.write_record([
                row.invoice_number.as_str(),
                row.outcome.status(),
                row.outcome.detail().as_str(),
                row.backup_rows.to_string().as_str(),
                row.net_amount
                    .map(format_currency)
                    .unwrap_or_default()
                    .as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// The batch pipeline: configuration, both templates, and loaded input data
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    front_template: Template,
    backup_template: Template,
    invoices: Vec<InvoiceRecord>,
    backups: Vec<BackupRecord>,
    skips: Vec<RowSkip>,
}

impl Pipeline {
    /// Validate config and open both templates. Fails before any invoice is
    /// processed when a shared prerequisite is broken.
    pub fn new(config: Config) -> Result<Pipeline> {
        config.validate()?;
        let front_template = Template::load(&config.front_page_template())?;
        let backup_template = Template::load(&config.backup_page_template())?;
        Ok(Pipeline {
            config,
            front_template,
            backup_template,
            invoices: Vec::new(),
            backups: Vec::new(),
            skips: Vec::new(),
        })
    }

    /// Load the invoice input workbook; returns the number of rows loaded
    pub fn load_invoices(&mut self, path: &Path) -> Result<usize> {
        let (records, skips) = data::load_invoices(path)?;
        info!(
            rows = records.len(),
            skipped = skips.len(),
            "loaded invoice data from {}",
            path.display()
        );
        self.invoices = records;
        self.skips.extend(skips);
        Ok(self.invoices.len())
    }

    /// Load the backup detail workbook; returns the number of rows loaded
    pub fn load_backups(&mut self, path: &Path) -> Result<usize> {
        let (records, skips) = data::load_backups(path)?;
        info!(
            rows = records.len(),
            skipped = skips.len(),
            "loaded backup data from {}",
            path.display()
        );
        self.backups = records;
        self.skips.extend(skips);
        Ok(self.backups.len())
    }

    /// Supply invoice records already in memory (alternate front ends)
    pub fn set_invoices(&mut self, invoices: Vec<InvoiceRecord>) {
        self.invoices = invoices;
    }

    /// Supply backup records already in memory (alternate front ends)
    pub fn set_backups(&mut self, backups: Vec<BackupRecord>) {
        self.backups = backups;
    }

    /// Process every loaded invoice and write the reference spreadsheet.
    /// Fails outright only when zero invoices were loaded.
    pub fn generate_all(&mut self) -> Result<RunSummary> {
        if self.invoices.is_empty() {
            return Err(Error::NoInvoices);
        }

        let groups = group_backups(&self.invoices, &self.backups);
        if !groups.unmatched.is_empty() {
            warn!(
                count = groups.unmatched.len(),
                "backup rows matched no invoice"
            );
        }

        fs::create_dir_all(&self.config.paths.output)?;

        let mut summary = RunSummary::default();
        for skip in self.skips.drain(..) {
            summary.push(SummaryRow {
                invoice_number: skip
                    .reference
                    .unwrap_or_else(|| format!("row {}", skip.row)),
                outcome: Outcome::Skipped { reason: skip.reason },
                backup_rows: 0,
                net_amount: None,
            });
        }

        let total = self.invoices.len();
        for (i, invoice) in self.invoices.iter().enumerate() {
            info!(
                invoice = invoice.invoice_number.as_str(),
                "processing invoice {}/{total}",
                i + 1
            );
            let rows = groups.for_invoice(invoice);
            let outcome = match generate_one(
                &self.config,
                &self.front_template,
                &self.backup_template,
                invoice,
                rows,
            ) {
                Ok(path) => {
                    info!(
                        invoice = invoice.invoice_number.as_str(),
                        "generated {}",
                        path.display()
                    );
                    Outcome::Generated { path }
                }
                Err(e) => {
                    error!(
                        invoice = invoice.invoice_number.as_str(),
                        "generation failed: {e}"
                    );
                    Outcome::Failed { reason: e.to_string() }
                }
            };
            summary.push(SummaryRow {
                invoice_number: invoice.invoice_number.clone(),
                outcome,
                backup_rows: rows.len(),
                net_amount: Some(invoice.invoice_amount),
            });
        }

        let summary_path = self.config.paths.output.join(SUMMARY_FILE_NAME);
        summary.write_csv(&summary_path)?;
        info!("reference spreadsheet written to {}", summary_path.display());

        Ok(summary)
    }
}

/// One invoice end to end: paginate its group, render the front page and
/// each backup page, and assemble them into the output document
fn generate_one(
    config: &Config,
    front_template: &Template,
    backup_template: &Template,
    invoice: &InvoiceRecord,
    rows: &[BackupRecord],
) -> Result<PathBuf> {
    let pages = paginate(rows, config.pdf_settings.rows_per_backup_page)?;
    let net_amount = format_currency(invoice.invoice_amount);

    let mut documents = Vec::with_capacity(pages.len() + 1);
    documents.push(front_template.render(&front_page_spans(invoice, config)?)?);

    let page_count = pages.len();
    for (i, page) in pages.iter().enumerate() {
        // net amount is overlaid on the final backup page only
        let net = (i + 1 == page_count).then_some(net_amount.as_str());
        documents.push(backup_template.render(&backup_page_spans(page, net, config)?)?);
    }

    assemble(documents, &config.invoice_output_path(&invoice.invoice_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: &str, outcome: Outcome) -> SummaryRow {
        SummaryRow {
            invoice_number: number.to_string(),
            outcome,
            backup_rows: 2,
            net_amount: Some(1234.5),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.push(row("INV001", Outcome::Generated { path: PathBuf::from("out/INV001.pdf") }));
        summary.push(row("INV002", Outcome::Failed { reason: "boom".to_string() }));
        summary.push(row("row 4", Outcome::Skipped { reason: "non-numeric Invoice Amount".to_string() }));
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.generated_count(), 1);
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn test_summary_csv_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE_NAME);

        let mut summary = RunSummary::default();
        summary.push(row("INV001", Outcome::Generated { path: PathBuf::from("out/INV001.pdf") }));
        summary.push(row("INV002", Outcome::Failed { reason: "render error: bad slot".to_string() }));
        summary.write_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Invoice Number,Status,Output / Error,Backup Rows,Net Amount"));
        assert!(contents.contains("INV001,generated,out/INV001.pdf,2,"));
        assert!(contents.contains("INV002,failed,render error: bad slot,2,"));
        assert!(contents.contains("£1,234.50") || contents.contains("\"£1,234.50\""));
    }
}
