//! Typed records and spreadsheet loading
//!
//! The two input workbooks are parsed into immutable record types by an
//! explicit, validated step: required columns are located by header name up
//! front (a missing column is fatal for the whole file), then each row is
//! converted with the cell coercions below. A row that will not parse is
//! skipped with a warning and reported back to the caller so the run summary
//! can note it.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use tracing::warn;

use crate::error::{Error, Result};
use crate::format::format_accounting_month;

/// One row of the invoice input spreadsheet
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub po_reference: String,
    /// The Line Description column holds the accounting period as a date
    pub accounting_period: NaiveDate,
    pub invoice_amount: f64,
    pub vat_amount: f64,
    pub total: f64,
}

/// One row of the backup detail spreadsheet
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub quote_sent: Option<NaiveDate>,
    pub supplier_quote_ref: String,
    pub client_ref: String,
    pub financial_month: String,
    pub site_name: String,
    pub reviewed_estimate: f64,
    pub po_reference: String,
}

/// A source row that could not be parsed and was skipped
#[derive(Debug, Clone)]
pub struct RowSkip {
    /// 1-based spreadsheet row number
    pub row: usize,
    /// Invoice number or quote ref if one was readable
    pub reference: Option<String>,
    pub reason: String,
}

const INVOICE_COLUMNS: [&str; 8] = [
    "Invoice Number",
    "Invoice Date",
    "Due Date",
    "PO",
    "Line Description",
    "Invoice Amount",
    "VAT Amount",
    "Total",
];

const BACKUP_COLUMNS: [&str; 7] = [
    "Date Quote Sent",
    "Supplier Quote ref.",
    "Client Ref",
    "Financial Month",
    "Site Name",
    "Reviewed Quote/Estimate (£)",
    "PO Order No.",
];

/// Load the invoice input workbook
pub fn load_invoices(path: &Path) -> Result<(Vec<InvoiceRecord>, Vec<RowSkip>)> {
    let rows = read_rows(path)?;
    let columns = map_columns(path, &rows, &INVOICE_COLUMNS)?;

    let mut records: Vec<InvoiceRecord> = Vec::new();
    let mut skips = Vec::new();

    for (i, row) in rows.iter().enumerate().skip(1) {
        let excel_row = i + 1;
        let reference = cell_string(cell(row, columns["Invoice Number"]));
        match parse_invoice_row(row, &columns) {
            Ok(record) => {
                if records.iter().any(|r| r.invoice_number == record.invoice_number) {
                    let reason = format!("duplicate invoice number '{}'", record.invoice_number);
                    warn!(row = excel_row, "{reason}; row skipped");
                    skips.push(RowSkip { row: excel_row, reference, reason });
                } else {
                    records.push(record);
                }
            }
            Err(reason) => {
                warn!(row = excel_row, "{reason}; row skipped");
                skips.push(RowSkip { row: excel_row, reference, reason });
            }
        }
    }

    Ok((records, skips))
}

/// Load the backup detail workbook
pub fn load_backups(path: &Path) -> Result<(Vec<BackupRecord>, Vec<RowSkip>)> {
    let rows = read_rows(path)?;
    let columns = map_columns(path, &rows, &BACKUP_COLUMNS)?;

    let mut records = Vec::new();
    let mut skips = Vec::new();

    for (i, row) in rows.iter().enumerate().skip(1) {
        let excel_row = i + 1;
        match parse_backup_row(row, &columns) {
            Ok(record) => records.push(record),
            Err(reason) => {
                let reference = cell_string(cell(row, columns["Supplier Quote ref."]));
                warn!(row = excel_row, "{reason}; row skipped");
                skips.push(RowSkip { row: excel_row, reference, reason });
            }
        }
    }

    Ok((records, skips))
}

fn read_rows(path: &Path) -> Result<Vec<Vec<Data>>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::SpreadsheetFormat {
            path: path.to_path_buf(),
            reason: "workbook has no sheets".to_string(),
        })??;
    Ok(range.rows().map(|r| r.to_vec()).collect())
}

/// Locate required columns in the header row. Header names are compared
/// trimmed; the source sheets carry stray trailing spaces (`"Site Name "`).
fn map_columns(
    path: &Path,
    rows: &[Vec<Data>],
    required: &[&'static str],
) -> Result<HashMap<&'static str, usize>> {
    let header = rows.first().ok_or_else(|| Error::SpreadsheetFormat {
        path: path.to_path_buf(),
        reason: "spreadsheet is empty".to_string(),
    })?;

    let mut columns = HashMap::new();
    for name in required {
        let index = header.iter().position(|cell| {
            cell.get_string()
                .map(|s| s.trim() == *name)
                .unwrap_or(false)
        });
        match index {
            Some(index) => {
                columns.insert(*name, index);
            }
            None => {
                return Err(Error::SpreadsheetFormat {
                    path: path.to_path_buf(),
                    reason: format!("required column '{name}' not found"),
                })
            }
        }
    }
    Ok(columns)
}

fn parse_invoice_row(
    row: &[Data],
    columns: &HashMap<&'static str, usize>,
) -> std::result::Result<InvoiceRecord, String> {
    let field = |name: &'static str| cell(row, columns[name]);

    Ok(InvoiceRecord {
        invoice_number: cell_string(field("Invoice Number"))
            .ok_or("missing Invoice Number")?,
        invoice_date: cell_date(field("Invoice Date")).ok_or("unparsable Invoice Date")?,
        due_date: cell_date(field("Due Date")).ok_or("unparsable Due Date")?,
        po_reference: cell_string(field("PO")).ok_or("missing PO")?,
        accounting_period: cell_date(field("Line Description"))
            .ok_or("unparsable Line Description date")?,
        invoice_amount: cell_f64(field("Invoice Amount")).ok_or("non-numeric Invoice Amount")?,
        vat_amount: cell_f64(field("VAT Amount")).ok_or("non-numeric VAT Amount")?,
        total: cell_f64(field("Total")).ok_or("non-numeric Total")?,
    })
}

fn parse_backup_row(
    row: &[Data],
    columns: &HashMap<&'static str, usize>,
) -> std::result::Result<BackupRecord, String> {
    let field = |name: &'static str| cell(row, columns[name]);

    Ok(BackupRecord {
        quote_sent: cell_date(field("Date Quote Sent")),
        supplier_quote_ref: cell_string(field("Supplier Quote ref."))
            .ok_or("missing Supplier Quote ref.")?,
        client_ref: cell_string(field("Client Ref")).unwrap_or_default(),
        financial_month: cell_month(field("Financial Month")).unwrap_or_default(),
        site_name: cell_string(field("Site Name")).unwrap_or_default(),
        reviewed_estimate: cell_f64(field("Reviewed Quote/Estimate (£)"))
            .ok_or("non-numeric Reviewed Quote/Estimate")?,
        po_reference: cell_string(field("PO Order No.")).ok_or("missing PO Order No.")?,
    })
}

fn cell(row: &[Data], index: usize) -> &Data {
    row.get(index).unwrap_or(&Data::Empty)
}

/// Coerce a cell to trimmed text. Numeric references (POs exported as
/// numbers) render without a trailing `.0`.
pub(crate) fn cell_string(data: &Data) -> Option<String> {
    match data {
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(format!("{f}")),
        Data::Int(i) => Some(format!("{i}")),
        _ => None,
    }
}

/// Coerce a cell to a number; string cells may carry `£` and separators
pub(crate) fn cell_f64(data: &Data) -> Option<f64> {
    match data {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s
            .trim()
            .trim_start_matches('£')
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    }
}

/// Coerce a cell to a date: Excel datetimes directly, strings via UK
/// day-first or ISO formats
pub(crate) fn cell_date(data: &Data) -> Option<NaiveDate> {
    if let Some(dt) = data.as_datetime() {
        return Some(dt.date());
    }
    let s = match data {
        Data::String(s) => s.trim(),
        _ => return None,
    };
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Normalize a financial-month cell to the `Jan-25` form
pub(crate) fn cell_month(data: &Data) -> Option<String> {
    if let Some(dt) = data.as_datetime() {
        return Some(format_accounting_month(&dt.date()));
    }
    match data {
        Data::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
