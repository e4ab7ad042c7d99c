//! Error types for the invoice generation library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the invoice generation library
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing configuration; fatal to the whole run
    #[error("configuration error: {0}")]
    Config(String),

    /// Input workbook violates the expected schema
    #[error("spreadsheet format error in {}: {reason}", .path.display())]
    SpreadsheetFormat { path: PathBuf, reason: String },

    /// Template unreadable or structurally unusable; fatal to the run
    #[error("template error: {}: {reason}", .path.display())]
    Template { path: PathBuf, reason: String },

    /// Overlay failure for one invoice (bad coordinate key, unusable page)
    #[error("render error: {0}")]
    Render(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Workbook parsing error
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    /// Config file parsing error
    #[error("invalid config JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    /// Reference spreadsheet write error
    #[error("summary export error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// No invoice rows could be read at all
    #[error("no invoices loaded; nothing to generate")]
    NoInvoices,
}
