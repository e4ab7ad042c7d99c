//! Invoice Mill Library
//!
//! A batch invoice PDF generator. This library provides functionality to:
//! - Load invoice line items and supporting backup detail from .xlsx files
//! - Group backup rows under each invoice's purchase-order reference
//! - Paginate backup rows onto fixed-capacity template pages
//! - Overlay computed text onto PDF templates at configured coordinates
//! - Concatenate the rendered pages into one output PDF per invoice
//! - Emit a reference spreadsheet summarizing the run
//!
//! # Example
//!
//! ```no_run
//! use invoice_mill::config::Config;
//! use invoice_mill::run::Pipeline;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("config.json")).expect("config");
//! let mut pipeline = Pipeline::new(config).expect("templates");
//! pipeline.load_invoices(Path::new("invoices.xlsx")).expect("invoices");
//! pipeline.load_backups(Path::new("backup.xlsx")).expect("backups");
//! let summary = pipeline.generate_all().expect("run");
//! println!("{} invoices processed", summary.len());
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod format;
pub mod matcher;
pub mod paginate;
pub mod pdf;
pub mod run;

// Re-export commonly used items
pub use error::{Error, Result};
