//! Configuration loading and path management
//!
//! The config file is JSON with three sections: `paths` (template and output
//! directories), `text_positions` (field name to `[x, y]` pairs in top-left
//! origin coordinates), and `pdf_settings` (pagination capacity and text
//! limits). The loaded object is passed explicitly into each component so
//! nothing depends on ambient state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    /// Field name -> [x, y] in points, measured from the top-left corner
    pub text_positions: HashMap<String, [f64; 2]>,
    #[serde(default)]
    pub pdf_settings: PdfSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory containing the two template PDFs
    pub templates: PathBuf,
    /// Directory receiving generated invoices and the reference spreadsheet
    pub output: PathBuf,
    #[serde(default = "default_front_page_template")]
    pub front_page_template: String,
    #[serde(default = "default_backup_page_template")]
    pub backup_page_template: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfSettings {
    #[serde(default = "default_rows_per_backup_page")]
    pub rows_per_backup_page: u32,
    #[serde(default = "default_max_site_name_chars")]
    pub max_site_name_chars: usize,
    #[serde(default = "default_max_client_ref_chars")]
    pub max_client_ref_chars: usize,
}

fn default_front_page_template() -> String {
    "front_pager.pdf".to_string()
}

fn default_backup_page_template() -> String {
    "blank_template.pdf".to_string()
}

fn default_rows_per_backup_page() -> u32 {
    58
}

fn default_max_site_name_chars() -> usize {
    30
}

fn default_max_client_ref_chars() -> usize {
    20
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            rows_per_backup_page: default_rows_per_backup_page(),
            max_site_name_chars: default_max_site_name_chars(),
            max_client_ref_chars: default_max_client_ref_chars(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that every downstream component depends on
    pub fn validate(&self) -> Result<()> {
        if self.pdf_settings.rows_per_backup_page == 0 {
            return Err(Error::Config(
                "pdf_settings.rows_per_backup_page must be a positive integer".to_string(),
            ));
        }
        if self.text_positions.is_empty() {
            return Err(Error::Config("text_positions is empty".to_string()));
        }
        Ok(())
    }

    /// Path to the front-page template PDF
    pub fn front_page_template(&self) -> PathBuf {
        self.paths.templates.join(&self.paths.front_page_template)
    }

    /// Path to the blank backup-page template PDF
    pub fn backup_page_template(&self) -> PathBuf {
        self.paths.templates.join(&self.paths.backup_page_template)
    }

    /// Output path for a generated invoice, derived from its invoice number
    pub fn invoice_output_path(&self, invoice_number: &str) -> PathBuf {
        self.paths.output.join(format!("{invoice_number}.pdf"))
    }

    /// Look up a text position by field name
    pub fn position(&self, name: &str) -> Result<(f64, f64)> {
        self.text_positions
            .get(name)
            .map(|p| (p[0], p[1]))
            .ok_or_else(|| Error::Render(format!("no text position configured for '{name}'")))
    }
}
