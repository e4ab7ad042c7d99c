//! PDF template rendering and document assembly

pub mod assemble;
pub mod template;

use std::path::Path;

use lopdf::Document;

use crate::error::{Error, Result};

// Re-export commonly used items
pub use assemble::assemble;
pub use template::{backup_page_spans, front_page_spans, Template, TextSpan};

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let doc = Document::load(path)?;
    let count = doc.get_pages().len();
    if count == 0 {
        return Err(Error::Template {
            path: path.to_path_buf(),
            reason: "PDF has no pages".to_string(),
        });
    }
    Ok(count)
}
