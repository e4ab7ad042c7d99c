//! Splitting a backup group into fixed-capacity pages

use crate::data::BackupRecord;
use crate::error::{Error, Result};

/// Partition a backup group into consecutive pages of at most `capacity`
/// rows, preserving order. The last page may be partial; an empty group
/// yields zero pages.
pub fn paginate(rows: &[BackupRecord], capacity: u32) -> Result<Vec<&[BackupRecord]>> {
    if capacity == 0 {
        return Err(Error::Config(
            "rows_per_backup_page must be a positive integer".to_string(),
        ));
    }
    Ok(rows.chunks(capacity as usize).collect())
}
