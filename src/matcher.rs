//! Grouping backup rows under invoices by purchase-order reference
//!
//! Matching is exact string equality on the trimmed PO reference. Backup rows
//! keep their spreadsheet order within each group; backup rows whose PO
//! matches no invoice are reported, not fatal.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::data::{BackupRecord, InvoiceRecord};

/// Backup rows grouped by normalized PO reference
#[derive(Debug, Default)]
pub struct BackupGroups {
    groups: HashMap<String, Vec<BackupRecord>>,
    /// Supplier quote refs of rows that matched no invoice
    pub unmatched: Vec<String>,
}

impl BackupGroups {
    /// Ordered backup rows for one invoice; empty when nothing matched
    pub fn for_invoice(&self, invoice: &InvoiceRecord) -> &[BackupRecord] {
        self.groups
            .get(invoice.po_reference.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Join backup rows to invoices on the PO key
pub fn group_backups(invoices: &[InvoiceRecord], backups: &[BackupRecord]) -> BackupGroups {
    let known_pos: HashSet<&str> = invoices.iter().map(|i| i.po_reference.trim()).collect();

    let mut result = BackupGroups::default();
    for backup in backups {
        let key = backup.po_reference.trim();
        if known_pos.contains(key) {
            result
                .groups
                .entry(key.to_string())
                .or_default()
                .push(backup.clone());
        } else {
            warn!(
                po = key,
                quote_ref = backup.supplier_quote_ref.as_str(),
                "backup row matches no invoice"
            );
            result.unmatched.push(backup.supplier_quote_ref.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn invoice(number: &str, po: &str) -> InvoiceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        InvoiceRecord {
            invoice_number: number.to_string(),
            invoice_date: date,
            due_date: date,
            po_reference: po.to_string(),
            accounting_period: date,
            invoice_amount: 100.0,
            vat_amount: 20.0,
            total: 120.0,
        }
    }

    fn backup(quote_ref: &str, po: &str) -> BackupRecord {
        BackupRecord {
            quote_sent: None,
            supplier_quote_ref: quote_ref.to_string(),
            client_ref: "CR1".to_string(),
            financial_month: "Jan-25".to_string(),
            site_name: "Site".to_string(),
            reviewed_estimate: 50.0,
            po_reference: po.to_string(),
        }
    }

    #[test]
    fn test_groups_preserve_row_order() {
        let invoices = vec![invoice("INV001", "PO123")];
        let backups = vec![
            backup("Q3", "PO123"),
            backup("Q1", "PO123"),
            backup("Q2", "PO123"),
        ];
        let groups = group_backups(&invoices, &backups);
        let matched: Vec<&str> = groups
            .for_invoice(&invoices[0])
            .iter()
            .map(|b| b.supplier_quote_ref.as_str())
            .collect();
        assert_eq!(matched, vec!["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn test_trimmed_po_matches() {
        let invoices = vec![invoice("INV001", " PO123 ")];
        let backups = vec![backup("Q1", "PO123  ")];
        let groups = group_backups(&invoices, &backups);
        assert_eq!(groups.for_invoice(&invoices[0]).len(), 1);
        assert!(groups.unmatched.is_empty());
    }

    #[test]
    fn test_unmatched_rows_reported_not_dropped_silently() {
        let invoices = vec![invoice("INV001", "PO123")];
        let backups = vec![backup("Q1", "PO123"), backup("Q9", "PO999")];
        let groups = group_backups(&invoices, &backups);
        assert_eq!(groups.for_invoice(&invoices[0]).len(), 1);
        assert_eq!(groups.unmatched, vec!["Q9".to_string()]);
    }

    #[test]
    fn test_invoice_with_no_matches_gets_empty_group() {
        let invoices = vec![invoice("INV002", "PO555")];
        let groups = group_backups(&invoices, &[]);
        assert!(groups.for_invoice(&invoices[0]).is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let invoices = vec![invoice("INV001", "po123")];
        let backups = vec![backup("Q1", "PO123")];
        let groups = group_backups(&invoices, &backups);
        assert!(groups.for_invoice(&invoices[0]).is_empty());
        assert_eq!(groups.unmatched.len(), 1);
    }
}
