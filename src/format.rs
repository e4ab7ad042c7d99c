//! Text formatting for overlaid fields
//!
//! Small pure helpers shared by the front-page and backup-page renderers.
//! Amounts are sterling with two decimal places; dates use UK day-first
//! formatting; accounting months use the `Jan-25` form the templates expect.

use chrono::NaiveDate;

/// Format a date as `dd/mm/YYYY`
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Format a date as an accounting month, e.g. `Jan-25`
pub fn format_accounting_month(date: &NaiveDate) -> String {
    date.format("%b-%y").to_string()
}

/// Format an amount with two decimal places and no separators, e.g. `1234.56`
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Format an amount as sterling with thousands separators, e.g. `£1,234.56`
pub fn format_currency(amount: f64) -> String {
    let plain = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*d);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}£{grouped}.{frac_part}")
}

/// Format the quantity field: amount / 1000 at five decimal places with
/// trailing zeros trimmed
pub fn format_quantity(invoice_amount: f64) -> String {
    let quantity = invoice_amount / 1000.0;
    let fixed = format!("{quantity:.5}");
    fixed.trim_end_matches('0').to_string()
}

/// Font size for the quantity field; long values drop to a smaller size so
/// they stay inside the template cell
pub fn quantity_font_size(quantity: &str) -> f32 {
    if quantity.len() > 7 {
        6.4
    } else {
        7.0
    }
}

/// Position key for the VAT amount. Five-digit amounts and amounts between
/// 1000 and 2000 land on the alternate slot of the template.
pub fn vat_position_key(vat_amount: f64) -> &'static str {
    let rounded = (vat_amount * 100.0).round() / 100.0;
    let integer_digits = rounded.abs().trunc().to_string().len();

    if integer_digits == 5 || (rounded > 1000.0 && rounded < 2000.0) {
        "vat_dos"
    } else {
        "vat"
    }
}

/// Cut a value at `max_chars` characters, no ellipsis
pub fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(format_date(&date), "31/01/2025");
    }

    #[test]
    fn test_format_accounting_month() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(format_accounting_month(&date), "Jan-25");
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(format_accounting_month(&date), "Dec-24");
    }

    #[test]
    fn test_format_currency_grouping() {
        assert_eq!(format_currency(0.0), "£0.00");
        assert_eq!(format_currency(999.9), "£999.90");
        assert_eq!(format_currency(1234.56), "£1,234.56");
        assert_eq!(format_currency(1_234_567.891), "£1,234,567.89");
        assert_eq!(format_currency(-45.5), "-£45.50");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234.5), "1234.50");
        assert_eq!(format_amount(0.125), "0.13");
    }

    #[test]
    fn test_format_quantity_trims_zeros() {
        // 12345.0 / 1000 = 12.345
        assert_eq!(format_quantity(12345.0), "12.345");
        // 1000.0 / 1000 = 1.00000 -> "1."
        assert_eq!(format_quantity(1000.0), "1.");
        assert_eq!(format_quantity(1234.56), "1.23456");
    }

    #[test]
    fn test_quantity_font_size() {
        assert_eq!(quantity_font_size("1.2345"), 7.0);
        assert_eq!(quantity_font_size("12345.67"), 6.4);
    }

    #[test]
    fn test_vat_position_key() {
        assert_eq!(vat_position_key(999.99), "vat");
        assert_eq!(vat_position_key(1500.0), "vat_dos");
        assert_eq!(vat_position_key(2500.0), "vat");
        assert_eq!(vat_position_key(12345.0), "vat_dos");
        assert_eq!(vat_position_key(0.0), "vat");
    }

    #[test]
    fn test_truncate_at_limit() {
        assert_eq!(truncate("Substation North Gate 14B extension", 20), "Substation North Gat");
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("short", 20).chars().count(), 5);
        // multi-byte safe
        assert_eq!(truncate("café terrace", 5), "café ");
    }
}
