//! Template loading and text overlay rendering
//!
//! A `Template` holds one single-page source PDF, opened read-only at
//! startup. Every render works on a fresh in-memory clone: a Helvetica font
//! is registered in the page resources and one content stream is appended
//! placing each text span with `BT`/`Tf`/`Tm`/`Tj` operators. The source
//! document is never mutated, so a later parallel caller cannot corrupt it.
//!
//! Configured coordinates are top-left-origin (matching how the template
//! positions were measured); they are flipped into PDF bottom-left space
//! using the page MediaBox height.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::config::Config;
use crate::data::{BackupRecord, InvoiceRecord};
use crate::error::{Error, Result};
use crate::format::{
    format_accounting_month, format_amount, format_currency, format_date, format_quantity,
    quantity_font_size, truncate, vat_position_key,
};

/// Font size for most front-page fields
const FIELD_FONT_SIZE: f32 = 8.0;
/// Font size for the accounting-month and net-amount fields
const SMALL_FONT_SIZE: f32 = 7.0;
/// Font size for backup detail rows
const BACKUP_FONT_SIZE: f32 = 8.0;
/// Vertical distance between backup detail rows, in points
const BACKUP_LINE_LEADING: f64 = 9.6;

/// One piece of text to overlay, in top-left-origin coordinates
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub x: f64,
    pub y: f64,
    pub size: f32,
    pub text: String,
}

/// A single-page template PDF, loaded once and cloned per render
#[derive(Debug)]
pub struct Template {
    doc: Document,
    page_id: ObjectId,
    page_height: f64,
}

impl Template {
    /// Load a template, failing fast if it is unreadable or has no pages
    pub fn load(path: &Path) -> Result<Template> {
        if !path.exists() {
            return Err(Error::Template {
                path: path.to_path_buf(),
                reason: "template file not found".to_string(),
            });
        }
        let doc = Document::load(path).map_err(|e| Error::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let pages = doc.get_pages();
        let page_id = match pages.values().next() {
            Some(id) => *id,
            None => {
                return Err(Error::Template {
                    path: path.to_path_buf(),
                    reason: "template has no pages".to_string(),
                })
            }
        };
        let page_height = page_height(&doc, page_id);

        Ok(Template { doc, page_id, page_height })
    }

    /// Overlay the given spans on a copy of the template, returning a new
    /// single-page document. Blank spans are skipped.
    pub fn render(&self, spans: &[TextSpan]) -> Result<Document> {
        let mut doc = self.doc.clone();

        let font_id = add_helvetica_font(&mut doc);
        add_font_to_page_resources(&mut doc, self.page_id, font_id)?;

        let content = overlay_content(spans, self.page_height);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        append_content_to_page(&mut doc, self.page_id, content_id)?;

        Ok(doc)
    }
}

/// Read the page height from the MediaBox, falling back to A4
fn page_height(doc: &Document, page_id: ObjectId) -> f64 {
    let media_box = doc
        .get_object(page_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|dict| dict.get(b"MediaBox").ok())
        .and_then(|obj| resolve(doc, obj).as_array().ok().cloned());

    if let Some(values) = media_box {
        let nums: Vec<f64> = values.iter().filter_map(as_f64).collect();
        if nums.len() == 4 {
            return nums[3] - nums[1];
        }
    }
    842.0
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Register Helvetica (one of the 14 standard PDF fonts) with WinAnsi
/// encoding, so sterling signs render as single bytes
fn add_helvetica_font(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Add the font as /F1 in the page's Resources dictionary
fn add_font_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<()> {
    // Resources may be inline or a reference; materialize a local copy
    let resources_dict = {
        let page_obj = doc.get_object(page_id)?;
        let page_dict = page_obj.as_dict()?;
        match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(res_id)) => match doc.get_object(*res_id) {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        }
    };

    let page_obj = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page_obj {
        let mut resources = resources_dict;
        let mut fonts = match resources.get(b"Font") {
            Ok(Object::Dictionary(f)) => f.clone(),
            _ => Dictionary::new(),
        };
        fonts.set("F1", Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));
        page_dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

/// Append a content stream after the page's existing Contents so the overlay
/// draws on top of the template artwork
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content_id: ObjectId) -> Result<()> {
    let page_obj = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page_obj {
        let existing = page_dict.get(b"Contents").ok().cloned();
        match existing {
            Some(Object::Reference(id)) => {
                page_dict.set(
                    "Contents",
                    Object::Array(vec![Object::Reference(id), Object::Reference(content_id)]),
                );
            }
            Some(Object::Array(mut array)) => {
                array.push(Object::Reference(content_id));
                page_dict.set("Contents", Object::Array(array));
            }
            _ => {
                page_dict.set("Contents", Object::Array(vec![Object::Reference(content_id)]));
            }
        }
    }
    Ok(())
}

/// Generate the overlay content stream for a set of spans
fn overlay_content(spans: &[TextSpan], page_height: f64) -> Vec<u8> {
    let mut content = String::from("q\n0 g\n");

    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        let y = page_height - span.y;
        content.push_str("BT\n");
        content.push_str(&format!("/F1 {} Tf\n", span.size));
        content.push_str(&format!("1 0 0 1 {:.2} {:.2} Tm\n", span.x, y));
        content.push('(');
        content.push_str(&escape_pdf_string(&span.text));
        content.push_str(") Tj\nET\n");
    }

    content.push_str("Q\n");
    encode_win_ansi(&content)
}

/// Escape special characters in PDF string literals
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace(['\r', '\n'], " ")
}

/// Encode to single-byte WinAnsi. Latin-1 code points pass through (the
/// sterling sign is 0xA3); anything outside becomes '?'
fn encode_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Build the overlay spans for an invoice's front page
pub fn front_page_spans(invoice: &InvoiceRecord, config: &Config) -> Result<Vec<TextSpan>> {
    let span = |key: &str, size: f32, text: String| -> Result<TextSpan> {
        let (x, y) = config.position(key)?;
        Ok(TextSpan { x, y, size, text })
    };

    let month = format_accounting_month(&invoice.accounting_period);
    let quantity = format_quantity(invoice.invoice_amount);
    let quantity_size = quantity_font_size(&quantity);

    let mut spans = vec![
        span("invoice_reference", FIELD_FONT_SIZE, invoice.invoice_number.clone())?,
        span("invoice_date", FIELD_FONT_SIZE, format_date(&invoice.invoice_date))?,
        span("due_date", FIELD_FONT_SIZE, format_date(&invoice.due_date))?,
        span("po", FIELD_FONT_SIZE, invoice.po_reference.clone())?,
        span("accounting_month_uno", SMALL_FONT_SIZE, month.clone())?,
        span("accounting_month_dos", SMALL_FONT_SIZE, month.clone())?,
        span("accounting_month_tres", SMALL_FONT_SIZE, month)?,
        span("quantity", quantity_size, quantity)?,
        span("net_amount", SMALL_FONT_SIZE, format_currency(invoice.invoice_amount))?,
        span("sub_total", FIELD_FONT_SIZE, format_amount(invoice.invoice_amount))?,
        span("total", FIELD_FONT_SIZE, format_amount(invoice.total))?,
    ];

    // Larger VAT amounts sit in the alternate template slot
    let vat_key = vat_position_key(invoice.vat_amount);
    spans.push(span(vat_key, FIELD_FONT_SIZE, format_amount(invoice.vat_amount))?);

    Ok(spans)
}

/// Build the overlay spans for one backup page. `net_amount` is placed at
/// the `total_two` slot and is only supplied for the last page.
pub fn backup_page_spans(
    rows: &[BackupRecord],
    net_amount: Option<&str>,
    config: &Config,
) -> Result<Vec<TextSpan>> {
    let (quote_x, quote_y) = config.position("bloque_uno")?;
    let (client_x, client_y) = config.position("bloque_two")?;
    let (site_x, site_y) = config.position("bloque_three")?;
    let (estimate_x, estimate_y) = config.position("bloque_four")?;

    let max_site = config.pdf_settings.max_site_name_chars;
    let max_client = config.pdf_settings.max_client_ref_chars;

    let mut spans = Vec::with_capacity(rows.len() * 4 + 1);
    for (i, row) in rows.iter().enumerate() {
        let offset = i as f64 * BACKUP_LINE_LEADING;
        let line = |x: f64, y: f64, text: String| TextSpan {
            x,
            y: y + offset,
            size: BACKUP_FONT_SIZE,
            text,
        };
        spans.push(line(quote_x, quote_y, row.supplier_quote_ref.clone()));
        spans.push(line(client_x, client_y, truncate(&row.client_ref, max_client)));
        spans.push(line(site_x, site_y, truncate(&row.site_name, max_site)));
        spans.push(line(estimate_x, estimate_y, format_currency(row.reviewed_estimate)));
    }

    if let Some(net_amount) = net_amount {
        let (x, y) = config.position("total_two")?;
        spans.push(TextSpan { x, y, size: BACKUP_FONT_SIZE, text: net_amount.to_string() });
    }

    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn test_config() -> Config {
        let json = r#"{
            "paths": { "templates": "t", "output": "o" },
            "text_positions": {
                "invoice_reference": [420.0, 110.0],
                "invoice_date": [420.0, 125.0],
                "due_date": [420.0, 140.0],
                "po": [420.0, 155.0],
                "accounting_month_uno": [60.0, 300.0],
                "accounting_month_dos": [60.0, 320.0],
                "accounting_month_tres": [60.0, 340.0],
                "quantity": [200.0, 300.0],
                "net_amount": [300.0, 300.0],
                "sub_total": [480.0, 560.0],
                "vat": [480.0, 580.0],
                "vat_dos": [470.0, 580.0],
                "total": [480.0, 600.0],
                "bloque_uno": [40.0, 120.0],
                "bloque_two": [160.0, 120.0],
                "bloque_three": [280.0, 120.0],
                "bloque_four": [460.0, 120.0],
                "total_two": [460.0, 700.0]
            }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    fn invoice() -> InvoiceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        InvoiceRecord {
            invoice_number: "INV001".to_string(),
            invoice_date: date,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
            po_reference: "PO123".to_string(),
            accounting_period: date,
            invoice_amount: 12345.0,
            vat_amount: 2469.0,
            total: 14814.0,
        }
    }

    fn backup_row(site: &str, client: &str) -> BackupRecord {
        BackupRecord {
            quote_sent: None,
            supplier_quote_ref: "Q1".to_string(),
            client_ref: client.to_string(),
            financial_month: "Jan-25".to_string(),
            site_name: site.to_string(),
            reviewed_estimate: 1234.5,
            po_reference: "PO123".to_string(),
        }
    }

    #[test]
    fn test_front_page_spans_fields() {
        let spans = front_page_spans(&invoice(), &test_config()).unwrap();
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&"INV001"));
        assert!(texts.contains(&"15/01/2025"));
        assert!(texts.contains(&"14/02/2025"));
        assert!(texts.contains(&"£12,345.00"));
        // accounting month appears three times
        assert_eq!(texts.iter().filter(|t| **t == "Jan-25").count(), 3);
    }

    #[test]
    fn test_front_page_vat_uses_alternate_slot() {
        // 2469.0 has 4 integer digits and is outside (1000, 2000): plain slot
        let spans = front_page_spans(&invoice(), &test_config()).unwrap();
        let vat = spans.iter().find(|s| s.text == "2469.00").unwrap();
        assert_eq!((vat.x, vat.y), (480.0, 580.0));

        let mut inv = invoice();
        inv.vat_amount = 1500.0;
        let spans = front_page_spans(&inv, &test_config()).unwrap();
        let vat = spans.iter().find(|s| s.text == "1500.00").unwrap();
        assert_eq!((vat.x, vat.y), (470.0, 580.0));
    }

    #[test]
    fn test_front_page_missing_position_fails() {
        let mut config = test_config();
        config.text_positions.remove("quantity");
        let err = front_page_spans(&invoice(), &config).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_backup_spans_truncate_to_limits() {
        let config = test_config();
        let long_site = "A very long substation site name well over the cap";
        let long_client = "CLIENTREFERENCE-OVERLONG";
        let spans = backup_page_spans(&[backup_row(long_site, long_client)], None, &config).unwrap();

        let site = spans.iter().find(|s| s.x == 280.0).unwrap();
        assert_eq!(site.text.chars().count(), config.pdf_settings.max_site_name_chars);
        let client = spans.iter().find(|s| s.x == 160.0).unwrap();
        assert_eq!(client.text.chars().count(), config.pdf_settings.max_client_ref_chars);
    }

    #[test]
    fn test_backup_spans_rows_advance_down_page() {
        let config = test_config();
        let rows = vec![backup_row("Site A", "C1"), backup_row("Site B", "C2")];
        let spans = backup_page_spans(&rows, None, &config).unwrap();
        let sites: Vec<&TextSpan> = spans.iter().filter(|s| s.x == 280.0).collect();
        assert_eq!(sites.len(), 2);
        assert!(sites[1].y > sites[0].y);
        assert!((sites[1].y - sites[0].y - BACKUP_LINE_LEADING).abs() < 1e-9);
    }

    #[test]
    fn test_backup_spans_net_amount_only_when_supplied() {
        let config = test_config();
        let rows = vec![backup_row("Site", "C1")];
        let without = backup_page_spans(&rows, None, &config).unwrap();
        assert!(!without.iter().any(|s| s.text == "£99.00"));
        let with = backup_page_spans(&rows, Some("£99.00"), &config).unwrap();
        assert!(with.iter().any(|s| s.text == "£99.00"));
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\d"), "a\\(b\\)c\\\\d");
        assert_eq!(escape_pdf_string("two\nlines"), "two lines");
    }

    #[test]
    fn test_encode_win_ansi_sterling() {
        let bytes = encode_win_ansi("£9");
        assert_eq!(bytes, vec![0xA3, b'9']);
        assert_eq!(encode_win_ansi("€"), vec![b'?']);
    }

    #[test]
    fn test_overlay_content_flips_y_and_skips_blank() {
        let spans = vec![
            TextSpan { x: 10.0, y: 100.0, size: 8.0, text: "hello".to_string() },
            TextSpan { x: 20.0, y: 200.0, size: 8.0, text: String::new() },
        ];
        let content = overlay_content(&spans, 842.0);
        let text = String::from_utf8(content).unwrap();
        assert!(text.contains("1 0 0 1 10.00 742.00 Tm"));
        assert_eq!(text.matches("Tj").count(), 1);
    }

    #[test]
    fn test_load_missing_template() {
        let err = Template::load(&PathBuf::from("missing/front_pager.pdf")).unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }
}
