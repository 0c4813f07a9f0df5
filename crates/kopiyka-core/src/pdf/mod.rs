//! PDF statement import
//!
//! Supported issuers, detected from the text of page 1:
//! - Monobank (`monobank`, `універсал банк`, `universal bank`)
//! - A-Bank (`а-банк`, `акцент-банк`), including its header totals
//!
//! Pages are reduced to glyph and ruling geometry, tables are located with
//! ruled lines first and text alignment second, and every table matching the
//! bank's layout contributes rows to the sign-aware classifier.

mod banks;
mod classify;
mod layout;
mod table;

use std::panic::{self, AssertUnwindSafe};

use pdf_extract::Document;

use crate::error::{Error, Result};
use crate::ingest::ParseContext;
use crate::models::{Bank, BankTotals, ParseResult};

pub use banks::{abank_totals, detect_pdf_bank, is_garbage, TableReader};
pub use classify::{is_person_name, SignAwareClassifier};
pub use layout::{Glyph, LayoutCollector, Orientation, PageLayout, Ruling, Word};
pub use table::{cell, extract_tables, extract_tables_with_fallback, Table};

/// Parse a PDF statement
pub fn parse_pdf(content: &[u8], ctx: &ParseContext<'_>) -> Result<ParseResult> {
    let pages = load_layouts(content)?;
    parse_layouts(&pages, ctx)
}

/// Detect the issuing bank from page 1 only
pub fn detect_bank(content: &[u8]) -> Result<Bank> {
    let pages = collect(&open(content)?, Some(1))?;
    let first = pages
        .first()
        .ok_or_else(|| Error::InvalidData("PDF has no pages".to_string()))?;
    detect_pdf_bank(&first.text()).ok_or_else(unsupported)
}

/// Geometry of every page in the document
pub fn load_layouts(content: &[u8]) -> Result<Vec<PageLayout>> {
    let pages = collect(&open(content)?, None)?;
    tracing::debug!("Loaded {} PDF pages", pages.len());
    Ok(pages)
}

/// Run the PDF pipeline over already collected pages
pub fn parse_layouts(pages: &[PageLayout], ctx: &ParseContext<'_>) -> Result<ParseResult> {
    let first = pages
        .first()
        .ok_or_else(|| Error::InvalidData("PDF has no pages".to_string()))?;
    let header = first.text();
    let bank = detect_pdf_bank(&header).ok_or_else(unsupported)?;

    let bank_totals = match bank {
        Bank::ABank => {
            let totals = abank_totals(&header);
            if totals.is_empty() {
                tracing::debug!("No period totals found in the A-Bank header");
            }
            totals
        }
        _ => BankTotals::default(),
    };

    let reader = TableReader::new(
        bank,
        ctx.rules,
        ctx.config.garbage_ratio,
        ctx.ingested_at,
    );
    let classifier = SignAwareClassifier::new(ctx.categorizer());

    let mut rows = Vec::new();
    let mut skipped = 0;

    for page in pages {
        let tables =
            extract_tables_with_fallback(page, &ctx.config.lines_table, &ctx.config.text_table);
        for table in &tables {
            if !reader.accepts(table) {
                tracing::debug!(
                    "Ignoring {}x{} table on page {}",
                    table.len(),
                    table.column_count(),
                    page.number
                );
                continue;
            }
            let (raw_rows, unreadable) = reader.read(table);
            skipped += unreadable;

            for raw in raw_rows {
                if ctx.is_below_minimum(raw.amount) {
                    skipped += 1;
                    continue;
                }
                let verdict = classifier.classify(raw.amount, &raw.description, &raw.mcc);
                rows.push(ctx.assemble(&raw, bank, verdict, Some(raw.amount < 0.0)));
            }
        }
    }

    tracing::debug!(
        "Parsed {} {} PDF transactions ({} skipped)",
        rows.len(),
        bank,
        skipped
    );

    Ok(ParseResult {
        rows,
        skipped,
        bank,
        bank_totals: Some(bank_totals),
    })
}

fn unsupported() -> Error {
    Error::UnsupportedFormat("PDF statement from an unsupported bank".to_string())
}

fn open(content: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(content)
        .map_err(|e| Error::Pdf(format!("Failed to load PDF: {}", e)))?;
    if doc.is_encrypted() {
        // Statements are often encrypted with an empty user password
        doc.decrypt("")
            .map_err(|e| Error::Pdf(format!("Failed to decrypt PDF: {}", e)))?;
    }
    if doc.get_pages().is_empty() {
        return Err(Error::InvalidData("PDF has no pages".to_string()));
    }
    Ok(doc)
}

/// Walk the content streams of one page or all pages
fn collect(doc: &Document, page: Option<u32>) -> Result<Vec<PageLayout>> {
    let mut collector = LayoutCollector::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match page {
        Some(number) => pdf_extract::output_doc_page(doc, &mut collector, number),
        None => pdf_extract::output_doc(doc, &mut collector),
    }));

    match outcome {
        Ok(Ok(())) => Ok(collector.into_pages()),
        Ok(Err(e)) => Err(Error::Pdf(format!("Failed to read PDF content: {}", e))),
        Err(_) => Err(Error::Pdf("Malformed PDF content stream".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlowType;
    use crate::config::TableSettings;
    use crate::test_utils::{
        abank_page, monobank_page, monobank_pdf, simple_pdf, StatementLine, TestContext,
        PDF_HEADER,
    };
    use chrono::NaiveDate;

    fn english_statement() -> Vec<u8> {
        monobank_pdf(&[
            StatementLine::new("02.01.2026 12:30", "SILPO", "5411", "-150.00"),
            StatementLine::new("03.01.2026 09:15", "ATM 1234", "6011", "-1 000.00"),
            StatementLine::new("04.01.2026 18:00", "Salary March", "", "25 000.00"),
        ])
    }

    /// Harness that recognizes the English date header of [`monobank_pdf`]
    fn english_harness() -> TestContext {
        let mut harness = TestContext::new();
        harness.rules.pdf.date_headers = vec![PDF_HEADER[0].to_string()];
        harness
    }

    #[test]
    fn test_monobank_pages() {
        let page = monobank_page(&[
            StatementLine::new("02.01.2026 12:30", "Сільпо", "5411", "-150.00"),
            StatementLine::new("03.01.2026 09:00", "Іван Петренко", "4829", "-300.00"),
            StatementLine::new("04.01.2026 18:00", "Зарплата", "", "25 000.00"),
        ]);
        let harness = TestContext::new();
        let result = parse_layouts(&[page], &harness.context("u")).unwrap();

        assert_eq!(result.bank, Bank::Monobank);
        assert_eq!(result.bank_totals, Some(BankTotals::default()));
        assert_eq!(result.skipped, 0);
        assert_eq!(result.rows.len(), 3);

        let grocery = &result.rows[0];
        assert_eq!(grocery.flow_type, FlowType::Expense);
        assert_eq!(grocery.metadata.raw_category, "Supermarkets");
        assert_eq!(grocery.metadata.is_outgoing, Some(true));
        assert_eq!(grocery.amount, 150.0);

        let person = &result.rows[1];
        assert_eq!(person.flow_type, FlowType::Transfer);
        assert_eq!(person.metadata.raw_category, "Transfer (to person)");
        assert_eq!(person.metadata.mcc, "4829");

        let salary = &result.rows[2];
        assert_eq!(salary.flow_type, FlowType::Income);
        assert_eq!(salary.amount, 25000.0);
        assert_eq!(salary.metadata.is_outgoing, Some(false));
    }

    #[test]
    fn test_abank_pages_with_totals() {
        let page = abank_page(
            &[
                "Період: 01.01.2026 - 31.01.2026",
                "Сума витрат за період: 150.00 UAH",
                "Сума зарахувань за період: 1 812.00 UAH",
            ],
            &[
                StatementLine::new("31.01.2026 08:48", "Сільпо", "5411", "-150.00"),
                StatementLine::new("31.01.2026 09:10", "Повернення коштів", "6012", "1 812.00"),
            ],
        );
        let harness = TestContext::new();
        let result = parse_layouts(&[page], &harness.context("u")).unwrap();

        assert_eq!(result.bank, Bank::ABank);
        let totals = result.bank_totals.clone().unwrap();
        assert_eq!(totals.expenses, Some(150.0));
        assert_eq!(totals.income, Some(1812.0));
        assert_eq!(totals.period_to.as_deref(), Some("31.01.2026"));

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].metadata.raw_category, "Supermarkets");
        assert_eq!(result.rows[1].flow_type, FlowType::Income);
        assert_eq!(result.rows[1].metadata.raw_category, "Other income");
    }

    #[test]
    fn test_tiny_rows_are_skipped() {
        let page = monobank_page(&[
            StatementLine::new("02.01.2026", "Кава", "5814", "-0.00"),
            StatementLine::new("02.01.2026", "Кава", "5814", "-45.00"),
        ]);
        let harness = TestContext::new();
        let result = parse_layouts(&[page], &harness.context("u")).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_unknown_bank_is_unsupported() {
        let mut page = monobank_page(&[]);
        page.glyphs.retain(|g| g.top > 60.0);
        let harness = TestContext::new();
        let err = parse_layouts(&[page], &harness.context("u")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_no_pages_is_invalid() {
        let harness = TestContext::new();
        let err = parse_layouts(&[], &harness.context("u")).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_load_real_pdf() {
        let pdf = simple_pdf("monobank statement");
        let pages = load_layouts(&pdf).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text().to_lowercase().contains("monobank"));
        assert!(pages[0].rulings.len() >= 4);
        assert_eq!(detect_bank(&pdf).unwrap(), Bank::Monobank);
    }

    #[test]
    fn test_real_pdf_from_unknown_bank() {
        let pdf = simple_pdf("Some other bank");
        let err = detect_bank(&pdf).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let harness = TestContext::new();
        let err = parse_pdf(&pdf, &harness.context("u")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_garbage_bytes_are_pdf_errors() {
        let err = load_layouts(b"%PDF-1.4 this is not a pdf").unwrap_err();
        assert!(matches!(err, Error::Pdf(_)));
    }

    #[test]
    fn test_real_pdf_grid_becomes_table_cells() {
        let pages = load_layouts(&english_statement()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].rulings.len(), 4 + 11);

        let tables = extract_tables(&pages[0], &TableSettings::lines());
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.len(), 4);
        assert_eq!(table.column_count(), 10);

        let rows: Vec<Vec<&str>> = table
            .rows
            .iter()
            .map(|row| (0..4).map(|i| cell(row, i)).collect())
            .collect();
        assert_eq!(rows[0], PDF_HEADER.to_vec());
        assert_eq!(rows[1], vec!["02.01.2026 12:30", "SILPO", "5411", "-150.00"]);
        assert_eq!(rows[2], vec!["03.01.2026 09:15", "ATM 1234", "6011", "-1 000.00"]);
        assert_eq!(rows[3], vec!["04.01.2026 18:00", "Salary March", "", "25 000.00"]);
    }

    #[test]
    fn test_parse_real_pdf_statement() {
        let harness = english_harness();
        let result = parse_pdf(&english_statement(), &harness.context("u")).unwrap();

        assert_eq!(result.bank, Bank::Monobank);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.rows.len(), 3);

        let grocery = &result.rows[0];
        assert_eq!(grocery.amount, 150.0);
        assert_eq!(grocery.description.as_deref(), Some("SILPO"));
        assert_eq!(grocery.flow_type, FlowType::Expense);
        assert_eq!(grocery.metadata.raw_category, "Supermarkets");
        assert_eq!(grocery.category_id.as_deref(), Some("exp-supermarkets"));
        assert_eq!(grocery.metadata.is_outgoing, Some(true));
        assert_eq!(
            grocery.transaction_date,
            NaiveDate::from_ymd_opt(2026, 1, 2)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap()
        );

        let cash = &result.rows[1];
        assert_eq!(cash.amount, 1000.0);
        assert_eq!(cash.description.as_deref(), Some("ATM 1234"));
        assert_eq!(cash.flow_type, FlowType::Transfer);
        assert_eq!(cash.metadata.raw_category, "Transfer (other)");
        assert_eq!(cash.metadata.mcc, "6011");

        let salary = &result.rows[2];
        assert_eq!(salary.amount, 25000.0);
        assert_eq!(salary.description.as_deref(), Some("Salary March"));
        assert_eq!(salary.flow_type, FlowType::Income);
        assert_eq!(salary.metadata.raw_category, "Salary");
        assert_eq!(salary.metadata.is_outgoing, Some(false));
    }

    #[test]
    fn test_real_pdf_table_needs_known_date_header() {
        // Default rules only know the Ukrainian header
        let harness = TestContext::new();
        let result = parse_pdf(&english_statement(), &harness.context("u")).unwrap();
        assert_eq!(result.bank, Bank::Monobank);
        assert!(result.rows.is_empty());
        assert_eq!(result.skipped, 0);
    }
}
