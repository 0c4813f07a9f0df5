//! Test utilities for kopiyka-core
//!
//! Fixtures shared by unit and integration tests: a sample category catalog,
//! a parse context with a pinned ingestion time, synthetic PDF page layouts
//! and small real PDF documents.

use chrono::{NaiveDate, NaiveDateTime};
use pdf_extract::content::{Content, Operation};
use pdf_extract::{Dictionary, Document, Object, Stream};

use crate::config::{IngestConfig, KopiykaConfig};
use crate::ingest::ParseContext;
use crate::models::{CategoryRef, FlowType};
use crate::pdf::{Glyph, PageLayout, Ruling};
use crate::rules::RuleSet;

/// Horizontal advance of each glyph from [`glyph_run`]
pub const GLYPH_WIDTH: f64 = 6.0;
/// Height of each glyph from [`glyph_run`]
pub const GLYPH_HEIGHT: f64 = 8.0;

/// A catalog with one category per engine label plus a few merchants
pub fn sample_categories() -> Vec<CategoryRef> {
    vec![
        CategoryRef::new("exp-supermarkets", "Supermarkets", FlowType::Expense),
        CategoryRef::new("exp-restaurants", "Restaurants", FlowType::Expense),
        CategoryRef::new("exp-transport", "Taxi/Public transport", FlowType::Expense),
        CategoryRef::new("exp-other", "Other", FlowType::Expense),
        CategoryRef::new("inc-salary", "Salary", FlowType::Income),
        CategoryRef::new("inc-other", "Other income", FlowType::Income),
        CategoryRef::new("tr-other", "Transfer (other)", FlowType::Transfer),
        CategoryRef::new("tr-person", "Transfer (to person)", FlowType::Transfer),
        CategoryRef::new("tr-savings", "Investments/Savings", FlowType::Transfer),
    ]
}

/// Owns everything a [`ParseContext`] borrows
pub struct TestContext {
    pub config: IngestConfig,
    pub rules: RuleSet,
    pub categories: Vec<CategoryRef>,
    /// Pinned so undated rows are predictable
    pub ingested_at: NaiveDateTime,
}

impl TestContext {
    pub fn new() -> Self {
        let config = KopiykaConfig::embedded().expect("embedded config parses");
        Self {
            config: config.ingest,
            rules: config.rules,
            categories: sample_categories(),
            ingested_at: NaiveDate::from_ymd_opt(2026, 2, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .expect("valid date"),
        }
    }

    pub fn context<'a>(&'a self, user_id: &'a str) -> ParseContext<'a> {
        ParseContext {
            config: &self.config,
            rules: &self.rules,
            user_id,
            categories: &self.categories,
            ingested_at: self.ingested_at,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One glyph per character, left to right from `x`, tops at `top`
///
/// Spaces become blank glyphs so words split the way rendered text does.
pub fn glyph_run(text: &str, x: f64, top: f64) -> Vec<Glyph> {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let x0 = x + i as f64 * GLYPH_WIDTH;
            Glyph::new(c.to_string(), x0, top, x0 + GLYPH_WIDTH, top + GLYPH_HEIGHT)
        })
        .collect()
}

/// Rulings of a full grid with its top-left corner at (`x`, `top`)
pub fn ruled_grid(x: f64, top: f64, widths: &[f64], heights: &[f64]) -> Vec<Ruling> {
    let right = x + widths.iter().sum::<f64>();
    let bottom = top + heights.iter().sum::<f64>();

    let mut rulings = Vec::new();
    let mut y = top;
    rulings.push(Ruling::horizontal(y, x, right));
    for h in heights {
        y += h;
        rulings.push(Ruling::horizontal(y, x, right));
    }
    let mut cx = x;
    rulings.push(Ruling::vertical(cx, top, bottom));
    for w in widths {
        cx += w;
        rulings.push(Ruling::vertical(cx, top, bottom));
    }
    rulings
}

/// One transaction as printed in a statement table
#[derive(Debug, Clone)]
pub struct StatementLine {
    pub date: String,
    pub description: String,
    pub mcc: String,
    pub amount: String,
}

impl StatementLine {
    pub fn new(date: &str, description: &str, mcc: &str, amount: &str) -> Self {
        Self {
            date: date.to_string(),
            description: description.to_string(),
            mcc: mcc.to_string(),
            amount: amount.to_string(),
        }
    }
}

const ROW_HEIGHT: f64 = 20.0;
const TABLE_LEFT: f64 = 30.0;

/// Lay out a ruled table whose rows are given cell by cell
fn ruled_table(page: &mut PageLayout, top: f64, widths: &[f64], rows: &[Vec<String>]) {
    let heights = vec![ROW_HEIGHT; rows.len()];
    page.rulings
        .extend(ruled_grid(TABLE_LEFT, top, widths, &heights));

    for (r, row) in rows.iter().enumerate() {
        let y = top + r as f64 * ROW_HEIGHT + (ROW_HEIGHT - GLYPH_HEIGHT) / 2.0;
        let mut x = TABLE_LEFT;
        for (text, width) in row.iter().zip(widths) {
            page.glyphs.extend(glyph_run(text, x + 2.0, y));
            x += width;
        }
    }
}

/// A Monobank statement page: bank name at the top, 10-column ruled table
pub fn monobank_page(lines: &[StatementLine]) -> PageLayout {
    let mut page = PageLayout::new(1, 595.0, 842.0);
    page.glyphs
        .extend(glyph_run("monobank | Universal Bank", TABLE_LEFT, 40.0));

    let widths = [100.0, 130.0, 40.0, 70.0, 30.0, 30.0, 30.0, 30.0, 30.0, 30.0];
    let mut rows = vec![vec![
        "Дата".to_string(),
        "Деталі".to_string(),
        "MCC".to_string(),
        "Сума".to_string(),
    ]];
    rows.extend(lines.iter().map(|l| {
        vec![
            l.date.clone(),
            l.description.clone(),
            l.mcc.clone(),
            l.amount.clone(),
        ]
    }));
    ruled_table(&mut page, 100.0, &widths, &rows);
    page
}

/// An A-Bank statement page: header lines, then an 11-column ruled table
pub fn abank_page(header: &[&str], lines: &[StatementLine]) -> PageLayout {
    let mut page = PageLayout::new(1, 595.0, 842.0);
    let mut y = 20.0;
    for text in std::iter::once(&"А-Банк").chain(header) {
        page.glyphs.extend(glyph_run(text, TABLE_LEFT, y));
        y += 15.0;
    }

    let widths = [
        100.0, 40.0, 130.0, 40.0, 70.0, 25.0, 25.0, 25.0, 25.0, 25.0, 25.0,
    ];
    let mut rows = vec![vec![
        "Дата".to_string(),
        "Картка".to_string(),
        "Опис".to_string(),
        "MCC".to_string(),
        "Сума".to_string(),
    ]];
    rows.extend(lines.iter().map(|l| {
        vec![
            l.date.clone(),
            "*1234".to_string(),
            l.description.clone(),
            l.mcc.clone(),
            l.amount.clone(),
        ]
    }));
    ruled_table(&mut page, y + 20.0, &widths, &rows);
    page
}

/// A one-page PDF with an ASCII line of Courier text and a stroked box
pub fn simple_pdf(text: &str) -> Vec<u8> {
    let mut operations = text_at(text, 50, 780, 12);
    operations.extend([
        Operation::new(
            "re",
            vec![
                Object::Integer(50),
                Object::Integer(700),
                Object::Integer(200),
                Object::Integer(40),
            ],
        ),
        Operation::new("S", vec![]),
    ]);
    single_page_pdf(operations)
}

/// Header cells of [`monobank_pdf`]; Courier has no Cyrillic glyphs
pub const PDF_HEADER: [&str; 4] = ["Date", "Details", "MCC", "Amount"];

/// A real Monobank-style PDF: title line, then a stroked 10-column grid with
/// [`PDF_HEADER`] and one row per statement line, all in ASCII Courier
pub fn monobank_pdf(lines: &[StatementLine]) -> Vec<u8> {
    const PAGE_TOP: i64 = 842;
    const LEFT: i64 = 30;
    const GRID_TOP: i64 = 760;
    const ROW: i64 = 20;
    const FONT_SIZE: i64 = 10;
    let widths: [i64; 10] = [120, 110, 40, 70, 30, 30, 30, 30, 30, 30];

    let mut rows = vec![PDF_HEADER.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
    rows.extend(lines.iter().map(|l| {
        vec![
            l.date.clone(),
            l.description.clone(),
            l.mcc.clone(),
            l.amount.clone(),
        ]
    }));

    let mut operations = text_at("monobank | Universal Bank", LEFT, PAGE_TOP - 40, 12);

    for (r, row) in rows.iter().enumerate() {
        let baseline = GRID_TOP - r as i64 * ROW - 14;
        let mut x = LEFT;
        for (text, width) in row.iter().zip(widths) {
            if !text.is_empty() {
                operations.extend(text_at(text, x + 3, baseline, FONT_SIZE));
            }
            x += width;
        }
    }

    let right = LEFT + widths.iter().sum::<i64>();
    let bottom = GRID_TOP - rows.len() as i64 * ROW;
    for r in 0..=rows.len() as i64 {
        let y = GRID_TOP - r * ROW;
        operations.extend(segment((LEFT, y), (right, y)));
    }
    let mut x = LEFT;
    operations.extend(segment((x, GRID_TOP), (x, bottom)));
    for width in widths {
        x += width;
        operations.extend(segment((x, GRID_TOP), (x, bottom)));
    }
    operations.push(Operation::new("S", vec![]));

    single_page_pdf(operations)
}

fn text_at(text: &str, x: i64, y: i64, size: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(size)],
        ),
        Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn segment(from: (i64, i64), to: (i64, i64)) -> [Operation; 2] {
    [
        Operation::new("m", vec![Object::Integer(from.0), Object::Integer(from.1)]),
        Operation::new("l", vec![Object::Integer(to.0), Object::Integer(to.1)]),
    ]
}

/// Wrap content operations in an A4 page with Courier as font `F1`
fn single_page_pdf(operations: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Courier".to_vec()));
    let font_id = doc.add_object(font);

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(resources);

    let content = Content { operations };
    let stream = Stream::new(
        Dictionary::new(),
        content.encode().expect("content encodes"),
    );
    let content_id = doc.add_object(stream);

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(page);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    pages.set("Resources", Object::Reference(resources_id));
    pages.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ]),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory PDF saves");
    bytes
}
