//! Bank-specific PDF statement layouts
//!
//! A-Bank: 11-column transaction table, date / description / MCC / amount in
//! cells 0, 2, 3 and 4, and period totals in the page-1 header.
//!
//! Monobank: 10-column table whose first header cell names the date column
//! (`Дата` unless the rules say otherwise), date / description / MCC / amount
//! in cells 0 to 3.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::table::{cell, Table};
use crate::models::{Bank, BankTotals, RawRow};
use crate::normalize::{parse_spaced_amount, parse_statement_date};
use crate::rules::{Labels, RuleSet};

const MONOBANK_MARKERS: &[&str] = &["monobank", "універсал банк", "universal bank"];
const ABANK_MARKERS: &[&str] = &["а-банк", "акцент-банк"];

const ABANK_COLUMNS: usize = 11;
const MONOBANK_COLUMNS: usize = 10;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}").expect("valid regex"))
}

fn mcc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{3,4}").expect("valid regex"))
}

fn total_re(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){}[:\s]+([\d\s]+[.,]\d{{2}})\s*UAH", label)).expect("valid regex")
}

fn totals_res() -> &'static [Regex; 4] {
    static RE: OnceLock<[Regex; 4]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            total_re("Сума витрат за період"),
            total_re("Сума зарахувань за період"),
            total_re("Баланс на початок періоду"),
            total_re("Баланс на кінець періоду"),
        ]
    })
}

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Період[:\s]+(\d{2}\.\d{2}\.\d{4})\s*[-–]\s*(\d{2}\.\d{2}\.\d{4})")
            .expect("valid regex")
    })
}

/// Identify the issuing bank from the text of page 1
///
/// Monobank markers are checked first; `None` when neither bank is named.
pub fn detect_pdf_bank(first_page_text: &str) -> Option<Bank> {
    let text = first_page_text.to_lowercase();
    if MONOBANK_MARKERS.iter().any(|m| text.contains(m)) {
        Some(Bank::Monobank)
    } else if ABANK_MARKERS.iter().any(|m| text.contains(m)) {
        Some(Bank::ABank)
    } else {
        None
    }
}

/// Whether extracted text is mostly unreadable glyphs
///
/// Empty text counts as unreadable.
pub fn is_garbage(text: &str, max_ratio: f64) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let bad = text
        .chars()
        .filter(|&c| c < ' ' || matches!(c, '\u{FFFD}' | '•' | '□' | '■'))
        .count();
    bad as f64 / total as f64 > max_ratio
}

/// Period totals from the A-Bank page-1 header
///
/// Fields whose line is missing or unparseable stay `None`.
pub fn abank_totals(first_page_text: &str) -> BankTotals {
    let [expenses, income, balance_start, balance_end] = totals_res();
    let amount = |re: &Regex| {
        re.captures(first_page_text)
            .and_then(|c| c[1].replace(' ', "").replace(',', ".").parse::<f64>().ok())
    };

    let mut totals = BankTotals {
        expenses: amount(expenses),
        income: amount(income),
        balance_start: amount(balance_start),
        balance_end: amount(balance_end),
        ..BankTotals::default()
    };
    if let Some(c) = period_re().captures(first_page_text) {
        totals.period_from = Some(c[1].to_string());
        totals.period_to = Some(c[2].to_string());
    }
    totals
}

/// Reads transaction rows out of one bank's statement tables
#[derive(Debug, Clone, Copy)]
pub struct TableReader<'a> {
    bank: Bank,
    labels: &'a Labels,
    date_headers: &'a [String],
    garbage_ratio: f64,
    /// Used when a date cell cannot be parsed
    fallback_date: NaiveDateTime,
}

impl<'a> TableReader<'a> {
    pub fn new(bank: Bank, rules: &'a RuleSet, garbage_ratio: f64, fallback_date: NaiveDateTime) -> Self {
        Self {
            bank,
            labels: &rules.labels,
            date_headers: &rules.pdf.date_headers,
            garbage_ratio,
            fallback_date,
        }
    }

    /// Whether a table is this bank's transaction table
    pub fn accepts(&self, table: &Table) -> bool {
        if table.len() < 2 {
            return false;
        }
        match self.bank {
            Bank::ABank => {
                table.column_count() == ABANK_COLUMNS
                    && table.rows[1..table.len().min(4)].iter().any(|row| {
                        row.len() >= 5
                            && date_re().is_match(cell(row, 0))
                            && mcc_re().is_match(cell(row, 3))
                    })
            }
            Bank::Monobank => {
                table.column_count() == MONOBANK_COLUMNS && self.is_date_header(cell(&table.rows[0], 0))
            }
            _ => false,
        }
    }

    /// Raw rows of an accepted table plus the number of rows skipped
    ///
    /// The first row is the header and is neither read nor counted.
    pub fn read(&self, table: &Table) -> (Vec<RawRow>, usize) {
        let mut rows = Vec::new();
        let mut skipped = 0;
        for row in table.rows.iter().skip(1) {
            let parsed = match self.bank {
                Bank::ABank => self.abank_row(row),
                Bank::Monobank => self.monobank_row(row),
                _ => None,
            };
            match parsed {
                Some(raw) => rows.push(raw),
                None => skipped += 1,
            }
        }
        (rows, skipped)
    }

    fn is_date_header(&self, text: &str) -> bool {
        self.date_headers.iter().any(|h| text.contains(h.as_str()))
    }

    fn abank_row(&self, row: &[Option<String>]) -> Option<RawRow> {
        if row.len() < 5 {
            return None;
        }
        let date = cell(row, 0);
        if !date_re().is_match(date) {
            return None;
        }
        let amount = parse_spaced_amount(cell(row, 4))?;

        let mut description = cell(row, 2).to_string();
        if is_garbage(&description, self.garbage_ratio) {
            description.clear();
        }

        Some(RawRow {
            date: parse_statement_date(date).unwrap_or(self.fallback_date),
            amount,
            description,
            mcc: cell(row, 3).to_string(),
        })
    }

    fn monobank_row(&self, row: &[Option<String>]) -> Option<RawRow> {
        if row.len() < 4 {
            return None;
        }
        let date = cell(row, 0);
        if date.is_empty() || self.is_date_header(date) {
            return None;
        }
        let amount = parse_spaced_amount(cell(row, 3))?;
        let mcc = cell(row, 2).to_string();

        let mut description = cell(row, 1).replace('\n', " ");
        if is_garbage(&description, self.garbage_ratio) {
            description = if mcc.is_empty() {
                self.labels.unreadable.clone()
            } else {
                self.labels.unreadable_with_mcc.clone()
            };
        }

        Some(RawRow {
            date: parse_statement_date(date).unwrap_or(self.fallback_date),
            amount,
            description,
            mcc,
        })
    }
}
