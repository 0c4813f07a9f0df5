//! CSV statement pipeline: detect, extract, categorize, correct, emit

use std::borrow::Cow;

use csv::{Reader, ReaderBuilder};

use super::detect::detect_bank;
use super::extract::RowExtractor;
use crate::error::Result;
use crate::ingest::ParseContext;
use crate::models::{Bank, ParseResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Statement bytes as text, without a leading BOM
fn decode(content: &[u8]) -> Cow<'_, str> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    String::from_utf8_lossy(content)
}

/// Header-first reader that tolerates ragged rows
fn statement_reader(text: &str) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Detect the issuing bank from the header row alone
pub fn detect_csv_bank(content: &[u8]) -> Result<Bank> {
    let text = decode(content);
    let mut reader = statement_reader(&text);
    let headers = reader.headers()?;
    Ok(detect_bank(&headers.iter().collect::<Vec<_>>()))
}

/// Parse a CSV bank statement
///
/// A missing header row yields an empty result tagged [`Bank::Generic`].
/// Rows that cannot be read are counted in `skipped`, never returned as
/// errors.
pub fn parse_csv(content: &[u8], ctx: &ParseContext<'_>) -> Result<ParseResult> {
    let text = decode(content);
    let mut reader = statement_reader(&text);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        tracing::debug!("CSV has no header row");
        return Ok(ParseResult::empty(Bank::Generic));
    }

    let bank = detect_bank(&headers.iter().collect::<Vec<_>>());
    let extractor = RowExtractor::new(bank, &headers);
    let categorizer = ctx.categorizer();

    let mut rows = Vec::new();
    let mut skipped = 0;

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping unreadable CSV record {}: {}", line + 1, e);
                skipped += 1;
                continue;
            }
        };

        let raw = match extractor.extract(&record, ctx.ingested_at) {
            Ok(raw) => raw,
            Err(reason) => {
                tracing::debug!("Skipping CSV record {}: {}", line + 1, reason);
                skipped += 1;
                continue;
            }
        };

        if ctx.is_below_minimum(raw.amount) {
            skipped += 1;
            continue;
        }

        let verdict = categorizer.categorize(&raw.description, &raw.mcc);
        let verdict = categorizer.correct_for_sign(verdict, raw.amount, &raw.description);
        rows.push(ctx.assemble(&raw, bank, verdict, None));
    }

    tracing::debug!(
        "Parsed {} {} transactions ({} skipped)",
        rows.len(),
        bank,
        skipped
    );

    Ok(ParseResult {
        rows,
        skipped,
        bank,
        bank_totals: None,
    })
}
