//! Statement ingestion entry points
//!
//! [`StatementIngestor`] owns the rule tables and settings and is constructed
//! explicitly by the caller. Every parse gets a [`ParseContext`]: the user,
//! a snapshot of their category catalog and the ingestion timestamp used for
//! undated rows. Nothing is shared mutably between parses.

use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};

use crate::categorize::Categorizer;
use crate::config::{IngestConfig, KopiykaConfig};
use crate::error::Result;
use crate::models::{
    Bank, CategorizedRow, CategoryRef, Classification, ParseResult, RawRow, RowMetadata,
};
use crate::resolve::{find_category_id, CategoryCatalog};
use crate::rules::RuleSet;
use crate::{import, pdf};

/// Statement format as routed by [`StatementIngestor::parse_statement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Pdf,
}

impl StatementFormat {
    /// Sniff the format from leading bytes
    ///
    /// `%PDF` after an optional BOM and whitespace means PDF; anything else is
    /// treated as delimited text.
    pub fn sniff(content: &[u8]) -> Self {
        let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
        let start = content
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(content.len());
        if content[start..].starts_with(b"%PDF") {
            Self::Pdf
        } else {
            Self::Csv
        }
    }
}

/// Everything one parse run needs besides the bytes
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub config: &'a IngestConfig,
    pub rules: &'a RuleSet,
    pub user_id: &'a str,
    pub categories: &'a [CategoryRef],
    /// Substituted for dates that cannot be parsed
    pub ingested_at: NaiveDateTime,
}

impl<'a> ParseContext<'a> {
    pub fn categorizer(&self) -> Categorizer<'a> {
        Categorizer::new(self.rules)
    }

    pub fn is_below_minimum(&self, signed_amount: f64) -> bool {
        signed_amount.abs() < self.config.min_amount
    }

    /// Build the emitted record for a categorized raw row
    ///
    /// `is_outgoing` is recorded for PDF rows only.
    pub fn assemble(
        &self,
        raw: &RawRow,
        bank: Bank,
        verdict: Classification,
        is_outgoing: Option<bool>,
    ) -> CategorizedRow {
        let description: String = raw
            .description
            .chars()
            .take(self.config.description_limit)
            .collect();

        CategorizedRow {
            user_id: self.user_id.to_string(),
            amount: raw.amount.abs(),
            flow_type: verdict.flow_type,
            category_id: find_category_id(self.categories, &verdict.category, verdict.flow_type),
            description: (!description.is_empty()).then_some(description),
            source: self.config.source,
            ignore_in_stats: verdict.ignore_in_stats,
            transaction_date: raw.date,
            import_hash: generate_hash(raw, bank),
            metadata: RowMetadata {
                raw_category: verdict.category,
                mcc: raw.mcc.clone(),
                bank,
                is_outgoing,
            },
        }
    }
}

/// Generate a unique hash for deduplication
///
/// Uses the untruncated description and the signed amount so that a refund
/// and the purchase it reverses hash differently.
pub fn generate_hash(raw: &RawRow, bank: Bank) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.date.to_string().as_bytes());
    hasher.update(raw.description.as_bytes());
    hasher.update(raw.amount.to_be_bytes());
    hasher.update(bank.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Parses bank statements into categorized rows
#[derive(Debug, Clone)]
pub struct StatementIngestor {
    config: IngestConfig,
    rules: RuleSet,
}

impl StatementIngestor {
    pub fn new(config: IngestConfig, rules: RuleSet) -> Self {
        Self { config, rules }
    }

    /// Ingestor over the embedded rule tables and default settings
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::from_config(KopiykaConfig::embedded()?))
    }

    pub fn from_config(config: KopiykaConfig) -> Self {
        Self::new(config.ingest, config.rules)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn categorizer(&self) -> Categorizer<'_> {
        Categorizer::new(&self.rules)
    }

    /// Context for one run, stamped with the current local time
    pub fn context<'a>(&'a self, user_id: &'a str, categories: &'a [CategoryRef]) -> ParseContext<'a> {
        ParseContext {
            config: &self.config,
            rules: &self.rules,
            user_id,
            categories,
            ingested_at: Local::now().naive_local(),
        }
    }

    /// Parse a CSV statement
    pub fn parse_csv(
        &self,
        content: &[u8],
        user_id: &str,
        categories: &[CategoryRef],
    ) -> Result<ParseResult> {
        import::parse_csv(content, &self.context(user_id, categories))
    }

    /// Parse a PDF statement
    ///
    /// Fails with [`crate::Error::UnsupportedFormat`] when page 1 names neither
    /// supported bank.
    pub fn parse_pdf(
        &self,
        content: &[u8],
        user_id: &str,
        categories: &[CategoryRef],
    ) -> Result<ParseResult> {
        pdf::parse_pdf(content, &self.context(user_id, categories))
    }

    /// Parse a statement of either format, routing on the `%PDF` magic
    pub fn parse_statement(
        &self,
        content: &[u8],
        user_id: &str,
        categories: &[CategoryRef],
    ) -> Result<ParseResult> {
        match StatementFormat::sniff(content) {
            StatementFormat::Pdf => self.parse_pdf(content, user_id, categories),
            StatementFormat::Csv => self.parse_csv(content, user_id, categories),
        }
    }

    /// Parse with the user's categories fetched from a catalog
    pub fn parse_for_user(
        &self,
        content: &[u8],
        user_id: &str,
        catalog: &dyn CategoryCatalog,
    ) -> Result<ParseResult> {
        let categories = catalog.categories_for(user_id);
        self.parse_statement(content, user_id, &categories)
    }

    /// Detect the issuing bank without categorizing anything
    pub fn detect(&self, content: &[u8]) -> Result<Bank> {
        match StatementFormat::sniff(content) {
            StatementFormat::Pdf => pdf::detect_bank(content),
            StatementFormat::Csv => import::detect_csv_bank(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlowType;
    use crate::test_utils::sample_categories;
    use chrono::NaiveDate;

    fn raw(description: &str, amount: f64) -> RawRow {
        RawRow {
            date: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            amount,
            description: description.to_string(),
            mcc: String::new(),
        }
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(StatementFormat::sniff(b"%PDF-1.4\n"), StatementFormat::Pdf);
        assert_eq!(StatementFormat::sniff(b"\xEF\xBB\xBF \n%PDF-1.7"), StatementFormat::Pdf);
        assert_eq!(StatementFormat::sniff(b"Date,Amount\n"), StatementFormat::Csv);
        assert_eq!(StatementFormat::sniff(b""), StatementFormat::Csv);
    }

    #[test]
    fn test_hash_is_stable_and_sign_sensitive() {
        let a = generate_hash(&raw("АТБ", -10.0), Bank::Monobank);
        let b = generate_hash(&raw("АТБ", -10.0), Bank::Monobank);
        let c = generate_hash(&raw("АТБ", 10.0), Bank::Monobank);
        let d = generate_hash(&raw("АТБ", -10.0), Bank::ABank);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_assemble_row() {
        let ingestor = StatementIngestor::with_defaults().unwrap();
        let categories = sample_categories();
        let ctx = ingestor.context("user-7", &categories);
        let row = ctx.assemble(
            &raw("Сільпо", -42.5),
            Bank::PrivatBank,
            Classification::new("Supermarkets", FlowType::Expense),
            Some(true),
        );
        assert_eq!(row.amount, 42.5);
        assert_eq!(row.user_id, "user-7");
        assert_eq!(row.category_id.as_deref(), Some("exp-supermarkets"));
        assert_eq!(row.description.as_deref(), Some("Сільпо"));
        assert_eq!(row.source.as_str(), "csv");
        assert_eq!(row.metadata.bank, Bank::PrivatBank);
        assert_eq!(row.metadata.is_outgoing, Some(true));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["metadata"]["raw_category"], "Supermarkets");
    }

    #[test]
    fn test_minimum_is_on_magnitude() {
        let ingestor = StatementIngestor::with_defaults().unwrap();
        let ctx = ingestor.context("u", &[]);
        assert!(ctx.is_below_minimum(-0.009));
        assert!(ctx.is_below_minimum(0.0));
        assert!(!ctx.is_below_minimum(-0.01));
    }

    #[test]
    fn test_detect_csv_without_categorizing() {
        let ingestor = StatementIngestor::with_defaults().unwrap();
        let bank = ingestor
            .detect("Дата,Опис,Прихід,Витрати\n".as_bytes())
            .unwrap();
        assert_eq!(bank, Bank::ABank);

        let mut with_bom = b"\xEF\xBB\xBF".to_vec();
        with_bom.extend_from_slice("Дата і час операції,Деталі операції,MCC,Сума\n".as_bytes());
        assert_eq!(ingestor.detect(&with_bom).unwrap(), Bank::Monobank);
    }
}
