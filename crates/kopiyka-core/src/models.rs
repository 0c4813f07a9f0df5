//! Domain models for Kopiyka

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Banks whose statement exports can be ingested
///
/// CSV detection can return any variant; PDF detection only ever returns
/// [`Bank::Monobank`] or [`Bank::ABank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    Monobank,
    #[serde(rename = "privatbank")]
    PrivatBank,
    Oschadbank,
    Raiffeisen,
    Pumb,
    #[serde(rename = "abank")]
    ABank,
    Generic,
}

impl Bank {
    /// Stable identifier used in metadata and hashes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monobank => "monobank",
            Self::PrivatBank => "privatbank",
            Self::Oschadbank => "oschadbank",
            Self::Raiffeisen => "raiffeisen",
            Self::Pumb => "pumb",
            Self::ABank => "abank",
            Self::Generic => "generic",
        }
    }

    /// Human-readable label shown to end users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Monobank => "Monobank",
            Self::PrivatBank => "ПриватБанк",
            Self::Oschadbank => "Ощадбанк",
            Self::Raiffeisen => "Райффайзен Банк",
            Self::Pumb => "ПУМБ",
            Self::ABank => "A-Банк",
            Self::Generic => "Невідомий банк",
        }
    }

    /// Get all banks
    pub fn all() -> &'static [Bank] {
        &[
            Self::Monobank,
            Self::PrivatBank,
            Self::Oschadbank,
            Self::Raiffeisen,
            Self::Pumb,
            Self::ABank,
            Self::Generic,
        ]
    }
}

impl std::str::FromStr for Bank {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monobank" | "mono" => Ok(Self::Monobank),
            "privatbank" | "privat" | "privat24" => Ok(Self::PrivatBank),
            "oschadbank" | "oschad" => Ok(Self::Oschadbank),
            "raiffeisen" | "aval" => Ok(Self::Raiffeisen),
            "pumb" => Ok(Self::Pumb),
            "abank" | "a-bank" | "a_bank" => Ok(Self::ABank),
            "generic" => Ok(Self::Generic),
            _ => Err(format!("Unknown bank: {}", s)),
        }
    }
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Expense,
    Income,
    Transfer,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown flow type: {}", s)),
        }
    }
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ingestion channel tag stored with every row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Imported from a statement file (CSV or PDF)
    #[default]
    Csv,
    /// Entered by hand
    Manual,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Manual => "manual",
        }
    }
}

/// One source record before categorization
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: NaiveDateTime,
    /// Signed amount: negative = debit, positive = credit
    pub amount: f64,
    pub description: String,
    /// Merchant category code, empty when unknown
    pub mcc: String,
}

/// Output of the categorization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub flow_type: FlowType,
    pub ignore_in_stats: bool,
}

impl Classification {
    pub fn new(category: impl Into<String>, flow_type: FlowType) -> Self {
        Self {
            category: category.into(),
            flow_type,
            ignore_in_stats: false,
        }
    }
}

/// Annotation bag stored alongside each emitted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMetadata {
    pub raw_category: String,
    pub mcc: String,
    pub bank: Bank,
    /// Only set for rows read from PDF statements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_outgoing: Option<bool>,
}

/// A categorized transaction ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRow {
    pub user_id: String,
    /// Always the absolute value; direction lives in `flow_type`
    pub amount: f64,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub source: TransactionSource,
    pub ignore_in_stats: bool,
    pub transaction_date: NaiveDateTime,
    /// SHA-256 of date, description, signed amount and bank for de-duplication
    pub import_hash: String,
    pub metadata: RowMetadata,
}

/// A category from the user's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
}

impl CategoryRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, flow_type: FlowType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            flow_type,
        }
    }
}

/// Period totals printed in a statement header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_to: Option<String>,
}

impl BankTotals {
    pub fn is_empty(&self) -> bool {
        self.expenses.is_none()
            && self.income.is_none()
            && self.balance_start.is_none()
            && self.balance_end.is_none()
            && self.period_from.is_none()
            && self.period_to.is_none()
    }
}

/// Output of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub rows: Vec<CategorizedRow>,
    pub skipped: usize,
    pub bank: Bank,
    /// Present for PDF statements only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_totals: Option<BankTotals>,
}

impl ParseResult {
    /// A successful run that found nothing
    pub fn empty(bank: Bank) -> Self {
        Self {
            rows: Vec::new(),
            skipped: 0,
            bank,
            bank_totals: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
