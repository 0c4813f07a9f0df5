//! Kopiyka Core Library
//!
//! Bank statement ingestion for Ukrainian banks:
//! - CSV import with bank auto-detection (Monobank, PrivatBank, Oschadbank,
//!   Raiffeisen, PUMB, A-Bank, generic)
//! - PDF import for Monobank and A-Bank with table extraction
//! - Amount and date normalization
//! - Two-layer categorization (MCC, then ordered keyword rules) with sign
//!   correction
//! - Fuzzy resolution of category labels to the user's catalog
//! - Rule tables and settings loaded from embedded or override TOML

pub mod categorize;
pub mod config;
pub mod error;
pub mod import;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod pdf;
pub mod resolve;
pub mod rules;

/// Test fixtures: sample catalog, parse context, synthetic PDF pages
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use categorize::Categorizer;
pub use config::{IngestConfig, KopiykaConfig, TableSettings, TableStrategy};
pub use error::{Error, Result};
pub use ingest::{generate_hash, ParseContext, StatementFormat, StatementIngestor};
pub use models::{
    Bank, BankTotals, CategorizedRow, CategoryRef, Classification, FlowType, ParseResult, RawRow,
    RowMetadata, TransactionSource,
};
pub use normalize::{parse_amount, parse_date, parse_spaced_amount, parse_statement_date};
pub use resolve::{find_category_id, CategoryCatalog, InMemoryCatalog};
pub use rules::RuleSet;
