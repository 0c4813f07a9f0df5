//! Categorization rule tables
//!
//! The MCC table, the ordered keyword rules, the ignore markers and the
//! sign-correction keyword lists are data, not code. They ship embedded in the
//! binary and can be replaced table-by-table from a TOML override.
//!
//! ## Override semantics
//!
//! Each table present in an override file replaces the embedded table of the
//! same name wholesale. Keyword rules are an array of tables so their order
//! survives parsing; order is the only tie-break between rules.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::FlowType;

/// Embedded default rules (compiled into binary)
pub const DEFAULT_RULES: &str = include_str!("../../../config/rules.toml");

/// Category assigned to an MCC code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MccRule {
    pub category: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
}

/// One entry of the ordered keyword table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordRule {
    pub category: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    /// Whether any keyword is a substring of an already lower-cased description
    pub fn matches(&self, desc_lower: &str) -> bool {
        contains_any(desc_lower, &self.keywords)
    }
}

/// Category names the engine produces on its own
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub other: String,
    pub other_income: String,
    pub transfer_other: String,
    pub transfer_to_person: String,
    pub savings: String,
    pub salary: String,
    pub freelance: String,
    pub unreadable_with_mcc: String,
    pub unreadable: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            other: "Other".to_string(),
            other_income: "Other income".to_string(),
            transfer_other: "Transfer (other)".to_string(),
            transfer_to_person: "Transfer (to person)".to_string(),
            savings: "Investments/Savings".to_string(),
            salary: "Salary".to_string(),
            freelance: "Freelance".to_string(),
            unreadable_with_mcc: "Переказ".to_string(),
            unreadable: "Без опису".to_string(),
        }
    }
}

/// Keyword lists for the CSV sign correction
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorrectionRules {
    /// Credit rows with an "expense" verdict become income when one matches
    pub credit_income_keywords: Vec<String>,
}

/// Keyword and MCC lists for the sign-aware PDF classifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PdfRules {
    pub always_transfer_mcc: Vec<String>,
    pub peer_to_peer_mcc: String,
    pub savings_keywords: Vec<String>,
    pub income_keywords: Vec<String>,
    pub salary_keywords: Vec<String>,
    pub freelance_keywords: Vec<String>,
    /// First header cell of a Monobank transaction table contains one of these.
    /// Matched case-sensitively, as printed.
    pub date_headers: Vec<String>,
}

impl Default for PdfRules {
    fn default() -> Self {
        Self {
            always_transfer_mcc: Vec::new(),
            peer_to_peer_mcc: String::new(),
            savings_keywords: Vec::new(),
            income_keywords: Vec::new(),
            salary_keywords: Vec::new(),
            freelance_keywords: Vec::new(),
            date_headers: vec!["Дата".to_string()],
        }
    }
}

/// Complete rule set consumed by the categorizers
///
/// Read-only after construction; share it by reference across parallel parses.
///
/// Keywords and ignore markers are lower-cased at load time and descriptions
/// are lower-cased before matching, so a mixed-case entry such as `"ЖКП"` or
/// `"SportLife"` matches regardless of how the statement spells it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub mcc: HashMap<String, MccRule>,
    pub keyword_rules: Vec<KeywordRule>,
    pub ignore_markers: Vec<String>,
    pub labels: Labels,
    pub correction: CorrectionRules,
    pub pdf: PdfRules,
}

impl RuleSet {
    /// Rules compiled into the binary
    pub fn embedded() -> Result<Self> {
        parse_rules(DEFAULT_RULES, None)
    }

    /// Apply an override document on top of these rules
    pub fn with_override(self, content: &str) -> Result<Self> {
        parse_rules(content, Some(self))
    }

    pub fn mcc_rule(&self, mcc: &str) -> Option<&MccRule> {
        let code = mcc.trim();
        if code.is_empty() {
            return None;
        }
        self.mcc.get(code)
    }

    pub fn is_always_transfer_mcc(&self, mcc: &str) -> bool {
        let code = mcc.trim();
        !code.is_empty() && self.pdf.always_transfer_mcc.iter().any(|m| m == code)
    }

    /// Whether a lower-cased description carries a shared/returned money marker
    pub fn has_ignore_marker(&self, desc_lower: &str) -> bool {
        contains_any(desc_lower, &self.ignore_markers)
    }
}

/// Substring test against a keyword list
pub fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|kw| !kw.is_empty() && haystack.contains(kw.as_str()))
}

/// Raw rules structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawRules {
    labels: Option<Labels>,
    ignore: Option<RawIgnore>,
    correction: Option<CorrectionRules>,
    pdf: Option<PdfRules>,
    mcc: Option<HashMap<String, MccRule>>,
    keyword_rules: Option<Vec<KeywordRule>>,
}

#[derive(Debug, Deserialize)]
struct RawIgnore {
    markers: Option<Vec<String>>,
}

/// Parse rules from TOML content, layering over `base` when given
fn parse_rules(content: &str, base: Option<RuleSet>) -> Result<RuleSet> {
    let raw: RawRules = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid rules TOML: {}", e)))?;

    let mut rules = base.unwrap_or_else(|| RuleSet {
        mcc: HashMap::new(),
        keyword_rules: Vec::new(),
        ignore_markers: Vec::new(),
        labels: Labels::default(),
        correction: CorrectionRules::default(),
        pdf: PdfRules::default(),
    });

    if let Some(labels) = raw.labels {
        rules.labels = labels;
    }
    if let Some(markers) = raw.ignore.and_then(|i| i.markers) {
        rules.ignore_markers = lowercase_all(markers);
    }
    if let Some(correction) = raw.correction {
        rules.correction = CorrectionRules {
            credit_income_keywords: lowercase_all(correction.credit_income_keywords),
        };
    }
    if let Some(pdf) = raw.pdf {
        rules.pdf = PdfRules {
            always_transfer_mcc: pdf
                .always_transfer_mcc
                .into_iter()
                .map(|m| m.trim().to_string())
                .collect(),
            peer_to_peer_mcc: pdf.peer_to_peer_mcc.trim().to_string(),
            savings_keywords: lowercase_all(pdf.savings_keywords),
            income_keywords: lowercase_all(pdf.income_keywords),
            salary_keywords: lowercase_all(pdf.salary_keywords),
            freelance_keywords: lowercase_all(pdf.freelance_keywords),
            date_headers: pdf
                .date_headers
                .into_iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
        };
    }
    if let Some(mcc) = raw.mcc {
        rules.mcc = mcc
            .into_iter()
            .map(|(code, rule)| (code.trim().to_string(), rule))
            .collect();
    }
    if let Some(keyword_rules) = raw.keyword_rules {
        rules.keyword_rules = keyword_rules
            .into_iter()
            .map(|rule| KeywordRule {
                keywords: lowercase_all(rule.keywords),
                ..rule
            })
            .collect();
    }

    tracing::debug!(
        "Loaded {} MCC codes and {} keyword rules",
        rules.mcc.len(),
        rules.keyword_rules.len()
    );

    Ok(rules)
}

// Descriptions are matched lower-cased, so keywords must be too
fn lowercase_all(words: Vec<String>) -> Vec<String> {
    words.into_iter().map(|w| w.to_lowercase()).collect()
}
