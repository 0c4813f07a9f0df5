//! Sign-aware classification for PDF rows
//!
//! PDF statements carry a signed amount, so the direction of money is known
//! before categorization. Rules, first match wins:
//!
//! 1. A bare person name is a transfer to a person
//! 2. Cash, ATM and quasi-cash MCCs are transfers (or income with a clear
//!    income keyword)
//! 3. Credits: savings, salary and freelance keywords, then the categorizer
//!    with expense verdicts turned into "Other income"
//! 4. Debits: the categorizer with income verdicts turned into "Other"

use std::sync::OnceLock;

use regex::Regex;

use crate::categorize::Categorizer;
use crate::models::{Classification, FlowType};
use crate::rules::contains_any;

fn person_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[А-ЯІЇЄҐ][а-яіїєґ'\-]{1,20}(?:[\s\-][А-ЯІЇЄҐ][а-яіїєґ'\-]{1,20}){1,3}$",
        )
        .expect("valid regex")
    })
}

fn name_breaker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d@.,/*&#(){}\[\]|]").expect("valid regex"))
}

/// Whether a description looks like a person's full name
///
/// Two to four capitalized Cyrillic words, at least five characters, no
/// digits and no punctuation besides apostrophes and hyphens.
pub fn is_person_name(text: &str) -> bool {
    if text.chars().count() < 5 || name_breaker_re().is_match(text) {
        return false;
    }
    let words = text.split_whitespace().count();
    if !(2..=4).contains(&words) {
        return false;
    }
    person_name_re().is_match(text.trim())
}

/// Classifies PDF rows using the sign of the amount
#[derive(Debug, Clone, Copy)]
pub struct SignAwareClassifier<'a> {
    categorizer: Categorizer<'a>,
}

impl<'a> SignAwareClassifier<'a> {
    pub fn new(categorizer: Categorizer<'a>) -> Self {
        Self { categorizer }
    }

    pub fn classify(&self, signed_amount: f64, description: &str, mcc: &str) -> Classification {
        let rules = self.categorizer.rules();
        let labels = &rules.labels;
        let pdf = &rules.pdf;
        let desc_lower = description.to_lowercase();
        let is_credit = signed_amount > 0.0;

        if is_person_name(description) {
            return Classification::new(labels.transfer_to_person.clone(), FlowType::Transfer);
        }

        if rules.is_always_transfer_mcc(mcc) {
            let mcc = mcc.trim();
            return if is_credit {
                if contains_any(&desc_lower, &pdf.income_keywords) || mcc == pdf.peer_to_peer_mcc {
                    Classification::new(labels.other_income.clone(), FlowType::Income)
                } else {
                    Classification::new(labels.transfer_other.clone(), FlowType::Transfer)
                }
            } else if contains_any(&desc_lower, &pdf.savings_keywords) {
                Classification::new(labels.savings.clone(), FlowType::Transfer)
            } else {
                Classification::new(labels.transfer_other.clone(), FlowType::Transfer)
            };
        }

        if is_credit {
            if contains_any(&desc_lower, &pdf.savings_keywords) {
                return Classification::new(labels.transfer_other.clone(), FlowType::Transfer);
            }
            if contains_any(&desc_lower, &pdf.salary_keywords) {
                return Classification::new(labels.salary.clone(), FlowType::Income);
            }
            if contains_any(&desc_lower, &pdf.freelance_keywords) {
                return Classification::new(labels.freelance.clone(), FlowType::Income);
            }
            let verdict = self.categorizer.categorize(description, mcc);
            if verdict.flow_type == FlowType::Expense {
                return Classification::new(labels.other_income.clone(), FlowType::Income);
            }
            verdict
        } else {
            let verdict = self.categorizer.categorize(description, mcc);
            if verdict.flow_type == FlowType::Income {
                return Classification::new(labels.other.clone(), FlowType::Expense);
            }
            verdict
        }
    }
}
