//! Two-layer categorization engine
//!
//! 1. MCC layer: a known merchant category code is authoritative
//! 2. Keyword layer: first ordered rule with a substring hit wins
//! 3. Fallback: "Other" / expense
//!
//! The engine is a pure function of the rule tables and its input.
//! [`Categorizer::correct_for_sign`] then reconciles the verdict with the
//! direction of money for CSV rows.

use crate::models::{Classification, FlowType};
use crate::rules::{contains_any, RuleSet};

/// Stateless categorizer over a borrowed rule set
#[derive(Debug, Clone, Copy)]
pub struct Categorizer<'a> {
    rules: &'a RuleSet,
}

impl<'a> Categorizer<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a RuleSet {
        self.rules
    }

    /// Classify a description and optional MCC code
    pub fn categorize(&self, description: &str, mcc: &str) -> Classification {
        if let Some(rule) = self.rules.mcc_rule(mcc) {
            return Classification::new(rule.category.clone(), rule.flow_type);
        }

        let desc_lower = description.to_lowercase();
        if let Some(rule) = self
            .rules
            .keyword_rules
            .iter()
            .find(|rule| rule.matches(&desc_lower))
        {
            return Classification {
                category: rule.category.clone(),
                flow_type: rule.flow_type,
                ignore_in_stats: self.rules.has_ignore_marker(&desc_lower),
            };
        }

        Classification::new(self.rules.labels.other.clone(), FlowType::Expense)
    }

    /// Reconcile a verdict with the sign of the source amount
    ///
    /// A debit can never be income: only the type flips, the category label
    /// is kept. A credit can never be an expense: it becomes "Other income"
    /// when the description has a salary-like marker, else "Transfer (other)".
    /// Transfers and already consistent verdicts pass through untouched.
    pub fn correct_for_sign(
        &self,
        classification: Classification,
        signed_amount: f64,
        description: &str,
    ) -> Classification {
        let is_debit = signed_amount < 0.0;

        match classification.flow_type {
            FlowType::Income if is_debit => Classification {
                flow_type: FlowType::Expense,
                ..classification
            },
            FlowType::Expense if !is_debit => {
                let desc_lower = description.to_lowercase();
                let labels = &self.rules.labels;
                if contains_any(&desc_lower, &self.rules.correction.credit_income_keywords) {
                    Classification {
                        category: labels.other_income.clone(),
                        flow_type: FlowType::Income,
                        ..classification
                    }
                } else {
                    Classification {
                        category: labels.transfer_other.clone(),
                        flow_type: FlowType::Transfer,
                        ..classification
                    }
                }
            }
            _ => classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::embedded().unwrap()
    }

    #[test]
    fn test_mcc_is_authoritative() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        // Description would hit the Taxi rule, MCC wins
        let result = categorizer.categorize("UBER поїздка", "5411");
        assert_eq!(result.category, "Supermarkets");
        assert_eq!(result.flow_type, FlowType::Expense);
        assert!(!result.ignore_in_stats);
    }

    #[test]
    fn test_mcc_skips_ignore_markers() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let result = categorizer.categorize("поділ рахунку", "5812");
        assert_eq!(result.category, "Restaurants");
        assert!(!result.ignore_in_stats);
    }

    #[test]
    fn test_unknown_mcc_falls_to_keywords() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let result = categorizer.categorize("Сільпо Київ", "9999");
        assert_eq!(result.category, "Supermarkets");
    }

    #[test]
    fn test_keyword_order_is_tie_break() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        // "bolt food" (transport) and "pizza" (restaurants): restaurants come first
        let result = categorizer.categorize("Bolt Food pizza", "");
        assert_eq!(result.category, "Restaurants");
        // "netflix" (services) vs "samsung" (electronics): services come first
        let result = categorizer.categorize("Netflix on Samsung", "");
        assert_eq!(result.category, "Services/Subscriptions");
    }

    #[test]
    fn test_ignore_marker_keeps_rule_verdict() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let result = categorizer.categorize("повернення боргу 200", "");
        assert_eq!(result.category, "Other income");
        assert_eq!(result.flow_type, FlowType::Income);
        assert!(result.ignore_in_stats);

        let result = categorizer.categorize("Кафе Львів, поділ рахунку", "");
        assert_eq!(result.category, "Restaurants");
        assert!(result.ignore_in_stats);
    }

    #[test]
    fn test_fallback() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let result = categorizer.categorize("щось незрозуміле", "");
        assert_eq!(result, Classification::new("Other", FlowType::Expense));
    }

    #[test]
    fn test_categorize_is_deterministic() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        for (desc, mcc) in [("АТБ", ""), ("Зарплата", ""), ("x", "6011"), ("", "")] {
            assert_eq!(
                categorizer.categorize(desc, mcc),
                categorizer.categorize(desc, mcc)
            );
        }
    }

    #[test]
    fn test_debit_income_becomes_expense() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let verdict = categorizer.categorize("Зарплата за березень", "");
        let corrected = categorizer.correct_for_sign(verdict, -100.0, "Зарплата за березень");
        assert_eq!(corrected.flow_type, FlowType::Expense);
        assert_eq!(corrected.category, "Salary");
    }

    #[test]
    fn test_credit_expense_becomes_income_or_transfer() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);

        let verdict = Classification::new("Other", FlowType::Expense);
        let corrected = categorizer.correct_for_sign(verdict.clone(), 500.0, "аванс від ФОП");
        assert_eq!(corrected.category, "Other income");
        assert_eq!(corrected.flow_type, FlowType::Income);

        let corrected = categorizer.correct_for_sign(verdict, 500.0, "АТБ повернення");
        assert_eq!(corrected.category, "Transfer (other)");
        assert_eq!(corrected.flow_type, FlowType::Transfer);
    }

    #[test]
    fn test_correction_keeps_ignore_flag() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let verdict = categorizer.categorize("Кафе, split check", "");
        assert!(verdict.ignore_in_stats);
        let corrected = categorizer.correct_for_sign(verdict, 120.0, "Кафе, split check");
        assert_eq!(corrected.flow_type, FlowType::Transfer);
        assert!(corrected.ignore_in_stats);
    }

    #[test]
    fn test_correction_is_noop_when_consistent() {
        let rules = rules();
        let categorizer = Categorizer::new(&rules);
        let cases = [
            (Classification::new("Supermarkets", FlowType::Expense), -10.0),
            (Classification::new("Salary", FlowType::Income), 10.0),
            (Classification::new("Transfer (other)", FlowType::Transfer), -10.0),
            (Classification::new("Transfer (other)", FlowType::Transfer), 10.0),
        ];
        for (verdict, amount) in cases {
            assert_eq!(
                categorizer.correct_for_sign(verdict.clone(), amount, "будь-що"),
                verdict
            );
        }
    }
}
