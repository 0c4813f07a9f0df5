//! Fuzzy category resolution against a user's catalog

use std::collections::{HashMap, HashSet};

use crate::models::{CategoryRef, FlowType};

/// Source of a user's category catalog
///
/// Implemented by the persistence layer; the ingestion core only reads a
/// snapshot per call and never mutates it.
pub trait CategoryCatalog {
    fn categories_for(&self, user_id: &str) -> Vec<CategoryRef>;
}

/// Catalog held in memory, optionally with per-user entries
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    shared: Vec<CategoryRef>,
    per_user: HashMap<String, Vec<CategoryRef>>,
}

impl InMemoryCatalog {
    /// Catalog returning the same categories for every user
    pub fn new(categories: Vec<CategoryRef>) -> Self {
        Self {
            shared: categories,
            per_user: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, categories: Vec<CategoryRef>) -> Self {
        self.per_user.insert(user_id.into(), categories);
        self
    }
}

impl CategoryCatalog for InMemoryCatalog {
    fn categories_for(&self, user_id: &str) -> Vec<CategoryRef> {
        self.per_user
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| self.shared.clone())
    }
}

/// Resolve a category name to an id of the same flow type
///
/// In order, first hit wins: exact case-insensitive name, containment in
/// either direction, highest shared-token count (first max wins). Categories
/// of another flow type are never returned.
pub fn find_category_id(
    categories: &[CategoryRef],
    name: &str,
    flow_type: FlowType,
) -> Option<String> {
    let query = name.trim().to_lowercase();
    let same_type: Vec<(&CategoryRef, String)> = categories
        .iter()
        .filter(|c| c.flow_type == flow_type)
        .map(|c| (c, c.name.trim().to_lowercase()))
        .filter(|(_, n)| !n.is_empty())
        .collect();

    if let Some((cat, _)) = same_type.iter().find(|(_, n)| *n == query) {
        return Some(cat.id.clone());
    }

    if !query.is_empty() {
        if let Some((cat, _)) = same_type
            .iter()
            .find(|(_, n)| n.contains(query.as_str()) || query.contains(n.as_str()))
        {
            return Some(cat.id.clone());
        }
    }

    let query_tokens = tokens(&query);
    let mut best: Option<(&CategoryRef, usize)> = None;
    for (cat, db_name) in &same_type {
        let score = tokens(db_name).intersection(&query_tokens).count();
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((*cat, score));
        }
    }

    best.map(|(cat, _)| cat.id.clone())
}

fn tokens(name: &str) -> HashSet<&str> {
    name.split(|c: char| c.is_whitespace() || c == '/')
        .filter(|t| !t.is_empty())
        .collect()
}
