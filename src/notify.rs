// src/notify.rs

//! Read-only lookup of notification pattern sets from `[notify.patterns]`.

use std::collections::BTreeMap;

/// One configured pattern set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPattern {
    pub id: String,
    pub name: String,
    pub patterns: Vec<String>,
}

impl NotifyPattern {
    fn new(id: &str, patterns: &[String]) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            patterns: patterns.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotifyPatternService {
    patterns: BTreeMap<String, Vec<String>>,
}

impl NotifyPatternService {
    pub fn new(patterns: BTreeMap<String, Vec<String>>) -> Self {
        Self { patterns }
    }

    pub fn find_one(&self, id: &str) -> Option<NotifyPattern> {
        self.patterns
            .get(id)
            .map(|patterns| NotifyPattern::new(id, patterns))
    }

    /// Every pattern set, ordered by id.
    pub fn find_all(&self) -> Vec<NotifyPattern> {
        self.patterns
            .iter()
            .map(|(id, patterns)| NotifyPattern::new(id, patterns))
            .collect()
    }
}
