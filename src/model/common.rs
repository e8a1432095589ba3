use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Id = i64;

/// Field-level validation messages, keyed by the dotted input name
/// (`title`, `meta.title`, `pages.2`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// First message overall, used as the summary line in error responses
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }
}

/// Convert a title or user-supplied slug into a URL-safe slug: non-ASCII
/// letters are transliterated, the rest becomes lowercase ASCII
/// alphanumerics separated by single dashes.
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}
