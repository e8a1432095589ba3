use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Id;

/// A create/update request body. Core page fields are read from it by the
/// validator; template handlers read their own fields from the same body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRequest {
    body: Map<String, Value>,
}

impl PageRequest {
    /// Non-object bodies are treated as empty so that validation reports
    /// the missing fields instead of failing on the shape.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(body) => Self { body },
            _ => Self::default(),
        }
    }

    /// Look up a dotted path such as `meta.title`.
    pub fn input(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.body.get(first)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// The key is present, even if its value is null.
    pub fn has(&self, path: &str) -> bool {
        self.input(path).is_some()
    }

    /// Present, not null and not an empty or blank string.
    pub fn filled(&self, path: &str) -> bool {
        match self.input(path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        self.input(path).and_then(Value::as_str)
    }

    /// Accepts `true`/`false`, `1`/`0` and `"1"`/`"0"`; `"true"` and
    /// `"false"` strings are not booleans.
    pub fn boolean(&self, path: &str) -> Option<bool> {
        match self.input(path)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Accepts JSON integers and integer strings.
    pub fn integer(&self, path: &str) -> Option<i64> {
        value_as_id(self.input(path)?)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

pub(crate) fn value_as_id(value: &Value) -> Option<Id> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<Id>().ok(),
        _ => None,
    }
}

/// Core page fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInput {
    pub title: String,
    pub slug: Option<String>,
    pub template_id: Id,
    pub parent_id: Option<Id>,
    pub is_stand_alone: bool,
    pub is_published: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_input_lookup() {
        let request = PageRequest::from_value(json!({
            "title": "About",
            "meta": { "title": "About us", "description": null },
            "gallery": [10, 11]
        }));

        assert_eq!(request.string("title"), Some("About"));
        assert_eq!(request.string("meta.title"), Some("About us"));
        assert!(request.has("meta.description"));
        assert!(!request.filled("meta.description"));
        assert_eq!(request.integer("gallery.1"), Some(11));
        assert!(!request.has("meta.keywords"));
        assert!(!request.has("title.nested"));
    }

    #[test]
    fn test_boolean_coercion() {
        let request = PageRequest::from_value(json!({
            "a": true, "b": 0, "c": "1", "d": "yes", "e": 2, "f": "true", "g": "0"
        }));

        assert_eq!(request.boolean("a"), Some(true));
        assert_eq!(request.boolean("b"), Some(false));
        assert_eq!(request.boolean("c"), Some(true));
        assert_eq!(request.boolean("d"), None);
        assert_eq!(request.boolean("e"), None);
        assert_eq!(request.boolean("f"), None);
        assert_eq!(request.boolean("g"), Some(false));
        assert_eq!(request.boolean("missing"), None);
    }

    #[test]
    fn test_non_object_body_is_empty() {
        let request = PageRequest::from_value(json!(["title"]));
        assert!(request.body().is_empty());
    }
}
