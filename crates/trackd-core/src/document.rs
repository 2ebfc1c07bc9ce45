//! Raw request documents.
//!
//! A [`RawDocument`] wraps the untyped, string-keyed field map a request
//! handler hands to a builder. Everything the builders do before producing
//! a typed output — presence checks, blank-field dropping, whitelist
//! trimming — operates on this container.

use serde_json::{Map, Value};

/// Canonical field names of the issue schema.
///
/// Builders, rules, and the repository all reference these constants so a
/// field can never be spelled two ways.
pub mod fields {
    pub const ID: &str = "id";
    pub const PROJECT: &str = "project";
    pub const TITLE: &str = "title";
    pub const TEXT: &str = "text";
    pub const CREATOR: &str = "creator";
    pub const ASSIGNEE: &str = "assignee";
    pub const STATUS_NOTE: &str = "status_note";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const OPEN: &str = "open";
}

/// An untyped field map as received from a request.
///
/// Unknown fields are treated as noise to be dropped, never rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocument {
    map: Map<String, Value>,
}

impl RawDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self { map }
    }

    /// Build from string key/value pairs (query-string style input).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { map }
    }

    /// True if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True if the field is present (any value, including null).
    pub fn contains(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    /// Get a field's value, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.map.get(field)
    }

    /// Set a field, overwriting any caller-supplied value.
    pub fn set(&mut self, field: &str, value: Value) {
        self.map.insert(field.to_string(), value);
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.map.remove(field)
    }

    /// Drop every field whose value is the empty string.
    pub fn drop_empty_strings(&mut self) {
        self.map
            .retain(|_, v| !matches!(v, Value::String(s) if s.is_empty()));
    }

    /// Drop every field whose name is not in the whitelist.
    pub fn retain_whitelist(&mut self, whitelist: &[&str]) {
        self.map.retain(|k, _| whitelist.contains(&k.as_str()));
    }

    /// Iterate over the present fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    /// Consume the wrapper, yielding the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }
}

impl From<Map<String, Value>> for RawDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> RawDocument {
        match value {
            Value::Object(map) => RawDocument::from_map(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_and_presence() {
        let d = RawDocument::new();
        assert!(d.is_empty());

        let d = doc(json!({"title": "T", "noise": null}));
        assert!(!d.is_empty());
        assert!(d.contains("title"));
        assert!(d.contains("noise"));
        assert!(!d.contains("text"));
    }

    #[test]
    fn test_drop_empty_strings() {
        let mut d = doc(json!({"title": "T", "assignee": "", "open": false}));
        d.drop_empty_strings();
        assert!(d.contains("title"));
        assert!(!d.contains("assignee"));
        // non-string falsy values survive
        assert!(d.contains("open"));
    }

    #[test]
    fn test_retain_whitelist() {
        let mut d = doc(json!({"title": "T", "hacker": "x", "project": "p"}));
        d.retain_whitelist(&["title", "project"]);
        assert!(d.contains("title"));
        assert!(d.contains("project"));
        assert!(!d.contains("hacker"));
    }

    #[test]
    fn test_retain_whitelist_is_idempotent() {
        let mut d = doc(json!({"title": "T", "junk": 1}));
        d.retain_whitelist(&["title"]);
        let once = d.clone();
        d.retain_whitelist(&["title"]);
        assert_eq!(d, once);
    }

    #[test]
    fn test_set_overwrites() {
        let mut d = doc(json!({"project": "spoofed"}));
        d.set(fields::PROJECT, json!("real"));
        assert_eq!(d.get(fields::PROJECT), Some(&json!("real")));
    }

    #[test]
    fn test_from_pairs() {
        let d = RawDocument::from_pairs(vec![("open", "false"), ("creator", "c")]);
        assert_eq!(d.get("open"), Some(&json!("false")));
        assert_eq!(d.get("creator"), Some(&json!("c")));
    }
}
