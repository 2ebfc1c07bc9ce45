//! Shared validation rule table and builder profiles.
//!
//! One static table maps each schema field to an `invalid` predicate. A
//! rule fires only when the field is present — absence is never itself
//! invalid here; required-field presence is the caller's check, made
//! before validation runs. Validation is single-pass and any-failure
//! aborts: the first present-and-violated rule marks the whole document
//! invalid.
//!
//! The three builders differ only in their whitelist and required set,
//! captured as [`TransformProfile`] constants.

use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use crate::document::{fields, RawDocument};

/// Maximum length of `title` in characters.
pub const MAX_TITLE_LEN: usize = 1024;
/// Maximum length of `text` in characters.
pub const MAX_TEXT_LEN: usize = 65536;
/// Maximum length of `creator` in characters.
pub const MAX_CREATOR_LEN: usize = 64;
/// Maximum length of `assignee` in characters.
pub const MAX_ASSIGNEE_LEN: usize = 64;
/// Maximum length of `status_note` in characters.
pub const MAX_STATUS_NOTE_LEN: usize = 1024;

/// A single field rule: fires when the field is present and malformed.
pub struct ValidationRule {
    pub field: &'static str,
    pub invalid: fn(&Value) -> bool,
}

/// The shared rule table, applied by all three builders.
pub const RULES: &[ValidationRule] = &[
    ValidationRule {
        field: fields::TITLE,
        invalid: invalid_title,
    },
    ValidationRule {
        field: fields::TEXT,
        invalid: invalid_text,
    },
    ValidationRule {
        field: fields::CREATOR,
        invalid: invalid_creator,
    },
    ValidationRule {
        field: fields::ASSIGNEE,
        invalid: invalid_assignee,
    },
    ValidationRule {
        field: fields::STATUS_NOTE,
        invalid: invalid_status_note,
    },
    ValidationRule {
        field: fields::OPEN,
        invalid: invalid_open,
    },
    ValidationRule {
        field: fields::CREATED_AT,
        invalid: invalid_timestamp,
    },
    ValidationRule {
        field: fields::UPDATED_AT,
        invalid: invalid_timestamp,
    },
    ValidationRule {
        field: fields::ID,
        invalid: invalid_id,
    },
];

/// Return the first present-and-violated field, if any.
pub fn first_violation(doc: &RawDocument) -> Option<&'static str> {
    RULES.iter().find_map(|rule| {
        let value = doc.get(rule.field)?;
        (rule.invalid)(value).then_some(rule.field)
    })
}

/// True if any present field violates its rule.
pub fn is_invalid(doc: &RawDocument) -> bool {
    first_violation(doc).is_some()
}

/// Coerce an `open` value to a boolean.
///
/// Accepts actual booleans and the strings `"true"`/`"false"`; anything
/// else yields `None` (a validation failure when present).
pub fn coerce_open(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn over_length(value: &Value, max: usize) -> bool {
    match value {
        Value::String(s) => s.chars().count() > max,
        _ => true,
    }
}

fn invalid_title(value: &Value) -> bool {
    over_length(value, MAX_TITLE_LEN)
}

fn invalid_text(value: &Value) -> bool {
    over_length(value, MAX_TEXT_LEN)
}

fn invalid_creator(value: &Value) -> bool {
    over_length(value, MAX_CREATOR_LEN)
}

fn invalid_assignee(value: &Value) -> bool {
    over_length(value, MAX_ASSIGNEE_LEN)
}

fn invalid_status_note(value: &Value) -> bool {
    over_length(value, MAX_STATUS_NOTE_LEN)
}

fn invalid_open(value: &Value) -> bool {
    coerce_open(value).is_none()
}

fn invalid_timestamp(value: &Value) -> bool {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).is_err(),
        _ => true,
    }
}

fn invalid_id(value: &Value) -> bool {
    match value {
        Value::String(s) => Uuid::parse_str(s).is_err(),
        _ => true,
    }
}

// =============================================================================
// BUILDER PROFILES
// =============================================================================

/// The per-builder parameterization of the shared document transform:
/// which fields survive sanitization and which must be present.
pub struct TransformProfile {
    pub whitelist: &'static [&'static str],
    pub required: &'static [&'static str],
}

impl TransformProfile {
    /// True if any required field is absent from the document.
    pub fn lacks_required(&self, doc: &RawDocument) -> bool {
        self.required.iter().any(|field| !doc.contains(field))
    }
}

/// Fields an insert may persist; `title`, `text`, `creator` must be present.
pub const INSERT_PROFILE: TransformProfile = TransformProfile {
    whitelist: &[
        fields::TITLE,
        fields::TEXT,
        fields::CREATOR,
        fields::ASSIGNEE,
        fields::STATUS_NOTE,
        fields::OPEN,
        fields::PROJECT,
    ],
    required: &[fields::TITLE, fields::TEXT, fields::CREATOR],
};

/// Fields an update may set. Identifier and project are supplied
/// separately by the caller and never travel in the payload.
pub const UPDATE_PROFILE: TransformProfile = TransformProfile {
    whitelist: &[
        fields::TITLE,
        fields::TEXT,
        fields::CREATOR,
        fields::ASSIGNEE,
        fields::STATUS_NOTE,
        fields::OPEN,
    ],
    required: &[],
};

/// Fields a query may filter on.
pub const FILTER_PROFILE: TransformProfile = TransformProfile {
    whitelist: &[
        fields::PROJECT,
        fields::TITLE,
        fields::TEXT,
        fields::CREATOR,
        fields::ASSIGNEE,
        fields::STATUS_NOTE,
        fields::OPEN,
        fields::CREATED_AT,
        fields::UPDATED_AT,
        fields::ID,
    ],
    required: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RawDocument {
        match value {
            Value::Object(map) => RawDocument::from_map(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_absent_fields_never_invalid() {
        assert!(!is_invalid(&RawDocument::new()));
        assert!(!is_invalid(&doc(json!({"unknown": 42}))));
    }

    #[test]
    fn test_string_length_rules() {
        assert!(!is_invalid(&doc(json!({"title": "T"}))));
        assert!(!is_invalid(&doc(json!({"title": "x".repeat(1024)}))));
        assert!(is_invalid(&doc(json!({"title": "x".repeat(1025)}))));
        assert!(is_invalid(&doc(json!({"title": 7}))));

        assert!(!is_invalid(&doc(json!({"text": "x".repeat(65536)}))));
        assert!(is_invalid(&doc(json!({"text": "x".repeat(65537)}))));

        assert!(!is_invalid(&doc(json!({"creator": "x".repeat(64)}))));
        assert!(is_invalid(&doc(json!({"creator": "x".repeat(65)}))));
        assert!(is_invalid(&doc(json!({"assignee": "x".repeat(65)}))));
        assert!(is_invalid(&doc(json!({"status_note": "x".repeat(1025)}))));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 64 multi-byte characters are within the creator limit
        let s: String = "é".repeat(64);
        assert!(!is_invalid(&doc(json!({ "creator": s }))));
    }

    #[test]
    fn test_open_rule() {
        assert!(!is_invalid(&doc(json!({"open": true}))));
        assert!(!is_invalid(&doc(json!({"open": false}))));
        assert!(!is_invalid(&doc(json!({"open": "true"}))));
        assert!(!is_invalid(&doc(json!({"open": "false"}))));
        assert!(is_invalid(&doc(json!({"open": "yes"}))));
        assert!(is_invalid(&doc(json!({"open": 1}))));
        assert!(is_invalid(&doc(json!({"open": null}))));
    }

    #[test]
    fn test_timestamp_rules() {
        assert!(!is_invalid(&doc(
            json!({"created_at": "2026-08-29T12:00:00Z"})
        )));
        assert!(!is_invalid(&doc(
            json!({"updated_at": "2026-08-29T12:00:00+02:00"})
        )));
        assert!(is_invalid(&doc(json!({"created_at": "yesterday"}))));
        assert!(is_invalid(&doc(json!({"updated_at": 1693300000}))));
    }

    #[test]
    fn test_id_rule() {
        assert!(!is_invalid(&doc(
            json!({"id": "0189f3a0-0000-7000-8000-000000000000"})
        )));
        assert!(is_invalid(&doc(json!({"id": "not-a-uuid"}))));
        assert!(is_invalid(&doc(json!({"id": 42}))));
    }

    #[test]
    fn test_first_violation_reports_field() {
        let d = doc(json!({"title": "ok", "open": "maybe"}));
        assert_eq!(first_violation(&d), Some(fields::OPEN));
        assert_eq!(first_violation(&RawDocument::new()), None);
    }

    #[test]
    fn test_coerce_open_totality() {
        assert_eq!(coerce_open(&json!("true")), Some(true));
        assert_eq!(coerce_open(&json!("false")), Some(false));
        assert_eq!(coerce_open(&json!(true)), Some(true));
        assert_eq!(coerce_open(&json!(false)), Some(false));
        assert_eq!(coerce_open(&json!("open")), None);
        assert_eq!(coerce_open(&json!(0)), None);
    }

    #[test]
    fn test_lacks_required() {
        let full = doc(json!({"title": "T", "text": "x", "creator": "c"}));
        assert!(!INSERT_PROFILE.lacks_required(&full));

        for missing in ["title", "text", "creator"] {
            let mut d = full.clone();
            d.remove(missing);
            assert!(
                INSERT_PROFILE.lacks_required(&d),
                "should lack required when {missing} absent"
            );
        }

        assert!(!UPDATE_PROFILE.lacks_required(&RawDocument::new()));
        assert!(!FILTER_PROFILE.lacks_required(&RawDocument::new()));
    }
}
