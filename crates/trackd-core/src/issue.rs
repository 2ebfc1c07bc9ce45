//! Document builders for insert, update, and filter operations.
//!
//! Each builder is a stateless transform over a single request's raw field
//! map: validation (shared rule table) → sanitization (drop blank fields,
//! drop unrecognized fields, apply defaults/coercions) → typed output.
//! Builders never error on validation failure; they report through the
//! boolean queries, which callers must check before sanitizing. The typed
//! finishers only error if that protocol was skipped.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::document::{fields, RawDocument};
use crate::error::{Error, Result};
use crate::models::{Issue, IssueFilter, IssueUpdate};
use crate::rules::{self, coerce_open, FILTER_PROFILE, INSERT_PROFILE, UPDATE_PROFILE};

/// Extract an optional string field; a present non-string is a protocol
/// violation surfaced with the builder's own error kind.
fn string_field(doc: &RawDocument, field: &str) -> std::result::Result<Option<String>, ()> {
    match doc.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(()),
    }
}

fn timestamp_field(doc: &RawDocument, field: &str) -> std::result::Result<Option<DateTime<Utc>>, ()> {
    match string_field(doc, field)? {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| ()),
    }
}

// =============================================================================
// INSERT
// =============================================================================

/// Validates and normalizes a new-issue payload into a ready-to-persist
/// document.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    doc: RawDocument,
}

impl InsertBuilder {
    /// Construct from a raw field map and the project scope. The project
    /// is force-set, overwriting any caller-supplied value.
    pub fn new(mut doc: RawDocument, project: &str) -> Self {
        doc.set(fields::PROJECT, Value::String(project.to_string()));
        Self { doc }
    }

    /// True if any create-required field (`title`, `text`, `creator`) is
    /// absent. Callers check this before validating and surface it as a
    /// missing-input failure.
    pub fn lacks_required(&self) -> bool {
        INSERT_PROFILE.lacks_required(&self.doc)
    }

    /// Run the shared rule table. Callers check before sanitizing and
    /// surface a violation as an invalid-input failure.
    pub fn is_invalid(&self) -> bool {
        rules::is_invalid(&self.doc)
    }

    /// Sanitization pipeline: drop empty-string fields, trim to the insert
    /// whitelist, then apply defaults — generate `id`, stamp `created_at`
    /// (and a matching `updated_at`) if absent, and coerce `open`
    /// (`"true"`/`"false"` strings, anything else including absent → true).
    pub fn sanitize(mut self) -> Self {
        self.doc.drop_empty_strings();
        self.doc.retain_whitelist(INSERT_PROFILE.whitelist);

        if !self.doc.contains(fields::ID) {
            self.doc
                .set(fields::ID, Value::String(Uuid::now_v7().to_string()));
        }
        if !self.doc.contains(fields::CREATED_AT) {
            let now = Utc::now();
            self.doc
                .set(fields::CREATED_AT, Value::String(now.to_rfc3339()));
            self.doc
                .set(fields::UPDATED_AT, Value::String(now.to_rfc3339()));
        }
        let open = self
            .doc
            .get(fields::OPEN)
            .and_then(coerce_open)
            .unwrap_or(true);
        self.doc.set(fields::OPEN, Value::Bool(open));

        self
    }

    /// The current working document.
    pub fn document(&self) -> &RawDocument {
        &self.doc
    }

    /// Finish into the typed document ready for a single-document insert.
    pub fn into_issue(self) -> Result<Issue> {
        let doc = &self.doc;
        let err = || Error::InvalidInput;

        let id = string_field(doc, fields::ID)
            .map_err(|_| err())?
            .and_then(|s| Uuid::parse_str(&s).ok())
            .ok_or_else(err)?;
        let project = string_field(doc, fields::PROJECT)
            .map_err(|_| err())?
            .ok_or_else(err)?;
        let title = string_field(doc, fields::TITLE)
            .map_err(|_| err())?
            .ok_or_else(err)?;
        let text = string_field(doc, fields::TEXT)
            .map_err(|_| err())?
            .ok_or_else(err)?;
        let creator = string_field(doc, fields::CREATOR)
            .map_err(|_| err())?
            .ok_or_else(err)?;
        let assignee = string_field(doc, fields::ASSIGNEE).map_err(|_| err())?;
        let status_note = string_field(doc, fields::STATUS_NOTE).map_err(|_| err())?;
        let created_at = timestamp_field(doc, fields::CREATED_AT)
            .map_err(|_| err())?
            .ok_or_else(err)?;
        let updated_at = timestamp_field(doc, fields::UPDATED_AT)
            .map_err(|_| err())?
            .unwrap_or(created_at);
        let open = match doc.get(fields::OPEN) {
            Some(Value::Bool(b)) => *b,
            _ => return Err(err()),
        };

        Ok(Issue {
            id,
            project,
            title,
            text,
            creator,
            assignee,
            status_note,
            created_at,
            updated_at,
            open,
            deletion: Default::default(),
        })
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Validates and normalizes a partial-update payload into a set-only
/// update descriptor. The identifier and project are supplied separately
/// by the caller and never travel in this payload.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    doc: RawDocument,
}

impl UpdateBuilder {
    pub fn new(doc: RawDocument) -> Self {
        Self { doc }
    }

    /// True if the payload names no fields at all. Callers reject an empty
    /// payload before invoking `sanitize`, since emptiness is judged on
    /// the fields the caller intends to change.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn is_invalid(&self) -> bool {
        rules::is_invalid(&self.doc)
    }

    /// Trim to the update whitelist, drop empty-string fields, and coerce
    /// `open` string↔bool if present. No default is injected for `open`.
    pub fn sanitize(mut self) -> Self {
        self.doc.retain_whitelist(UPDATE_PROFILE.whitelist);
        self.doc.drop_empty_strings();
        if let Some(open) = self.doc.get(fields::OPEN).and_then(coerce_open) {
            self.doc.set(fields::OPEN, Value::Bool(open));
        }
        self
    }

    pub fn document(&self) -> &RawDocument {
        &self.doc
    }

    /// Finish into the set-only descriptor, unconditionally stamping
    /// `updated_at` with the current time.
    pub fn into_update(self) -> Result<IssueUpdate> {
        let doc = &self.doc;
        let err = || Error::InvalidInput;

        let open = match doc.get(fields::OPEN) {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => return Err(err()),
        };

        Ok(IssueUpdate {
            title: string_field(doc, fields::TITLE).map_err(|_| err())?,
            text: string_field(doc, fields::TEXT).map_err(|_| err())?,
            creator: string_field(doc, fields::CREATOR).map_err(|_| err())?,
            assignee: string_field(doc, fields::ASSIGNEE).map_err(|_| err())?,
            status_note: string_field(doc, fields::STATUS_NOTE).map_err(|_| err())?,
            open,
            updated_at: Utc::now(),
        })
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Validates and normalizes query parameters into a filter predicate
/// scoped to a project and excluding soft-deleted records.
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    doc: RawDocument,
}

impl FilterBuilder {
    /// Construct from a raw query field map and the project scope. The
    /// project is force-set, overwriting any caller-supplied value.
    pub fn new(mut doc: RawDocument, project: &str) -> Self {
        doc.set(fields::PROJECT, Value::String(project.to_string()));
        Self { doc }
    }

    pub fn is_invalid(&self) -> bool {
        rules::is_invalid(&self.doc)
    }

    /// Drop empty-string fields and trim to the filter whitelist.
    pub fn sanitize(mut self) -> Self {
        self.doc.drop_empty_strings();
        self.doc.retain_whitelist(FILTER_PROFILE.whitelist);
        self
    }

    pub fn document(&self) -> &RawDocument {
        &self.doc
    }

    /// Finish into the typed predicate: `id` converted to the native
    /// identifier, timestamps parsed, `open` carried exactly as given,
    /// and the not-soft-deleted condition always applied.
    pub fn into_filter(self) -> Result<IssueFilter> {
        let doc = &self.doc;
        let err = || Error::InvalidQuery;

        let id = string_field(doc, fields::ID)
            .map_err(|_| err())?
            .map(|s| Uuid::parse_str(&s).map_err(|_| err()))
            .transpose()?;
        let project = string_field(doc, fields::PROJECT)
            .map_err(|_| err())?
            .ok_or_else(err)?;

        Ok(IssueFilter {
            project,
            id,
            title: string_field(doc, fields::TITLE).map_err(|_| err())?,
            text: string_field(doc, fields::TEXT).map_err(|_| err())?,
            creator: string_field(doc, fields::CREATOR).map_err(|_| err())?,
            assignee: string_field(doc, fields::ASSIGNEE).map_err(|_| err())?,
            status_note: string_field(doc, fields::STATUS_NOTE).map_err(|_| err())?,
            open: doc.get(fields::OPEN).cloned(),
            created_at: timestamp_field(doc, fields::CREATED_AT).map_err(|_| err())?,
            updated_at: timestamp_field(doc, fields::UPDATED_AT).map_err(|_| err())?,
            include_deleted: false,
        })
    }
}
