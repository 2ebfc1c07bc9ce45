//! Issue data model and the typed builder outputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::rules::coerce_open;

/// Soft-delete state of an issue.
///
/// Kept as an explicit tri-state on the entity rather than key-absence, so
/// "never deleted" and "explicitly cleared" cannot be confused. On the
/// wire this serializes as an optional `deleted_at` timestamp; live issues
/// omit the key entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "Option<DateTime<Utc>>",
    into = "Option<DateTime<Utc>>"
)]
pub enum Deletion {
    #[default]
    NotDeleted,
    DeletedAt(DateTime<Utc>),
}

impl Deletion {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Deletion::DeletedAt(_))
    }

    pub fn is_not_deleted(&self) -> bool {
        !self.is_deleted()
    }

    /// The deletion timestamp, if deleted.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Deletion::NotDeleted => None,
            Deletion::DeletedAt(ts) => Some(*ts),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Deletion {
    fn from(ts: Option<DateTime<Utc>>) -> Self {
        match ts {
            None => Deletion::NotDeleted,
            Some(ts) => Deletion::DeletedAt(ts),
        }
    }
}

impl From<Deletion> for Option<DateTime<Utc>> {
    fn from(d: Deletion) -> Self {
        d.deleted_at()
    }
}

/// One issue record as stored and transacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier, generated at insert if not supplied (UUIDv7).
    pub id: Uuid,
    /// Project scoping key. Immutable, always present.
    pub project: String,
    pub title: String,
    pub text: String,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    /// Set exactly once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful update; never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
    pub open: bool,
    #[serde(
        rename = "deleted_at",
        default,
        skip_serializing_if = "Deletion::is_not_deleted"
    )]
    pub deletion: Deletion,
}

impl Issue {
    pub fn is_deleted(&self) -> bool {
        self.deletion.is_deleted()
    }
}

/// A set-only update descriptor over named issue fields.
///
/// `updated_at` is always stamped; the remaining fields are applied only
/// when present. Never a full-document replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub text: Option<String>,
    pub creator: Option<String>,
    pub assignee: Option<String>,
    pub status_note: Option<String>,
    pub open: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl IssueUpdate {
    /// Number of caller-supplied fields to set (excluding `updated_at`).
    pub fn set_field_count(&self) -> usize {
        [
            self.title.is_some(),
            self.text.is_some(),
            self.creator.is_some(),
            self.assignee.is_some(),
            self.status_note.is_some(),
            self.open.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// An equality filter over whitelisted issue fields, scoped to a project
/// and always excluding soft-deleted documents.
///
/// `open` is carried exactly as supplied (string or boolean) with no
/// coercion; consumers relying on boolean semantics must pass the coerced
/// representation. All other conditions are typed: `id` is converted to
/// the native identifier, timestamps are parsed RFC 3339.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueFilter {
    pub project: String,
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub creator: Option<String>,
    pub assignee: Option<String>,
    pub status_note: Option<String>,
    pub open: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Always false when produced by `FilterBuilder`; soft-deleted
    /// documents are excluded from every default operation.
    pub include_deleted: bool,
}

impl IssueFilter {
    /// Evaluate the predicate against an issue in memory.
    ///
    /// This is the reference semantics the SQL repository mirrors: plain
    /// equality per condition, with `open` matched against the coerced
    /// representation of the value as given (a value with no boolean
    /// representation matches nothing).
    pub fn matches(&self, issue: &Issue) -> bool {
        if issue.project != self.project {
            return false;
        }
        if issue.is_deleted() && !self.include_deleted {
            return false;
        }
        if let Some(id) = self.id {
            if issue.id != id {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if &issue.title != title {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if &issue.text != text {
                return false;
            }
        }
        if let Some(creator) = &self.creator {
            if &issue.creator != creator {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if issue.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if let Some(status_note) = &self.status_note {
            if issue.status_note.as_deref() != Some(status_note.as_str()) {
                return false;
            }
        }
        if let Some(open) = &self.open {
            if coerce_open(open) != Some(issue.open) {
                return false;
            }
        }
        if let Some(created_at) = self.created_at {
            if issue.created_at != created_at {
                return false;
            }
        }
        if let Some(updated_at) = self.updated_at {
            if issue.updated_at != updated_at {
                return false;
            }
        }
        true
    }
}
