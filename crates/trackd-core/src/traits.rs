//! Repository abstraction for the issue store.
//!
//! The builders never talk to the store directly; handlers pass their
//! typed outputs to an implementation of this trait. Implementations must
//! guarantee single-document atomicity per call; no multi-document
//! transactions are required.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Issue, IssueFilter, IssueUpdate};

/// Maximum number of documents a find may return.
pub const MAX_FIND_RESULTS: i64 = 1000;

/// Repository for issue CRUD operations.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Persist a sanitized document. Exactly one row must be inserted;
    /// the complete persisted document is returned.
    async fn insert(&self, issue: Issue) -> Result<Issue>;

    /// Find all live documents matching the predicate, capped at
    /// [`MAX_FIND_RESULTS`].
    async fn find(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Apply a set-only update to the documents matching the predicate.
    /// Returns the number of documents modified; callers treat anything
    /// other than exactly one as a failure.
    async fn update(&self, filter: &IssueFilter, update: &IssueUpdate) -> Result<u64>;

    /// Soft-delete the documents matching the predicate by stamping their
    /// deletion timestamp. Returns the number of documents modified.
    async fn soft_delete(&self, filter: &IssueFilter) -> Result<u64>;
}
