//! # trackd-core
//!
//! Core types, traits, and the document-builder layer for trackd.
//!
//! This crate provides the issue data model, the shared validation rule
//! table, and the three request builders (insert, update, filter) that
//! turn raw request input into sanitized, schema-conformant documents.

pub mod document;
pub mod error;
pub mod issue;
pub mod logging;
pub mod models;
pub mod rules;
pub mod traits;

// Re-export commonly used types at crate root
pub use document::{fields, RawDocument};
pub use error::{Error, Result};
pub use issue::{FilterBuilder, InsertBuilder, UpdateBuilder};
pub use models::{Deletion, Issue, IssueFilter, IssueUpdate};
pub use rules::{TransformProfile, FILTER_PROFILE, INSERT_PROFILE, UPDATE_PROFILE};
pub use traits::IssueRepository;
