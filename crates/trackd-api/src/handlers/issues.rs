//! Issue CRUD handlers.
//!
//! Each handler runs the same shape of pipeline: raw payload into a
//! builder, presence/validity checks surfaced as client errors, then the
//! sanitized typed value handed to the repository. Success bodies for
//! update and delete are plain text, matching the stable message contract.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use trackd_core::{
    fields, Error, FilterBuilder, InsertBuilder, Issue, IssueRepository, RawDocument,
    UpdateBuilder,
};

use crate::{ApiError, AppState};

/// POST /api/issues/:project
///
/// Create an issue from a JSON body. Requires `title`, `text`, and
/// `creator`; everything else is optional or defaulted.
pub async fn create_issue(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Issue>, ApiError> {
    let builder = InsertBuilder::new(RawDocument::from_map(body), &project);

    if builder.lacks_required() {
        return Err(Error::MissingRequiredInput.into());
    }
    if builder.is_invalid() {
        return Err(Error::InvalidInput.into());
    }

    let issue = builder.sanitize().into_issue()?;

    debug!(project = %project, issue_id = %issue.id, "Creating issue");

    let persisted = state.db.issues.insert(issue).await.map_err(|e| {
        warn!(project = %project, error = %e, "Issue insert failed");
        Error::SaveFailed
    })?;

    Ok(Json(persisted))
}

/// GET /api/issues/:project
///
/// List issues matching the query-string filter. Soft-deleted issues are
/// never returned.
pub async fn list_issues(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let builder = FilterBuilder::new(RawDocument::from_pairs(params), &project);

    if builder.is_invalid() {
        return Err(Error::InvalidQuery.into());
    }

    let filter = builder.sanitize().into_filter()?;

    let issues = state.db.issues.find(&filter).await.map_err(|e| {
        warn!(project = %project, error = %e, "Issue query failed");
        Error::FetchFailed
    })?;

    debug!(project = %project, result_count = issues.len(), "Listed issues");

    Ok(Json(issues))
}

/// PUT /api/issues/:project
///
/// Apply a partial update to the issue named by `id` in the JSON body.
/// The body must carry `id` plus at least one updatable field.
pub async fn update_issue(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<String, ApiError> {
    let id_value = body.remove(fields::ID);

    let builder = UpdateBuilder::new(RawDocument::from_map(body));
    if builder.is_empty() {
        return Err(Error::EmptyUpdate.into());
    }

    let id = match id_value {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(Error::MissingId.into()),
    };

    let target = FilterBuilder::new(RawDocument::from_pairs([(fields::ID, id.as_str())]), &project);
    if target.is_invalid() {
        return Err(Error::InvalidQuery.into());
    }
    if builder.is_invalid() {
        return Err(Error::InvalidInput.into());
    }

    let filter = target.sanitize().into_filter()?;
    let update = builder.sanitize().into_update()?;

    let affected = state
        .db
        .issues
        .update(&filter, &update)
        .await
        .map_err(|e| {
            warn!(project = %project, issue_id = %id, error = %e, "Issue update failed");
            Error::UpdateFailed(id.clone())
        })?;

    if affected != 1 {
        return Err(Error::UpdateFailed(id).into());
    }

    debug!(project = %project, issue_id = %id, "Updated issue");

    Ok("successfully updated".to_string())
}

/// DELETE /api/issues/:project
///
/// Soft-delete the issue named by `id`, taken from the query string or,
/// failing that, from an optional JSON body.
pub async fn delete_issue(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Option<Json<Map<String, Value>>>,
) -> Result<String, ApiError> {
    let query_doc = RawDocument::from_pairs(params);
    let body_doc = body.map(|Json(map)| RawDocument::from_map(map));

    let doc = if query_doc.contains(fields::ID) {
        query_doc
    } else {
        match body_doc {
            Some(doc) if doc.contains(fields::ID) => doc,
            _ => return Err(Error::IdRequired.into()),
        }
    };

    let id = match doc.get(fields::ID) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(Error::IdRequired.into()),
    };

    let builder = FilterBuilder::new(RawDocument::from_pairs([(fields::ID, id.as_str())]), &project);
    if builder.is_invalid() {
        return Err(Error::InvalidQuery.into());
    }

    let filter = builder.sanitize().into_filter()?;

    let affected = state.db.issues.soft_delete(&filter).await.map_err(|e| {
        warn!(project = %project, issue_id = %id, error = %e, "Issue delete failed");
        Error::DeleteFailed(id.clone())
    })?;

    if affected != 1 {
        return Err(Error::DeleteFailed(id).into());
    }

    debug!(project = %project, issue_id = %id, "Soft-deleted issue");

    Ok(format!("deleted {id}"))
}
