//! Issue repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use trackd_core::rules::coerce_open;
use trackd_core::{
    Deletion, Error, Issue, IssueFilter, IssueRepository, IssueUpdate, Result,
    traits::MAX_FIND_RESULTS,
};

/// Columns of the `issue` table, in the order `map_row_to_issue` reads them.
const ISSUE_COLUMNS: &str =
    "id, project, title, text, creator, assignee, status_note, created_at, updated_at, open, deleted_at";

/// PostgreSQL implementation of IssueRepository.
pub struct PgIssueRepository {
    pool: Pool<Postgres>,
}

impl PgIssueRepository {
    /// Create a new PgIssueRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =============================================================================
// HELPER FUNCTIONS FOR QUERY BUILDING
// =============================================================================

/// Build the WHERE clause for a filter predicate, advancing `param_idx`
/// past every placeholder it emits. Conditions are emitted in the same
/// fixed order `bind_filter_params!` binds them.
fn build_where_clause(filter: &IssueFilter, param_idx: &mut usize) -> String {
    let mut sql = format!("project = ${}", param_idx);
    *param_idx += 1;

    if !filter.include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    if filter.id.is_some() {
        sql.push_str(&format!(" AND id = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.title.is_some() {
        sql.push_str(&format!(" AND title = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.text.is_some() {
        sql.push_str(&format!(" AND text = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.creator.is_some() {
        sql.push_str(&format!(" AND creator = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.assignee.is_some() {
        sql.push_str(&format!(" AND assignee = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.status_note.is_some() {
        sql.push_str(&format!(" AND status_note = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.open.is_some() {
        sql.push_str(&format!(" AND open = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.created_at.is_some() {
        sql.push_str(&format!(" AND created_at = ${}", param_idx));
        *param_idx += 1;
    }
    if filter.updated_at.is_some() {
        sql.push_str(&format!(" AND updated_at = ${}", param_idx));
        *param_idx += 1;
    }
    sql
}

/// Build the SET clause for an update descriptor. `updated_at` is always
/// first; the caller-supplied fields follow in bind order.
fn build_set_clause(update: &IssueUpdate, param_idx: &mut usize) -> String {
    let mut sets = vec![format!("updated_at = ${}", param_idx)];
    *param_idx += 1;

    let mut push = |column: &str, present: bool, idx: &mut usize| {
        if present {
            sets.push(format!("{} = ${}", column, idx));
            *idx += 1;
        }
    };
    push("title", update.title.is_some(), param_idx);
    push("text", update.text.is_some(), param_idx);
    push("creator", update.creator.is_some(), param_idx);
    push("assignee", update.assignee.is_some(), param_idx);
    push("status_note", update.status_note.is_some(), param_idx);
    push("open", update.open.is_some(), param_idx);

    sets.join(", ")
}

/// Bind filter parameters in the order `build_where_clause` numbered them.
///
/// The `open` condition binds the coerced boolean representation of the
/// value as given; a value with no boolean representation binds NULL,
/// which matches no row.
macro_rules! bind_filter_params {
    ($query:expr, $filter:expr) => {{
        let mut q = $query.bind(&$filter.project);
        if let Some(id) = $filter.id {
            q = q.bind(id);
        }
        if let Some(v) = &$filter.title {
            q = q.bind(v);
        }
        if let Some(v) = &$filter.text {
            q = q.bind(v);
        }
        if let Some(v) = &$filter.creator {
            q = q.bind(v);
        }
        if let Some(v) = &$filter.assignee {
            q = q.bind(v);
        }
        if let Some(v) = &$filter.status_note {
            q = q.bind(v);
        }
        if let Some(v) = &$filter.open {
            q = q.bind(coerce_open(v));
        }
        if let Some(ts) = $filter.created_at {
            q = q.bind(ts);
        }
        if let Some(ts) = $filter.updated_at {
            q = q.bind(ts);
        }
        q
    }};
}

/// Bind update parameters in the order `build_set_clause` numbered them.
macro_rules! bind_update_params {
    ($query:expr, $update:expr) => {{
        let mut q = $query.bind($update.updated_at);
        if let Some(v) = &$update.title {
            q = q.bind(v);
        }
        if let Some(v) = &$update.text {
            q = q.bind(v);
        }
        if let Some(v) = &$update.creator {
            q = q.bind(v);
        }
        if let Some(v) = &$update.assignee {
            q = q.bind(v);
        }
        if let Some(v) = &$update.status_note {
            q = q.bind(v);
        }
        if let Some(v) = $update.open {
            q = q.bind(v);
        }
        q
    }};
}

/// Map a database row to an Issue.
fn map_row_to_issue(row: PgRow) -> Issue {
    Issue {
        id: row.get("id"),
        project: row.get("project"),
        title: row.get("title"),
        text: row.get("text"),
        creator: row.get("creator"),
        assignee: row.get("assignee"),
        status_note: row.get("status_note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        open: row.get("open"),
        deletion: Deletion::from(row.get::<Option<DateTime<Utc>>, _>("deleted_at")),
    }
}

#[async_trait]
impl IssueRepository for PgIssueRepository {
    async fn insert(&self, issue: Issue) -> Result<Issue> {
        let sql = format!(
            "INSERT INTO issue \
                 (id, project, title, text, creator, assignee, status_note, \
                  created_at, updated_at, open) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            ISSUE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(issue.id)
            .bind(&issue.project)
            .bind(&issue.title)
            .bind(&issue.text)
            .bind(&issue.creator)
            .bind(&issue.assignee)
            .bind(&issue.status_note)
            .bind(issue.created_at)
            .bind(issue.updated_at)
            .bind(issue.open)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let persisted = map_row_to_issue(row);
        tracing::debug!(
            subsystem = "db",
            component = "issues",
            op = "insert",
            project = %persisted.project,
            issue_id = %persisted.id,
            "Issue inserted"
        );
        Ok(persisted)
    }

    async fn find(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut param_idx = 1;
        let where_sql = build_where_clause(filter, &mut param_idx);
        let sql = format!(
            "SELECT {} FROM issue WHERE {} ORDER BY created_at ASC LIMIT {}",
            ISSUE_COLUMNS, where_sql, MAX_FIND_RESULTS
        );

        let rows = bind_filter_params!(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "issues",
            op = "find",
            project = %filter.project,
            result_count = rows.len(),
            "Issues fetched"
        );
        Ok(rows.into_iter().map(map_row_to_issue).collect())
    }

    async fn update(&self, filter: &IssueFilter, update: &IssueUpdate) -> Result<u64> {
        let mut param_idx = 1;
        let set_sql = build_set_clause(update, &mut param_idx);
        let where_sql = build_where_clause(filter, &mut param_idx);
        let sql = format!("UPDATE issue SET {} WHERE {}", set_sql, where_sql);

        let q = bind_update_params!(sqlx::query(&sql), update);
        let result = bind_filter_params!(q, filter)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "issues",
            op = "update",
            project = %filter.project,
            rows_affected = result.rows_affected(),
            "Issue update applied"
        );
        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, filter: &IssueFilter) -> Result<u64> {
        let mut param_idx = 2;
        let where_sql = build_where_clause(filter, &mut param_idx);
        let sql = format!("UPDATE issue SET deleted_at = $1 WHERE {}", where_sql);

        let q = sqlx::query(&sql).bind(Utc::now());
        let result = bind_filter_params!(q, filter)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "issues",
            op = "soft_delete",
            project = %filter.project,
            rows_affected = result.rows_affected(),
            "Issue soft-deleted"
        );
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn empty_filter(project: &str) -> IssueFilter {
        IssueFilter {
            project: project.to_string(),
            id: None,
            title: None,
            text: None,
            creator: None,
            assignee: None,
            status_note: None,
            open: None,
            created_at: None,
            updated_at: None,
            include_deleted: false,
        }
    }

    #[test]
    fn test_where_clause_always_excludes_deleted() {
        let mut idx = 1;
        let sql = build_where_clause(&empty_filter("p"), &mut idx);
        assert_eq!(sql, "project = $1 AND deleted_at IS NULL");
        assert_eq!(idx, 2);
    }

    #[test]
    fn test_where_clause_numbers_conditions_in_bind_order() {
        let mut filter = empty_filter("p");
        filter.id = Some(Uuid::now_v7());
        filter.creator = Some("c".to_string());
        filter.open = Some(json!("false"));

        let mut idx = 1;
        let sql = build_where_clause(&filter, &mut idx);
        assert_eq!(
            sql,
            "project = $1 AND deleted_at IS NULL AND id = $2 AND creator = $3 AND open = $4"
        );
        assert_eq!(idx, 5);
    }

    #[test]
    fn test_where_clause_include_deleted() {
        let mut filter = empty_filter("p");
        filter.include_deleted = true;

        let mut idx = 1;
        let sql = build_where_clause(&filter, &mut idx);
        assert_eq!(sql, "project = $1");
    }

    #[test]
    fn test_where_clause_continues_caller_numbering() {
        let mut filter = empty_filter("p");
        filter.id = Some(Uuid::now_v7());

        // update() numbers SET placeholders first
        let mut idx = 3;
        let sql = build_where_clause(&filter, &mut idx);
        assert_eq!(sql, "project = $3 AND deleted_at IS NULL AND id = $4");
        assert_eq!(idx, 5);
    }

    #[test]
    fn test_set_clause_always_touches_updated_at() {
        let update = IssueUpdate {
            title: None,
            text: None,
            creator: None,
            assignee: None,
            status_note: None,
            open: None,
            updated_at: Utc::now(),
        };
        let mut idx = 1;
        assert_eq!(build_set_clause(&update, &mut idx), "updated_at = $1");
        assert_eq!(idx, 2);
    }

    #[test]
    fn test_set_clause_orders_fields() {
        let update = IssueUpdate {
            title: Some("T".to_string()),
            text: None,
            creator: None,
            assignee: Some("A".to_string()),
            status_note: None,
            open: Some(false),
            updated_at: Utc::now(),
        };
        let mut idx = 1;
        let sql = build_set_clause(&update, &mut idx);
        assert_eq!(sql, "updated_at = $1, title = $2, assignee = $3, open = $4");
        assert_eq!(idx, 5);
    }
}
