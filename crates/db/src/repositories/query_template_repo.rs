//! Repository for the `query_templates` table.

use querybank_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::query_template::{
    CreateQueryTemplate, QueryTemplate, QueryTemplateSummary, TemplateSnapshot,
    UpdateQueryTemplate,
};

/// Column list for full rows (history included).
const COLUMNS: &str = "id, text, target_databases, parameter_spec, label, description, \
     version_history, created_at, updated_at";

/// Column list for summaries (history omitted).
const SUMMARY_COLUMNS: &str =
    "id, text, target_databases, parameter_spec, label, description, created_at, updated_at";

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Clamp a caller-supplied page size into `1..=MAX_LIST_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Negative offsets are treated as zero.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Provides create, read, and versioned-update operations for templates.
/// Templates are never deleted here.
pub struct QueryTemplateRepo;

impl QueryTemplateRepo {
    /// Insert a new template with an empty history, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateQueryTemplate,
    ) -> Result<QueryTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO query_templates \
                (text, target_databases, parameter_spec, label, description) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueryTemplate>(&query)
            .bind(&input.text)
            .bind(&input.target_databases)
            .bind(Json(&input.parameter_spec))
            .bind(&input.label)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a template by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<QueryTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM query_templates WHERE id = $1");
        sqlx::query_as::<_, QueryTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List templates by ascending ID, without history.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QueryTemplateSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM query_templates \
             ORDER BY id ASC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, QueryTemplateSummary>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// The version history of a template, oldest first. `None` if the template
    /// does not exist.
    pub async fn list_versions(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Vec<TemplateSnapshot>>, sqlx::Error> {
        let row: Option<(Json<Vec<TemplateSnapshot>>,)> =
            sqlx::query_as("SELECT version_history FROM query_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(Json(history),)| history))
    }

    /// Apply a partial update, first appending the current state to the
    /// template's version history.
    ///
    /// The read and the write happen in one transaction and the row is locked
    /// by the read, so concurrent updates of the same template are applied one
    /// after another and each snapshot is the state its update replaced.
    /// Returns `None` if the template does not exist.
    pub async fn versioned_update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateQueryTemplate,
    ) -> Result<Option<QueryTemplate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM query_templates WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, QueryTemplate>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let snapshot = current.snapshot();
        let label_provided = input.label.is_some();
        let label = input.label.as_ref().and_then(|v| v.as_deref());
        let description_provided = input.description.is_some();
        let description = input.description.as_ref().and_then(|v| v.as_deref());

        // clock_timestamp() so an update queued on the row lock is stamped
        // with the time it was applied, not the time its transaction began.
        let update = format!(
            "UPDATE query_templates SET \
                text = COALESCE($2, text), \
                target_databases = COALESCE($3, target_databases), \
                label = CASE WHEN $4 THEN $5 ELSE label END, \
                description = CASE WHEN $6 THEN $7 ELSE description END, \
                parameter_spec = COALESCE($8, parameter_spec), \
                version_history = version_history || jsonb_build_array($9::jsonb), \
                updated_at = clock_timestamp() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, QueryTemplate>(&update)
            .bind(id)
            .bind(&input.text)
            .bind(&input.target_databases)
            .bind(label_provided)
            .bind(label)
            .bind(description_provided)
            .bind(description)
            .bind(input.parameter_spec.as_ref().map(Json))
            .bind(Json(&snapshot))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}
