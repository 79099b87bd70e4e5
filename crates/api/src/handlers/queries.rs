//! Handlers for saved query templates.
//!
//! Save, execute, read, update (with version history), list, and history
//! endpoints. Template text travels base64-encoded on the wire and is stored
//! decoded.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};

use querybank_core::error::CoreError;
use querybank_core::extract::extract_parameters;
use querybank_core::materialize::materialize;
use querybank_core::parameters::{ProvidedParameters, ValueParameter};
use querybank_core::routing::{ensure_known, resolve_database, TargetDatabases};
use querybank_core::types::DbId;
use querybank_core::validation::{validate_declaration, validate_execution};
use querybank_db::executor::{self, JsonRow};
use querybank_db::models::query_template::{
    CreateQueryTemplate, QueryTemplate, QueryTemplateSummary, UpdateQueryTemplate,
};
use querybank_db::repositories::query_template_repo::{clamp_limit, clamp_offset};
use querybank_db::repositories::QueryTemplateRepo;

use crate::error::{AppError, AppResult};
use crate::query::{IncludeHistoryParams, PaginationParams};
use crate::response::{DataResponse, IdResponse};
use crate::state::AppState;

/* --------------------------------------------------------------------------
Request / response types
-------------------------------------------------------------------------- */

/// Value parameter declarations sent with a save or update. Identifier
/// placeholders are not declared; they are taken from the text.
#[derive(Debug, Default, Deserialize)]
pub struct DeclaredParameters {
    #[serde(default)]
    pub values: Vec<ValueParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQueryRequest {
    /// Base64-encoded SQL.
    pub text: String,
    pub target_databases: TargetDatabases,
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: DeclaredParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQueryRequest {
    /// Base64-encoded SQL.
    pub text: Option<String>,
    pub target_databases: Option<TargetDatabases>,
    /// Absent keeps the label, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub label: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub parameters: Option<DeclaredParameters>,
}

/// Keep an explicit `null` apart from a missing field: with `#[serde(default)]`
/// a missing field stays `None` and a present one, `null` included, becomes
/// `Some`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub id: DbId,
    pub database: Option<String>,
    #[serde(default)]
    pub parameters: ProvidedParameters,
}

#[derive(Debug, Serialize)]
pub struct ExecuteQueryResponse {
    pub database: String,
    pub rows: Vec<JsonRow>,
}

/// A template with or without its version history.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TemplateView {
    Full(QueryTemplate),
    Summary(QueryTemplateSummary),
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

/// Decode base64 template text into a UTF-8 string.
fn decode_text(encoded: &str) -> AppResult<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("text must be base64-encoded: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest("text must decode to valid UTF-8".to_string()))
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "QueryTemplate",
        id,
    })
}

/// Fetch a template by id or return 404.
async fn ensure_template(state: &AppState, id: DbId) -> AppResult<QueryTemplate> {
    QueryTemplateRepo::find_by_id(state.store(), id)
        .await?
        .ok_or_else(|| not_found(id))
}

/* --------------------------------------------------------------------------
Save / execute
-------------------------------------------------------------------------- */

/// POST /queries
///
/// Extract placeholders from the decoded text, check them against the
/// declared values, and store the template. Every target database must be
/// configured.
pub async fn save_query(
    State(state): State<AppState>,
    Json(input): Json<SaveQueryRequest>,
) -> AppResult<impl IntoResponse> {
    let text = decode_text(&input.text)?;
    let extracted = extract_parameters(&text);
    let parameter_spec = validate_declaration(&extracted, &input.parameters.values)?;

    let target_databases = input.target_databases.into_names()?;
    ensure_known(&target_databases, &state.registry.tenant_names())?;

    let create = CreateQueryTemplate {
        text,
        target_databases,
        label: input.label,
        description: input.description,
        parameter_spec,
    };
    let template = QueryTemplateRepo::create(state.store(), &create).await?;

    tracing::info!(template_id = template.id, "Query template saved");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IdResponse { id: template.id },
        }),
    ))
}

/// POST /queries/execute
///
/// Identifier values are spliced into the SQL without quoting. Only pass
/// identifiers that come from a trusted allow-list.
pub async fn execute_query(
    State(state): State<AppState>,
    Json(input): Json<ExecuteQueryRequest>,
) -> AppResult<impl IntoResponse> {
    let template = ensure_template(&state, input.id).await?;

    let validated = validate_execution(&template.parameter_spec, &input.parameters)?;
    let database = resolve_database(&template.target_databases, input.database.as_deref())?;
    let materialized = materialize(&template.text, &validated.values, &validated.identifiers);

    if !validated.identifiers.is_empty() {
        let names: Vec<&str> = validated
            .identifiers
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        tracing::debug!(
            template_id = template.id,
            identifiers = ?names,
            "Substituting raw identifiers"
        );
    }

    let rows = executor::execute(&state.registry, &database, &materialized)
        .await
        .map_err(|e| AppError::from_execute(e, state.config.expose_execution_details))?;

    tracing::info!(
        template_id = template.id,
        database = %database,
        rows = rows.len(),
        "Query template executed"
    );

    Ok(Json(DataResponse {
        data: ExecuteQueryResponse { database, rows },
    }))
}

/* --------------------------------------------------------------------------
Read / update
-------------------------------------------------------------------------- */

/// GET /queries/{id}
pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<IncludeHistoryParams>,
) -> AppResult<impl IntoResponse> {
    let template = ensure_template(&state, id).await?;
    let data = if params.include_history {
        TemplateView::Full(template)
    } else {
        TemplateView::Summary(template.into())
    };
    Ok(Json(DataResponse { data }))
}

/// PUT /queries/{id}
///
/// Partial update. The replaced state is appended to the version history.
/// Changing the text or the declared values re-validates the parameter spec;
/// the stored value declarations are reused when only the text changes.
pub async fn update_query(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateQueryRequest>,
) -> AppResult<impl IntoResponse> {
    let current = ensure_template(&state, id).await?;

    let text = input.text.as_deref().map(decode_text).transpose()?;

    let parameter_spec = if text.is_some() || input.parameters.is_some() {
        let effective_text = text.as_deref().unwrap_or(&current.text);
        let declared = input
            .parameters
            .as_ref()
            .map_or(&current.parameter_spec.values, |p| &p.values);
        Some(validate_declaration(
            &extract_parameters(effective_text),
            declared,
        )?)
    } else {
        None
    };

    let target_databases = input
        .target_databases
        .map(TargetDatabases::into_names)
        .transpose()?;
    if let Some(targets) = &target_databases {
        ensure_known(targets, &state.registry.tenant_names())?;
    }

    let update = UpdateQueryTemplate {
        text,
        target_databases,
        label: input.label,
        description: input.description,
        parameter_spec,
    };
    let updated = QueryTemplateRepo::versioned_update(state.store(), id, &update)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(
        template_id = id,
        versions = updated.version_history.len(),
        "Query template updated"
    );

    Ok(Json(DataResponse {
        data: IdResponse { id: updated.id },
    }))
}

/* --------------------------------------------------------------------------
Listing / history
-------------------------------------------------------------------------- */

/// GET /queries
pub async fn list_queries(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit);
    let offset = clamp_offset(params.offset);
    let templates = QueryTemplateRepo::list(state.store(), limit, offset).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /queries/{id}/versions
///
/// Prior states of the template, oldest first.
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let versions = QueryTemplateRepo::list_versions(state.store(), id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: versions }))
}
