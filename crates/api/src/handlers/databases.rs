//! Handler for listing the configured tenant databases.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /databases
///
/// Names a template may target, sorted. The template-store database is not
/// included.
pub async fn list_databases(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.registry.tenant_names(),
    }))
}
