//! Route definitions for saved query templates.
//!
//! Registered under `/queries`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::queries;
use crate::state::AppState;

/// Query template routes, registered as `/queries`.
///
/// ```text
/// GET    /                 list_queries
/// POST   /                 save_query
/// POST   /execute          execute_query
/// GET    /{id}             get_query
/// PUT    /{id}             update_query
/// GET    /{id}/versions    list_versions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(queries::list_queries).post(queries::save_query))
        .route("/execute", post(queries::execute_query))
        .route("/{id}", get(queries::get_query).put(queries::update_query))
        .route("/{id}/versions", get(queries::list_versions))
}
