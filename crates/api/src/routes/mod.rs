pub mod databases;
pub mod health;
pub mod queries;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /queries                     list, save
/// /queries/execute             execute (POST)
/// /queries/{id}                get, update
/// /queries/{id}/versions       version history
///
/// /databases                   configured tenant databases
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/queries", queries::router())
        .nest("/databases", databases::router())
}
