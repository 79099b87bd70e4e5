use axum::routing::get;
use axum::Router;

use crate::handlers::databases;
use crate::state::AppState;

/// Tenant database routes, registered as `/databases`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(databases::list_databases))
}
