//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `?includeHistory=true` on single-template reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeHistoryParams {
    #[serde(default)]
    pub include_history: bool,
}
