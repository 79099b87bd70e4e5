use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use querybank_core::error::CoreError;
use querybank_db::executor::{ExecuteError, ExecutionError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `querybank_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A template-store error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement failed on a tenant database. `expose` controls whether the
    /// statement, binds and driver message are echoed to the caller.
    #[error("{error}")]
    Execution { error: ExecutionError, expose: bool },

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn from_execute(err: ExecuteError, expose: bool) -> Self {
        match err {
            ExecuteError::Core(core) => AppError::Core(core),
            ExecuteError::Execution(error) => AppError::Execution { error, expose },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Execution { error, expose } = &self {
            return execution_error_response(error, *expose);
        }

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
            AppError::Execution { .. } => internal(),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    let code = match core {
        CoreError::NotFound { entity, id } => {
            return (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            );
        }
        CoreError::Validation(msg) => {
            return (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone());
        }
        CoreError::MissingParameter { .. } => "MISSING_PARAMETER",
        CoreError::MissingIdentifier { .. } => "MISSING_IDENTIFIER",
        CoreError::Arity { .. } => "ARITY_ERROR",
        CoreError::TypeMismatch { .. } => "TYPE_MISMATCH",
        CoreError::UnavailableDatabase { .. } => "UNAVAILABLE_DATABASE",
        CoreError::AmbiguousDatabase { .. } => "AMBIGUOUS_DATABASE",
    };
    (StatusCode::BAD_REQUEST, code, core.to_string())
}

/// 500 with `EXECUTION_ERROR`. The full context is always logged; it is only
/// returned to the caller when `expose` is set.
fn execution_error_response(error: &ExecutionError, expose: bool) -> Response {
    tracing::error!(
        database = %error.database,
        statement = %error.statement,
        binds = ?error.binds,
        error = %error.source,
        "Query execution failed"
    );

    let body = if expose {
        json!({
            "error": error.to_string(),
            "code": "EXECUTION_ERROR",
            "details": {
                "database": error.database,
                "statement": error.statement,
                "binds": error.binds,
                "cause": error.source.to_string(),
            },
        })
    } else {
        json!({
            "error": "Query execution failed",
            "code": "EXECUTION_ERROR",
        })
    };

    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

/// Classify a template-store sqlx error into an HTTP status, error code, and
/// message.
///
/// - `RowNotFound` maps to 404.
/// - Check-constraint violations (23514) map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23514") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Value violates check constraint: {constraint}"),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
