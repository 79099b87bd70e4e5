//! Shared primitive aliases.

/// Template ids are PostgreSQL BIGSERIAL values.
pub type DbId = i64;

/// Store timestamps (`created_at`, `updated_at`, snapshot times) are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
