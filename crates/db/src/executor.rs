//! Execution of materialized statements against tenant databases.
//!
//! A [`MaterializedQuery`] is compiled to positional form, bound value by value
//! onto a sqlx query, and run on the tenant's pool. Rows come back as a lazy
//! stream of JSON objects keyed by column name.

use std::str::FromStr;

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use querybank_core::bind::{compile_positional, PositionalQuery};
use querybank_core::error::CoreError;
use querybank_core::materialize::{BindMap, MaterializedQuery};
use querybank_core::parameters::ScalarValue;
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};

use crate::registry::DatabaseRegistry;
use crate::DbPool;

/// One result row: column name -> JSON value.
pub type JsonRow = Map<String, Value>;

/// A driver failure, with everything needed to reproduce it.
///
/// `statement` and `binds` are the materialized (named) form, as the caller
/// would recognise it, not the positional form sent to Postgres.
#[derive(Debug, thiserror::Error)]
#[error("Query execution failed on database '{database}': {source}")]
pub struct ExecutionError {
    pub database: String,
    pub statement: String,
    pub binds: BindMap,
    #[source]
    pub source: sqlx::Error,
}

/// Why a statement could not be executed.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// Rejected before reaching the database (unknown tenant, unbound placeholder).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Bind the compiled arguments, in order, onto a sqlx query.
fn build_query(compiled: &PositionalQuery) -> Query<'_, Postgres, PgArguments> {
    compiled
        .arguments
        .iter()
        .fold(sqlx::query(&compiled.sql), |query, argument| match argument {
            ScalarValue::Text(text) => query.bind(text.as_str()),
            ScalarValue::Integer(int) => query.bind(*int),
            ScalarValue::Float(float) => query.bind(*float),
            ScalarValue::Date(date) => query.bind(*date),
            ScalarValue::Timestamp(ts) => query.bind(*ts),
        })
}

/// Run a compiled statement and stream its rows.
///
/// The stream is lazy (nothing is sent until it is polled), finite, and can
/// only be consumed once.
pub fn fetch_rows<'a>(
    pool: &'a DbPool,
    compiled: &'a PositionalQuery,
) -> BoxStream<'a, Result<JsonRow, sqlx::Error>> {
    build_query(compiled)
        .fetch(pool)
        .map_ok(|row| row_to_json(&row))
        .boxed()
}

/// Execute a materialized statement on the named tenant database and collect
/// every row.
pub async fn execute(
    registry: &DatabaseRegistry,
    database: &str,
    materialized: &MaterializedQuery,
) -> Result<Vec<JsonRow>, ExecuteError> {
    let pool = registry.tenant(database)?;
    let compiled = compile_positional(materialized)?;

    tracing::debug!(
        database = %database,
        sql = %compiled.sql,
        arguments = compiled.arguments.len(),
        "Executing materialized query"
    );

    fetch_rows(pool, &compiled)
        .try_collect()
        .await
        .map_err(|source| {
            ExecuteError::Execution(ExecutionError {
                database: database.to_string(),
                statement: materialized.statement.clone(),
                binds: materialized.binds.clone(),
                source,
            })
        })
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Convert a row into a JSON object, decoding each column by its Postgres type.
///
/// NULLs and values of types with no JSON mapping become `null`.
pub fn row_to_json(row: &PgRow) -> JsonRow {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let value = decode_column(row, index, column.type_info().name()).unwrap_or(Value::Null);
        object.insert(column.name().to_string(), value);
    }
    object
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

fn float(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Option<Value> {
    match type_name {
        "BOOL" => get::<bool>(row, index).map(Value::Bool),
        "INT2" => get::<i16>(row, index).map(Value::from),
        "INT4" => get::<i32>(row, index).map(Value::from),
        "INT8" => get::<i64>(row, index).map(Value::from),
        "FLOAT4" => get::<f32>(row, index).and_then(|v| float(f64::from(v))),
        "FLOAT8" => get::<f64>(row, index).and_then(float),
        "NUMERIC" => get::<BigDecimal>(row, index).map(|v| {
            let text = v.to_string();
            Number::from_str(&text).map_or(Value::String(text), Value::Number)
        }),
        "JSON" | "JSONB" => get::<Value>(row, index),
        "UUID" => get::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index).map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => get::<NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => get::<NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, index).map(Value::from),
        "INT4[]" => get::<Vec<i32>>(row, index).map(Value::from),
        "INT8[]" => get::<Vec<i64>>(row, index).map(Value::from),
        _ => get::<String>(row, index).map(Value::String),
    }
}
