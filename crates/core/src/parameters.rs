//! Parameter declarations, caller-supplied parameters, and typed bind values.
//!
//! A template declares its value parameters with a type and its identifier
//! parameters by name only. At execution time the caller supplies JSON values
//! that are checked against those declarations (see [`crate::validation`]) and
//! converted into [`BindValue`]s.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Declared type of a value parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "number[]")]
    NumberArray,
    #[serde(rename = "date[]")]
    DateArray,
}

/// Element type shared by a scalar [`ParamType`] and its array variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Date,
}

impl ParamType {
    /// The element type (`number[]` -> `number`).
    pub fn scalar(self) -> ScalarType {
        match self {
            Self::String | Self::StringArray => ScalarType::String,
            Self::Number | Self::NumberArray => ScalarType::Number,
            Self::Date | Self::DateArray => ScalarType::Date,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, Self::StringArray | Self::NumberArray | Self::DateArray)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::StringArray => "string[]",
            Self::NumberArray => "number[]",
            Self::DateArray => "date[]",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two parameter lists an arity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Value,
    Identifier,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => f.write_str("Value parameter"),
            Self::Identifier => f.write_str("Identifier"),
        }
    }
}

/// A declared value parameter: `{ "name": "ids", "type": "number[]" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// The stored parameter declarations of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default)]
    pub values: Vec<ValueParameter>,
    #[serde(default)]
    pub identifiers: Vec<String>,
}

impl ParameterSpec {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.identifiers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Caller-supplied parameters
// ---------------------------------------------------------------------------

/// A value supplied at execution time. The value is kept as raw JSON until
/// it has been checked against the declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidedValue {
    pub name: String,
    pub value: serde_json::Value,
}

/// A raw identifier supplied at execution time (table or column name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidedIdentifier {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidedParameters {
    #[serde(default)]
    pub values: Vec<ProvidedValue>,
    #[serde(default)]
    pub identifiers: Vec<ProvidedIdentifier>,
}

// ---------------------------------------------------------------------------
// Typed bind values
// ---------------------------------------------------------------------------

/// A single value handed to the database driver.
///
/// Serializes to plain JSON (string, number, or ISO-8601 string) so bind maps
/// can be echoed in diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(Timestamp),
}

/// A validated value parameter: either one scalar or a list to be expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedValue {
    pub name: String,
    pub value: BindValue,
}

/// Output of execute-time validation, ready for materialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParameters {
    pub values: Vec<ValidatedValue>,
    pub identifiers: Vec<ProvidedIdentifier>,
}
