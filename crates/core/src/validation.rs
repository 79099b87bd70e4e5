//! Parameter validation at save time and at execute time.
//!
//! Both entry points are pure and stop at the first failure, returning a
//! single [`CoreError`] that names the offending parameter.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::CoreError;
use crate::extract::ExtractedParameters;
use crate::materialize::is_array_bind_name;
use crate::parameters::{
    BindValue, ParamKind, ParamType, ParameterSpec, ProvidedParameters, ScalarType, ScalarValue,
    ValidatedParameters, ValidatedValue, ValueParameter,
};

/// Accepted layouts for naive (offset-less) timestamps, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ---------------------------------------------------------------------------
// Save time
// ---------------------------------------------------------------------------

/// Check declared value parameters against the placeholders found in the
/// template text and build the spec to store.
///
/// Declared names must be unique, must not shadow a bind name generated for
/// an array parameter, the text must not use a name in both roles, and the
/// declared values must match the extracted value names one to one.
pub fn validate_declaration(
    extracted: &ExtractedParameters,
    declared: &[ValueParameter],
) -> Result<ParameterSpec, CoreError> {
    for (i, param) in declared.iter().enumerate() {
        if declared[..i].iter().any(|p| p.name == param.name) {
            return Err(CoreError::Validation(format!(
                "Parameter '{}' is declared more than once",
                param.name
            )));
        }
    }

    check_array_bind_names(declared)?;

    if let Some(name) = extracted.conflicting.first() {
        return Err(CoreError::Validation(format!(
            "'{name}' is used both as a value (:{name}) and as an identifier (:{name}:)"
        )));
    }

    if let Some(param) = declared
        .iter()
        .find(|p| extracted.identifiers.contains(&p.name))
    {
        return Err(CoreError::Validation(format!(
            "'{}' is an identifier placeholder and cannot be declared as a value",
            param.name
        )));
    }

    if declared.len() != extracted.values.len() {
        return Err(CoreError::Arity {
            kind: ParamKind::Value,
            expected: extracted.values.len(),
            provided: declared.len(),
        });
    }

    if let Some(name) = extracted
        .values
        .iter()
        .find(|name| !declared.iter().any(|p| &p.name == *name))
    {
        return Err(CoreError::MissingParameter { name: name.clone() });
    }

    Ok(ParameterSpec {
        values: declared.to_vec(),
        identifiers: extracted.identifiers.clone(),
    })
}

/// Array values expand to binds named `<name>_arr_<i>`. A declared value with
/// that shape would share a bind slot with an element and overwrite it.
fn check_array_bind_names(declared: &[ValueParameter]) -> Result<(), CoreError> {
    for array in declared.iter().filter(|p| p.param_type.is_array()) {
        if let Some(clash) = declared
            .iter()
            .find(|p| is_array_bind_name(&p.name, &array.name))
        {
            return Err(CoreError::Validation(format!(
                "'{}' clashes with a bind name generated for array parameter '{}'",
                clash.name, array.name
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Execute time
// ---------------------------------------------------------------------------

/// Check caller-supplied parameters against a stored spec.
///
/// Order of checks: array bind name clashes in the stored spec, value count,
/// identifier count, presence of every stored value, type of every value,
/// presence of every stored identifier.
pub fn validate_execution(
    spec: &ParameterSpec,
    provided: &ProvidedParameters,
) -> Result<ValidatedParameters, CoreError> {
    check_array_bind_names(&spec.values)?;

    if provided.values.len() != spec.values.len() {
        return Err(CoreError::Arity {
            kind: ParamKind::Value,
            expected: spec.values.len(),
            provided: provided.values.len(),
        });
    }
    if provided.identifiers.len() != spec.identifiers.len() {
        return Err(CoreError::Arity {
            kind: ParamKind::Identifier,
            expected: spec.identifiers.len(),
            provided: provided.identifiers.len(),
        });
    }

    let mut matched = Vec::with_capacity(spec.values.len());
    for declared in &spec.values {
        let value = provided
            .values
            .iter()
            .find(|p| p.name == declared.name)
            .ok_or_else(|| CoreError::MissingParameter {
                name: declared.name.clone(),
            })?;
        matched.push((declared, value));
    }

    let mut values = Vec::with_capacity(matched.len());
    for (declared, provided_value) in matched {
        let value = check_value(&provided_value.value, declared.param_type).ok_or_else(|| {
            CoreError::TypeMismatch {
                name: declared.name.clone(),
                expected: declared.param_type,
            }
        })?;
        values.push(ValidatedValue {
            name: declared.name.clone(),
            value,
        });
    }

    let mut identifiers = Vec::with_capacity(spec.identifiers.len());
    for name in &spec.identifiers {
        let identifier = provided
            .identifiers
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| CoreError::MissingIdentifier { name: name.clone() })?;
        identifiers.push(identifier.clone());
    }

    Ok(ValidatedParameters {
        values,
        identifiers,
    })
}

/// Convert a JSON value into a bind value if it conforms to `param_type`.
pub fn check_value(value: &Value, param_type: ParamType) -> Option<BindValue> {
    let scalar = param_type.scalar();
    if param_type.is_array() {
        let items = value.as_array()?;
        items
            .iter()
            .map(|item| check_scalar(item, scalar))
            .collect::<Option<Vec<_>>>()
            .map(BindValue::List)
    } else {
        check_scalar(value, scalar).map(BindValue::Scalar)
    }
}

fn check_scalar(value: &Value, scalar: ScalarType) -> Option<ScalarValue> {
    match scalar {
        ScalarType::String => value.as_str().map(|s| ScalarValue::Text(s.to_string())),
        ScalarType::Number => {
            let Value::Number(number) = value else {
                return None;
            };
            if let Some(i) = number.as_i64() {
                return Some(ScalarValue::Integer(i));
            }
            number
                .as_f64()
                .filter(|f| f.is_finite())
                .map(ScalarValue::Float)
        }
        ScalarType::Date => value.as_str().and_then(parse_date),
    }
}

/// Parse a calendar date or timestamp string.
///
/// RFC 3339 timestamps keep their instant (converted to UTC); offset-less
/// timestamps are read as UTC; a bare `YYYY-MM-DD` stays a date.
pub fn parse_date(input: &str) -> Option<ScalarValue> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ScalarValue::Timestamp(ts.with_timezone(&Utc)));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(ScalarValue::Timestamp(naive.and_utc()));
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(ScalarValue::Date)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::extract::extract_parameters;
    use crate::parameters::{ProvidedIdentifier, ProvidedValue};

    fn declare(name: &str, param_type: ParamType) -> ValueParameter {
        ValueParameter {
            name: name.to_string(),
            param_type,
        }
    }

    fn value(name: &str, value: Value) -> ProvidedValue {
        ProvidedValue {
            name: name.to_string(),
            value,
        }
    }

    fn identifier(name: &str, value: &str) -> ProvidedIdentifier {
        ProvidedIdentifier {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    // -- validate_declaration ------------------------------------------------

    #[test]
    fn declaration_matching_placeholders_is_stored_with_identifiers() {
        let extracted = extract_parameters("SELECT * FROM :tbl: WHERE id IN (:ids)");
        let spec =
            validate_declaration(&extracted, &[declare("ids", ParamType::NumberArray)]).unwrap();
        assert_eq!(spec.values, vec![declare("ids", ParamType::NumberArray)]);
        assert_eq!(spec.identifiers, vec!["tbl".to_string()]);
    }

    #[test]
    fn declaration_shadowing_an_array_bind_name_is_rejected() {
        let extracted = extract_parameters("SELECT * FROM t WHERE a IN (:ids) AND b = :ids_arr_0");
        let err = validate_declaration(
            &extracted,
            &[
                declare("ids", ParamType::NumberArray),
                declare("ids_arr_0", ParamType::String),
            ],
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("ids_arr_0"));
    }

    #[test]
    fn array_bind_shape_only_matters_for_array_parameters() {
        let extracted = extract_parameters("SELECT * FROM t WHERE a = :ids AND b = :ids_arr_0");
        let spec = validate_declaration(
            &extracted,
            &[
                declare("ids", ParamType::Number),
                declare("ids_arr_0", ParamType::String),
            ],
        )
        .unwrap();
        assert_eq!(spec.values.len(), 2);
    }

    #[test]
    fn declaration_with_too_few_values_fails_arity() {
        let extracted = extract_parameters("SELECT * FROM t WHERE a = :a AND b = :b");
        let err = validate_declaration(&extracted, &[declare("a", ParamType::String)]).unwrap_err();
        assert_eq!(
            err,
            CoreError::Arity {
                kind: ParamKind::Value,
                expected: 2,
                provided: 1,
            }
        );
    }

    #[test]
    fn declaration_with_wrong_name_fails_missing_parameter() {
        let extracted = extract_parameters("SELECT * FROM t WHERE a = :a");
        let err = validate_declaration(&extracted, &[declare("b", ParamType::String)]).unwrap_err();
        assert_eq!(err, CoreError::MissingParameter { name: "a".into() });
    }

    #[test]
    fn declaration_for_parameterless_text_must_be_empty() {
        let extracted = extract_parameters("SELECT 1");
        assert!(validate_declaration(&extracted, &[]).unwrap().is_empty());
        assert_matches!(
            validate_declaration(&extracted, &[declare("x", ParamType::Number)]),
            Err(CoreError::Arity { expected: 0, provided: 1, .. })
        );
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let extracted = extract_parameters("SELECT :a");
        let err = validate_declaration(
            &extracted,
            &[declare("a", ParamType::String), declare("a", ParamType::Number)],
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("more than once"));
    }

    #[test]
    fn conflicting_roles_are_rejected() {
        let extracted = extract_parameters("SELECT :x: FROM t WHERE y = :x");
        assert_matches!(
            validate_declaration(&extracted, &[]),
            Err(CoreError::Validation(msg)) if msg.contains("'x'")
        );
    }

    #[test]
    fn identifier_declared_as_value_is_rejected() {
        let extracted = extract_parameters("SELECT * FROM :tbl:");
        assert_matches!(
            validate_declaration(&extracted, &[declare("tbl", ParamType::String)]),
            Err(CoreError::Validation(_))
        );
    }

    // -- validate_execution --------------------------------------------------

    fn spec(values: Vec<ValueParameter>, identifiers: &[&str]) -> ParameterSpec {
        ParameterSpec {
            values,
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn execution_with_matching_parameters_succeeds() {
        let spec = spec(vec![declare("ids", ParamType::NumberArray)], &["tbl"]);
        let provided = ProvidedParameters {
            values: vec![value("ids", json!([1, 2, 3]))],
            identifiers: vec![identifier("tbl", "users")],
        };
        let validated = validate_execution(&spec, &provided).unwrap();
        assert_eq!(
            validated.values[0].value,
            BindValue::List(vec![
                ScalarValue::Integer(1),
                ScalarValue::Integer(2),
                ScalarValue::Integer(3),
            ])
        );
        assert_eq!(validated.identifiers, vec![identifier("tbl", "users")]);
    }

    #[test]
    fn stored_spec_with_clashing_array_bind_name_is_rejected() {
        let spec = spec(
            vec![
                declare("ids", ParamType::NumberArray),
                declare("ids_arr_1", ParamType::Number),
            ],
            &[],
        );
        let provided = ProvidedParameters {
            values: vec![value("ids", json!([1, 2])), value("ids_arr_1", json!(9))],
            identifiers: vec![],
        };
        assert_matches!(
            validate_execution(&spec, &provided),
            Err(CoreError::Validation(msg)) if msg.contains("ids_arr_1")
        );
    }

    #[test]
    fn value_count_mismatch_fails_before_per_value_checks() {
        let spec = spec(vec![declare("a", ParamType::String)], &[]);
        let err = validate_execution(&spec, &ProvidedParameters::default()).unwrap_err();
        assert_eq!(
            err,
            CoreError::Arity {
                kind: ParamKind::Value,
                expected: 1,
                provided: 0,
            }
        );
    }

    #[test]
    fn identifier_count_mismatch_has_its_own_message() {
        let spec = spec(vec![], &["tbl"]);
        let err = validate_execution(&spec, &ProvidedParameters::default()).unwrap_err();
        assert_matches!(
            err,
            CoreError::Arity {
                kind: ParamKind::Identifier,
                ..
            }
        );
        assert!(err.to_string().starts_with("Identifier count mismatch"));
    }

    #[test]
    fn misnamed_value_fails_missing_parameter() {
        let spec = spec(vec![declare("a", ParamType::String)], &[]);
        let provided = ProvidedParameters {
            values: vec![value("b", json!("x"))],
            identifiers: vec![],
        };
        assert_eq!(
            validate_execution(&spec, &provided).unwrap_err(),
            CoreError::MissingParameter { name: "a".into() }
        );
    }

    #[test]
    fn string_for_number_fails_type_mismatch() {
        let spec = spec(vec![declare("x", ParamType::Number)], &[]);
        let provided = ProvidedParameters {
            values: vec![value("x", json!("abc"))],
            identifiers: vec![],
        };
        assert_eq!(
            validate_execution(&spec, &provided).unwrap_err(),
            CoreError::TypeMismatch {
                name: "x".into(),
                expected: ParamType::Number,
            }
        );
    }

    #[test]
    fn misnamed_identifier_fails_missing_identifier() {
        let spec = spec(vec![], &["tbl"]);
        let provided = ProvidedParameters {
            values: vec![],
            identifiers: vec![identifier("table", "users")],
        };
        assert_eq!(
            validate_execution(&spec, &provided).unwrap_err(),
            CoreError::MissingIdentifier { name: "tbl".into() }
        );
    }

    // -- check_value ---------------------------------------------------------

    #[test]
    fn numbers_keep_integer_or_float_shape() {
        assert_eq!(
            check_value(&json!(42), ParamType::Number),
            Some(BindValue::Scalar(ScalarValue::Integer(42)))
        );
        assert_eq!(
            check_value(&json!(1.5), ParamType::Number),
            Some(BindValue::Scalar(ScalarValue::Float(1.5)))
        );
        assert_eq!(check_value(&json!("42"), ParamType::Number), None);
        assert_eq!(check_value(&json!(null), ParamType::Number), None);
    }

    #[test]
    fn strings_must_be_strings() {
        assert!(check_value(&json!("abc"), ParamType::String).is_some());
        assert!(check_value(&json!(1), ParamType::String).is_none());
    }

    #[test]
    fn dates_accept_common_iso_forms() {
        assert_matches!(
            check_value(&json!("2024-01-31"), ParamType::Date),
            Some(BindValue::Scalar(ScalarValue::Date(_)))
        );
        assert_matches!(
            check_value(&json!("2024-01-31T10:00:00Z"), ParamType::Date),
            Some(BindValue::Scalar(ScalarValue::Timestamp(_)))
        );
        assert_matches!(
            check_value(&json!("2024-01-31T10:00:00+02:00"), ParamType::Date),
            Some(BindValue::Scalar(ScalarValue::Timestamp(_)))
        );
        assert_matches!(
            check_value(&json!("2024-01-31 10:00:00"), ParamType::Date),
            Some(BindValue::Scalar(ScalarValue::Timestamp(_)))
        );
        assert_eq!(check_value(&json!("2024-02-30"), ParamType::Date), None);
        assert_eq!(check_value(&json!("yesterday"), ParamType::Date), None);
        assert_eq!(check_value(&json!(20240131), ParamType::Date), None);
    }

    #[test]
    fn arrays_check_every_element() {
        assert!(check_value(&json!(["a", "b"]), ParamType::StringArray).is_some());
        assert!(check_value(&json!(["a", 1]), ParamType::StringArray).is_none());
        assert!(check_value(&json!("a"), ParamType::StringArray).is_none());
        assert!(check_value(&json!(["2024-01-01", "nope"]), ParamType::DateArray).is_none());
        assert_eq!(
            check_value(&json!([]), ParamType::NumberArray),
            Some(BindValue::List(vec![]))
        );
    }

    #[test]
    fn scalar_type_does_not_accept_an_array() {
        assert!(check_value(&json!([1]), ParamType::Number).is_none());
    }
}
