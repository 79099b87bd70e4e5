//! Materialization: template text + validated parameters -> statement + binds.
//!
//! Identifier placeholders are replaced by the caller's raw string. No quoting
//! or escaping is applied, so an identifier value is spliced into the SQL
//! exactly as given; callers that accept identifiers from untrusted input must
//! allow-list them first.
//!
//! Value placeholders stay in the text as `:name` and their values go into the
//! bind map. Array values are expanded into one synthesized placeholder per
//! element (`:ids` -> `:ids_arr_0, :ids_arr_1`), which turns `col IN (:ids)`
//! into a list the driver can bind.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::extract::{tokenize, Token};
use crate::parameters::{BindValue, ProvidedIdentifier, ScalarValue, ValidatedValue};

/// Infix between an array parameter name and the element index.
pub const ARRAY_BIND_INFIX: &str = "_arr_";

/// Rendered for an empty array so `col IN (:ids)` becomes `col IN (NULL)`.
const EMPTY_LIST: &str = "NULL";

/// Bind name -> scalar value, ordered by name.
pub type BindMap = BTreeMap<String, ScalarValue>;

/// A piece of a materialized statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// SQL text, spliced identifier values included. Never scanned again.
    Sql(String),
    /// A named bind placeholder.
    Bind(String),
}

/// An executable statement with named placeholders and its bind map.
///
/// `statement` is the readable form used in logs and error details. The
/// segment list is what gets compiled for the driver, so text spliced in
/// from an identifier is never mistaken for a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedQuery {
    pub statement: String,
    pub binds: BindMap,
    #[serde(skip)]
    segments: Vec<Segment>,
}

impl MaterializedQuery {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn push_sql(&mut self, sql: &str) {
        self.statement.push_str(sql);
        match self.segments.last_mut() {
            Some(Segment::Sql(last)) => last.push_str(sql),
            _ => self.segments.push(Segment::Sql(sql.to_string())),
        }
    }

    fn push_bind(&mut self, name: String) {
        self.statement.push(':');
        self.statement.push_str(&name);
        self.segments.push(Segment::Bind(name));
    }
}

/// Bind name for element `index` of array parameter `name`.
pub fn array_bind_name(name: &str, index: usize) -> String {
    format!("{name}{ARRAY_BIND_INFIX}{index}")
}

/// Whether `candidate` has the shape of a bind name synthesized for an
/// element of array parameter `array` (`ids_arr_0` for `ids`).
pub fn is_array_bind_name(candidate: &str, array: &str) -> bool {
    candidate
        .strip_prefix(array)
        .and_then(|rest| rest.strip_prefix(ARRAY_BIND_INFIX))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Rewrite `text` with the given identifiers and values.
///
/// Placeholders with no matching parameter are left untouched. Validation
/// guarantees there are none for a stored template. Bind names synthesized
/// for array elements cannot clash with declared names for the same reason.
pub fn materialize(
    text: &str,
    values: &[ValidatedValue],
    identifiers: &[ProvidedIdentifier],
) -> MaterializedQuery {
    let identifier_map: HashMap<&str, &str> = identifiers
        .iter()
        .map(|i| (i.name.as_str(), i.value.as_str()))
        .collect();
    let value_map: HashMap<&str, &BindValue> =
        values.iter().map(|v| (v.name.as_str(), &v.value)).collect();

    let mut query = MaterializedQuery {
        statement: String::with_capacity(text.len()),
        binds: BindMap::new(),
        segments: Vec::new(),
    };
    for token in tokenize(text) {
        match token {
            Token::Text(literal) => query.push_sql(literal),
            Token::Identifier(name) => match identifier_map.get(name) {
                Some(raw) => query.push_sql(raw),
                None => query.push_sql(&format!(":{name}:")),
            },
            Token::Value(name) => match value_map.get(name) {
                Some(BindValue::List(items)) if items.is_empty() => query.push_sql(EMPTY_LIST),
                Some(BindValue::List(items)) => {
                    for i in 0..items.len() {
                        if i > 0 {
                            query.push_sql(", ");
                        }
                        query.push_bind(array_bind_name(name, i));
                    }
                }
                Some(BindValue::Scalar(_)) | None => query.push_bind(name.to_string()),
            },
        }
    }

    for validated in values {
        match &validated.value {
            BindValue::Scalar(scalar) => {
                query.binds.insert(validated.name.clone(), scalar.clone());
            }
            BindValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    query
                        .binds
                        .insert(array_bind_name(&validated.name, i), item.clone());
                }
            }
        }
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, value: ScalarValue) -> ValidatedValue {
        ValidatedValue {
            name: name.to_string(),
            value: BindValue::Scalar(value),
        }
    }

    fn list(name: &str, items: Vec<ScalarValue>) -> ValidatedValue {
        ValidatedValue {
            name: name.to_string(),
            value: BindValue::List(items),
        }
    }

    fn ident(name: &str, value: &str) -> ProvidedIdentifier {
        ProvidedIdentifier {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn scalar_values_leave_text_unchanged() {
        let text = "SELECT * FROM t WHERE col = :v AND other = :w::int";
        let result = materialize(
            text,
            &[
                scalar("v", ScalarValue::Text("abc".into())),
                scalar("w", ScalarValue::Integer(3)),
            ],
            &[],
        );
        assert_eq!(result.statement, text);
        assert_eq!(result.binds.len(), 2);
        assert_eq!(result.binds["v"], ScalarValue::Text("abc".into()));
        assert_eq!(result.binds["w"], ScalarValue::Integer(3));
    }

    #[test]
    fn identifiers_and_arrays_are_expanded() {
        let result = materialize(
            "SELECT * FROM :tbl: WHERE id IN (:ids)",
            &[list(
                "ids",
                vec![
                    ScalarValue::Integer(1),
                    ScalarValue::Integer(2),
                    ScalarValue::Integer(3),
                ],
            )],
            &[ident("tbl", "users")],
        );
        assert_eq!(
            result.statement,
            "SELECT * FROM users WHERE id IN (:ids_arr_0, :ids_arr_1, :ids_arr_2)"
        );
        let expected: BindMap = [
            ("ids_arr_0".to_string(), ScalarValue::Integer(1)),
            ("ids_arr_1".to_string(), ScalarValue::Integer(2)),
            ("ids_arr_2".to_string(), ScalarValue::Integer(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(result.binds, expected);
    }

    #[test]
    fn array_of_n_produces_n_binds_and_n_references() {
        for n in 1..=12 {
            let items = (0..n).map(|i| ScalarValue::Integer(i as i64)).collect();
            let result = materialize("x IN (:xs)", &[list("xs", items)], &[]);
            assert_eq!(result.binds.len(), n);
            let inner = result
                .statement
                .trim_start_matches("x IN (")
                .trim_end_matches(')');
            assert_eq!(inner.split(", ").count(), n);
        }
    }

    #[test]
    fn prefix_names_do_not_collide() {
        let result = materialize(
            "WHERE id = :id AND parent IN (:ids)",
            &[
                scalar("id", ScalarValue::Integer(9)),
                list(
                    "ids",
                    vec![ScalarValue::Integer(1), ScalarValue::Integer(2)],
                ),
            ],
            &[],
        );
        assert_eq!(
            result.statement,
            "WHERE id = :id AND parent IN (:ids_arr_0, :ids_arr_1)"
        );
        assert_eq!(result.binds.len(), 3);
        assert_eq!(result.binds["id"], ScalarValue::Integer(9));
    }

    #[test]
    fn repeated_array_placeholder_expands_everywhere() {
        let result = materialize(
            "a IN (:xs) OR b IN (:xs)",
            &[list(
                "xs",
                vec![ScalarValue::Text("p".into()), ScalarValue::Text("q".into())],
            )],
            &[],
        );
        assert_eq!(
            result.statement,
            "a IN (:xs_arr_0, :xs_arr_1) OR b IN (:xs_arr_0, :xs_arr_1)"
        );
        assert_eq!(result.binds.len(), 2);
    }

    #[test]
    fn empty_array_renders_null() {
        let result = materialize("id IN (:ids)", &[list("ids", vec![])], &[]);
        assert_eq!(result.statement, "id IN (NULL)");
        assert!(result.binds.is_empty());
    }

    #[test]
    fn identifier_values_are_not_escaped() {
        let result = materialize(
            "SELECT * FROM :tbl:",
            &[],
            &[ident("tbl", "users; DROP TABLE users")],
        );
        assert_eq!(result.statement, "SELECT * FROM users; DROP TABLE users");
    }

    #[test]
    fn spliced_identifier_text_is_a_single_sql_segment() {
        let result = materialize(
            "SELECT :col: FROM t WHERE id = :id",
            &[scalar("id", ScalarValue::Integer(1))],
            &[ident("col", "to_char(ts, 'HH24:MI')")],
        );
        assert_eq!(
            result.statement,
            "SELECT to_char(ts, 'HH24:MI') FROM t WHERE id = :id"
        );
        assert_eq!(
            result.segments(),
            &[
                Segment::Sql("SELECT to_char(ts, 'HH24:MI') FROM t WHERE id = ".into()),
                Segment::Bind("id".into()),
            ]
        );
    }

    #[test]
    fn array_bind_name_shape() {
        assert!(is_array_bind_name("ids_arr_0", "ids"));
        assert!(is_array_bind_name("ids_arr_12", "ids"));
        assert!(!is_array_bind_name("ids_arr_", "ids"));
        assert!(!is_array_bind_name("ids_arr_x", "ids"));
        assert!(!is_array_bind_name("idsarr_0", "ids"));
        assert!(!is_array_bind_name("ids", "ids"));
    }

    #[test]
    fn unknown_placeholders_are_left_in_place() {
        let result = materialize("SELECT :a, :b:", &[], &[]);
        assert_eq!(result.statement, "SELECT :a, :b:");
        assert!(result.binds.is_empty());
    }
}
