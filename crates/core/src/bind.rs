//! Named-to-positional placeholder compilation.
//!
//! Postgres binds parameters by position (`$1`, `$2`, ...). A materialized
//! statement uses `:name` placeholders, so before execution every `:name` is
//! replaced with its position and the bind values are laid out in that order.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::materialize::{MaterializedQuery, Segment};
use crate::parameters::ScalarValue;

/// A statement in driver form with its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalQuery {
    pub sql: String,
    pub arguments: Vec<ScalarValue>,
}

/// Replace each bind placeholder with `$n`, where `n` is the order of first
/// use.
///
/// Works on the materialized segment list rather than the statement text, so
/// a `:word` inside a spliced identifier value stays literal SQL. A name used
/// more than once reuses its position. A placeholder missing from the bind
/// map fails with [`CoreError::MissingParameter`].
pub fn compile_positional(query: &MaterializedQuery) -> Result<PositionalQuery, CoreError> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut arguments = Vec::new();
    let mut sql = String::with_capacity(query.statement.len());

    for segment in query.segments() {
        match segment {
            Segment::Sql(literal) => sql.push_str(literal),
            Segment::Bind(name) => {
                let position = match positions.get(name.as_str()) {
                    Some(position) => *position,
                    None => {
                        let value = query.binds.get(name).ok_or_else(|| {
                            CoreError::MissingParameter { name: name.clone() }
                        })?;
                        arguments.push(value.clone());
                        positions.insert(name, arguments.len());
                        arguments.len()
                    }
                };
                sql.push('$');
                sql.push_str(&position.to_string());
            }
        }
    }

    Ok(PositionalQuery { sql, arguments })
}
