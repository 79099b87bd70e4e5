//! Target-database normalization and resolution.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `targetDatabases` as sent by callers: one name, a comma-separated list,
/// or an array of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetDatabases {
    One(String),
    Many(Vec<String>),
}

impl TargetDatabases {
    /// Trimmed, de-duplicated, non-empty names in first-seen order.
    pub fn into_names(self) -> Result<Vec<String>, CoreError> {
        let raw: Vec<String> = match self {
            Self::One(list) => list.split(',').map(str::to_string).collect(),
            Self::Many(names) => names,
        };

        let mut names: Vec<String> = Vec::with_capacity(raw.len());
        for name in raw {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        if names.is_empty() {
            return Err(CoreError::Validation(
                "At least one target database is required".into(),
            ));
        }
        Ok(names)
    }
}

/// Fail with [`CoreError::UnavailableDatabase`] on the first target that is
/// not among the configured databases.
pub fn ensure_known(targets: &[String], known: &[String]) -> Result<(), CoreError> {
    match targets.iter().find(|t| !known.contains(t)) {
        Some(unknown) => Err(CoreError::UnavailableDatabase {
            requested: unknown.clone(),
            allowed: known.to_vec(),
        }),
        None => Ok(()),
    }
}

/// Pick the database a template runs against.
///
/// - A single target is always used; requesting any other name is an error.
/// - A requested name must be one of the targets.
/// - With several targets and no request, nothing is chosen silently.
pub fn resolve_database(targets: &[String], requested: Option<&str>) -> Result<String, CoreError> {
    let requested = requested.map(str::trim).filter(|r| !r.is_empty());

    match (targets, requested) {
        ([], _) => Err(CoreError::Validation(
            "Template has no target databases".into(),
        )),
        (_, Some(name)) if targets.iter().any(|t| t == name) => Ok(name.to_string()),
        (_, Some(name)) => Err(CoreError::UnavailableDatabase {
            requested: name.to_string(),
            allowed: targets.to_vec(),
        }),
        ([only], None) => Ok(only.clone()),
        (_, None) => Err(CoreError::AmbiguousDatabase {
            allowed: targets.to_vec(),
        }),
    }
}
