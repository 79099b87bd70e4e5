//! Query template model, history snapshot, and DTOs.

use querybank_core::parameters::ParameterSpec;
use querybank_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `query_templates` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplate {
    pub id: DbId,
    pub text: String,
    pub target_databases: Vec<String>,
    #[sqlx(json)]
    pub parameter_spec: ParameterSpec,
    pub label: Option<String>,
    pub description: Option<String>,
    #[sqlx(json)]
    pub version_history: Vec<TemplateSnapshot>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QueryTemplate {
    /// The current state as a history entry.
    pub fn snapshot(&self) -> TemplateSnapshot {
        TemplateSnapshot {
            text: self.text.clone(),
            target_databases: self.target_databases.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            parameter_spec: self.parameter_spec.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// A template without its version history (list and plain get responses).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplateSummary {
    pub id: DbId,
    pub text: String,
    pub target_databases: Vec<String>,
    #[sqlx(json)]
    pub parameter_spec: ParameterSpec,
    pub label: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<QueryTemplate> for QueryTemplateSummary {
    fn from(template: QueryTemplate) -> Self {
        Self {
            id: template.id,
            text: template.text,
            target_databases: template.target_databases,
            parameter_spec: template.parameter_spec,
            label: template.label,
            description: template.description,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

/// Full prior state of a template, appended to `version_history` on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    pub text: String,
    pub target_databases: Vec<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub parameter_spec: ParameterSpec,
    pub updated_at: Timestamp,
}

/// Validated input for creating a template.
#[derive(Debug, Clone)]
pub struct CreateQueryTemplate {
    pub text: String,
    pub target_databases: Vec<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub parameter_spec: ParameterSpec,
}

/// Validated input for a versioned update. Only `Some` fields are applied.
///
/// `label` and `description` are nullable: `None` keeps the stored value,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateQueryTemplate {
    pub text: Option<String>,
    pub target_databases: Option<Vec<String>>,
    pub label: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub parameter_spec: Option<ParameterSpec>,
}
