//! The table metadata model persisted per `(workspace, table)`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::error::EngineError;
use crate::db::catalog::ColumnInfo;

pub const BASE_TABLE: &str = "base_table";

/// Preferred label columns for enrichment, in priority order.
const LABEL_CANDIDATES: &[&str] = &["name", "title", "label", "display_name", "email", "slug"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub field_name: String,
    pub display_name: String,
    pub data_type: String,
    pub is_required: bool,
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FieldMetadata {
    pub fn from_column(column: &ColumnInfo) -> Self {
        Self {
            field_name: column.name.clone(),
            display_name: display_name(&column.name),
            data_type: column.data_type.clone(),
            is_required: !column.is_nullable,
            is_unique: column.is_unique,
            default_value: column.default_value.clone(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.data_type.as_str(),
            "text" | "character varying" | "character" | "citext"
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Many-to-one, seen from the table holding the FK column.
    BelongsTo,
    /// One-to-many, seen from the referenced table.
    HasMany,
}

/// A foreign-key edge. `source_*` is always the referencing side, whichever
/// table the edge is stored on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub name: String,
    pub kind: RelationshipKind,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub table_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub primary_key_column: Option<String>,
    pub field_metadata: Vec<FieldMetadata>,
    pub relationships: Vec<RelationshipConfig>,
    #[serde(default)]
    pub label_fields: Vec<String>,
    #[serde(default)]
    pub rls_policy_templates: Vec<JsonValue>,
    #[serde(default)]
    pub rls_policy_groups: Vec<JsonValue>,
    #[serde(default)]
    pub indexes: Vec<JsonValue>,
    /// Fields written by newer producers; kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Everything one introspection pass reads for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub forward: Vec<RelationshipConfig>,
    pub reverse: Vec<RelationshipConfig>,
    pub primary_key: Option<String>,
    pub description: Option<String>,
}

impl TableConfig {
    /// Builds a fresh snapshot. Derived fields are regenerated; placeholder
    /// and unknown fields are carried over from `previous`.
    pub fn assemble(
        snapshot: CatalogSnapshot,
        previous: Option<&TableConfig>,
    ) -> Result<Self, EngineError> {
        if snapshot.columns.is_empty() {
            return Err(EngineError::NotFound {
                kind: "Table",
                identity: snapshot.table,
            });
        }

        let field_metadata = snapshot
            .columns
            .iter()
            .map(FieldMetadata::from_column)
            .collect();
        let mut relationships = snapshot.forward;
        relationships.extend(snapshot.reverse);

        let mut config = Self {
            table_type: BASE_TABLE.to_string(),
            description: snapshot.description,
            primary_key_column: snapshot.primary_key,
            field_metadata,
            relationships,
            label_fields: Vec::new(),
            rls_policy_templates: Vec::new(),
            rls_policy_groups: Vec::new(),
            indexes: Vec::new(),
            extra: Map::new(),
        };

        if let Some(previous) = previous {
            config.label_fields = previous.label_fields.clone();
            config.rls_policy_templates = previous.rls_policy_templates.clone();
            config.rls_policy_groups = previous.rls_policy_groups.clone();
            config.indexes = previous.indexes.clone();
            config.extra = previous.extra.clone();
        }

        Ok(config)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.field_metadata
            .iter()
            .find(|field| field.field_name == name)
    }

    pub fn forward_relationships(&self) -> impl Iterator<Item = &RelationshipConfig> {
        self.relationships
            .iter()
            .filter(|rel| rel.kind == RelationshipKind::BelongsTo)
    }

    /// Column used to label rows of this table when other tables join to it.
    pub fn label_column(&self) -> Option<&str> {
        if let Some(label) = self
            .label_fields
            .iter()
            .find(|label| self.field(label).is_some())
        {
            return Some(label.as_str());
        }

        LABEL_CANDIDATES
            .iter()
            .find_map(|candidate| self.field(candidate))
            .or_else(|| self.field_metadata.iter().find(|field| field.is_text()))
            .map(|field| field.field_name.as_str())
    }
}

/// `customer_id` -> `Customer Id`.
pub fn display_name(field_name: &str) -> String {
    field_name
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
