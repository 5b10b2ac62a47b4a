//! Field model for staging and main datasets

use serde::{Deserialize, Serialize};

use super::types::DataType;

/// The part a field plays during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Business payload, moved from staging to main unchanged (default)
    #[default]
    Data,
    /// Content hash of the business fields, used for duplicate detection
    Digest,
    /// Validity boundary maintained by a temporal mode
    Temporal,
    /// Provenance stamp written by an auditing strategy
    Audit,
}

/// A typed field of a dataset
///
/// # Example
///
/// ```rust
/// use data_persistence_sdk::models::{DataType, Field};
///
/// let id = Field::new("id", DataType::Integer).primary_key();
/// assert!(id.primary_key);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Logical data type
    pub data_type: DataType,
    /// Whether the field allows NULL values (default: true)
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Whether this field is part of the primary key (default: false)
    #[serde(default)]
    pub primary_key: bool,
    /// Ingestion role (default: data)
    #[serde(default)]
    pub role: FieldRole,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// Create a nullable data field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
            role: FieldRole::Data,
        }
    }

    /// Mark the field as part of the primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark the field NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the ingestion role
    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Whether the field carries business payload
    pub fn is_data(&self) -> bool {
        matches!(self.role, FieldRole::Data | FieldRole::Digest)
    }
}
