//! Dataset model: a logical table reference plus its ordered fields

use serde::{Deserialize, Serialize};

use super::field::{Field, FieldRole};

/// Logical reference to a table: optional namespace (schema/dataset) and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetReference {
    /// Namespace (schema, BigQuery dataset, ...); `None` uses the connection default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Table name
    pub name: String,
}

impl DatasetReference {
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for DatasetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}.{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A staging or main dataset
///
/// Staging and main are distinct instances. Their data fields must be
/// structurally compatible so records move between them without transformation;
/// that is checked by [`crate::validation::check_schema_compatibility`].
///
/// # Example
///
/// ```rust
/// use data_persistence_sdk::models::{DataType, Dataset, Field, FieldRole};
///
/// let staging = Dataset::new(Some("demo"), "staging")
///     .with_field(Field::new("id", DataType::Integer).primary_key())
///     .with_field(Field::new("digest", DataType::Varchar).with_role(FieldRole::Digest));
///
/// assert_eq!(staging.primary_keys(), vec!["id"]);
/// assert_eq!(staging.digest_field().map(|f| f.name.as_str()), Some("digest"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Table reference
    #[serde(flatten)]
    pub reference: DatasetReference,
    /// Ordered fields
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            reference: DatasetReference::new(namespace, name),
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// The field flagged as digest, if any
    pub fn digest_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.role == FieldRole::Digest)
    }

    /// Names of the primary key fields, in declaration order
    pub fn primary_keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Data fields, skipping any name in `managed`
    ///
    /// `managed` lists the fields an ingest mode writes itself (audit and
    /// validity columns), which never come from staging.
    pub fn data_fields<'a>(&'a self, managed: &[&str]) -> Vec<&'a Field> {
        self.fields
            .iter()
            .filter(|f| f.is_data() && !managed.contains(&f.name.as_str()))
            .collect()
    }
}
