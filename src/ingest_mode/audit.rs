//! Auditing strategies

use serde::{Deserialize, Serialize};

/// Policy for stamping written rows with provenance metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditingStrategy {
    /// No audit column (default)
    #[default]
    NoAuditing,
    /// Write the batch timestamp into `date_time_field` on every inserted or updated row
    DateTime { date_time_field: String },
}

impl AuditingStrategy {
    pub fn date_time(field: impl Into<String>) -> Self {
        AuditingStrategy::DateTime {
            date_time_field: field.into(),
        }
    }

    /// The audit column, if auditing is enabled
    pub fn audit_field(&self) -> Option<&str> {
        match self {
            AuditingStrategy::NoAuditing => None,
            AuditingStrategy::DateTime { date_time_field } => Some(date_time_field.as_str()),
        }
    }
}
