//! Batch filter over staged records

use serde::{Deserialize, Serialize};

use super::types::Literal;

/// Comparison applied by a [`DatasetFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
}

impl FilterType {
    /// SQL operator text (`In` renders its own list syntax)
    pub fn operator(&self) -> &'static str {
        match self {
            FilterType::EqualTo => "=",
            FilterType::NotEqualTo => "<>",
            FilterType::GreaterThan => ">",
            FilterType::GreaterThanOrEqual => ">=",
            FilterType::LessThan => "<",
            FilterType::LessThanOrEqual => "<=",
            FilterType::In => "IN",
        }
    }
}

/// Restricts staged rows to the current batch: `field <op> value(s)`
///
/// # Example
///
/// ```rust
/// use data_persistence_sdk::models::{DatasetFilter, FilterType, Literal};
///
/// let filter = DatasetFilter::of(
///     "insert_ts",
///     FilterType::EqualTo,
///     Literal::timestamp("2023-01-01 00:00:00").unwrap(),
/// );
/// assert_eq!(filter.values.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFilter {
    /// Filtered field name (must exist on the staging dataset)
    pub field: String,
    /// Comparison
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    /// One value for comparisons, one or more for `In`
    #[serde(alias = "value", deserialize_with = "one_or_many")]
    pub values: Vec<Literal>,
}

impl DatasetFilter {
    /// Single-value comparison filter
    pub fn of(field: impl Into<String>, filter_type: FilterType, value: impl Into<Literal>) -> Self {
        Self {
            field: field.into(),
            filter_type,
            values: vec![value.into()],
        }
    }

    /// Set membership filter
    pub fn in_list(field: impl Into<String>, values: Vec<Literal>) -> Self {
        Self {
            field: field.into(),
            filter_type: FilterType::In,
            values,
        }
    }

    /// Check the operator/value arity
    pub fn check_arity(&self) -> Result<(), String> {
        match (self.filter_type, self.values.len()) {
            (FilterType::In, 0) => Err(format!(
                "IN filter on '{}' needs at least one value",
                self.field
            )),
            (FilterType::In, _) | (_, 1) => Ok(()),
            (op, n) => Err(format!(
                "Filter '{} {}' takes exactly one value, got {}",
                self.field,
                op.operator(),
                n
            )),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Literal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Literal>),
        One(Literal),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}
