//! Field data types and literal values
//!
//! # Serde Casing Conventions
//!
//! `DataType` round-trips through its SQL spelling (`"DECIMAL(10,2)"`, `"VARCHAR"`);
//! `Literal` uses `snake_case` tags so configuration files stay readable
//! (`value = { timestamp = "2023-01-01T00:00:00" }`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Logical type of a dataset field
///
/// Only the types the planner needs to move records and create the main
/// dataset are represented; each dialect maps them to its own type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Integer,
    BigInt,
    Double,
    Decimal { precision: u8, scale: u8 },
    Varchar,
    Boolean,
    Date,
    Timestamp,
}

impl DataType {
    /// Whether values of this type are rendered inline as dialect literals
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Timestamp)
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if let Some(args) = upper
            .strip_prefix("DECIMAL(")
            .or_else(|| upper.strip_prefix("NUMERIC("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut parts = args.split(',').map(str::trim);
            let precision = parts.next().and_then(|p| p.parse().ok());
            let scale = parts.next().and_then(|p| p.parse().ok());
            return match (precision, scale, parts.next()) {
                (Some(precision), Some(scale), None) if scale <= precision => {
                    Ok(DataType::Decimal { precision, scale })
                }
                _ => Err(format!("Invalid decimal type: {}", s)),
            };
        }

        match upper.as_str() {
            "INT" | "INTEGER" | "INT4" => Ok(DataType::Integer),
            "BIGINT" | "INT8" | "INT64" | "LONG" => Ok(DataType::BigInt),
            "DOUBLE" | "FLOAT8" | "FLOAT64" | "DOUBLE PRECISION" => Ok(DataType::Double),
            "VARCHAR" | "STRING" | "TEXT" => Ok(DataType::Varchar),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "DATE" => Ok(DataType::Date),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

/// A literal value used by filters
///
/// Text, numeric and boolean literals are bound as statement parameters.
/// Dates and timestamps are rendered inline using the dialect's literal syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Literal {
    /// Build a timestamp literal from `YYYY-MM-DD HH:MM:SS` text
    pub fn timestamp(value: &str) -> Result<Self, String> {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map(Literal::Timestamp)
            .map_err(|e| format!("Invalid timestamp '{}': {}", value, e))
    }

    /// Whether the literal is inlined rather than bound as a parameter
    pub fn is_inline(&self) -> bool {
        matches!(self, Literal::Date(_) | Literal::Timestamp(_))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(value: NaiveDateTime) -> Self {
        Literal::Timestamp(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Literal::Date(value)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Literal::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Canonical text format for timestamps in rendered SQL
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical text format for dates in rendered SQL
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("STRING".parse::<DataType>().unwrap(), DataType::Varchar);
        assert_eq!("datetime".parse::<DataType>().unwrap(), DataType::Timestamp);
        assert_eq!(
            "DECIMAL(10, 2)".parse::<DataType>().unwrap(),
            DataType::Decimal {
                precision: 10,
                scale: 2
            }
        );
        assert!("DECIMAL(2,10)".parse::<DataType>().is_err());
        assert!("GEOGRAPHY".parse::<DataType>().is_err());
    }

    #[test]
    fn test_data_type_serde_uses_sql_spelling() {
        let json = serde_json::to_string(&DataType::Decimal {
            precision: 12,
            scale: 4,
        })
        .unwrap();
        assert_eq!(json, "\"DECIMAL(12,4)\"");
        let parsed: DataType = serde_json::from_str("\"bigint\"").unwrap();
        assert_eq!(parsed, DataType::BigInt);
    }

    #[test]
    fn test_timestamp_literal() {
        let lit = Literal::timestamp("2023-01-01 00:00:00").unwrap();
        assert!(lit.is_inline());
        assert_eq!(lit.to_string(), "2023-01-01 00:00:00");
        assert!(Literal::timestamp("yesterday").is_err());
        assert!(!Literal::from("abc").is_inline());
    }
}
