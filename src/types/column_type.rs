use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The fixed set of column kinds. Values are always stored as text; the kind
/// only decides which inputs a column accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    Datetime,
    Url,
    Select,
    Markdown,
}

impl ColumnType {
    pub const ALL: [ColumnType; 8] = [
        Self::Text,
        Self::Number,
        Self::Boolean,
        Self::Date,
        Self::Datetime,
        Self::Url,
        Self::Select,
        Self::Markdown,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Url => "url",
            Self::Select => "select",
            Self::Markdown => "markdown",
        }
    }

    pub fn parse(s: &str) -> Option<ColumnType> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Checks a non-empty value against this kind. `choices` is only consulted
    /// for select columns.
    pub fn check_value(self, column: &str, value: &str, choices: &[String]) -> Result<()> {
        let ok = match self {
            Self::Text | Self::Url | Self::Markdown => true,
            Self::Number => value.trim().parse::<f64>().is_ok_and(f64::is_finite),
            Self::Boolean => matches!(value, "true" | "false"),
            Self::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            Self::Datetime => {
                DateTime::parse_from_rfc3339(value).is_ok()
                    || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
                    || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
            }
            Self::Select => choices.iter().any(|c| c == value),
        };

        if ok {
            return Ok(());
        }

        let message = match self {
            Self::Number => format!("invalid numeric input for '{column}': {value}"),
            Self::Select => format!("'{value}' is not one of the choices for '{column}'"),
            other => format!("invalid {other} input for '{column}': {value}"),
        };
        Err(Error::Validation(message))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
