use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ColumnType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Table {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub table_id: i64,
    pub name: String,
    pub display_order: i64,
    pub is_unique: bool,
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Column {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for a column insert. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewColumn {
    pub table_id: i64,
    pub name: String,
    pub display_order: i64,
    pub is_unique: bool,
    pub column_type: ColumnType,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    #[default]
    None,
    RowCreated,
    RowLifecycle,
}

impl Sentinel {
    /// Stored representation. Plain cell events store NULL.
    #[must_use]
    pub const fn as_db(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::RowCreated => Some("row_created"),
            Self::RowLifecycle => Some("row_lifecycle"),
        }
    }

    pub fn from_db(s: Option<&str>) -> Sentinel {
        match s {
            Some("row_created") => Self::RowCreated,
            Some("row_lifecycle") => Self::RowLifecycle,
            _ => Self::None,
        }
    }
}

pub const LIFECYCLE_DELETED: &str = "deleted";
pub const LIFECYCLE_RESTORED: &str = "restored";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEvent {
    pub id: i64,
    pub table_id: i64,
    pub row_id: String,
    pub column_id: Option<i64>,
    pub sentinel: Sentinel,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An event waiting to be appended. The log assigns the id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub table_id: i64,
    pub row_id: String,
    pub column_id: Option<i64>,
    pub sentinel: Sentinel,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn row_created(table_id: i64, row_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            table_id,
            row_id: row_id.to_string(),
            column_id: None,
            sentinel: Sentinel::RowCreated,
            value: None,
            created_at: at,
        }
    }

    pub fn lifecycle(table_id: i64, row_id: &str, marker: &str, at: DateTime<Utc>) -> Self {
        Self {
            table_id,
            row_id: row_id.to_string(),
            column_id: None,
            sentinel: Sentinel::RowLifecycle,
            value: Some(marker.to_string()),
            created_at: at,
        }
    }

    pub fn cell(
        table_id: i64,
        row_id: &str,
        column_id: i64,
        value: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            table_id,
            row_id: row_id.to_string(),
            column_id: Some(column_id),
            sentinel: Sentinel::None,
            value,
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub id: i64,
    pub from_column_id: i64,
    pub to_table_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub column_id: i64,
    pub column: String,
    pub value: Option<String>,
}

/// A reconstructed live row. Cells follow column display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: String,
    pub cells: Vec<Cell>,
    pub last_modified: DateTime<Utc>,
}

impl Row {
    /// Current value of the named column, if the row holds a non-null one.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .and_then(|c| c.value.as_deref())
    }

    #[must_use]
    pub fn value_of(&self, column_id: i64) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column_id == column_id)
            .and_then(|c| c.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub event: CellEvent,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkOption {
    pub row_id: String,
    pub label: Option<String>,
}
