//! Integrity checks against reconstructed state. Nothing in here writes.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Column, Row};

use super::reconstruct::reconstruct_rows;

const MAX_NAME_LEN: usize = 255;

/// Trims a table or column name and rejects blank or unprintable ones.
pub fn normalize_name(name: &str, entity: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::validation(format!("{entity} name cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "{entity} name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::validation(format!(
            "{entity} name contains invalid characters"
        )));
    }

    Ok(name.to_string())
}

/// Live columns and live rows of one table, as of one read of the log.
pub struct TableSnapshot {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TableSnapshot {
    pub fn capture(store: &dyn Store, table_id: i64) -> Result<Self> {
        let columns = store.list_columns(table_id)?;
        let events = store.list_events(table_id)?;
        let rows = reconstruct_rows(&events, &columns);
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.row_id == row_id)
    }

    pub fn contains_row(&self, row_id: &str) -> bool {
        self.row(row_id).is_some()
    }

    /// Number of live rows, other than `exclude`, whose current value in
    /// `column_id` equals `value`.
    pub fn holders(&self, column_id: i64, value: &str, exclude: Option<&str>) -> usize {
        self.rows
            .iter()
            .filter(|row| exclude != Some(row.row_id.as_str()))
            .filter(|row| row.value_of(column_id) == Some(value))
            .count()
    }

    /// First non-empty value held by more than one live row.
    pub fn duplicate_value(&self, column_id: i64) -> Option<&str> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            let Some(value) = row.value_of(column_id).filter(|v| !v.is_empty()) else {
                continue;
            };
            let count = seen.entry(value).or_insert(0);
            *count += 1;
            if *count > 1 {
                return Some(value);
            }
        }
        None
    }
}

/// A validated-to-be cell write: a live column and the value to record.
/// `None` clears the cell.
#[derive(Debug, Clone)]
pub struct PendingCell<'a> {
    pub column: &'a Column,
    pub value: Option<String>,
}

/// Matches supplied cells against the live columns by name. Unknown names are
/// dropped; empty strings become clears. Output follows display order.
pub fn pending_cells<'a>(
    columns: &'a [Column],
    cells: &HashMap<String, Option<String>>,
) -> Vec<PendingCell<'a>> {
    columns
        .iter()
        .filter_map(|column| {
            cells.get(&column.name).map(|value| PendingCell {
                column,
                value: value.clone().filter(|v| !v.is_empty()),
            })
        })
        .collect()
}

/// Runs the type, uniqueness and foreign-key checks for a set of writes.
/// `exclude` is the row being updated, which may keep its own values.
pub fn check_cells(
    store: &dyn Store,
    snapshot: &TableSnapshot,
    cells: &[PendingCell<'_>],
    exclude: Option<&str>,
) -> Result<()> {
    let mut targets: HashMap<i64, TableSnapshot> = HashMap::new();

    for cell in cells {
        let Some(value) = cell.value.as_deref() else {
            continue;
        };
        let column = cell.column;

        column
            .column_type
            .check_value(&column.name, value, &column.choices)?;

        if column.is_unique && snapshot.holders(column.id, value, exclude) > 0 {
            return Err(Error::conflict(format!(
                "value '{value}' already exists in unique column '{}'",
                column.name
            )));
        }

        if let Some(fk) = store.get_live_foreign_key_for_column(column.id)? {
            if !targets.contains_key(&fk.to_table_id) {
                let target = TableSnapshot::capture(store, fk.to_table_id)?;
                targets.insert(fk.to_table_id, target);
            }
            if !targets[&fk.to_table_id].contains_row(value) {
                let target = store
                    .get_table(fk.to_table_id)?
                    .map_or_else(
                        || format!("table {}", fk.to_table_id),
                        |t| format!("'{}'", t.name),
                    );
                return Err(Error::conflict(format!(
                    "'{value}' in column '{}' does not reference a live row of {target}",
                    column.name
                )));
            }
        }
    }

    Ok(())
}

/// Live rows elsewhere that point at `row_id` through a live foreign key,
/// as (referencing table name, count) pairs.
pub fn referencers(store: &dyn Store, table_id: i64, row_id: &str) -> Result<Vec<(String, usize)>> {
    let mut found = Vec::new();

    for fk in store.list_foreign_keys_targeting(table_id)? {
        let Some(column) = store.get_column(fk.from_column_id)? else {
            continue;
        };
        if !column.is_live() {
            continue;
        }
        let Some(table) = store.get_table(column.table_id)? else {
            continue;
        };
        if !table.is_live() {
            continue;
        }

        let snapshot = TableSnapshot::capture(store, table.id)?;
        let count = snapshot.holders(column.id, row_id, None);
        if count > 0 {
            found.push((table.name, count));
        }
    }

    Ok(found)
}
