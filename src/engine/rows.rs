use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use super::{Engine, now};
use super::reconstruct::describe_history;
use super::validate::{check_cells, pending_cells, referencers};
use crate::error::{Error, Result};
use crate::types::{Cell, HistoryEntry, LIFECYCLE_DELETED, NewEvent, Row};

/// Cell values keyed by column name. `None` or an empty string clears a cell.
pub type CellInput = HashMap<String, Option<String>>;

impl Engine {
    /// Live rows of a table, reconstructed from the log.
    pub fn get_rows(&self, table_id: i64) -> Result<Vec<Row>> {
        self.live_table(table_id)?;
        Ok(self.snapshot(table_id)?.into_rows())
    }

    /// Every event of a row, oldest first, with a readable description.
    pub fn get_row_history(&self, table_id: i64, row_id: &str) -> Result<Vec<HistoryEntry>> {
        if self.store.get_table(table_id)?.is_none() {
            return Err(Error::not_found(format!("table {table_id}")));
        }

        let events = self.store.list_row_events(table_id, row_id)?;
        if events.is_empty() {
            return Err(Error::not_found(format!("row {row_id}")));
        }

        let names: HashMap<i64, String> = self
            .store
            .list_columns(table_id)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(describe_history(events, &names))
    }

    /// Validates every supplied value, then appends a row-created event and
    /// one event per non-empty value. Nothing is written if a check fails.
    pub fn create_row(&self, table_id: i64, cells: &CellInput) -> Result<Row> {
        self.live_table(table_id)?;
        let snapshot = self.snapshot(table_id)?;
        let pending = pending_cells(snapshot.columns(), cells);

        check_cells(self.store(), &snapshot, &pending, None)?;

        let row_id = Uuid::new_v4().to_string();
        let at = now();

        let mut events = vec![NewEvent::row_created(table_id, &row_id, at)];
        let mut written = Vec::new();
        for cell in &pending {
            let Some(value) = &cell.value else {
                continue;
            };
            events.push(NewEvent::cell(
                table_id,
                &row_id,
                cell.column.id,
                Some(value.clone()),
                at,
            ));
            written.push(Cell {
                column_id: cell.column.id,
                column: cell.column.name.clone(),
                value: Some(value.clone()),
            });
        }

        self.store.append_events(&events)?;
        debug!(table_id, row_id = %row_id, cells = written.len(), "Created row");

        Ok(Row {
            row_id,
            cells: written,
            last_modified: at,
        })
    }

    /// Records new values for the supplied columns of a live row. Unknown
    /// column names are ignored; at least one known column is required.
    pub fn update_row(&self, table_id: i64, row_id: &str, cells: &CellInput) -> Result<Row> {
        self.live_table(table_id)?;
        let snapshot = self.snapshot(table_id)?;

        if !snapshot.contains_row(row_id) {
            return Err(Error::not_found(format!("row {row_id}")));
        }

        let pending = pending_cells(snapshot.columns(), cells);
        if pending.is_empty() {
            return Err(Error::validation("no valid columns"));
        }

        check_cells(self.store(), &snapshot, &pending, Some(row_id))?;

        let at = now();
        let events: Vec<NewEvent> = pending
            .iter()
            .map(|cell| NewEvent::cell(table_id, row_id, cell.column.id, cell.value.clone(), at))
            .collect();

        self.store.append_events(&events)?;
        debug!(table_id, row_id, cells = events.len(), "Updated row");

        self.snapshot(table_id)?
            .row(row_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("row {row_id}")))
    }

    /// Marks a live row deleted. Refused while a live row elsewhere holds its
    /// id through a live foreign key.
    pub fn delete_row(&self, table_id: i64, row_id: &str) -> Result<()> {
        self.live_table(table_id)?;

        if !self.snapshot(table_id)?.contains_row(row_id) {
            return Err(Error::not_found(format!("row {row_id}")));
        }

        let blocking = referencers(self.store(), table_id, row_id)?;
        if !blocking.is_empty() {
            warn!(table_id, row_id, "Refusing to delete referenced row");
            let detail = blocking
                .iter()
                .map(|(table, count)| format!("{count} row(s) in '{table}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::blocked(format!(
                "row {row_id} is referenced by {detail}"
            )));
        }

        self.store.append_events(&[NewEvent::lifecycle(
            table_id,
            row_id,
            LIFECYCLE_DELETED,
            now(),
        )])?;
        debug!(table_id, row_id, "Deleted row");
        Ok(())
    }
}
