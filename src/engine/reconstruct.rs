//! Derives live rows from the event log.
//!
//! Both folds take the events of one table in ascending id order, which is
//! what `Store::list_events` returns. Nothing here touches storage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{
    Cell, CellEvent, Column, HistoryEntry, LIFECYCLE_DELETED, LIFECYCLE_RESTORED, Row, Sentinel,
};

/// Per-row state gathered by the first pass.
#[derive(Debug, Default)]
struct RowFold<'a> {
    created: Option<(i64, DateTime<Utc>)>,
    last_deleted: Option<i64>,
    last_restored: Option<i64>,
    /// column id -> highest-id cell event for that column
    latest: HashMap<i64, &'a CellEvent>,
}

impl RowFold<'_> {
    fn is_live(&self) -> bool {
        if self.created.is_none() {
            return false;
        }
        match (self.last_deleted, self.last_restored) {
            (None, _) => true,
            (Some(deleted), Some(restored)) => restored > deleted,
            (Some(_), None) => false,
        }
    }
}

/// Rebuilds the live rows of a table.
///
/// Pass one indexes every (row, column) pair to its highest-id cell event and
/// records the latest deleted/restored marker ids per row. Pass two keeps the
/// rows that were created and whose latest "deleted" marker does not outrank
/// their latest "restored" one, and joins their cells with `columns`, which
/// must be the live columns in display order. `last_modified` comes from the
/// newest joined cell, or the row-created event when there is none.
#[must_use]
pub fn reconstruct_rows(events: &[CellEvent], columns: &[Column]) -> Vec<Row> {
    let mut folds: HashMap<&str, RowFold<'_>> = HashMap::new();

    for event in events {
        let fold = folds.entry(event.row_id.as_str()).or_default();
        match event.sentinel {
            Sentinel::RowCreated => {
                if fold.created.is_none() {
                    fold.created = Some((event.id, event.created_at));
                }
            }
            Sentinel::RowLifecycle => match event.value.as_deref() {
                Some(LIFECYCLE_DELETED) => fold.last_deleted = fold.last_deleted.max(Some(event.id)),
                Some(LIFECYCLE_RESTORED) => {
                    fold.last_restored = fold.last_restored.max(Some(event.id));
                }
                other => tracing::warn!(
                    event_id = event.id,
                    marker = ?other,
                    "Ignoring lifecycle event with unknown marker"
                ),
            },
            Sentinel::None => {
                let Some(column_id) = event.column_id else {
                    continue;
                };
                let slot = fold.latest.entry(column_id).or_insert(event);
                if event.id > slot.id {
                    *slot = event;
                }
            }
        }
    }

    let mut rows: Vec<(i64, Row)> = folds
        .into_iter()
        .filter(|(_, fold)| fold.is_live())
        .filter_map(|(row_id, fold)| {
            let (created_id, created_at) = fold.created?;

            let live: Vec<(&Column, &CellEvent)> = columns
                .iter()
                .filter_map(|column| fold.latest.get(&column.id).map(|event| (column, *event)))
                .collect();

            let cells = live
                .iter()
                .map(|(column, event)| Cell {
                    column_id: column.id,
                    column: column.name.clone(),
                    value: event.value.clone(),
                })
                .collect();

            // Only cells joined to a live column count.
            let last_modified = live
                .iter()
                .map(|(_, event)| *event)
                .max_by_key(|event| event.id)
                .map_or(created_at, |event| event.created_at);

            Some((
                created_id,
                Row {
                    row_id: row_id.to_string(),
                    cells,
                    last_modified,
                },
            ))
        })
        .collect();

    rows.sort_by_key(|(created_id, _)| *created_id);
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Annotates the events of one row. `columns` maps live column ids to names;
/// anything missing from it is reported as a deleted column.
#[must_use]
pub fn describe_history(events: Vec<CellEvent>, columns: &HashMap<i64, String>) -> Vec<HistoryEntry> {
    events
        .into_iter()
        .map(|event| {
            let description = describe(&event, columns);
            HistoryEntry { event, description }
        })
        .collect()
}

fn describe(event: &CellEvent, columns: &HashMap<i64, String>) -> String {
    match event.sentinel {
        Sentinel::RowCreated => "Row created".to_string(),
        Sentinel::RowLifecycle => match event.value.as_deref() {
            Some(LIFECYCLE_RESTORED) => "Row restored".to_string(),
            _ => "Row deleted".to_string(),
        },
        Sentinel::None => {
            let column = event
                .column_id
                .and_then(|id| columns.get(&id))
                .map_or("(deleted column)", String::as_str);
            match event.value.as_deref() {
                Some(value) => format!("{column} → \"{value}\""),
                None => format!("{column} → (cleared)"),
            }
        }
    }
}
