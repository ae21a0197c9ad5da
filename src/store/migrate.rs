use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use super::sqlite::format_datetime;
use super::schema::{
    CREATE_CELL_EVENTS, CREATE_DATA_COLUMNS, CREATE_DATA_TABLES, CREATE_FOREIGN_KEYS, INDEXES,
};
use crate::error::Result;

/// What `initialize` found on disk before upgrading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// No registries at all.
    Fresh,
    /// Single-table layout without a tables registry.
    Legacy,
    Current,
}

pub fn detect_layout(conn: &Connection) -> Result<Layout> {
    if has_table(conn, "data_tables")? {
        return Ok(Layout::Current);
    }
    if has_table(conn, "data_columns")? || has_table(conn, "cell_events")? {
        return Ok(Layout::Legacy);
    }
    Ok(Layout::Fresh)
}

fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Brings the file to the current layout and returns the layout it started in.
pub fn upgrade(conn: &mut Connection, default_table_name: &str) -> Result<Layout> {
    let layout = detect_layout(conn)?;

    match layout {
        Layout::Current => {}
        Layout::Fresh => create_current(conn)?,
        Layout::Legacy => migrate_legacy(conn, default_table_name)?,
    }

    conn.execute_batch(INDEXES)?;
    Ok(layout)
}

fn create_current(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    for ddl in [
        CREATE_DATA_TABLES,
        CREATE_DATA_COLUMNS,
        CREATE_CELL_EVENTS,
        CREATE_FOREIGN_KEYS,
    ] {
        tx.execute_batch(ddl)?;
    }
    tx.commit()?;

    info!("Created empty store");
    Ok(())
}

fn migrate_legacy(conn: &mut Connection, default_table_name: &str) -> Result<()> {
    // Tables are rebuilt with enforcement off. The pragma has no effect inside
    // a transaction, so it brackets the whole unit.
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    let migrated = rebuild_legacy(conn, default_table_name);
    let restored = conn.pragma_update(None, "foreign_keys", "ON");

    let table_id = migrated?;
    restored?;

    info!(
        table_id,
        table = default_table_name,
        "Migrated single-table layout"
    );
    Ok(())
}

/// Runs as one transaction. Any error drops it uncommitted, which leaves the
/// legacy layout untouched.
fn rebuild_legacy(conn: &mut Connection, default_table_name: &str) -> Result<i64> {
    let tx = conn.transaction()?;

    tx.execute_batch(CREATE_DATA_TABLES)?;
    tx.execute(
        "INSERT INTO data_tables (name, created_at) VALUES (?1, ?2)",
        params![default_table_name, format_datetime(&Utc::now())],
    )?;
    let table_id = tx.last_insert_rowid();

    // A file may hold only one of the two legacy tables; the other starts
    // out empty in the current shape.
    if has_table(&tx, "data_columns")? {
        tx.execute_batch("ALTER TABLE data_columns RENAME TO legacy_data_columns;")?;
        tx.execute_batch(CREATE_DATA_COLUMNS)?;
        tx.execute(
            "INSERT INTO data_columns
                (id, table_id, name, display_order, is_unique, column_type, choices, created_at, deleted_at)
             SELECT id, ?1, name, display_order, is_unique, column_type, choices, created_at, deleted_at
             FROM legacy_data_columns",
            params![table_id],
        )?;
        tx.execute_batch("DROP TABLE legacy_data_columns;")?;
    } else {
        tx.execute_batch(CREATE_DATA_COLUMNS)?;
    }

    if has_table(&tx, "cell_events")? {
        tx.execute_batch("ALTER TABLE cell_events RENAME TO legacy_cell_events;")?;
        tx.execute_batch(CREATE_CELL_EVENTS)?;
        tx.execute(
            "INSERT INTO cell_events (id, table_id, row_id, column_id, sentinel, value, created_at)
             SELECT id, ?1, row_id, column_id, sentinel, value, created_at
             FROM legacy_cell_events",
            params![table_id],
        )?;
        tx.execute_batch("DROP TABLE legacy_cell_events;")?;
    } else {
        tx.execute_batch(CREATE_CELL_EVENTS)?;
    }

    tx.execute_batch(CREATE_FOREIGN_KEYS)?;

    tx.commit()?;
    Ok(table_id)
}
