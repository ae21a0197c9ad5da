use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::Store;
use super::migrate::{self, Layout};
use crate::error::{Error, Result};
use crate::types::*;

pub const DEFAULT_TABLE_NAME: &str = "Default";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    default_table_name: String,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
            default_table_name: DEFAULT_TABLE_NAME.to_string(),
        })
    }

    /// A private database that disappears with the store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
            default_table_name: DEFAULT_TABLE_NAME.to_string(),
        })
    }

    /// Name of the table that receives all data when a single-table file is
    /// migrated.
    #[must_use]
    pub fn with_default_table_name(mut self, name: impl Into<String>) -> Self {
        self.default_table_name = name.into();
        self
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Drops what `format_datetime` cannot represent, so records handed back
/// from an insert equal the ones read later.
fn stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    // Fixed width so that stored timestamps also sort correctly as text.
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_choices(raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::error!("Invalid choice list in database: '{}' - {}", raw, e);
        Vec::new()
    })
}

fn parse_column_type(raw: &str) -> ColumnType {
    ColumnType::parse(raw).unwrap_or_else(|| {
        tracing::warn!("Unknown column type in database: '{}', reading as text", raw);
        ColumnType::Text
    })
}

/// Maps a constraint failure on one of the live-uniqueness indexes to a
/// domain conflict.
fn conflict_or(err: rusqlite::Error, message: impl FnOnce() -> String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Error::Conflict(message())
        }
        e => Error::from(e),
    }
}

const TABLE_COLUMNS: &str = "id, name, created_at, deleted_at";

fn table_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Table> {
    Ok(Table {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        deleted_at: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
    })
}

const COLUMN_COLUMNS: &str =
    "id, table_id, name, display_order, is_unique, column_type, choices, created_at, deleted_at";

fn column_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        table_id: row.get(1)?,
        name: row.get(2)?,
        display_order: row.get(3)?,
        is_unique: row.get(4)?,
        column_type: parse_column_type(&row.get::<_, String>(5)?),
        choices: parse_choices(row.get(6)?),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        deleted_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
    })
}

const EVENT_COLUMNS: &str = "id, table_id, row_id, column_id, sentinel, value, created_at";

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CellEvent> {
    Ok(CellEvent {
        id: row.get(0)?,
        table_id: row.get(1)?,
        row_id: row.get(2)?,
        column_id: row.get(3)?,
        sentinel: Sentinel::from_db(row.get::<_, Option<String>>(4)?.as_deref()),
        value: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const FOREIGN_KEY_COLUMNS: &str = "id, from_column_id, to_table_id, created_at, deleted_at";

fn foreign_key_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ForeignKey> {
    Ok(ForeignKey {
        id: row.get(0)?,
        from_column_id: row.get(1)?,
        to_table_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        deleted_at: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<Layout> {
        let mut conn = self.conn();
        migrate::upgrade(&mut conn, &self.default_table_name)
    }

    // Table operations

    fn create_table(&self, name: &str, created_at: DateTime<Utc>) -> Result<Table> {
        let created_at = stored_precision(created_at);
        let conn = self.conn();
        conn.execute(
            "INSERT INTO data_tables (name, created_at) VALUES (?1, ?2)",
            params![name, format_datetime(&created_at)],
        )
        .map_err(|e| conflict_or(e, || format!("a table named '{name}' already exists")))?;

        Ok(Table {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
            deleted_at: None,
        })
    }

    fn get_table(&self, id: i64) -> Result<Option<Table>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TABLE_COLUMNS} FROM data_tables WHERE id = ?1"),
            params![id],
            table_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_live_table_by_name(&self, name: &str) -> Result<Option<Table>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {TABLE_COLUMNS} FROM data_tables WHERE name = ?1 AND deleted_at IS NULL"
            ),
            params![name],
            table_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tables(&self) -> Result<Vec<Table>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TABLE_COLUMNS} FROM data_tables WHERE deleted_at IS NULL ORDER BY id"
        ))?;

        let rows = stmt.query_map([], table_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn rename_table(&self, id: i64, name: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE data_tables SET name = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![name, id],
            )
            .map_err(|e| conflict_or(e, || format!("a table named '{name}' already exists")))?;

        if rows == 0 {
            return Err(Error::not_found(format!("table {id}")));
        }
        Ok(())
    }

    fn tombstone_table(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let foreign_keys = tx.execute(
            "UPDATE foreign_keys SET deleted_at = ?1
             WHERE deleted_at IS NULL AND from_column_id IN (
                 SELECT id FROM data_columns WHERE table_id = ?2 AND deleted_at IS NULL
             )",
            params![at, id],
        )?;
        let columns = tx.execute(
            "UPDATE data_columns SET deleted_at = ?1 WHERE table_id = ?2 AND deleted_at IS NULL",
            params![at, id],
        )?;
        let tables = tx.execute(
            "UPDATE data_tables SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![at, id],
        )?;

        if tables == 0 {
            return Err(Error::not_found(format!("table {id}")));
        }

        tx.commit()?;
        debug!(table_id = id, columns, foreign_keys, "Tombstoned table");
        Ok(())
    }

    // Column operations

    fn create_column(&self, column: &NewColumn, created_at: DateTime<Utc>) -> Result<Column> {
        let created_at = stored_precision(created_at);
        let choices = if column.choices.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&column.choices)?)
        };

        let conn = self.conn();
        conn.execute(
            "INSERT INTO data_columns (table_id, name, display_order, is_unique, column_type, choices, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                column.table_id,
                column.name,
                column.display_order,
                column.is_unique,
                column.column_type.as_str(),
                choices,
                format_datetime(&created_at),
            ],
        )
        .map_err(|e| {
            conflict_or(e, || {
                format!("a column named '{}' already exists in this table", column.name)
            })
        })?;

        Ok(Column {
            id: conn.last_insert_rowid(),
            table_id: column.table_id,
            name: column.name.clone(),
            display_order: column.display_order,
            is_unique: column.is_unique,
            column_type: column.column_type,
            choices: column.choices.clone(),
            created_at,
            deleted_at: None,
        })
    }

    fn get_column(&self, id: i64) -> Result<Option<Column>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COLUMN_COLUMNS} FROM data_columns WHERE id = ?1"),
            params![id],
            column_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_columns(&self, table_id: i64) -> Result<Vec<Column>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMN_COLUMNS} FROM data_columns
             WHERE table_id = ?1 AND deleted_at IS NULL
             ORDER BY display_order, id"
        ))?;

        let rows = stmt.query_map(params![table_id], column_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn max_display_order(&self, table_id: i64) -> Result<Option<i64>> {
        let conn = self.conn();
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(display_order) FROM data_columns WHERE table_id = ?1 AND deleted_at IS NULL",
            params![table_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn rename_column(&self, id: i64, name: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE data_columns SET name = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![name, id],
            )
            .map_err(|e| {
                conflict_or(e, || {
                    format!("a column named '{name}' already exists in this table")
                })
            })?;

        if rows == 0 {
            return Err(Error::not_found(format!("column {id}")));
        }
        Ok(())
    }

    fn set_column_unique(&self, id: i64, is_unique: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE data_columns SET is_unique = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![is_unique, id],
        )?;

        if rows == 0 {
            return Err(Error::not_found(format!("column {id}")));
        }
        Ok(())
    }

    fn set_column_order(&self, id: i64, display_order: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE data_columns SET display_order = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![display_order, id],
        )?;

        if rows == 0 {
            return Err(Error::not_found(format!("column {id}")));
        }
        Ok(())
    }

    fn tombstone_column(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let foreign_keys = tx.execute(
            "UPDATE foreign_keys SET deleted_at = ?1 WHERE from_column_id = ?2 AND deleted_at IS NULL",
            params![at, id],
        )?;
        let columns = tx.execute(
            "UPDATE data_columns SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![at, id],
        )?;

        if columns == 0 {
            return Err(Error::not_found(format!("column {id}")));
        }

        tx.commit()?;
        debug!(column_id = id, foreign_keys, "Tombstoned column");
        Ok(())
    }

    // Event log operations

    fn append_events(&self, events: &[NewEvent]) -> Result<Vec<i64>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(events.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO cell_events (table_id, row_id, column_id, sentinel, value, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in events {
                stmt.execute(params![
                    event.table_id,
                    event.row_id,
                    event.column_id,
                    event.sentinel.as_db(),
                    event.value,
                    format_datetime(&event.created_at),
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    fn list_events(&self, table_id: i64) -> Result<Vec<CellEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM cell_events WHERE table_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![table_id], event_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_row_events(&self, table_id: i64, row_id: &str) -> Result<Vec<CellEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM cell_events WHERE table_id = ?1 AND row_id = ?2 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![table_id, row_id], event_from_row)?;
        let mut events = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        // Older files may hold timestamps in other formats, so order on the
        // parsed values rather than the stored text.
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    // Foreign key operations

    fn create_foreign_key(
        &self,
        from_column_id: i64,
        to_table_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<ForeignKey> {
        let created_at = stored_precision(created_at);
        let conn = self.conn();
        conn.execute(
            "INSERT INTO foreign_keys (from_column_id, to_table_id, created_at) VALUES (?1, ?2, ?3)",
            params![from_column_id, to_table_id, format_datetime(&created_at)],
        )
        .map_err(|e| {
            conflict_or(e, || {
                format!("column {from_column_id} already has a foreign key")
            })
        })?;

        Ok(ForeignKey {
            id: conn.last_insert_rowid(),
            from_column_id,
            to_table_id,
            created_at,
            deleted_at: None,
        })
    }

    fn get_foreign_key(&self, id: i64) -> Result<Option<ForeignKey>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FOREIGN_KEY_COLUMNS} FROM foreign_keys WHERE id = ?1"),
            params![id],
            foreign_key_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_live_foreign_key_for_column(&self, column_id: i64) -> Result<Option<ForeignKey>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {FOREIGN_KEY_COLUMNS} FROM foreign_keys
                 WHERE from_column_id = ?1 AND deleted_at IS NULL"
            ),
            params![column_id],
            foreign_key_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_foreign_keys(&self, table_id: i64) -> Result<Vec<ForeignKey>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT fk.id, fk.from_column_id, fk.to_table_id, fk.created_at, fk.deleted_at
             FROM foreign_keys fk
             JOIN data_columns c ON c.id = fk.from_column_id
             WHERE c.table_id = ?1 AND c.deleted_at IS NULL AND fk.deleted_at IS NULL
             ORDER BY c.display_order, fk.id",
        )?;

        let rows = stmt.query_map(params![table_id], foreign_key_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_foreign_keys_targeting(&self, table_id: i64) -> Result<Vec<ForeignKey>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FOREIGN_KEY_COLUMNS} FROM foreign_keys
             WHERE to_table_id = ?1 AND deleted_at IS NULL
             ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![table_id], foreign_key_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn tombstone_foreign_key(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE foreign_keys SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&at), id],
        )?;
        Ok(rows > 0)
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}
