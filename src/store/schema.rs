/// Registry of user tables.
pub const CREATE_DATA_TABLES: &str = r#"
CREATE TABLE data_tables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    deleted_at TEXT                 -- tombstone, NULL = live
);
"#;

/// Column definitions, scoped to their owning table.
pub const CREATE_DATA_COLUMNS: &str = r#"
CREATE TABLE data_columns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id INTEGER NOT NULL REFERENCES data_tables(id),
    name TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    is_unique INTEGER NOT NULL DEFAULT 0,
    column_type TEXT NOT NULL DEFAULT 'text',
    choices TEXT,                   -- JSON array, select columns only
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
"#;

/// The append-only event log. Rows are never updated or deleted.
pub const CREATE_CELL_EVENTS: &str = r#"
CREATE TABLE cell_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id INTEGER NOT NULL REFERENCES data_tables(id),
    row_id TEXT NOT NULL,
    column_id INTEGER,              -- NULL for lifecycle events
    sentinel TEXT,                  -- NULL, 'row_created' or 'row_lifecycle'
    value TEXT,
    created_at TEXT NOT NULL
);
"#;

pub const CREATE_FOREIGN_KEYS: &str = r#"
CREATE TABLE foreign_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_column_id INTEGER NOT NULL REFERENCES data_columns(id),
    to_table_id INTEGER NOT NULL REFERENCES data_tables(id),
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
"#;

/// Indexes are idempotent and re-applied on every open.
pub const INDEXES: &str = r#"
-- Names are unique among live siblings only
CREATE UNIQUE INDEX IF NOT EXISTS idx_tables_live_name
    ON data_tables(name) WHERE deleted_at IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_columns_live_name
    ON data_columns(table_id, name) WHERE deleted_at IS NULL;

-- At most one live foreign key per column
CREATE UNIQUE INDEX IF NOT EXISTS idx_foreign_keys_live_column
    ON foreign_keys(from_column_id) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_foreign_keys_target ON foreign_keys(to_table_id);

CREATE INDEX IF NOT EXISTS idx_columns_table ON data_columns(table_id);
CREATE INDEX IF NOT EXISTS idx_cell_events_table ON cell_events(table_id, id);
CREATE INDEX IF NOT EXISTS idx_cell_events_row ON cell_events(table_id, row_id);
"#;

/// The single-table layout written by earlier releases: no tables registry,
/// column names unique across the whole file, events without a table id.
pub const LEGACY_SCHEMA: &str = r#"
CREATE TABLE data_columns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    display_order INTEGER NOT NULL,
    is_unique INTEGER NOT NULL DEFAULT 0,
    column_type TEXT NOT NULL DEFAULT 'text',
    choices TEXT,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE cell_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id TEXT NOT NULL,
    column_id INTEGER,
    sentinel TEXT,
    value TEXT,
    created_at TEXT NOT NULL
);
"#;
