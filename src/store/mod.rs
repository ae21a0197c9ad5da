pub mod migrate;
pub mod schema;
mod sqlite;

pub use migrate::Layout;
pub use sqlite::{DEFAULT_TABLE_NAME, SqliteStore};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the persistence interface behind the engine.
///
/// Every collection is append/tombstone-only. Operations that write more than
/// one record (`append_events`, the tombstone cascades) must be atomic.
pub trait Store: Send + Sync {
    /// Prepares the backing file, upgrading older layouts in place.
    fn initialize(&self) -> Result<Layout>;

    // Table operations
    fn create_table(&self, name: &str, created_at: DateTime<Utc>) -> Result<Table>;
    fn get_table(&self, id: i64) -> Result<Option<Table>>;
    fn get_live_table_by_name(&self, name: &str) -> Result<Option<Table>>;
    fn list_tables(&self) -> Result<Vec<Table>>;
    fn rename_table(&self, id: i64, name: &str) -> Result<()>;
    /// Tombstones the foreign keys anchored on the table's live columns, then
    /// those columns, then the table, as one unit.
    fn tombstone_table(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    // Column operations
    fn create_column(&self, column: &NewColumn, created_at: DateTime<Utc>) -> Result<Column>;
    fn get_column(&self, id: i64) -> Result<Option<Column>>;
    fn list_columns(&self, table_id: i64) -> Result<Vec<Column>>;
    fn max_display_order(&self, table_id: i64) -> Result<Option<i64>>;
    fn rename_column(&self, id: i64, name: &str) -> Result<()>;
    fn set_column_unique(&self, id: i64, is_unique: bool) -> Result<()>;
    fn set_column_order(&self, id: i64, display_order: i64) -> Result<()>;
    /// Tombstones the column's live foreign key and the column as one unit.
    fn tombstone_column(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    // Event log operations
    /// Appends all events or none. Returns the assigned ids in order.
    fn append_events(&self, events: &[NewEvent]) -> Result<Vec<i64>>;
    /// All events of a table, ascending by id.
    fn list_events(&self, table_id: i64) -> Result<Vec<CellEvent>>;
    /// All events of one row, ascending by (timestamp, id).
    fn list_row_events(&self, table_id: i64, row_id: &str) -> Result<Vec<CellEvent>>;

    // Foreign key operations
    fn create_foreign_key(
        &self,
        from_column_id: i64,
        to_table_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<ForeignKey>;
    fn get_foreign_key(&self, id: i64) -> Result<Option<ForeignKey>>;
    fn get_live_foreign_key_for_column(&self, column_id: i64) -> Result<Option<ForeignKey>>;
    /// Live foreign keys anchored on the live columns of `table_id`.
    fn list_foreign_keys(&self, table_id: i64) -> Result<Vec<ForeignKey>>;
    /// Live foreign keys whose target is `table_id`.
    fn list_foreign_keys_targeting(&self, table_id: i64) -> Result<Vec<ForeignKey>>;
    fn tombstone_foreign_key(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
