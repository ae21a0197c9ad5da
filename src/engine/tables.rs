use tracing::{debug, warn};

use super::{Engine, now};
use super::validate::normalize_name;
use crate::error::{Error, Result};
use crate::types::Table;

impl Engine {
    /// Live tables in creation order.
    pub fn get_tables(&self) -> Result<Vec<Table>> {
        self.store.list_tables()
    }

    pub fn create_table(&self, name: &str) -> Result<Table> {
        let name = normalize_name(name, "Table")?;

        if self.store.get_live_table_by_name(&name)?.is_some() {
            return Err(Error::conflict(format!(
                "a table named '{name}' already exists"
            )));
        }

        let table = self.store.create_table(&name, now())?;
        debug!(table_id = table.id, name = %table.name, "Created table");
        Ok(table)
    }

    pub fn rename_table(&self, id: i64, name: &str) -> Result<Table> {
        let mut table = self.live_table(id)?;
        let name = normalize_name(name, "Table")?;

        if let Some(existing) = self.store.get_live_table_by_name(&name)? {
            if existing.id != id {
                return Err(Error::conflict(format!(
                    "a table named '{name}' already exists"
                )));
            }
        }

        self.store.rename_table(id, &name)?;
        debug!(table_id = id, from = %table.name, to = %name, "Renamed table");
        table.name = name;
        Ok(table)
    }

    /// Tombstones the table together with its live columns and their foreign
    /// keys. Refused while the table has live rows.
    pub fn delete_table(&self, id: i64) -> Result<()> {
        let table = self.live_table(id)?;

        let live_rows = self.snapshot(id)?.rows().len();
        if live_rows > 0 {
            warn!(table_id = id, live_rows, "Refusing to delete table with live rows");
            return Err(Error::blocked(format!(
                "table '{}' still has {live_rows} live row(s)",
                table.name
            )));
        }

        self.store.tombstone_table(id, now())?;
        debug!(table_id = id, name = %table.name, "Deleted table");
        Ok(())
    }
}
