use tracing::debug;

use super::{Engine, now};
use crate::error::{Error, Result};
use crate::types::{FkOption, ForeignKey};

impl Engine {
    /// Live foreign keys anchored on the table's live columns.
    pub fn get_foreign_keys(&self, table_id: i64) -> Result<Vec<ForeignKey>> {
        self.live_table(table_id)?;
        self.store.list_foreign_keys(table_id)
    }

    pub fn create_foreign_key(&self, from_column_id: i64, to_table_id: i64) -> Result<ForeignKey> {
        let column = self.live_column(from_column_id)?;

        if column.table_id == to_table_id {
            return Err(Error::conflict(format!(
                "column '{}' cannot reference its own table",
                column.name
            )));
        }

        self.live_table(to_table_id)?;

        if self
            .store
            .get_live_foreign_key_for_column(from_column_id)?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "column '{}' already has a foreign key",
                column.name
            )));
        }

        let fk = self
            .store
            .create_foreign_key(from_column_id, to_table_id, now())?;
        debug!(
            fk_id = fk.id,
            from_column_id,
            to_table_id,
            "Created foreign key"
        );
        Ok(fk)
    }

    pub fn delete_foreign_key(&self, id: i64) -> Result<()> {
        if !self.store.tombstone_foreign_key(id, now())? {
            return Err(Error::not_found(format!("foreign key {id}")));
        }
        debug!(fk_id = id, "Deleted foreign key");
        Ok(())
    }

    /// Rows a value of `column_id` may point at, labelled by each row's first
    /// non-empty cell, ordered by row id.
    pub fn get_fk_options(&self, column_id: i64) -> Result<Vec<FkOption>> {
        let column = self.live_column(column_id)?;
        let fk = self
            .store
            .get_live_foreign_key_for_column(column_id)?
            .ok_or_else(|| {
                Error::not_found(format!("foreign key on column '{}'", column.name))
            })?;
        self.live_table(fk.to_table_id)?;

        let mut options: Vec<FkOption> = self
            .snapshot(fk.to_table_id)?
            .into_rows()
            .into_iter()
            .map(|row| {
                let label = row
                    .cells
                    .iter()
                    .find_map(|c| c.value.as_deref().filter(|v| !v.is_empty()))
                    .map(str::to_string);
                FkOption {
                    row_id: row.row_id,
                    label,
                }
            })
            .collect();

        options.sort_by(|a, b| a.row_id.cmp(&b.row_id));
        Ok(options)
    }
}
