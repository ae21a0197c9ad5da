use tracing::debug;

use super::{Engine, now};
use super::validate::normalize_name;
use crate::error::{Error, Result};
use crate::types::{Column, ColumnType, NewColumn};

impl Engine {
    /// Live columns of a table in display order.
    pub fn get_columns(&self, table_id: i64) -> Result<Vec<Column>> {
        self.live_table(table_id)?;
        self.store.list_columns(table_id)
    }

    /// Adds a text column at the end of the table.
    pub fn create_column(&self, table_id: i64, name: &str, is_unique: bool) -> Result<Column> {
        self.create_typed_column(table_id, name, is_unique, ColumnType::Text, Vec::new())
    }

    /// Adds a column of any kind at the end of the table. `choices` is only
    /// kept for select columns, which require at least one.
    pub fn create_typed_column(
        &self,
        table_id: i64,
        name: &str,
        is_unique: bool,
        column_type: ColumnType,
        choices: Vec<String>,
    ) -> Result<Column> {
        let name = normalize_name(name, "Column")?;
        self.live_table(table_id)?;

        let choices = if column_type == ColumnType::Select {
            let choices = normalize_choices(choices);
            if choices.is_empty() {
                return Err(Error::validation(format!(
                    "select column '{name}' needs at least one choice"
                )));
            }
            choices
        } else {
            Vec::new()
        };

        let display_order = self
            .store
            .max_display_order(table_id)?
            .map_or(0, |max| max + 1);

        let column = self.store.create_column(
            &NewColumn {
                table_id,
                name,
                display_order,
                is_unique,
                column_type,
                choices,
            },
            now(),
        )?;

        debug!(
            table_id,
            column_id = column.id,
            name = %column.name,
            column_type = %column.column_type,
            "Created column"
        );
        Ok(column)
    }

    pub fn rename_column(&self, id: i64, name: &str) -> Result<Column> {
        let mut column = self.live_column(id)?;
        let name = normalize_name(name, "Column")?;

        let clash = self
            .store
            .list_columns(column.table_id)?
            .into_iter()
            .any(|c| c.id != id && c.name == name);
        if clash {
            return Err(Error::conflict(format!(
                "a column named '{name}' already exists in this table"
            )));
        }

        self.store.rename_column(id, &name)?;
        debug!(column_id = id, from = %column.name, to = %name, "Renamed column");
        column.name = name;
        Ok(column)
    }

    /// Turns the unique flag on or off. Turning it on fails while two live
    /// rows share a non-empty value in the column.
    pub fn set_column_unique(&self, id: i64, enable: bool) -> Result<Column> {
        let mut column = self.live_column(id)?;

        if enable && !column.is_unique {
            let snapshot = self.snapshot(column.table_id)?;
            if let Some(value) = snapshot.duplicate_value(id) {
                return Err(Error::conflict(format!(
                    "column '{}' has duplicate value '{value}'",
                    column.name
                )));
            }
        }

        self.store.set_column_unique(id, enable)?;
        debug!(column_id = id, is_unique = enable, "Updated column uniqueness");
        column.is_unique = enable;
        Ok(column)
    }

    pub fn move_column(&self, id: i64, display_order: i64) -> Result<Column> {
        let mut column = self.live_column(id)?;

        if display_order < 0 {
            return Err(Error::validation("display order cannot be negative"));
        }

        self.store.set_column_order(id, display_order)?;
        column.display_order = display_order;
        Ok(column)
    }

    /// Tombstones the column and its foreign key, if it has one.
    pub fn delete_column(&self, id: i64) -> Result<()> {
        let column = self.live_column(id)?;
        self.store.tombstone_column(id, now())?;
        debug!(column_id = id, name = %column.name, "Deleted column");
        Ok(())
    }
}

fn normalize_choices(choices: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(choices.len());
    for choice in choices {
        let choice = choice.trim();
        if !choice.is_empty() && !out.iter().any(|c| c == choice) {
            out.push(choice.to_string());
        }
    }
    out
}
