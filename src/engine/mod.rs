//! The storage/reconstruction engine.
//!
//! [`Engine`] is the synchronous core: every operation validates against a
//! fresh reconstruction of the log and only then writes. It does no locking of
//! its own, so concurrent callers go through [`EngineHandle`], which runs the
//! engine on one worker and executes requests in arrival order.

mod columns;
mod foreign_keys;
mod handle;
pub mod reconstruct;
mod rows;
mod tables;
pub mod validate;

pub use handle::EngineHandle;
pub use rows::CellInput;

use std::fs;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::store::{Layout, SqliteStore, Store};
use crate::types::{Column, Table};

use validate::TableSnapshot;

pub struct Engine {
    store: Arc<dyn Store>,
    layout: Layout,
}

impl Engine {
    /// Opens (creating or upgrading as needed) the SQLite file named by
    /// `config`.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = SqliteStore::new(config.db_path())?
            .with_default_table_name(config.default_table_name.clone());

        info!(path = %config.db_path().display(), "Opening store");
        Self::with_store(Arc::new(store))
    }

    /// Wraps an already constructed store and initializes it.
    pub fn with_store(store: Arc<dyn Store>) -> Result<Self> {
        let layout = store.initialize()?;
        info!(?layout, "Engine ready");
        Ok(Self { store, layout })
    }

    /// The layout the store was in before it was opened.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn close(self) -> Result<()> {
        self.store.close()?;
        info!("Engine closed");
        Ok(())
    }

    fn snapshot(&self, table_id: i64) -> Result<TableSnapshot> {
        TableSnapshot::capture(self.store(), table_id)
    }

    fn live_table(&self, id: i64) -> Result<Table> {
        self.store
            .get_table(id)?
            .filter(Table::is_live)
            .ok_or_else(|| Error::not_found(format!("table {id}")))
    }

    fn live_column(&self, id: i64) -> Result<Column> {
        self.store
            .get_column(id)?
            .filter(Column::is_live)
            .ok_or_else(|| Error::not_found(format!("column {id}")))
    }
}

/// Current time at the precision the store keeps, so values handed back to
/// callers compare equal to what a later read returns.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
