mod column;
mod commands;
mod fk;
mod output;
mod row;
mod table;

pub use column::run_column;
pub use commands::{ColumnCommands, FkCommands, RowCommands, StoreArgs, TableCommands};
pub use fk::run_fk;
pub use row::run_row;
pub use table::run_table;

use crate::config::EngineConfig;
use crate::engine::EngineHandle;

/// Resolves the configuration from `--config` and `--data-dir`, then opens
/// (creating or upgrading) the store.
pub fn open_engine(args: &StoreArgs) -> anyhow::Result<EngineHandle> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }

    Ok(EngineHandle::open(&config)?)
}

pub async fn run_init(engine: &EngineHandle, json: bool) -> anyhow::Result<()> {
    let layout = engine.layout().await?;
    let tables = engine.get_tables().await?;

    if json {
        output::print_json(&serde_json::json!({
            "previous_layout": layout,
            "tables": tables,
        }))?;
    } else {
        println!("Store ready (was: {})", output::layout_label(layout));
        println!("Tables: {}", tables.len());
    }

    Ok(())
}
