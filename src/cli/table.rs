use crate::engine::EngineHandle;

use super::commands::TableCommands;
use super::output::{print_json, print_tables};

pub async fn run_table(
    engine: &EngineHandle,
    command: TableCommands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        TableCommands::List => {
            let tables = engine.get_tables().await?;
            if json {
                print_json(&tables)?;
            } else {
                print_tables(&tables);
            }
        }
        TableCommands::Create { name } => {
            let table = engine.create_table(&name).await?;
            if json {
                print_json(&table)?;
            } else {
                println!("Created table \"{}\" (id {})", table.name, table.id);
            }
        }
        TableCommands::Rename { id, name } => {
            let table = engine.rename_table(id, &name).await?;
            if json {
                print_json(&table)?;
            } else {
                println!("Renamed table {} to \"{}\"", table.id, table.name);
            }
        }
        TableCommands::Delete { id } => {
            engine.delete_table(id).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted table {id}");
            }
        }
    }

    Ok(())
}
