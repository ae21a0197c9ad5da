use crate::engine::EngineHandle;

use super::commands::FkCommands;
use super::output::{print_foreign_keys, print_json};

pub async fn run_fk(engine: &EngineHandle, command: FkCommands, json: bool) -> anyhow::Result<()> {
    match command {
        FkCommands::List { table_id } => {
            let fks = engine.get_foreign_keys(table_id).await?;
            if json {
                print_json(&fks)?;
            } else {
                print_foreign_keys(&fks);
            }
        }
        FkCommands::Create {
            column_id,
            table_id,
        } => {
            let fk = engine.create_foreign_key(column_id, table_id).await?;
            if json {
                print_json(&fk)?;
            } else {
                println!(
                    "Created foreign key {} (column {} -> table {})",
                    fk.id, fk.from_column_id, fk.to_table_id
                );
            }
        }
        FkCommands::Delete { id } => {
            engine.delete_foreign_key(id).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted foreign key {id}");
            }
        }
        FkCommands::Options { column_id } => {
            let options = engine.get_fk_options(column_id).await?;
            if json {
                print_json(&options)?;
            } else if options.is_empty() {
                println!("No rows to reference.");
            } else {
                for option in &options {
                    println!("{}  {}", option.row_id, option.label.as_deref().unwrap_or("-"));
                }
            }
        }
    }

    Ok(())
}
