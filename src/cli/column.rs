use crate::engine::EngineHandle;

use super::commands::ColumnCommands;
use super::output::{print_columns, print_json};

pub async fn run_column(
    engine: &EngineHandle,
    command: ColumnCommands,
    json: bool,
) -> anyhow::Result<()> {
    let column = match command {
        ColumnCommands::List { table_id } => {
            let columns = engine.get_columns(table_id).await?;
            if json {
                print_json(&columns)?;
            } else {
                print_columns(&columns);
            }
            return Ok(());
        }
        ColumnCommands::Delete { id } => {
            engine.delete_column(id).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted column {id}");
            }
            return Ok(());
        }
        ColumnCommands::Create {
            table_id,
            name,
            unique,
            column_type,
            choices,
        } => {
            engine
                .create_typed_column(table_id, &name, unique, column_type, choices)
                .await?
        }
        ColumnCommands::Rename { id, name } => engine.rename_column(id, &name).await?,
        ColumnCommands::Unique { id, off } => engine.set_column_unique(id, !off).await?,
        ColumnCommands::Move { id, order } => engine.move_column(id, order).await?,
    };

    if json {
        print_json(&column)?;
    } else {
        print_columns(std::slice::from_ref(&column));
    }

    Ok(())
}
