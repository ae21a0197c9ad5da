use crate::engine::{CellInput, EngineHandle};

use super::commands::RowCommands;
use super::output::{print_json, print_row, print_rows};

pub async fn run_row(engine: &EngineHandle, command: RowCommands, json: bool) -> anyhow::Result<()> {
    match command {
        RowCommands::List { table_id } => {
            let rows = engine.get_rows(table_id).await?;
            if json {
                print_json(&rows)?;
            } else {
                print_rows(&rows);
            }
        }
        RowCommands::Create { table_id, cells } => {
            let row = engine.create_row(table_id, to_input(cells)).await?;
            if json {
                print_json(&row)?;
            } else {
                print_row(&row);
            }
        }
        RowCommands::Update {
            table_id,
            row_id,
            cells,
        } => {
            if cells.is_empty() {
                anyhow::bail!("at least one --set NAME=VALUE is required");
            }
            let row = engine.update_row(table_id, &row_id, to_input(cells)).await?;
            if json {
                print_json(&row)?;
            } else {
                print_row(&row);
            }
        }
        RowCommands::Delete { table_id, row_id } => {
            engine.delete_row(table_id, &row_id).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": row_id }))?;
            } else {
                println!("Deleted row {row_id}");
            }
        }
        RowCommands::History { table_id, row_id } => {
            let history = engine.get_row_history(table_id, &row_id).await?;
            if json {
                print_json(&history)?;
            } else {
                for entry in &history {
                    println!(
                        "{:>6}  {}  {}",
                        entry.event.id,
                        entry.event.created_at.to_rfc3339(),
                        entry.description
                    );
                }
            }
        }
    }

    Ok(())
}

/// Later assignments to the same column win.
fn to_input(cells: Vec<(String, Option<String>)>) -> CellInput {
    cells.into_iter().collect()
}
