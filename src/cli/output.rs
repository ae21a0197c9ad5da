use serde::Serialize;

use crate::store::Layout;
use crate::types::{Column, ForeignKey, Row, Table};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn layout_label(layout: Layout) -> &'static str {
    match layout {
        Layout::Fresh => "empty, created",
        Layout::Legacy => "single-table, upgraded",
        Layout::Current => "current",
    }
}

pub fn print_tables(tables: &[Table]) {
    if tables.is_empty() {
        println!("No tables.");
        return;
    }
    println!("{:<6} NAME", "ID");
    for table in tables {
        println!("{:<6} {}", table.id, table.name);
    }
}

pub fn print_columns(columns: &[Column]) {
    if columns.is_empty() {
        println!("No columns.");
        return;
    }
    println!("{:<6} {:<6} {:<10} {:<7} NAME", "ID", "ORDER", "TYPE", "UNIQUE");
    for column in columns {
        let unique = if column.is_unique { "yes" } else { "" };
        println!(
            "{:<6} {:<6} {:<10} {:<7} {}",
            column.id,
            column.display_order,
            column.column_type.as_str(),
            unique,
            column.name
        );
        if !column.choices.is_empty() {
            println!("{:<6} choices: {}", "", column.choices.join(", "));
        }
    }
}

pub fn print_row(row: &Row) {
    println!("{}  (modified {})", row.row_id, row.last_modified.to_rfc3339());
    for cell in &row.cells {
        println!("  {}: {}", cell.column, cell.value.as_deref().unwrap_or(""));
    }
}

pub fn print_rows(rows: &[Row]) {
    if rows.is_empty() {
        println!("No rows.");
        return;
    }
    for row in rows {
        print_row(row);
    }
}

pub fn print_foreign_keys(fks: &[ForeignKey]) {
    if fks.is_empty() {
        println!("No foreign keys.");
        return;
    }
    println!("{:<6} {:<8} TO TABLE", "ID", "COLUMN");
    for fk in fks {
        println!("{:<6} {:<8} {}", fk.id, fk.from_column_id, fk.to_table_id);
    }
}
