use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::types::ColumnType;

/// Where the store lives and how to print results. Accepted by every
/// subcommand.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Data directory holding the database file [default: ./data]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file; --data-dir overrides its data_dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum TableCommands {
    /// List live tables
    List,

    /// Create a table
    Create {
        /// Table name
        name: String,
    },

    /// Rename a table
    Rename {
        /// Table ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a table that has no live rows
    Delete {
        /// Table ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ColumnCommands {
    /// List live columns of a table in display order
    List {
        /// Table ID
        table_id: i64,
    },

    /// Add a column at the end of a table
    Create {
        /// Table ID
        table_id: i64,

        /// Column name
        name: String,

        /// Reject values already held by another live row
        #[arg(long)]
        unique: bool,

        /// Value type (text, number, boolean, date, datetime, url, select, markdown)
        #[arg(long = "type", default_value = "text", value_parser = parse_column_type)]
        column_type: ColumnType,

        /// Allowed value for a select column (repeatable)
        #[arg(long = "choice")]
        choices: Vec<String>,
    },

    /// Rename a column
    Rename {
        /// Column ID
        id: i64,

        /// New name
        name: String,
    },

    /// Turn the unique flag on, or off with --off
    Unique {
        /// Column ID
        id: i64,

        /// Drop the constraint instead of adding it
        #[arg(long)]
        off: bool,
    },

    /// Change a column's display order
    Move {
        /// Column ID
        id: i64,

        /// New display order
        order: i64,
    },

    /// Delete a column and its foreign key
    Delete {
        /// Column ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RowCommands {
    /// List live rows of a table
    List {
        /// Table ID
        table_id: i64,
    },

    /// Insert a row
    Create {
        /// Table ID
        table_id: i64,

        /// Cell value as NAME=VALUE (repeatable); an empty VALUE leaves the cell empty
        #[arg(long = "set", value_parser = parse_assignment)]
        cells: Vec<(String, Option<String>)>,
    },

    /// Write new values into a live row
    Update {
        /// Table ID
        table_id: i64,

        /// Row ID
        row_id: String,

        /// Cell value as NAME=VALUE (repeatable); an empty VALUE clears the cell
        #[arg(long = "set", value_parser = parse_assignment)]
        cells: Vec<(String, Option<String>)>,
    },

    /// Delete a row that nothing references
    Delete {
        /// Table ID
        table_id: i64,

        /// Row ID
        row_id: String,
    },

    /// Show every event recorded for a row
    History {
        /// Table ID
        table_id: i64,

        /// Row ID
        row_id: String,
    },
}

#[derive(Subcommand)]
pub enum FkCommands {
    /// List live foreign keys of a table
    List {
        /// Table ID
        table_id: i64,
    },

    /// Point a column at the rows of another table
    Create {
        /// Referencing column ID
        column_id: i64,

        /// Target table ID
        table_id: i64,
    },

    /// Delete a foreign key
    Delete {
        /// Foreign key ID
        id: i64,
    },

    /// List the rows a column's values may reference
    Options {
        /// Column ID
        column_id: i64,
    },
}

fn parse_column_type(s: &str) -> Result<ColumnType, String> {
    ColumnType::parse(s).ok_or_else(|| {
        let known: Vec<_> = ColumnType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown column type '{s}' (expected one of: {})", known.join(", "))
    })
}

fn parse_assignment(s: &str) -> Result<(String, Option<String>), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if name.trim().is_empty() {
        return Err(format!("missing column name in '{s}'"));
    }
    let value = (!value.is_empty()).then(|| value.to_string());
    Ok((name.trim().to_string(), value))
}
