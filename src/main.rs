use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cellar::cli::{
    ColumnCommands, FkCommands, RowCommands, StoreArgs, TableCommands, open_engine, run_column,
    run_fk, run_init, run_row, run_table,
};

#[derive(Parser)]
#[command(name = "cellar")]
#[command(about = "An event-sourced table store", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store, or upgrade an older one, and report its layout
    Init,

    /// Manage tables
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },

    /// Manage columns
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },

    /// Read and write rows
    Row {
        #[command(subcommand)]
        command: RowCommands,
    },

    /// Manage foreign keys
    Fk {
        #[command(subcommand)]
        command: FkCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cellar=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.store.json;
    let engine = open_engine(&cli.store)?;

    let result = match cli.command {
        Commands::Init => run_init(&engine, json).await,
        Commands::Table { command } => run_table(&engine, command, json).await,
        Commands::Column { command } => run_column(&engine, command, json).await,
        Commands::Row { command } => run_row(&engine, command, json).await,
        Commands::Fk { command } => run_fk(&engine, command, json).await,
    };

    engine.close().await?;
    result
}
