//! Async front for [`Engine`].
//!
//! The engine lives on a dedicated thread and drains a bounded queue, so
//! requests from any number of tasks are applied one at a time in the order
//! they were received. Each request carries a oneshot for its reply.

use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{CellInput, Engine};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::store::Layout;
use crate::types::{Column, ColumnType, FkOption, ForeignKey, HistoryEntry, Row, Table};

const QUEUE_DEPTH: usize = 256;

type Job = Box<dyn FnOnce(&Engine) + Send>;

enum Message {
    Run(Job),
    Shutdown(oneshot::Sender<Result<()>>),
}

/// Cloneable handle to an engine running on its own thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Message>,
}

impl EngineHandle {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        Self::spawn(Engine::open(config)?)
    }

    /// Moves `engine` onto a new worker thread.
    pub fn spawn(engine: Engine) -> Result<Self> {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        thread::Builder::new()
            .name("cellar-engine".to_string())
            .spawn(move || worker(engine, rx))?;
        Ok(Self { tx })
    }

    async fn call<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Engine) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |engine| {
            let _ = reply_tx.send(op(engine));
        });

        self.tx
            .send(Message::Run(job))
            .await
            .map_err(|_| Error::EngineClosed)?;
        reply_rx.await.map_err(|_| Error::EngineClosed)?
    }

    /// Stops the worker after the requests already queued ahead of this one.
    /// Later calls on any clone fail with [`Error::EngineClosed`].
    pub async fn close(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Message::Shutdown(reply_tx))
            .await
            .map_err(|_| Error::EngineClosed)?;
        reply_rx.await.map_err(|_| Error::EngineClosed)?
    }

    pub async fn layout(&self) -> Result<Layout> {
        self.call(|engine| Ok(engine.layout())).await
    }

    // Tables

    pub async fn get_tables(&self) -> Result<Vec<Table>> {
        self.call(|engine| engine.get_tables()).await
    }

    pub async fn create_table(&self, name: &str) -> Result<Table> {
        let name = name.to_string();
        self.call(move |engine| engine.create_table(&name)).await
    }

    pub async fn rename_table(&self, id: i64, name: &str) -> Result<Table> {
        let name = name.to_string();
        self.call(move |engine| engine.rename_table(id, &name)).await
    }

    pub async fn delete_table(&self, id: i64) -> Result<()> {
        self.call(move |engine| engine.delete_table(id)).await
    }

    // Columns

    pub async fn get_columns(&self, table_id: i64) -> Result<Vec<Column>> {
        self.call(move |engine| engine.get_columns(table_id)).await
    }

    pub async fn create_column(&self, table_id: i64, name: &str, is_unique: bool) -> Result<Column> {
        let name = name.to_string();
        self.call(move |engine| engine.create_column(table_id, &name, is_unique))
            .await
    }

    pub async fn create_typed_column(
        &self,
        table_id: i64,
        name: &str,
        is_unique: bool,
        column_type: ColumnType,
        choices: Vec<String>,
    ) -> Result<Column> {
        let name = name.to_string();
        self.call(move |engine| {
            engine.create_typed_column(table_id, &name, is_unique, column_type, choices)
        })
        .await
    }

    pub async fn rename_column(&self, id: i64, name: &str) -> Result<Column> {
        let name = name.to_string();
        self.call(move |engine| engine.rename_column(id, &name)).await
    }

    pub async fn set_column_unique(&self, id: i64, enable: bool) -> Result<Column> {
        self.call(move |engine| engine.set_column_unique(id, enable))
            .await
    }

    pub async fn move_column(&self, id: i64, display_order: i64) -> Result<Column> {
        self.call(move |engine| engine.move_column(id, display_order))
            .await
    }

    pub async fn delete_column(&self, id: i64) -> Result<()> {
        self.call(move |engine| engine.delete_column(id)).await
    }

    // Rows

    pub async fn get_rows(&self, table_id: i64) -> Result<Vec<Row>> {
        self.call(move |engine| engine.get_rows(table_id)).await
    }

    pub async fn get_row_history(&self, table_id: i64, row_id: &str) -> Result<Vec<HistoryEntry>> {
        let row_id = row_id.to_string();
        self.call(move |engine| engine.get_row_history(table_id, &row_id))
            .await
    }

    pub async fn create_row(&self, table_id: i64, cells: CellInput) -> Result<Row> {
        self.call(move |engine| engine.create_row(table_id, &cells))
            .await
    }

    pub async fn update_row(&self, table_id: i64, row_id: &str, cells: CellInput) -> Result<Row> {
        let row_id = row_id.to_string();
        self.call(move |engine| engine.update_row(table_id, &row_id, &cells))
            .await
    }

    pub async fn delete_row(&self, table_id: i64, row_id: &str) -> Result<()> {
        let row_id = row_id.to_string();
        self.call(move |engine| engine.delete_row(table_id, &row_id))
            .await
    }

    // Foreign keys

    pub async fn get_foreign_keys(&self, table_id: i64) -> Result<Vec<ForeignKey>> {
        self.call(move |engine| engine.get_foreign_keys(table_id))
            .await
    }

    pub async fn create_foreign_key(&self, from_column_id: i64, to_table_id: i64) -> Result<ForeignKey> {
        self.call(move |engine| engine.create_foreign_key(from_column_id, to_table_id))
            .await
    }

    pub async fn delete_foreign_key(&self, id: i64) -> Result<()> {
        self.call(move |engine| engine.delete_foreign_key(id)).await
    }

    pub async fn get_fk_options(&self, column_id: i64) -> Result<Vec<FkOption>> {
        self.call(move |engine| engine.get_fk_options(column_id))
            .await
    }
}

fn worker(engine: Engine, mut rx: mpsc::Receiver<Message>) {
    debug!("Engine worker started");

    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(job) => job(&engine),
            Message::Shutdown(reply) => {
                rx.close();
                let _ = reply.send(engine.close());
                return;
            }
        }
    }

    // Every handle was dropped without an explicit close.
    if let Err(err) = engine.close() {
        warn!(error = %err, "Failed to close engine");
    }
}
