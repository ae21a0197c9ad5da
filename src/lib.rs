//! # Cellar
//!
//! An event-sourced, multi-table cell store on SQLite. Tables, columns and
//! foreign keys are tombstoned rather than removed, and rows exist only as an
//! append-only log of cell events that is folded back into rows on read.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! cellar = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use cellar::config::EngineConfig;
//! use cellar::engine::Engine;
//!
//! let engine = Engine::open(&EngineConfig::default())?;
//! let tasks = engine.create_table("Tasks")?;
//! engine.create_column(tasks.id, "Title", true)?;
//!
//! let cells = HashMap::from([("Title".to_string(), Some("Buy milk".to_string()))]);
//! let row = engine.create_row(tasks.id, &cells)?;
//! ```
//!
//! Async callers share one engine through [`engine::EngineHandle`].
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI module and the `cellar` binary.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;
