//! End-to-end tests for the synchronous engine.
//!
//! Most tests run against an in-memory store; the ones that care about the
//! file on disk (reopening, upgrading an old layout) use a temp directory.

use std::collections::HashMap;
use std::sync::Arc;

use cellar::config::EngineConfig;
use cellar::engine::{CellInput, Engine};
use cellar::error::Error;
use cellar::store::schema::LEGACY_SCHEMA;
use cellar::store::{Layout, SqliteStore, Store};
use cellar::types::ColumnType;
use rusqlite::Connection;
use tempfile::TempDir;

fn engine() -> Engine {
    Engine::with_store(Arc::new(SqliteStore::in_memory().unwrap())).unwrap()
}

fn cells(pairs: &[(&str, &str)]) -> CellInput {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

fn event_count(engine: &Engine, table_id: i64) -> usize {
    engine.store().list_events(table_id).unwrap().len()
}

#[test]
fn test_tasks_scenario() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", true).unwrap();

    let row = engine
        .create_row(tasks.id, &cells(&[("Title", "Buy milk")]))
        .unwrap();
    assert_eq!(row.get("Title"), Some("Buy milk"));

    let dup = engine.create_row(tasks.id, &cells(&[("Title", "Buy milk")]));
    assert!(matches!(dup, Err(Error::Conflict(_))));

    let updated = engine
        .update_row(tasks.id, &row.row_id, &cells(&[("Title", "Buy eggs")]))
        .unwrap();
    assert_eq!(updated.get("Title"), Some("Buy eggs"));

    let history: Vec<String> = engine
        .get_row_history(tasks.id, &row.row_id)
        .unwrap()
        .into_iter()
        .map(|entry| entry.description)
        .collect();
    assert_eq!(
        history,
        vec![
            "Row created".to_string(),
            "Title → \"Buy milk\"".to_string(),
            "Title → \"Buy eggs\"".to_string(),
        ]
    );
}

#[test]
fn test_rejected_create_appends_nothing() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", true).unwrap();
    engine
        .create_typed_column(tasks.id, "Points", false, ColumnType::Number, vec![])
        .unwrap();

    engine
        .create_row(tasks.id, &cells(&[("Title", "A")]))
        .unwrap();
    let before = event_count(&engine, tasks.id);

    let dup = engine.create_row(tasks.id, &cells(&[("Title", "A"), ("Points", "3")]));
    assert!(matches!(dup, Err(Error::Conflict(_))));

    let bad_number = engine.create_row(tasks.id, &cells(&[("Title", "B"), ("Points", "lots")]));
    assert!(matches!(bad_number, Err(Error::Validation(_))));

    assert_eq!(event_count(&engine, tasks.id), before);
    assert_eq!(engine.get_rows(tasks.id).unwrap().len(), 1);
}

#[test]
fn test_create_row_ignores_unknown_and_empty_values() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", false).unwrap();
    engine.create_column(tasks.id, "Notes", false).unwrap();

    let row = engine
        .create_row(
            tasks.id,
            &cells(&[("Title", "A"), ("Notes", ""), ("Nope", "x")]),
        )
        .unwrap();

    // row-created + one cell
    assert_eq!(event_count(&engine, tasks.id), 2);
    let rows = engine.get_rows(tasks.id).unwrap();
    assert_eq!(rows, vec![row]);
    assert_eq!(rows[0].get("Notes"), None);
}

#[test]
fn test_untouched_row_is_listed() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", false).unwrap();

    let row = engine.create_row(tasks.id, &CellInput::new()).unwrap();
    let rows = engine.get_rows(tasks.id).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_id, row.row_id);
    assert!(rows[0].cells.is_empty());
    assert_eq!(rows[0].last_modified, row.last_modified);
}

#[test]
fn test_update_row_rules() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", true).unwrap();
    engine.create_column(tasks.id, "Notes", false).unwrap();

    let row = engine
        .create_row(tasks.id, &cells(&[("Title", "A"), ("Notes", "n")]))
        .unwrap();
    engine
        .create_row(tasks.id, &cells(&[("Title", "B")]))
        .unwrap();

    // Keeping its own unique value is fine, taking another row's is not.
    engine
        .update_row(tasks.id, &row.row_id, &cells(&[("Title", "A")]))
        .unwrap();
    assert!(matches!(
        engine.update_row(tasks.id, &row.row_id, &cells(&[("Title", "B")])),
        Err(Error::Conflict(_))
    ));

    assert!(matches!(
        engine.update_row(tasks.id, &row.row_id, &cells(&[("Nope", "x")])),
        Err(Error::Validation(msg)) if msg.contains("no valid columns")
    ));
    assert!(matches!(
        engine.update_row(tasks.id, "missing", &cells(&[("Title", "C")])),
        Err(Error::NotFound(_))
    ));

    let clear = HashMap::from([("Notes".to_string(), None)]);
    let updated = engine.update_row(tasks.id, &row.row_id, &clear).unwrap();
    assert_eq!(updated.get("Notes"), None);
    assert_eq!(updated.get("Title"), Some("A"));

    let history = engine.get_row_history(tasks.id, &row.row_id).unwrap();
    assert_eq!(history.last().unwrap().description, "Notes → (cleared)");
}

#[test]
fn test_enable_unique_with_duplicates_keeps_flag_unset() {
    let engine = engine();
    let tasks = engine.create_table("Tasks").unwrap();
    let title = engine.create_column(tasks.id, "Title", false).unwrap();

    engine.create_row(tasks.id, &cells(&[("Title", "A")])).unwrap();
    let second = engine.create_row(tasks.id, &cells(&[("Title", "A")])).unwrap();

    assert!(matches!(
        engine.set_column_unique(title.id, true),
        Err(Error::Conflict(_))
    ));
    assert!(!engine.get_columns(tasks.id).unwrap()[0].is_unique);

    engine.delete_row(tasks.id, &second.row_id).unwrap();
    assert!(engine.set_column_unique(title.id, true).unwrap().is_unique);
}

#[test]
fn test_foreign_key_rules() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();
    let name = engine.create_column(projects.id, "Name", false).unwrap();

    assert!(matches!(
        engine.create_foreign_key(name.id, projects.id),
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        engine.create_foreign_key(project_col.id, 999),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        engine.create_foreign_key(999, projects.id),
        Err(Error::NotFound(_))
    ));

    let fk = engine.create_foreign_key(project_col.id, projects.id).unwrap();
    assert!(matches!(
        engine.create_foreign_key(project_col.id, projects.id),
        Err(Error::Conflict(_))
    ));
    assert_eq!(engine.get_foreign_keys(tasks.id).unwrap(), vec![fk.clone()]);
    assert!(engine.get_foreign_keys(projects.id).unwrap().is_empty());

    engine.delete_foreign_key(fk.id).unwrap();
    assert!(matches!(
        engine.delete_foreign_key(fk.id),
        Err(Error::NotFound(_))
    ));
    engine.create_foreign_key(project_col.id, projects.id).unwrap();
}

#[test]
fn test_foreign_key_values_must_reference_live_rows() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(projects.id, "Name", false).unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();
    engine.create_foreign_key(project_col.id, projects.id).unwrap();

    let home = engine
        .create_row(projects.id, &cells(&[("Name", "Home")]))
        .unwrap();

    match engine.create_row(tasks.id, &cells(&[("Project", "no-such-row")])) {
        Err(Error::Conflict(msg)) => {
            assert!(msg.contains("live row of 'Projects'"), "{msg}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    engine
        .create_row(tasks.id, &cells(&[("Project", &home.row_id)]))
        .unwrap();
}

#[test]
fn test_fk_options_labels() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(projects.id, "Code", false).unwrap();
    engine.create_column(projects.id, "Name", false).unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();

    assert!(matches!(
        engine.get_fk_options(project_col.id),
        Err(Error::NotFound(_))
    ));
    engine.create_foreign_key(project_col.id, projects.id).unwrap();

    let coded = engine
        .create_row(projects.id, &cells(&[("Code", "P1"), ("Name", "Home")]))
        .unwrap();
    let named = engine
        .create_row(projects.id, &cells(&[("Name", "Work")]))
        .unwrap();
    let blank = engine.create_row(projects.id, &CellInput::new()).unwrap();

    let options = engine.get_fk_options(project_col.id).unwrap();
    let mut expected = vec![
        (coded.row_id, Some("P1".to_string())),
        (named.row_id, Some("Work".to_string())),
        (blank.row_id, None),
    ];
    expected.sort();

    let actual: Vec<_> = options.into_iter().map(|o| (o.row_id, o.label)).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_delete_row_blocked_by_live_referencer() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();
    engine.create_foreign_key(project_col.id, projects.id).unwrap();

    let home = engine.create_row(projects.id, &CellInput::new()).unwrap();
    let task = engine
        .create_row(tasks.id, &cells(&[("Project", &home.row_id)]))
        .unwrap();

    let err = engine.delete_row(projects.id, &home.row_id).unwrap_err();
    match err {
        Error::ReferentialBlock(msg) => assert!(msg.contains("1 row(s) in 'Tasks'"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.get_rows(projects.id).unwrap().len(), 1);

    engine.delete_row(tasks.id, &task.row_id).unwrap();
    engine.delete_row(projects.id, &home.row_id).unwrap();
    assert!(engine.get_rows(projects.id).unwrap().is_empty());
    assert!(matches!(
        engine.delete_row(projects.id, &home.row_id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_delete_table_cascades() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    let title = engine.create_column(tasks.id, "Title", false).unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();
    let fk = engine.create_foreign_key(project_col.id, projects.id).unwrap();

    let row = engine.create_row(tasks.id, &cells(&[("Title", "A")])).unwrap();
    assert!(matches!(
        engine.delete_table(tasks.id),
        Err(Error::ReferentialBlock(_))
    ));

    engine.delete_row(tasks.id, &row.row_id).unwrap();
    engine.delete_table(tasks.id).unwrap();

    let store = engine.store();
    assert!(store.get_table(tasks.id).unwrap().unwrap().deleted_at.is_some());
    assert!(store.get_column(title.id).unwrap().unwrap().deleted_at.is_some());
    assert!(store.get_column(project_col.id).unwrap().unwrap().deleted_at.is_some());
    assert!(store.get_foreign_key(fk.id).unwrap().unwrap().deleted_at.is_some());

    assert!(matches!(engine.get_rows(tasks.id), Err(Error::NotFound(_))));
    assert_eq!(engine.get_tables().unwrap(), vec![projects]);
}

#[test]
fn test_failed_table_cascade_leaves_everything_live() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = Engine::with_store(store.clone()).unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    let title = engine.create_column(tasks.id, "Title", false).unwrap();

    store
        .connection()
        .execute_batch(
            "CREATE TRIGGER refuse_table_tombstone
             BEFORE UPDATE OF deleted_at ON data_tables
             BEGIN SELECT RAISE(ABORT, 'refused'); END;",
        )
        .unwrap();

    assert!(matches!(
        engine.delete_table(tasks.id),
        Err(Error::Database(_))
    ));

    assert!(store.get_table(tasks.id).unwrap().unwrap().is_live());
    assert!(store.get_column(title.id).unwrap().unwrap().is_live());
    assert_eq!(engine.get_columns(tasks.id).unwrap().len(), 1);
}

#[test]
fn test_deleted_column_values_are_ignored() {
    let engine = engine();
    let projects = engine.create_table("Projects").unwrap();
    let tasks = engine.create_table("Tasks").unwrap();
    let code = engine.create_column(tasks.id, "Code", true).unwrap();
    let project_col = engine.create_column(tasks.id, "Project", false).unwrap();
    let fk = engine.create_foreign_key(project_col.id, projects.id).unwrap();

    let home = engine.create_row(projects.id, &CellInput::new()).unwrap();
    let task = engine
        .create_row(
            tasks.id,
            &cells(&[("Code", "T-1"), ("Project", &home.row_id)]),
        )
        .unwrap();

    // A fresh unique column with the old name does not see the old values.
    engine.delete_column(code.id).unwrap();
    engine.create_column(tasks.id, "Code", true).unwrap();
    engine
        .update_row(tasks.id, &task.row_id, &cells(&[("Code", "T-1")]))
        .unwrap();
    engine
        .create_row(tasks.id, &cells(&[("Code", "T-2")]))
        .unwrap();

    // Dropping the referencing column drops its foreign key and the block.
    engine.delete_column(project_col.id).unwrap();
    assert!(
        engine
            .store()
            .get_foreign_key(fk.id)
            .unwrap()
            .unwrap()
            .deleted_at
            .is_some()
    );
    engine.delete_row(projects.id, &home.row_id).unwrap();

    let history = engine.get_row_history(tasks.id, &task.row_id).unwrap();
    assert!(
        history
            .iter()
            .any(|entry| entry.description == "(deleted column) → \"T-1\"")
    );
}

#[test]
fn test_reopen_keeps_state() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        data_dir: dir.path().join("store"),
        ..EngineConfig::default()
    };

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.layout(), Layout::Fresh);
    let tasks = engine.create_table("Tasks").unwrap();
    engine.create_column(tasks.id, "Title", false).unwrap();
    let row = engine
        .create_row(tasks.id, &cells(&[("Title", "Persisted")]))
        .unwrap();
    engine.close().unwrap();

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.layout(), Layout::Current);
    let rows = engine.get_rows(tasks.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_id, row.row_id);
    assert_eq!(rows[0].get("Title"), Some("Persisted"));
}

#[test]
fn test_open_upgrades_legacy_file() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        data_dir: dir.path().to_path_buf(),
        default_table_name: "Sheet".to_string(),
        ..EngineConfig::default()
    };

    {
        let conn = Connection::open(config.db_path()).unwrap();
        conn.execute_batch(LEGACY_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO data_columns (id, name, display_order, is_unique, created_at)
                VALUES (4, 'Title', 1, 1, '2024-01-01T00:00:00+00:00');
             INSERT INTO data_columns (id, name, display_order, is_unique, created_at)
                VALUES (9, 'Done', 0, 0, '2024-01-01T00:00:00+00:00');
             INSERT INTO cell_events (row_id, column_id, sentinel, value, created_at)
                VALUES ('r1', NULL, 'row_created', NULL, '2024-01-01T00:00:00+00:00');
             INSERT INTO cell_events (row_id, column_id, sentinel, value, created_at)
                VALUES ('r1', 4, NULL, 'hello', '2024-01-01T00:00:01+00:00');
             INSERT INTO cell_events (row_id, column_id, sentinel, value, created_at)
                VALUES ('r2', NULL, 'row_created', NULL, '2024-01-02T00:00:00+00:00');
             INSERT INTO cell_events (row_id, column_id, sentinel, value, created_at)
                VALUES ('r2', NULL, 'row_lifecycle', 'deleted', '2024-01-02T00:00:01+00:00');",
        )
        .unwrap();
    }

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.layout(), Layout::Legacy);

    let tables = engine.get_tables().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "Sheet");

    let columns = engine.get_columns(tables[0].id).unwrap();
    let ids: Vec<_> = columns.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(ids, vec![(9, "Done"), (4, "Title")]);
    assert!(columns[1].is_unique);

    let rows = engine.get_rows(tables[0].id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_id, "r1");
    assert_eq!(rows[0].get("Title"), Some("hello"));
    assert_eq!(event_count(&engine, tables[0].id), 4);

    // Names are now scoped per table.
    let other = engine.create_table("Other").unwrap();
    engine.create_column(other.id, "Title", true).unwrap();
    engine.close().unwrap();

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.layout(), Layout::Current);
}
