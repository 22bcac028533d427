//! Migration Runner Tests
//!
//! End-to-end runs against a real data directory:
//! - state and ledger survive a restart
//! - a corrupted state file is never silently accepted
//! - a ledger that contradicts the history blocks planning
//! - backward runs drop the field and forward runs regenerate it
//! - a failing run keeps earlier migrations and records nothing else

use std::fs;
use std::path::Path;

use schemadelta::apps;
use schemadelta::executor::{Direction, MigrationExecutor, Mode, Target};
use schemadelta::migration::{MigrationHistory, MigrationId};
use schemadelta::recorder::AppliedLedger;
use schemadelta::storage::{Row, StateStore, StorageErrorCode};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const PROJECT: &str = "video.project";

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn video_history() -> MigrationHistory {
    apps::history(&["video".to_string()]).unwrap()
}

fn id(name: &str) -> MigrationId {
    MigrationId::new("video", name)
}

fn project(name: &str) -> Row {
    let mut row = Row::new();
    row.insert("name".into(), json!(name));
    row
}

/// Runs one "process": load state and ledger, migrate to `target`, drop.
fn run_process(data_dir: &Path, history: &MigrationHistory, target: Target, mode: Mode) {
    let store = StateStore::new(data_dir);
    let mut db = store.load().unwrap();
    let mut ledger = AppliedLedger::open(data_dir).unwrap();

    MigrationExecutor::new(history)
        .with_store(&store)
        .migrate_to(&mut db, &mut ledger, &target, mode)
        .unwrap();
}

fn insert_projects(data_dir: &Path, names: &[&str]) {
    let store = StateStore::new(data_dir);
    let mut db = store.load().unwrap();
    for name in names {
        db.insert(PROJECT, project(name)).unwrap();
    }
    store.save(&db).unwrap();
}

fn stored_uuids(data_dir: &Path) -> Vec<Option<String>> {
    StateStore::new(data_dir)
        .load()
        .unwrap()
        .rows(PROJECT)
        .unwrap()
        .iter()
        .map(|r| r.get("uuid").and_then(|v| v.as_str()).map(String::from))
        .collect()
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_state_and_ledger_survive_restart() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(
        data_dir,
        &history,
        Target::To(id("0003_alter_project_layers")),
        Mode::Apply,
    );
    insert_projects(data_dir, &["Intro", "Trailer", "Outro"]);
    run_process(data_dir, &history, Target::Latest, Mode::Apply);

    let ledger = AppliedLedger::open(data_dir).unwrap();
    assert_eq!(ledger.applied_ids().count(), 4);
    assert!(ledger.is_applied(&id("0004_project_uuid")));
    assert!(data_dir.join("metadata/applied.json").exists());

    let first = stored_uuids(data_dir);
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(Option::is_some));

    // Another process finds nothing to do and changes nothing
    run_process(data_dir, &history, Target::Latest, Mode::Apply);
    assert_eq!(stored_uuids(data_dir), first);
}

#[test]
fn test_ledger_order_is_application_order() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(data_dir, &history, Target::Latest, Mode::Apply);

    let ledger = AppliedLedger::open(data_dir).unwrap();
    let names: Vec<&str> = ledger.applied().iter().map(|a| a.id.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "0001_initial",
            "0002_project_created_at",
            "0003_alter_project_layers",
            "0004_project_uuid",
        ]
    );
    assert!(ledger
        .applied()
        .windows(2)
        .all(|w| w[0].applied_at <= w[1].applied_at));
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_corrupted_state_is_fatal() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(data_dir, &history, Target::Latest, Mode::Apply);
    insert_projects(data_dir, &["Intro"]);

    let path = data_dir.join("data/state.db");
    let mut contents = fs::read(&path).unwrap();
    let mid = contents.len() / 2;
    contents[mid] ^= 0xFF;
    fs::write(&path, contents).unwrap();

    let err = StateStore::new(data_dir).load().unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::DataCorruption);
    assert!(err.is_fatal());
    assert!(
        err.to_string().contains("checksum"),
        "error should mention the checksum, got: {}",
        err
    );
}

#[test]
fn test_truncated_state_is_fatal() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(data_dir, &history, Target::Latest, Mode::Apply);

    let path = data_dir.join("data/state.db");
    let contents = fs::read(&path).unwrap();
    fs::write(&path, &contents[..contents.len() - 3]).unwrap();

    let err = StateStore::new(data_dir).load().unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::DataCorruption);
}

// =============================================================================
// Ledger consistency
// =============================================================================

#[test]
fn test_inconsistent_ledger_blocks_planning() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    fs::create_dir_all(data_dir.join("metadata")).unwrap();
    fs::write(
        data_dir.join("metadata/applied.json"),
        r#"{"applied": [{"app": "video", "name": "0004_project_uuid", "applied_at": "2024-01-01T00:00:00Z"}]}"#,
    )
    .unwrap();

    let history = video_history();
    let ledger = AppliedLedger::open(data_dir).unwrap();
    let err = MigrationExecutor::new(&history)
        .plan(&ledger, &Target::Latest)
        .unwrap_err();

    assert_eq!(err.code(), "DELTA_INCONSISTENT_HISTORY");
    assert!(err.is_fatal());
}

#[test]
fn test_unknown_ledger_entry_blocks_planning() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    fs::create_dir_all(data_dir.join("metadata")).unwrap();
    fs::write(
        data_dir.join("metadata/applied.json"),
        r#"{"applied": [{"app": "video", "name": "0099_future", "applied_at": "2024-01-01T00:00:00Z"}]}"#,
    )
    .unwrap();

    let history = video_history();
    let ledger = AppliedLedger::open(data_dir).unwrap();
    let err = MigrationExecutor::new(&history)
        .plan(&ledger, &Target::Latest)
        .unwrap_err();
    assert_eq!(err.code(), "DELTA_UNKNOWN_APPLIED");
}

// =============================================================================
// Backward runs
// =============================================================================

#[test]
fn test_backward_then_forward_regenerates_uuids() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(
        data_dir,
        &history,
        Target::To(id("0003_alter_project_layers")),
        Mode::Apply,
    );
    insert_projects(data_dir, &["Intro", "Trailer"]);
    run_process(data_dir, &history, Target::Latest, Mode::Apply);
    let first = stored_uuids(data_dir);

    // Back to 0003: field and values gone, ledger updated
    {
        let store = StateStore::new(data_dir);
        let ledger = AppliedLedger::open(data_dir).unwrap();
        let plan = MigrationExecutor::new(&history)
            .plan(&ledger, &Target::To(id("0003_alter_project_layers")))
            .unwrap();
        assert_eq!(plan.ids(Direction::Backward), [&id("0004_project_uuid")]);
        assert!(plan.ids(Direction::Forward).is_empty());

        let mut db = store.load().unwrap();
        let mut ledger = ledger;
        MigrationExecutor::new(&history)
            .with_store(&store)
            .migrate(&mut db, &mut ledger, &plan, Mode::Apply)
            .unwrap();
    }

    let db = StateStore::new(data_dir).load().unwrap();
    assert!(!db.entity(PROJECT).unwrap().has_field("uuid"));
    let cleared = stored_uuids(data_dir);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(Option::is_none));
    assert!(!AppliedLedger::open(data_dir)
        .unwrap()
        .is_applied(&id("0004_project_uuid")));

    // Forward again: new values, still distinct
    run_process(data_dir, &history, Target::Latest, Mode::Apply);
    let second = stored_uuids(data_dir);
    assert!(second.iter().all(Option::is_some));
    assert_ne!(second[0], second[1]);
    assert_ne!(second, first);
}

#[test]
fn test_zero_stops_at_irreversible_alter() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(data_dir, &history, Target::Latest, Mode::Apply);

    let store = StateStore::new(data_dir);
    let mut db = store.load().unwrap();
    let mut ledger = AppliedLedger::open(data_dir).unwrap();
    let err = MigrationExecutor::new(&history)
        .with_store(&store)
        .migrate_to(&mut db, &mut ledger, &Target::Zero("video".into()), Mode::Apply)
        .unwrap_err();

    // 0004 was reversed and committed; 0003 (alter) cannot be
    assert_eq!(err.code(), "DELTA_IRREVERSIBLE_OPERATION");
    let reopened = AppliedLedger::open(data_dir).unwrap();
    assert!(!reopened.is_applied(&id("0004_project_uuid")));
    assert!(reopened.is_applied(&id("0003_alter_project_layers")));
    assert!(!store.load().unwrap().entity(PROJECT).unwrap().has_field("uuid"));
}

// =============================================================================
// Fake runs
// =============================================================================

#[test]
fn test_fake_initial_then_real_run_fails_on_missing_entity() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path();
    let history = video_history();

    run_process(data_dir, &history, Target::To(id("0001_initial")), Mode::Fake);
    assert!(!data_dir.join("data/state.db").exists());

    let store = StateStore::new(data_dir);
    let mut db = store.load().unwrap();
    let mut ledger = AppliedLedger::open(data_dir).unwrap();
    let err = MigrationExecutor::new(&history)
        .with_store(&store)
        .migrate_to(&mut db, &mut ledger, &Target::Latest, Mode::Apply)
        .unwrap_err();

    assert_eq!(err.code(), "DELTA_SCHEMA_MISMATCH");
    let reopened = AppliedLedger::open(data_dir).unwrap();
    assert_eq!(reopened.applied_ids().count(), 1);
}
