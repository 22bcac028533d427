//! CLI command implementations
//!
//! Every command except `init` follows the same boot sequence:
//! 1. Configuration load
//! 2. History build from the enabled apps
//! 3. State load (row store, then ledger)
//!
//! and answers with exactly one JSON line on stdout.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::apps;
use crate::executor::{MigrationExecutor, MigrationPlan, Mode, Target};
use crate::migration::{MigrationHistory, MigrationId};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::recorder::AppliedLedger;
use crate::schema::{qualified_name, FormDescriptor};
use crate::storage::{Database, StateStore, StorageErrorCode};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_object, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, dispatches, and reports any failure as a JSON error
/// line. This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::ShowMigrations { config } => show_migrations(&config),
        Command::Plan {
            config,
            app,
            target,
        } => plan(&config, app, target),
        Command::Migrate {
            config,
            app,
            target,
            fake,
        } => migrate(&config, app, target, fake),
        Command::Describe { config, app, name } => describe(&config, &app, &name),
        Command::Insert { config, entity } => insert(&config, &entity),
        Command::Rows { config, entity } => rows(&config, &entity),
        Command::Form { config, entity } => form(&config, &entity),
    }
}

/// Create `data/` and `metadata/` under the data directory.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    for dir in [data_dir.join("data"), data_dir.join("metadata")] {
        fs::create_dir_all(&dir).map_err(|e| {
            CliError::config_error(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;
    }

    write_response(json!({"initialized": true, "data_dir": config.data_dir}))
}

pub fn show_migrations(config_path: &Path) -> CliResult<()> {
    let session = Session::boot(config_path)?;

    let mut apps = serde_json::Map::new();
    for app in session.history.apps() {
        let entries: Vec<Value> = session
            .history
            .app_migrations(app)
            .map(|m| {
                let applied_at = session
                    .ledger
                    .applied()
                    .iter()
                    .find(|a| a.id == m.id)
                    .map(|a| a.applied_at.to_rfc3339());
                let mark = if applied_at.is_some() { "[X]" } else { "[ ]" };
                json!({
                    "name": m.id.name,
                    "mark": mark,
                    "applied": applied_at.is_some(),
                    "applied_at": applied_at,
                })
            })
            .collect();
        apps.insert(app.to_string(), Value::Array(entries));
    }

    write_response(Value::Object(apps))
}

pub fn plan(config_path: &Path, app: Option<String>, target: Option<String>) -> CliResult<()> {
    let session = Session::boot(config_path)?;
    let target = resolve_target(&session.history, app, target)?;

    let executor = MigrationExecutor::new(&session.history);
    let plan = executor.plan(&session.ledger, &target)?;

    write_response(json!({
        "target": target.to_string(),
        "steps": render_plan(&session.history, &plan),
    }))
}

pub fn migrate(
    config_path: &Path,
    app: Option<String>,
    target: Option<String>,
    fake: bool,
) -> CliResult<()> {
    let mut session = Session::boot(config_path)?;
    let target = resolve_target(&session.history, app, target)?;
    let mode = if fake { Mode::Fake } else { Mode::Apply };

    let executor = MigrationExecutor::new(&session.history).with_store(&session.store);
    let plan = executor.plan(&session.ledger, &target)?;
    let report = executor.migrate(&mut session.db, &mut session.ledger, &plan, mode)?;

    let names = |ids: &[MigrationId]| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
    write_response(json!({
        "target": target.to_string(),
        "applied": names(&report.applied),
        "unapplied": names(&report.unapplied),
        "faked": report.faked,
    }))
}

pub fn describe(config_path: &Path, app: &str, name: &str) -> CliResult<()> {
    let session = Session::boot(config_path)?;
    let id = resolve_name(&session.history, app, name)?;
    let migration = session.history.require(&id)?;

    let operations: Vec<Value> = migration
        .operations()
        .iter()
        .map(|op| {
            json!({
                "description": op.describe(),
                "reversible": op.is_reversible(),
                "definition": op,
            })
        })
        .collect();

    write_response(json!({
        "migration": migration.id.to_string(),
        "applied": session.ledger.is_applied(&migration.id),
        "dependencies": migration
            .dependencies()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>(),
        "operations": operations,
    }))
}

pub fn insert(config_path: &Path, entity: &str) -> CliResult<()> {
    let mut session = Session::boot(config_path)?;
    let entity = parse_entity(entity)?;
    let values = read_object()?;

    let row = session.db.insert(&entity, values)?;
    session.store.save(&session.db)?;
    log_event_with_fields(Event::RowInserted, &[("entity", &entity)]);

    write_response(json!({"entity": entity, "row": row}))
}

pub fn rows(config_path: &Path, entity: &str) -> CliResult<()> {
    let session = Session::boot(config_path)?;
    let entity = parse_entity(entity)?;
    let rows = session.db.rows(&entity)?;

    write_response(json!({"entity": entity, "count": rows.len(), "rows": rows}))
}

pub fn form(config_path: &Path, entity: &str) -> CliResult<()> {
    let session = Session::boot(config_path)?;
    let entity = parse_entity(entity)?;
    let descriptor = FormDescriptor::derive(session.db.entity(&entity)?);

    write_response(serde_json::to_value(&descriptor)?)
}

/// Everything a command needs after boot
struct Session {
    history: MigrationHistory,
    store: StateStore,
    db: Database,
    ledger: AppliedLedger,
}

impl Session {
    fn boot(config_path: &Path) -> CliResult<Self> {
        let config = load_config(config_path)?;
        let data_dir = config.data_path();

        if !is_initialized(data_dir) {
            return Err(CliError::not_initialized());
        }

        let history = apps::history(&config.apps).map_err(|e| {
            log_event_with_fields(
                Event::HistoryInvalid,
                &[("code", e.code().code()), ("message", e.message())],
            );
            e
        })?;
        log_event_with_fields(
            Event::HistoryLoaded,
            &[
                ("apps", &config.apps.join(",")),
                ("migrations", &history.len().to_string()),
            ],
        );

        let store = StateStore::new(data_dir);
        let db = store.load().map_err(|e| {
            if e.code() == StorageErrorCode::DataCorruption {
                log_event_with_fields(
                    Event::StateCorruption,
                    &[("path", &store.path().display().to_string()), ("message", e.message())],
                );
            }
            e
        })?;
        log_event_with_fields(
            Event::StateLoaded,
            &[("entities", &db.catalog().entity_count().to_string())],
        );

        let ledger = AppliedLedger::open(data_dir)?;

        Ok(Self {
            history,
            store,
            db,
            ledger,
        })
    }
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("config", &config_path.display().to_string()),
            ("data_dir", &config.data_dir),
        ],
    );
    Ok(config)
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("data").is_dir() && data_dir.join("metadata").is_dir()
}

/// Maps `--app` / `--target` to a target:
/// nothing is `Latest`, an app alone is that app's latest, `zero` unapplies
/// the app, anything else names a migration.
pub(crate) fn resolve_target(
    history: &MigrationHistory,
    app: Option<String>,
    target: Option<String>,
) -> CliResult<Target> {
    match (app, target) {
        (None, None) => Ok(Target::Latest),
        (None, Some(_)) => Err(CliError::invalid_argument("--target requires --app")),
        (Some(app), None) => Ok(Target::AppLatest(app)),
        (Some(app), Some(target)) if target == "zero" => Ok(Target::Zero(app)),
        (Some(app), Some(target)) => Ok(Target::To(resolve_name(history, &app, &target)?)),
    }
}

/// Exact name, else a unique name prefix such as `0004`. An unmatched name
/// is passed through so the executor reports it as unknown.
pub(crate) fn resolve_name(
    history: &MigrationHistory,
    app: &str,
    name: &str,
) -> CliResult<MigrationId> {
    let exact = MigrationId::new(app, name);
    if history.contains(&exact) {
        return Ok(exact);
    }

    let candidates: Vec<&MigrationId> = history
        .app_migrations(app)
        .map(|m| &m.id)
        .filter(|id| id.name.starts_with(name))
        .collect();

    match candidates.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Ok(exact),
        many => Err(CliError::invalid_argument(format!(
            "'{}' matches {} migrations of {}",
            name,
            many.len(),
            app
        ))),
    }
}

/// `app.model`, lower-cased
pub(crate) fn parse_entity(entity: &str) -> CliResult<String> {
    match entity.split_once('.') {
        Some((app, model)) if !app.is_empty() && !model.is_empty() => {
            Ok(qualified_name(app, model))
        }
        _ => Err(CliError::invalid_argument(format!(
            "Entity must be written as app.model, got '{}'",
            entity
        ))),
    }
}

fn render_plan(history: &MigrationHistory, plan: &MigrationPlan) -> Vec<Value> {
    plan.steps()
        .iter()
        .map(|step| {
            let operations: Vec<String> = history
                .get(&step.migration)
                .map(|m| m.describe())
                .unwrap_or_default();
            json!({
                "migration": step.migration.to_string(),
                "direction": step.direction,
                "operations": operations,
            })
        })
        .collect()
}
