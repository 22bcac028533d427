//! Migration executor for schemadelta
//!
//! Plans moves between ledger states and runs them against a `Database`.
//!
//! Execution per step (strict order):
//! 1. Skip if the ledger already reflects the step
//! 2. Check prerequisites (dependencies applied, or no applied dependents)
//! 3. Interpret the operations on a staging copy of the database
//! 4. Persist the staging copy when a store is attached
//! 5. Commit the staging copy
//! 6. Update the ledger
//!
//! The first failing step halts the run. Steps before it stay committed;
//! the failing migration leaves no trace in the database or the ledger.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::migration::{Migration, MigrationError, MigrationHistory, MigrationId};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::recorder::{AppliedLedger, RecorderError};
use crate::storage::{Database, StateStore};

use super::errors::{ExecutorError, ExecutorResult};
use super::plan::{Direction, MigrationPlan, PlanStep, Target};

/// How steps touch the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Interpret operations, then record
    Apply,
    /// Record only; the schema is assumed to already match
    Fake,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Apply => "apply",
            Mode::Fake => "fake",
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    pub applied: Vec<MigrationId>,
    pub unapplied: Vec<MigrationId>,
    pub faked: bool,
}

impl MigrateReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.unapplied.is_empty()
    }
}

/// Plans and runs migrations from one history
pub struct MigrationExecutor<'a> {
    history: &'a MigrationHistory,
    store: Option<&'a StateStore>,
}

impl<'a> MigrationExecutor<'a> {
    /// Executor that only changes the in-memory database
    pub fn new(history: &'a MigrationHistory) -> Self {
        Self {
            history,
            store: None,
        }
    }

    /// Persist the database through `store` after every committed step
    pub fn with_store(mut self, store: &'a StateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn history(&self) -> &MigrationHistory {
        self.history
    }

    /// Computes the steps that move `ledger` to `target`.
    ///
    /// # Errors
    ///
    /// - Ledger inconsistent with the history (fatal)
    /// - `DELTA_UNKNOWN_APP` / `DELTA_UNKNOWN_MIGRATION` for a bad target
    pub fn plan(&self, ledger: &AppliedLedger, target: &Target) -> ExecutorResult<MigrationPlan> {
        if let Err(e) = ledger.check_consistent(self.history) {
            let message = e.to_string();
            log_event_with_fields(
                Event::LedgerInconsistent,
                &[("code", e.code()), ("message", &message)],
            );
            return Err(e.into());
        }

        let mut steps = Vec::new();
        match target {
            Target::Latest => {
                let all: BTreeSet<&MigrationId> =
                    self.history.topological_order().into_iter().collect();
                steps.extend(self.forward_steps(ledger, &all));
            }
            Target::AppLatest(app) => {
                self.require_app(app)?;
                let mut wanted = BTreeSet::new();
                for leaf in self.history.leaf_nodes(app) {
                    wanted.extend(self.history.forwards_plan(leaf)?);
                }
                steps.extend(self.forward_steps(ledger, &wanted));
            }
            Target::To(id) => {
                let anchor = &self.history.require(id)?.id;

                // Later migrations of the same app, and anything built on them
                let mut undo = BTreeSet::new();
                for child in self.history.dependents_of(anchor) {
                    if child.app == anchor.app && ledger.is_applied(child) {
                        undo.extend(self.history.backwards_plan(child)?);
                    }
                }
                steps.extend(self.backward_steps(ledger, &undo));

                let wanted: BTreeSet<&MigrationId> =
                    self.history.forwards_plan(anchor)?.into_iter().collect();
                steps.extend(self.forward_steps(ledger, &wanted));
            }
            Target::Zero(app) => {
                self.require_app(app)?;
                let mut undo = BTreeSet::new();
                for migration in self.history.app_migrations(app) {
                    if ledger.is_applied(&migration.id) {
                        undo.extend(self.history.backwards_plan(&migration.id)?);
                    }
                }
                steps.extend(self.backward_steps(ledger, &undo));
            }
        }

        let plan = MigrationPlan::new(steps);
        log_event_with_fields(
            Event::PlanBuilt,
            &[
                ("target", &target.to_string()),
                ("steps", &plan.len().to_string()),
            ],
        );
        Ok(plan)
    }

    /// Runs `plan` step by step, halting at the first failure.
    pub fn migrate(
        &self,
        db: &mut Database,
        ledger: &mut AppliedLedger,
        plan: &MigrationPlan,
        mode: Mode,
    ) -> ExecutorResult<MigrateReport> {
        let scope = ObservationScope::new(
            "MIGRATE",
            &[("steps", &plan.len().to_string()), ("mode", mode.as_str())],
        );

        let mut report = MigrateReport {
            faked: mode == Mode::Fake,
            ..MigrateReport::default()
        };

        for step in plan.steps() {
            let migration = self.history.require(&step.migration)?;
            match step.direction {
                Direction::Forward => {
                    if self.apply_migration(db, ledger, migration, mode)? {
                        report.applied.push(migration.id.clone());
                    }
                }
                Direction::Backward => {
                    if self.unapply_migration(db, ledger, migration, mode)? {
                        report.unapplied.push(migration.id.clone());
                    }
                }
            }
        }

        scope.complete(&[
            ("applied", &report.applied.len().to_string()),
            ("unapplied", &report.unapplied.len().to_string()),
        ]);
        Ok(report)
    }

    /// Plans then runs in one call
    pub fn migrate_to(
        &self,
        db: &mut Database,
        ledger: &mut AppliedLedger,
        target: &Target,
        mode: Mode,
    ) -> ExecutorResult<MigrateReport> {
        let plan = self.plan(ledger, target)?;
        self.migrate(db, ledger, &plan, mode)
    }

    /// Returns `false` when the migration was already recorded.
    fn apply_migration(
        &self,
        db: &mut Database,
        ledger: &mut AppliedLedger,
        migration: &Migration,
        mode: Mode,
    ) -> ExecutorResult<bool> {
        if ledger.is_applied(&migration.id) {
            return Ok(false);
        }

        if let Some(missing) = migration
            .dependencies()
            .iter()
            .find(|d| !ledger.is_applied(d))
        {
            return Err(self.fail(
                &migration.id,
                RecorderError::InconsistentHistory {
                    migration: migration.id.clone(),
                    dependency: missing.clone(),
                }
                .into(),
            ));
        }

        if mode == Mode::Apply {
            let mut staged = db.clone();
            for (index, operation) in migration.operations().iter().enumerate() {
                if let Err(source) = operation.apply(migration.app(), &mut staged) {
                    return Err(self.fail(
                        &migration.id,
                        ExecutorError::OperationFailed {
                            migration: migration.id.clone(),
                            index,
                            source,
                        },
                    ));
                }
            }
            self.commit(db, staged, &migration.id)?;
        }

        ledger
            .record_applied(migration)
            .map_err(|e| self.fail(&migration.id, e.into()))?;

        let event = match mode {
            Mode::Apply => Event::MigrationApplied,
            Mode::Fake => Event::MigrationFaked,
        };
        log_event_with_fields(
            event,
            &[
                ("migration", &migration.id.to_string()),
                ("direction", "forward"),
                ("operations", &migration.operations().len().to_string()),
            ],
        );
        Ok(true)
    }

    /// Returns `false` when the migration was not recorded.
    fn unapply_migration(
        &self,
        db: &mut Database,
        ledger: &mut AppliedLedger,
        migration: &Migration,
        mode: Mode,
    ) -> ExecutorResult<bool> {
        if !ledger.is_applied(&migration.id) {
            return Ok(false);
        }

        if let Some(dependent) = self
            .history
            .dependents_of(&migration.id)
            .find(|d| ledger.is_applied(d))
        {
            return Err(self.fail(
                &migration.id,
                RecorderError::DependentApplied {
                    migration: migration.id.clone(),
                    dependent: dependent.clone(),
                }
                .into(),
            ));
        }

        if mode == Mode::Apply {
            if let Some(operation) = migration.operations().iter().find(|op| !op.is_reversible()) {
                return Err(self.fail(
                    &migration.id,
                    MigrationError::irreversible(&migration.id, &operation.describe()).into(),
                ));
            }

            let mut staged = db.clone();
            for (index, operation) in migration.operations().iter().enumerate().rev() {
                if let Err(source) = operation.unapply(migration.app(), &mut staged) {
                    return Err(self.fail(
                        &migration.id,
                        ExecutorError::OperationFailed {
                            migration: migration.id.clone(),
                            index,
                            source,
                        },
                    ));
                }
            }
            self.commit(db, staged, &migration.id)?;
        }

        ledger
            .record_unapplied(&migration.id, self.history)
            .map_err(|e| self.fail(&migration.id, e.into()))?;

        let event = match mode {
            Mode::Apply => Event::MigrationUnapplied,
            Mode::Fake => Event::MigrationFaked,
        };
        log_event_with_fields(
            event,
            &[
                ("migration", &migration.id.to_string()),
                ("direction", "backward"),
            ],
        );
        Ok(true)
    }

    /// Persists `staged`, then swaps it in. On a write failure `db` keeps
    /// its previous state.
    fn commit(&self, db: &mut Database, staged: Database, id: &MigrationId) -> ExecutorResult<()> {
        if let Some(store) = self.store {
            store.save(&staged).map_err(|e| self.fail(id, e.into()))?;
            log_event_with_fields(
                Event::StateSaved,
                &[
                    ("path", &store.path().display().to_string()),
                    ("migration", &id.to_string()),
                ],
            );
        }
        *db = staged;
        Ok(())
    }

    fn fail(&self, id: &MigrationId, error: ExecutorError) -> ExecutorError {
        let message = error.to_string();
        log_event_with_fields(
            Event::MigrationFailed,
            &[
                ("migration", &id.to_string()),
                ("code", error.code()),
                ("message", &message),
            ],
        );
        error
    }

    fn require_app(&self, app: &str) -> ExecutorResult<()> {
        if self.history.has_app(app) {
            Ok(())
        } else {
            Err(MigrationError::unknown_app(app).into())
        }
    }

    fn forward_steps(&self, ledger: &AppliedLedger, wanted: &BTreeSet<&MigrationId>) -> Vec<PlanStep> {
        self.history
            .topological_order()
            .into_iter()
            .filter(|id| wanted.contains(id) && !ledger.is_applied(id))
            .map(|id| PlanStep::forward(id.clone()))
            .collect()
    }

    fn backward_steps(&self, ledger: &AppliedLedger, undo: &BTreeSet<&MigrationId>) -> Vec<PlanStep> {
        self.history
            .topological_order()
            .into_iter()
            .rev()
            .filter(|id| undo.contains(id) && ledger.is_applied(id))
            .map(|id| PlanStep::backward(id.clone()))
            .collect()
    }
}
