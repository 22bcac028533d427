//! Migration executor subsystem
//!
//! Turns a target into a plan against the applied ledger, then runs that
//! plan one migration at a time. Each migration is applied to a staging
//! copy of the database and only committed when every one of its
//! operations succeeds.
//!
//! # Design Principles
//!
//! - Deterministic plans
//! - Fail fast, never partially apply a migration
//! - The ledger changes only after the data does

mod errors;
#[allow(clippy::module_inception)]
mod executor;
mod plan;

pub use errors::{ExecutorError, ExecutorResult};
pub use executor::{MigrateReport, MigrationExecutor, Mode};
pub use plan::{Direction, MigrationPlan, PlanStep, Target};
