//! Applied-migration recorder
//!
//! Tracks which migrations have been applied to a database. The applied set
//! lives in its own file so the row store never has to know about history.

mod errors;
mod ledger;

pub use errors::{RecorderError, RecorderResult};
pub use ledger::{AppliedLedger, AppliedMigration};
