//! schemadelta - declarative schema deltas with a deterministic, fail-fast
//! migration runner
//!
//! A migration is a value: an identity, its prerequisites and an ordered
//! list of operations. The runner plans against an applied ledger kept
//! apart from the data, applies each migration to a staging copy of the
//! database and commits only when every operation succeeds.
//!
//! The `video` app ships four migrations; `0004_project_uuid` gives every
//! project a generated, non-editable UUID.

pub mod apps;
pub mod cli;
pub mod executor;
pub mod migration;
pub mod observability;
pub mod recorder;
pub mod schema;
pub mod storage;
