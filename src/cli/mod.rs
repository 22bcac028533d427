//! CLI module for schemadelta
//!
//! Provides command-line interface for:
//! - init: Create directory structure
//! - showmigrations / plan / describe: Inspect the history and ledger
//! - migrate: Run a plan
//! - insert / rows / form: Work with entity data

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    describe, form, init, insert, migrate, plan, rows, run, run_command, show_migrations,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_object, write_error, write_response};
