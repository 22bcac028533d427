//! schemadelta CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which has already
//! written the JSON error line by the time an error reaches here. The
//! process then exits non-zero.

use schemadelta::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
