//! CLI argument definitions using clap
//!
//! Commands:
//! - schemadelta init --config <path>
//! - schemadelta showmigrations --config <path>
//! - schemadelta plan [--app <app> [--target <name|zero>]]
//! - schemadelta migrate [--app <app> [--target <name|zero>]] [--fake]
//! - schemadelta describe --app <app> --name <name>
//! - schemadelta insert --entity <app.model>   (row JSON on stdin)
//! - schemadelta rows --entity <app.model>
//! - schemadelta form --entity <app.model>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// schemadelta - declarative schema deltas and a fail-fast migration runner
#[derive(Parser, Debug)]
#[command(name = "schemadelta")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory layout
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,
    },

    /// List every migration of the enabled apps and whether it is applied
    #[command(name = "showmigrations")]
    ShowMigrations {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,
    },

    /// Show the steps a migrate run would take, without running them
    Plan {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        /// Restrict the run to one app
        #[arg(long)]
        app: Option<String>,

        /// Migration name (or unique prefix) to move to, or `zero`
        #[arg(long, requires = "app")]
        target: Option<String>,
    },

    /// Apply or unapply migrations
    Migrate {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        /// Restrict the run to one app
        #[arg(long)]
        app: Option<String>,

        /// Migration name (or unique prefix) to move to, or `zero`
        #[arg(long, requires = "app")]
        target: Option<String>,

        /// Record the steps without touching the schema
        #[arg(long)]
        fake: bool,
    },

    /// Describe the operations of one migration
    Describe {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        #[arg(long)]
        app: String,

        /// Migration name or unique prefix
        #[arg(long)]
        name: String,
    },

    /// Insert one row read as a JSON object from stdin
    Insert {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        /// Entity as `app.model`
        #[arg(long)]
        entity: String,
    },

    /// Print every row of an entity
    Rows {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        /// Entity as `app.model`
        #[arg(long)]
        entity: String,
    },

    /// Print the editable-field listing of an entity
    Form {
        /// Path to configuration file
        #[arg(long, default_value = "./schemadelta.json")]
        config: PathBuf,

        /// Entity as `app.model`
        #[arg(long)]
        entity: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
