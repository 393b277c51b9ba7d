// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use crate::core::naming::APP_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// broker-migrate - Service broker database migrations
///
/// Brings a service broker database up to date by applying the released
/// migration steps exactly once each, in order.
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service broker database migration tool")]
#[command(long_about = "broker-migrate - Service broker database migrations

Applies the broker's numbered migration steps in order, one transaction per
step, and records each applied step in the `migrations` ledger table.
Re-running is safe: steps that are already recorded are skipped.

Supported databases: PostgreSQL, MySQL, SQLite")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Write .broker-migrate.yaml with your database settings
  2. Check what is pending:         broker-migrate status
  3. Apply pending migrations:      broker-migrate migrate

For detailed help on each command, use: broker-migrate <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target environment
    #[arg(short, long, global = true, default_value = "development")]
    pub env: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations to the broker database
    ///
    /// Resumes after the last step recorded in the ledger and stops at the
    /// first failing step. The failing step is rolled back; earlier steps
    /// stay committed.
    ///
    /// EXAMPLES:
    ///   # Apply to development environment
    ///   broker-migrate migrate
    ///
    ///   # Apply to production with a 10 second provisioning deadline
    ///   broker-migrate migrate --env production --lookup-timeout 10
    Migrate {
        /// Deadline in seconds for each provisioning API call
        #[arg(long, value_name = "SECONDS")]
        lookup_timeout: Option<u64>,
    },

    /// Show the migration ledger and pending steps
    ///
    /// Reads the ledger without executing anything.
    ///
    /// EXAMPLES:
    ///   broker-migrate status --env production
    Status,
}
