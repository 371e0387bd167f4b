//! Command-line interface definitions for updatecache.
//!
//! # Example
//!
//! ```bash
//! # Rebuild every cached entry (default mode)
//! updatecache -c backend.json
//!
//! # Empty the cache
//! updatecache -c backend.json --mode clear
//!
//! # Rebuild into memory only and report what would be written
//! updatecache -c backend.json --dry-run -v
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Bulk-load or clear the statement cache.
///
/// Reads every unapproved statement from the statement database, groups
/// them by subject and dataset and writes one cache entry per group.
#[derive(Debug, Parser)]
#[command(name = "updatecache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend configuration file with the database and cache settings
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: PathBuf,

    /// Cache update mode
    #[arg(short, long, value_enum, default_value_t = Mode::Update)]
    pub mode: Mode,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Rebuild into memory instead of the cache server
    #[arg(long)]
    pub dry_run: bool,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// What to do with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Rewrite every cache entry from the statement database
    #[default]
    Update,
    /// Remove every cache entry
    Clear,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Update => write!(f, "update"),
            Mode::Clear => write!(f, "clear"),
        }
    }
}
