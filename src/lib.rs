//! updatecache - Statement cache rebuild tool
//!
//! Rebuilds a key-value cache of unapproved statements, grouped by subject,
//! once across all datasets and once per dataset, from a consistent read
//! snapshot of the statement store. Can also empty the cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod store;

use anyhow::Context;
use bytesize::ByteSize;

use crate::cache::{CacheWriter, MemoryCache, RedisCache};
use crate::cli::{Cli, Mode};
use crate::config::Config;
use crate::error::ExitCode;
use crate::pipeline::{Orchestrator, RunSummary};
use crate::progress::{Progress, ProgressReporter};
use crate::store::SqliteStore;

/// Run the application for parsed command-line arguments.
///
/// The configuration is loaded before any connection is opened. With
/// `--dry-run` entries are written to an in-memory cache and discarded.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a connection
/// fails, or the run itself fails.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load_from_path(&cli.config).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            cli.config.display()
        )
    })?;
    log::debug!("Running in {} mode", cli.mode);

    let progress = Progress::new(cli.quiet || cli.no_progress);

    if cli.dry_run {
        let mut cache = MemoryCache::new();
        execute(cli.mode, &config, &mut cache, &progress)?;
        log::info!(
            "Dry run finished, {} entries were not written to the cache",
            cache.len()
        );
    } else {
        let cache = RedisCache::connect(&config.redis).context("Failed to connect to cache")?;
        execute(cli.mode, &config, cache, &progress)?;
    }

    Ok(ExitCode::Success)
}

/// Run `mode` against `cache`, opening the statement store only for updates.
///
/// Returns the run summary for [`Mode::Update`] and `None` for
/// [`Mode::Clear`].
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the run fails. Errors
/// from clear and update are reported the same way.
pub fn execute<W: CacheWriter>(
    mode: Mode,
    config: &Config,
    cache: W,
    progress: &dyn ProgressReporter,
) -> anyhow::Result<Option<RunSummary>> {
    let mut orchestrator = Orchestrator::new(cache, progress).with_grouping(config.grouping);

    match mode {
        Mode::Clear => {
            orchestrator.clear().context("Failed to clear cached entries")?;
            Ok(None)
        }
        Mode::Update => {
            let mut store = SqliteStore::open(&config.database)
                .context("Failed to open statement database")?;
            let summary = orchestrator
                .update(&mut store)
                .context("Failed to refresh cached entries")?;
            log::info!(
                "Wrote {} entries across {} scopes ({})",
                summary.batches(),
                summary.scopes.len(),
                ByteSize::b(summary.bytes())
            );
            Ok(Some(summary))
        }
    }
}
