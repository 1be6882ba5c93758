//! # Moodmix
//!
//! Builds mixes from the listener's own music channels, steered by a mood
//! and a discovery level.
//!
//! ## Architecture
//!
//! - `cli`: Command-line interface definitions
//! - `engine`: Mix generation (recipe, pools, discovery, interleaving)
//! - `catalog`: JSON catalog used as the track provider
//! - `db`: SQLite-backed blocks, cooldown, links and artist cache
//! - `config`: Data directory and settings
//!
//! ## Usage
//!
//! ```bash
//! # Point channels at catalog sources
//! moodmix link liked liked-songs --catalog catalog.json
//! moodmix link similar similar-1 similar-2
//!
//! # Build a mix
//! moodmix mix --mood 0.3 --discover 0.2 --catalog catalog.json
//!
//! # Never hear a track again
//! moodmix block t-123
//! ```

use anyhow::{anyhow, bail, Result};
use chrono::{Duration, Utc};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use moodmix::catalog::LocalCatalog;
use moodmix::cli::{self, CooldownAction};
use moodmix::completion;
use moodmix::config::RuntimeConfig;
use moodmix::db::SqliteLibrary;
use moodmix::engine::{MixEngine, RunRequest, RunResult};
use moodmix::recipe::compute_recipe;
use moodmix::store::{window_start, BlockStore, ConfigStore, CooldownStore};
use moodmix::track::Channel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main entry point for the Moodmix application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the library.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug moodmix mix` - Enable debug logging
/// - `RUST_LOG=moodmix::pools=trace moodmix mix` - Show every rejected track
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    // Completion commands never touch the library.
    let command = match args.command {
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
            );
            return Ok(());
        }
        cli::Command::CompleteBlocked => return completion::print_blocked_completions(),
        command => command,
    };

    let config = RuntimeConfig::new()?;
    debug!("Using library database at {}", config.db_path.display());

    match command {
        cli::Command::Mix {
            mood,
            discover,
            length,
            window,
            catalog,
            offline,
            no_explicit,
            seed,
            verbose,
        } => {
            let defaults = &config.settings.mix;
            let request = RunRequest {
                mood,
                discover,
                target_length: defaults.resolve_length(length)?,
                window_days: window.unwrap_or(defaults.window_days),
                allow_explicit: !no_explicit,
                offline,
            };
            let catalog = catalog_path(catalog, &config)?;
            run_mix(&config, &catalog, &request, seed, verbose).await?;
        }
        cli::Command::Recipe {
            mood,
            discover,
            length,
        } => {
            let length = config.settings.mix.resolve_length(length)?;
            let recipe = compute_recipe(mood, discover, length);
            for (channel, count) in recipe.channels() {
                println!("{:<16} {count:>3}", channel.label());
            }
            println!("{:<16} {:>3}", "Discovery", recipe.discovery_count);
        }
        cli::Command::Link {
            channel,
            sources,
            catalog,
        } => {
            if let Some(path) = catalog {
                check_sources(&path, &sources)?;
            }
            let channel = Channel::from(channel);
            SqliteLibrary::open(&config.db_path)?.link(channel, &sources)?;
            info!("Linked {channel} to {} source(s)", sources.len());
            println!("{channel} -> {}", sources.join(", "));
        }
        cli::Command::Unlink { channel } => {
            let channel = Channel::from(channel);
            SqliteLibrary::open(&config.db_path)?.unlink(channel)?;
            println!("{channel} unlinked");
        }
        cli::Command::Links => {
            let links = SqliteLibrary::open(&config.db_path)?.all_links()?;
            if links.is_empty() {
                println!("No channels linked. Use `moodmix link <channel> <source>...`");
            }
            for (channel, sources) in links {
                println!("{:<16} {}", channel.label(), sources.join(", "));
            }
        }
        cli::Command::Block { track_id } => {
            SqliteLibrary::open(&config.db_path)?.block(&track_id)?;
            println!("Blocked {track_id}");
        }
        cli::Command::Unblock { track_id } => {
            if SqliteLibrary::open(&config.db_path)?.unblock(&track_id)? {
                println!("Unblocked {track_id}");
            } else {
                bail!("Track {track_id} was not blocked");
            }
        }
        cli::Command::Blocked => {
            for id in SqliteLibrary::open(&config.db_path)?.blocked()? {
                println!("{id}");
            }
        }
        cli::Command::Cooldown { action } => {
            let library = SqliteLibrary::open(&config.db_path)?;
            match action {
                CooldownAction::Clear => {
                    let removed = library.clear()?;
                    println!("Cleared {removed} cooldown entries");
                }
                CooldownAction::Prune { window } => {
                    let days = window.unwrap_or(config.settings.mix.window_days);
                    let before = window_start(Utc::now(), Duration::days(i64::from(days)));
                    let removed = library.prune(before)?;
                    println!("Pruned {removed} entries older than {days} days");
                }
            }
        }
        // Handled before the library was opened.
        cli::Command::Completion { .. } | cli::Command::CompleteBlocked => {}
    }

    Ok(())
}

fn catalog_path(flag: Option<PathBuf>, config: &RuntimeConfig) -> Result<PathBuf> {
    flag.or_else(|| config.settings.mix.catalog.clone())
        .ok_or_else(|| {
            anyhow!("No catalog given. Pass --catalog, set MOODMIX_CATALOG, or set mix.catalog in config.json")
        })
}

fn check_sources(catalog: &Path, sources: &[String]) -> Result<()> {
    let catalog = LocalCatalog::load(catalog)?;
    let known = catalog.source_ids();
    let unknown: Vec<&str> = sources
        .iter()
        .map(String::as_str)
        .filter(|source| !known.contains(source))
        .collect();
    if !unknown.is_empty() {
        bail!(
            "Unknown source(s) {}; the catalog has: {}",
            unknown.join(", "),
            known.join(", ")
        );
    }
    Ok(())
}

async fn run_mix(
    config: &RuntimeConfig,
    catalog: &Path,
    request: &RunRequest,
    seed: Option<u64>,
    verbose: bool,
) -> Result<()> {
    let provider = Arc::new(LocalCatalog::load(catalog)?);
    let library = Arc::new(SqliteLibrary::open(&config.db_path)?);
    let engine = MixEngine::new(provider, library).with_settings(config.settings.engine.clone());

    info!(
        "Generating {} tracks at mood {:.2}, discover {:.2}",
        request.target_length, request.mood, request.discover
    );
    let result = match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            engine.generate_with_rng(request, &mut rng).await?
        }
        None => engine.generate(request).await?,
    };

    print_mix(&result, verbose);
    Ok(())
}

fn print_mix(result: &RunResult, verbose: bool) {
    let width = result.len().to_string().len();
    for (i, entry) in result.entries.iter().enumerate() {
        if verbose {
            println!("{:>width$}. {}  [{}]", i + 1, entry.track, entry.origin);
        } else {
            println!("{:>width$}. {}", i + 1, entry.track);
        }
    }

    if verbose {
        println!();
        println!("Recipe:  {}", result.recipe);
        println!("Result:  {}", result.summary);
    }
    if let Some(warning) = &result.warning {
        eprintln!("Warning: {warning}");
    }
}
