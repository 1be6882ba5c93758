//! Mood-driven mix generation over a listener's own music channels.
//!
//! Core modules:
//! - [`recipe`] - How many tracks each channel contributes
//! - [`pools`] - Concurrent per-channel candidate fetching
//! - [`discovery`] - Catalog search for tracks the listener has not met
//! - [`sequence`] - Interleaving and fallback filling
//! - [`engine`] - One complete run, from request to result
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track and channel types
//! - [`filter`] - Per-track eligibility (playable, blocked, cooling down)
//! - [`provider`] - The catalog provider interface
//! - [`batch`] - Throttled batches of provider calls
//! - [`store`] - Block, cooldown, link and artist-cache interfaces
//! - [`db`] - SQLite implementation of every store
//! - [`catalog`] - JSON catalog provider
//! - [`config`] - Data directory management and settings
//! - [`error`] - Errors a run can end with
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodmix::catalog::LocalCatalog;
//! use moodmix::engine::{MixEngine, RunRequest};
//! use moodmix::store::{ConfigStore, MemoryStore};
//! use moodmix::track::Channel;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let catalog = Arc::new(LocalCatalog::load(Path::new("catalog.json"))?);
//! let store = Arc::new(MemoryStore::new());
//! store.link(Channel::Liked, &["liked-songs".to_string()])?;
//!
//! let engine = MixEngine::new(catalog, store);
//! let result = engine.generate(&RunRequest::new(0.3, 0.2, 25)).await?;
//! for track in result.tracks() {
//!     println!("{track}");
//! }
//! println!("{}", result.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## How a Mix Is Built
//!
//! ### Recipe
//! - Mood sets a weight for each of the six channels: personal channels
//!   dominate at low mood, similar-artist and high-intensity channels at
//!   high mood
//! - Discovery takes `round(length × discover × 0.4)` slots, never more
//!   than 40% of the mix
//! - Counts are rounded and the rounding drift is absorbed by a single
//!   channel, so the recipe always adds up to the requested length
//!
//! ### Pools
//! - Each channel fetches several times its share from its linked sources,
//!   all channels at once
//! - Unplayable, local-only, blocked and recently used tracks are dropped
//! - A failing source leaves its channel short; it never fails the run
//!
//! ### Discovery
//! - Low levels search for artists already in the listener's pools
//! - High levels search mood-matched genre seeds, more of them the higher
//!   the level
//! - Searches run in small batches with a pause in between
//!
//! ### Ordering
//! - Channels are interleaved round-robin, so no channel plays a long run
//! - Short mixes are topped up from everything else the channels returned,
//!   and the result carries a warning saying so

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod filter;
pub mod pools;
pub mod provider;
pub mod recipe;
pub mod sequence;
pub mod store;
pub mod track;
