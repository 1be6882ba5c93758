//! Errors a mix run can end with.
//!
//! Recoverable problems (a channel that failed to load, a search that timed
//! out) never show up here; they shrink the mix and may add a warning to
//! the result instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MixError>;

#[derive(Error, Debug)]
pub enum MixError {
    /// The request itself is unusable (for example a zero length).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider refused to start a session.
    #[error("Provider `{provider}' is unavailable: {source:#}")]
    Provider {
        provider: String,
        source: anyhow::Error,
    },

    /// A block, cooldown or config store could not be read.
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),

    /// None of the channels the recipe needs are linked to a source.
    #[error("No linked sources for any channel in this mix; link at least one channel")]
    NoLinkedSources,

    /// Every channel and the fallback came back empty.
    #[error("No eligible tracks found")]
    NoEligibleTracks,
}
