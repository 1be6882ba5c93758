//! Per-track eligibility.

use crate::store::{BlockStore, CooldownStore};
use crate::track::Track;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::trace;

/// Why a track was rejected. Only used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotPlayable,
    LocalOnly,
    Explicit,
    Blocked,
    CoolingDown,
}

/// Eligibility rules for one run.
///
/// The cooldown check is skipped entirely when `window` is `None`
/// (offline/demo mode, or a zero-day window).
pub struct FilterPredicate<'a> {
    blocks: &'a dyn BlockStore,
    cooldowns: &'a dyn CooldownStore,
    allow_explicit: bool,
    window: Option<Duration>,
    now: DateTime<Utc>,
}

impl<'a> FilterPredicate<'a> {
    #[must_use]
    pub fn new(
        blocks: &'a dyn BlockStore,
        cooldowns: &'a dyn CooldownStore,
        allow_explicit: bool,
        window: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            blocks,
            cooldowns,
            allow_explicit,
            window,
            now,
        }
    }

    /// Returns the first rule the track breaks, if any.
    ///
    /// # Errors
    ///
    /// Propagates block or cooldown store read failures.
    pub fn check(&self, track: &Track) -> Result<Option<Rejection>> {
        if !track.playable {
            return Ok(Some(Rejection::NotPlayable));
        }
        if track.local_only {
            return Ok(Some(Rejection::LocalOnly));
        }
        if track.explicit && !self.allow_explicit {
            return Ok(Some(Rejection::Explicit));
        }
        if self.blocks.is_blocked(&track.id)? {
            return Ok(Some(Rejection::Blocked));
        }
        if let Some(window) = self.window {
            if self.cooldowns.is_cooling_down(&track.id, self.now, window)? {
                return Ok(Some(Rejection::CoolingDown));
            }
        }
        Ok(None)
    }

    /// Keeps eligible tracks, preserving order.
    ///
    /// # Errors
    ///
    /// Propagates block or cooldown store read failures.
    pub fn retain(&self, tracks: Vec<Track>) -> Result<Vec<Track>> {
        let mut kept = Vec::with_capacity(tracks.len());
        for track in tracks {
            match self.check(&track)? {
                None => kept.push(track),
                Some(reason) => trace!("Rejected `{}' ({}): {reason:?}", track.title, track.id),
            }
        }
        Ok(kept)
    }
}
