//! Key-value collaborators the engine reads and writes.
//!
//! Each concern is a small trait so callers can back them however they
//! like. [`crate::db::SqliteLibrary`] persists all four in SQLite;
//! [`MemoryStore`] keeps them in memory for tests and throwaway runs.
//!
//! Access is by key with last-write-wins semantics, so no cross-store
//! locking is needed.

use crate::track::Channel;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Tracks the listener never wants to hear.
pub trait BlockStore: Send + Sync {
    fn is_blocked(&self, track_id: &str) -> Result<bool>;
    fn block(&self, track_id: &str) -> Result<()>;
    /// Returns whether the track was blocked.
    fn unblock(&self, track_id: &str) -> Result<bool>;
    fn blocked(&self) -> Result<Vec<String>>;
}

/// Recently used tracks.
pub trait CooldownStore: Send + Sync {
    /// Whether `track_id` was used within `window` before `now`.
    fn is_cooling_down(&self, track_id: &str, now: DateTime<Utc>, window: Duration) -> Result<bool>;
    fn mark_used(&self, track_ids: &[String], at: DateTime<Utc>) -> Result<()>;
    /// Drops entries last used before `before`. Returns how many were removed.
    fn prune(&self, before: DateTime<Utc>) -> Result<usize>;
    fn clear(&self) -> Result<usize>;
}

/// Which provider sources back each channel.
pub trait ConfigStore: Send + Sync {
    /// Empty when the channel is not linked.
    fn linked_sources(&self, channel: Channel) -> Result<Vec<String>>;
    fn link(&self, channel: Channel, source_ids: &[String]) -> Result<()>;
    fn unlink(&self, channel: Channel) -> Result<()>;
}

/// Artist name to catalog artist id.
pub trait ArtistCache: Send + Sync {
    fn cached_artist_id(&self, name: &str) -> Result<Option<String>>;
    fn cache_artist_id(&self, name: &str, artist_id: &str) -> Result<()>;
}

/// Artist cache keys are case-insensitive.
pub(crate) fn artist_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Start of a cooldown window ending at `now`.
///
/// Windows reaching past the earliest representable time start there.
#[must_use]
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Default)]
struct MemoryState {
    blocked: HashSet<String>,
    cooldown: HashMap<String, DateTime<Utc>>,
    links: HashMap<Channel, Vec<String>>,
    artists: HashMap<String, String>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl BlockStore for MemoryStore {
    fn is_blocked(&self, track_id: &str) -> Result<bool> {
        Ok(self.state()?.blocked.contains(track_id))
    }

    fn block(&self, track_id: &str) -> Result<()> {
        self.state()?.blocked.insert(track_id.to_string());
        Ok(())
    }

    fn unblock(&self, track_id: &str) -> Result<bool> {
        Ok(self.state()?.blocked.remove(track_id))
    }

    fn blocked(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.state()?.blocked.iter().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl CooldownStore for MemoryStore {
    fn is_cooling_down(&self, track_id: &str, now: DateTime<Utc>, window: Duration) -> Result<bool> {
        Ok(self
            .state()?
            .cooldown
            .get(track_id)
            .is_some_and(|used_at| *used_at > window_start(now, window)))
    }

    fn mark_used(&self, track_ids: &[String], at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state()?;
        for id in track_ids {
            state.cooldown.insert(id.clone(), at);
        }
        Ok(())
    }

    fn prune(&self, before: DateTime<Utc>) -> Result<usize> {
        let mut state = self.state()?;
        let len = state.cooldown.len();
        state.cooldown.retain(|_, used_at| *used_at >= before);
        Ok(len - state.cooldown.len())
    }

    fn clear(&self) -> Result<usize> {
        let mut state = self.state()?;
        let len = state.cooldown.len();
        state.cooldown.clear();
        Ok(len)
    }
}

impl ConfigStore for MemoryStore {
    fn linked_sources(&self, channel: Channel) -> Result<Vec<String>> {
        Ok(self.state()?.links.get(&channel).cloned().unwrap_or_default())
    }

    fn link(&self, channel: Channel, source_ids: &[String]) -> Result<()> {
        self.state()?.links.insert(channel, source_ids.to_vec());
        Ok(())
    }

    fn unlink(&self, channel: Channel) -> Result<()> {
        self.state()?.links.remove(&channel);
        Ok(())
    }
}

impl ArtistCache for MemoryStore {
    fn cached_artist_id(&self, name: &str) -> Result<Option<String>> {
        Ok(self.state()?.artists.get(&artist_key(name)).cloned())
    }

    fn cache_artist_id(&self, name: &str, artist_id: &str) -> Result<()> {
        self.state()?
            .artists
            .insert(artist_key(name), artist_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_unblock() -> Result<()> {
        let store = MemoryStore::new();
        store.block("b")?;
        store.block("a")?;

        assert!(store.is_blocked("a")?);
        assert_eq!(store.blocked()?, ["a", "b"]);
        assert!(store.unblock("a")?);
        assert!(!store.unblock("a")?);
        assert!(!store.is_blocked("a")?);
        Ok(())
    }

    #[test]
    fn test_cooldown_window_and_prune() -> Result<()> {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.mark_used(&["old".to_string()], now - Duration::days(9))?;
        store.mark_used(&["new".to_string()], now - Duration::days(1))?;

        assert!(store.is_cooling_down("new", now, Duration::days(7))?);
        assert!(!store.is_cooling_down("old", now, Duration::days(7))?);
        assert!(!store.is_cooling_down("never", now, Duration::days(7))?);

        assert_eq!(store.prune(now - Duration::days(7))?, 1);
        assert_eq!(store.clear()?, 1);
        Ok(())
    }

    #[test]
    fn test_window_longer_than_calendar_covers_everything() -> Result<()> {
        let store = MemoryStore::new();
        let now = Utc::now();
        let window = Duration::days(200_000_000);
        store.mark_used(&["ancient".to_string()], now - Duration::days(365 * 50))?;

        assert_eq!(window_start(now, window), DateTime::<Utc>::MIN_UTC);
        assert!(store.is_cooling_down("ancient", now, window)?);
        assert!(!store.is_cooling_down("never", now, window)?);
        Ok(())
    }

    #[test]
    fn test_links_and_artist_cache() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store.linked_sources(Channel::Liked)?.is_empty());

        store.link(Channel::Similar, &["s1".to_string(), "s2".to_string()])?;
        assert_eq!(store.linked_sources(Channel::Similar)?, ["s1", "s2"]);
        store.unlink(Channel::Similar)?;
        assert!(store.linked_sources(Channel::Similar)?.is_empty());

        store.cache_artist_id("The Band", "art-1")?;
        assert_eq!(store.cached_artist_id("the band ")?, Some("art-1".to_string()));
        Ok(())
    }
}
