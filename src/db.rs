//! SQLite persistence for the engine's stores.
//!
//! One database file backs blocked tracks, cooldown timestamps, channel
//! links and the artist id cache. The schema is created on open, so a
//! fresh path just works.

use crate::store::{artist_key, window_start, ArtistCache, BlockStore, ConfigStore, CooldownStore};
use crate::track::Channel;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS blocked (
        track_id   TEXT    PRIMARY KEY,
        blocked_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS cooldown (
        track_id TEXT    PRIMARY KEY,
        used_at  INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cooldown_used_at ON cooldown(used_at);
    CREATE TABLE IF NOT EXISTS links (
        channel   TEXT    NOT NULL,
        position  INTEGER NOT NULL,
        source_id TEXT    NOT NULL,
        PRIMARY KEY (channel, position)
    );
    CREATE TABLE IF NOT EXISTS artist_cache (
        name      TEXT PRIMARY KEY,
        artist_id TEXT NOT NULL
    );
";

/// All four stores over a single SQLite connection.
#[derive(Debug)]
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
}

impl SqliteLibrary {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database at {}", path.display()))?;
        debug!("Opened library database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Database that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create library schema")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Library database lock poisoned"))
    }

    /// Every linked channel with its sources, in channel order.
    ///
    /// # Errors
    ///
    /// Returns an error if the links table cannot be read.
    pub fn all_links(&self) -> Result<Vec<(Channel, Vec<String>)>> {
        let mut links = Vec::new();
        for channel in Channel::ALL {
            let sources = self.linked_sources(channel)?;
            if !sources.is_empty() {
                links.push((channel, sources));
            }
        }
        Ok(links)
    }
}

impl BlockStore for SqliteLibrary {
    fn is_blocked(&self, track_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM blocked WHERE track_id = ?1",
                [track_id],
                |_| Ok(()),
            )
            .optional()
            .with_context(|| format!("Failed to look up blocked track {track_id}"))?;
        Ok(found.is_some())
    }

    fn block(&self, track_id: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO blocked (track_id, blocked_at) VALUES (?1, ?2)",
                params![track_id, Utc::now().timestamp()],
            )
            .with_context(|| format!("Failed to block track {track_id}"))?;
        Ok(())
    }

    fn unblock(&self, track_id: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM blocked WHERE track_id = ?1", [track_id])
            .with_context(|| format!("Failed to unblock track {track_id}"))?;
        Ok(removed > 0)
    }

    fn blocked(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT track_id FROM blocked ORDER BY track_id")
            .context("Invalid SQL statement when listing blocked tracks")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Cannot query blocked tracks")?;
        Ok(ids)
    }
}

impl CooldownStore for SqliteLibrary {
    fn is_cooling_down(&self, track_id: &str, now: DateTime<Utc>, window: Duration) -> Result<bool> {
        let since = window_start(now, window).timestamp();
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM cooldown WHERE track_id = ?1 AND used_at > ?2",
                params![track_id, since],
                |_| Ok(()),
            )
            .optional()
            .with_context(|| format!("Failed to look up cooldown for {track_id}"))?;
        Ok(found.is_some())
    }

    fn mark_used(&self, track_ids: &[String], at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cooldown (track_id, used_at) VALUES (?1, ?2)
                 ON CONFLICT(track_id) DO UPDATE SET used_at = excluded.used_at",
            )?;
            for id in track_ids {
                stmt.execute(params![id, at.timestamp()])
                    .with_context(|| format!("Failed to record cooldown for {id}"))?;
            }
        }
        tx.commit().context("Committing cooldown transaction failed")?;
        trace!("Recorded cooldown for {} tracks", track_ids.len());
        Ok(())
    }

    fn prune(&self, before: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM cooldown WHERE used_at < ?1", [before.timestamp()])
            .context("Failed to prune cooldown entries")?;
        Ok(removed)
    }

    fn clear(&self) -> Result<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM cooldown", [])
            .context("Failed to clear cooldown entries")?;
        Ok(removed)
    }
}

impl ConfigStore for SqliteLibrary {
    fn linked_sources(&self, channel: Channel) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT source_id FROM links WHERE channel = ?1 ORDER BY position")
            .context("Invalid SQL statement when reading channel links")?;
        let sources = stmt
            .query_map([channel.key()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .with_context(|| format!("Cannot query links for channel {}", channel.key()))?;
        Ok(sources)
    }

    fn link(&self, channel: Channel, source_ids: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM links WHERE channel = ?1", [channel.key()])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO links (channel, position, source_id) VALUES (?1, ?2, ?3)",
            )?;
            for (position, source_id) in source_ids.iter().enumerate() {
                #[allow(clippy::cast_possible_wrap)]
                stmt.execute(params![channel.key(), position as i64, source_id])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to link channel {}", channel.key()))?;
        Ok(())
    }

    fn unlink(&self, channel: Channel) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM links WHERE channel = ?1", [channel.key()])
            .with_context(|| format!("Failed to unlink channel {}", channel.key()))?;
        Ok(())
    }
}

impl ArtistCache for SqliteLibrary {
    fn cached_artist_id(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT artist_id FROM artist_cache WHERE name = ?1",
            [artist_key(name)],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read artist cache for `{name}'"))
    }

    fn cache_artist_id(&self, name: &str, artist_id: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO artist_cache (name, artist_id) VALUES (?1, ?2)",
                params![artist_key(name), artist_id],
            )
            .with_context(|| format!("Failed to cache artist id for `{name}'"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_schema_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("library.db");

        let library = SqliteLibrary::open(&path)?;
        library.block("t1")?;
        drop(library);

        let reopened = SqliteLibrary::open(&path)?;
        assert!(reopened.is_blocked("t1")?);
        Ok(())
    }

    #[test]
    fn test_cooldown_upsert_keeps_latest() -> Result<()> {
        let library = SqliteLibrary::open_in_memory()?;
        let now = Utc::now();
        let ids = vec!["t1".to_string()];

        library.mark_used(&ids, now - Duration::days(30))?;
        assert!(!library.is_cooling_down("t1", now, Duration::days(7))?);

        library.mark_used(&ids, now)?;
        assert!(library.is_cooling_down("t1", now, Duration::days(7))?);
        assert_eq!(library.prune(now - Duration::days(7))?, 0);
        assert_eq!(library.clear()?, 1);
        Ok(())
    }

    #[test]
    fn test_huge_cooldown_window_does_not_overflow() -> Result<()> {
        let library = SqliteLibrary::open_in_memory()?;
        let now = Utc::now();
        library.mark_used(&["t1".to_string()], now - Duration::days(365 * 40))?;

        assert!(library.is_cooling_down("t1", now, Duration::days(200_000_000))?);
        assert!(!library.is_cooling_down("t2", now, Duration::days(200_000_000))?);
        Ok(())
    }

    #[test]
    fn test_links_preserve_order_and_replace() -> Result<()> {
        let library = SqliteLibrary::open_in_memory()?;
        library.link(Channel::Similar, &["b".to_string(), "a".to_string()])?;
        assert_eq!(library.linked_sources(Channel::Similar)?, ["b", "a"]);

        library.link(Channel::Similar, &["c".to_string()])?;
        assert_eq!(library.linked_sources(Channel::Similar)?, ["c"]);

        library.link(Channel::Liked, &["liked".to_string()])?;
        let all = library.all_links()?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, Channel::Liked);

        library.unlink(Channel::Similar)?;
        assert!(library.linked_sources(Channel::Similar)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_artist_cache_is_case_insensitive() -> Result<()> {
        let library = SqliteLibrary::open_in_memory()?;
        assert_eq!(library.cached_artist_id("Nobody")?, None);

        library.cache_artist_id("Boards of Canada", "boc")?;
        assert_eq!(library.cached_artist_id("boards of canada")?, Some("boc".to_string()));
        Ok(())
    }

    #[test]
    fn test_blocked_listing() -> Result<()> {
        let library = SqliteLibrary::open_in_memory()?;
        library.block("z")?;
        library.block("a")?;
        assert_eq!(library.blocked()?, ["a", "z"]);
        assert!(library.unblock("z")?);
        assert!(!library.unblock("z")?);
        Ok(())
    }
}
