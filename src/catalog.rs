//! # Local Catalog
//!
//! A [`CatalogProvider`] backed by a JSON document on disk. It lets the
//! command line build real mixes without a streaming service, and gives the
//! tests a provider whose contents are easy to reason about.
//!
//! ## Document Format
//!
//! ```json
//! {
//!   "name": "my catalog",
//!   "tracks": [
//!     {
//!       "id": "t1",
//!       "title": "Song",
//!       "artists": [{ "name": "Band", "id": "ar1" }],
//!       "album": "Record",
//!       "duration_ms": 215000,
//!       "explicit": false,
//!       "genres": ["shoegaze", "dream pop"]
//!     }
//!   ],
//!   "sources": { "liked-songs": ["t1"] },
//!   "artists": { "Band": "ar1" }
//! }
//! ```
//!
//! `sources` maps the ids that channels get linked to onto track ids.
//! `artists` is optional; artist ids found on track credits are indexed
//! too.

use crate::provider::{CatalogProvider, SearchKind};
use crate::store::artist_key;
use crate::track::Track;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(flatten)]
    track: Track,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogDocument {
    name: Option<String>,
    tracks: Vec<CatalogEntry>,
    sources: HashMap<String, Vec<String>>,
    artists: HashMap<String, String>,
}

/// In-memory catalog loaded from a JSON document.
#[derive(Debug)]
pub struct LocalCatalog {
    name: String,
    tracks: Vec<Track>,
    /// Lowercased genre tags, parallel to `tracks`.
    genres: Vec<Vec<String>>,
    by_id: HashMap<String, usize>,
    sources: HashMap<String, Vec<String>>,
    artists: HashMap<String, String>,
}

impl LocalCatalog {
    /// Loads a catalog document from `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid catalog document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog at {}", path.display()))?;
        let mut catalog = Self::from_json(&text)
            .with_context(|| format!("Invalid catalog document at {}", path.display()))?;
        if catalog.name.is_empty() {
            catalog.name = path
                .file_stem()
                .map_or_else(|| "local".to_string(), |stem| stem.to_string_lossy().into_owned());
        }
        debug!(
            "Loaded catalog `{}' with {} tracks and {} sources",
            catalog.name,
            catalog.tracks.len(),
            catalog.sources.len()
        );
        Ok(catalog)
    }

    /// Parses a catalog document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or on two tracks sharing an id.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: CatalogDocument =
            serde_json::from_str(text).context("Failed to parse catalog JSON")?;
        Self::from_document(document)
    }

    fn from_document(document: CatalogDocument) -> Result<Self> {
        let mut tracks = Vec::with_capacity(document.tracks.len());
        let mut genres = Vec::with_capacity(document.tracks.len());
        let mut by_id = HashMap::new();
        let mut artists: HashMap<String, String> = document
            .artists
            .into_iter()
            .map(|(name, id)| (artist_key(&name), id))
            .collect();

        for entry in document.tracks {
            if by_id.insert(entry.track.id.clone(), tracks.len()).is_some() {
                bail!("Duplicate track id `{}' in catalog", entry.track.id);
            }
            for credit in &entry.track.artists {
                if let Some(id) = &credit.id {
                    artists
                        .entry(artist_key(&credit.name))
                        .or_insert_with(|| id.clone());
                }
            }
            genres.push(entry.genres.iter().map(|g| g.to_lowercase()).collect());
            tracks.push(entry.track);
        }

        Ok(Self {
            name: document.name.unwrap_or_default(),
            tracks,
            genres,
            by_id,
            sources: document.sources,
            artists,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Source ids that channels can be linked to, sorted.
    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn matches(&self, index: usize, term: &str, kinds: &[SearchKind]) -> bool {
        let track = &self.tracks[index];
        let artist_hit = || {
            track
                .artists
                .iter()
                .any(|artist| artist.name.to_lowercase().contains(term))
        };
        kinds.iter().any(|kind| match kind {
            SearchKind::Track => {
                track.title.to_lowercase().contains(term)
                    || artist_hit()
                    || self.genres[index].iter().any(|genre| genre.contains(term))
            }
            SearchKind::Artist => artist_hit(),
            SearchKind::Album => track.album.to_lowercase().contains(term),
            SearchKind::Playlist => self
                .sources
                .iter()
                .any(|(source, ids)| source.to_lowercase().contains(term) && ids.contains(&track.id)),
        })
    }
}

#[async_trait]
impl CatalogProvider for LocalCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tracks(&self, source_id: &str, limit: usize) -> Result<Vec<Track>> {
        let Some(ids) = self.sources.get(source_id) else {
            bail!("Unknown source `{source_id}' in catalog `{}'", self.name);
        };

        let mut tracks = Vec::with_capacity(limit.min(ids.len()));
        for id in ids {
            if tracks.len() >= limit {
                break;
            }
            match self.by_id.get(id) {
                Some(&index) => tracks.push(self.tracks[index].clone()),
                None => warn!("Source `{source_id}' lists unknown track `{id}'"),
            }
        }
        Ok(tracks)
    }

    async fn search_catalog(
        &self,
        term: &str,
        kinds: &[SearchKind],
        limit: usize,
    ) -> Result<Vec<Track>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let all = [
            SearchKind::Track,
            SearchKind::Artist,
            SearchKind::Album,
            SearchKind::Playlist,
        ];
        let kinds = if kinds.is_empty() { &all[..] } else { kinds };

        let mut seen = HashSet::new();
        Ok((0..self.tracks.len())
            .filter(|&index| self.matches(index, &term, kinds))
            .map(|index| &self.tracks[index])
            .filter(|track| seen.insert(track.id.as_str()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn resolve_artist(&self, name: &str) -> Result<Option<String>> {
        Ok(self.artists.get(&artist_key(name)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "name": "test",
        "tracks": [
            {"id": "t1", "title": "Slow Tide", "artists": [{"name": "Low Sun", "id": "ar1"}],
             "album": "Drift", "genres": ["Ambient"]},
            {"id": "t2", "title": "Fast Lane", "artists": [{"name": "Riot Grrl"}],
             "album": "Speed", "explicit": true, "genres": ["punk"]},
            {"id": "t3", "title": "Tide Pool", "artists": [{"name": "Low Sun", "id": "ar1"}],
             "album": "Drift", "playable": false}
        ],
        "sources": {"liked": ["t1", "t2", "missing"], "punk-mix": ["t2"]},
        "artists": {"Riot Grrl": "ar2"}
    }"#;

    fn catalog() -> LocalCatalog {
        LocalCatalog::from_json(DOCUMENT).unwrap()
    }

    #[test]
    fn test_parses_document() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.source_ids(), ["liked", "punk-mix"]);
        assert!(!catalog.tracks[2].playable);
        assert!(catalog.tracks[1].explicit);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let doc = r#"{"tracks": [
            {"id": "a", "title": "A", "artists": []},
            {"id": "a", "title": "B", "artists": []}
        ]}"#;
        assert!(LocalCatalog::from_json(doc).is_err());
    }

    #[tokio::test]
    async fn test_fetch_respects_limit_and_skips_unknown_ids() {
        let catalog = catalog();
        let tracks = catalog.fetch_tracks("liked", 10).await.unwrap();
        assert_eq!(tracks.len(), 2);

        let tracks = catalog.fetch_tracks("liked", 1).await.unwrap();
        assert_eq!(tracks[0].id, "t1");

        assert!(catalog.fetch_tracks("nope", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_search_by_kind() {
        let catalog = catalog();

        let hits = catalog.search_catalog("tide", &[SearchKind::Track], 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = catalog.search_catalog("AMBIENT", &[SearchKind::Track], 10).await.unwrap();
        assert_eq!(hits[0].id, "t1");

        let hits = catalog.search_catalog("punk-mix", &[SearchKind::Playlist], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t2");

        let hits = catalog.search_catalog("drift", &[SearchKind::Artist], 10).await.unwrap();
        assert!(hits.is_empty());

        let hits = catalog.search_catalog("  ", &[], 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_artist_from_credits_and_table() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_artist("low sun").await.unwrap().as_deref(), Some("ar1"));
        assert_eq!(catalog.resolve_artist("Riot Grrl").await.unwrap().as_deref(), Some("ar2"));
        assert_eq!(catalog.resolve_artist("Nobody").await.unwrap(), None);
    }
}
