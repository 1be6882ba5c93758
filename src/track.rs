//! Track and channel types shared by every stage of mix generation.
//!
//! Providers normalize whatever shape their backend returns into [`Track`]
//! before the engine sees it. Nothing in the engine knows about provider
//! specific fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a track came from, relative to the listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Drawn from one of the listener's linked sources.
    #[default]
    Known,
    /// Found through catalog search and not present in any known pool.
    Discovery,
}

/// A credited artist. The catalog id is optional because not every
/// provider exposes one for every credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl ArtistCredit {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), id: None }
    }
}

/// How a track is represented inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable provider identifier.
    pub id: String,
    pub title: String,
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub artwork: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    /// False when the provider reports the track cannot be streamed.
    #[serde(default = "default_playable")]
    pub playable: bool,
    /// Files that only exist on the listener's device.
    #[serde(default)]
    pub local_only: bool,
    #[serde(default)]
    pub provenance: Provenance,
}

fn default_playable() -> bool {
    true
}

impl Track {
    /// Minimal playable, non-explicit track. Mostly useful for tests and
    /// for providers that fill the rest in afterwards.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: vec![ArtistCredit::named(artist)],
            album: String::new(),
            artwork: None,
            duration_ms: 0,
            explicit: false,
            playable: true,
            local_only: false,
            provenance: Provenance::Known,
        }
    }

    /// Name of the first credited artist, or an empty string.
    #[must_use]
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map_or("", |artist| artist.name.as_str())
    }

    /// Whether any credit matches the given catalog artist id.
    #[must_use]
    pub fn credits_artist_id(&self, artist_id: &str) -> bool {
        self.artists
            .iter()
            .any(|artist| artist.id.as_deref() == Some(artist_id))
    }

    /// Whether any credit matches the given artist name, ignoring case.
    #[must_use]
    pub fn credits_artist_name(&self, name: &str) -> bool {
        self.artists
            .iter()
            .any(|artist| artist.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let artists = self
            .artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{artists} - {}", self.title)
    }
}

/// One named source of candidate tracks.
///
/// The order of [`Channel::ALL`] is the interleaving priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Liked songs / library. Dominant at low mood.
    Liked,
    /// Secondary personal list.
    Mellow,
    /// Curated genre list.
    Genre,
    /// Primary artist station.
    Station,
    /// Similar-artist stations.
    Similar,
    /// Aggregated high-intensity list.
    Intense,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Liked,
        Channel::Mellow,
        Channel::Genre,
        Channel::Station,
        Channel::Similar,
        Channel::Intense,
    ];

    /// Key used by the config store.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Channel::Liked => "liked",
            Channel::Mellow => "mellow",
            Channel::Genre => "genre",
            Channel::Station => "station",
            Channel::Similar => "similar",
            Channel::Intense => "intense",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Channel::Liked => "Liked",
            Channel::Mellow => "Mellow",
            Channel::Genre => "Genre",
            Channel::Station => "Artist station",
            Channel::Similar => "Similar artists",
            Channel::Intense => "High intensity",
        }
    }

    /// Position in [`Channel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.key() == key)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
