//! Discovery resolution: tracks the listener has not met yet.
//!
//! Two modes, chosen by the discover level:
//!
//! - **Familiar** (up to the familiar threshold): search the catalog for
//!   artists already present in the listener's personal pools.
//! - **Outside** (above it): search mood-appropriate seed terms, using more
//!   seeds the wilder the discover level.
//!
//! Searches go through a [`BatchScheduler`] so a burst of requests cannot
//! trip provider rate limits. A failed search only loses its own results.

use crate::batch::BatchScheduler;
use crate::config::EngineSettings;
use crate::filter::FilterPredicate;
use crate::pools::Pools;
use crate::provider::{attempt, CatalogProvider, SearchKind};
use crate::store::ArtistCache;
use crate::track::{Channel, Provenance, Track};
use anyhow::Result;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Seed terms for low mood.
pub const LOW_MOOD_SEEDS: &[&str] = &[
    "ambient", "acoustic", "folk", "dream pop", "lo-fi", "chillwave", "jazz", "bossa nova",
    "neo soul", "slowcore",
];

/// Seed terms for mid mood.
pub const MID_MOOD_SEEDS: &[&str] = &[
    "indie rock", "alternative", "synthpop", "shoegaze", "funk", "new wave", "trip hop",
    "britpop", "post-punk", "indie pop",
];

/// Seed terms for high mood.
pub const HIGH_MOOD_SEEDS: &[&str] = &[
    "punk", "hard rock", "metal", "drum and bass", "garage rock", "grunge", "techno",
    "hardcore", "big beat", "industrial",
];

/// Channels whose artists seed familiar-mode searches.
const PERSONAL_CHANNELS: [Channel; 2] = [Channel::Liked, Channel::Mellow];

/// How discovery candidates are found for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryMode {
    Familiar,
    Outside { wildness: f64 },
}

impl DiscoveryMode {
    #[must_use]
    pub fn for_level(discover: f64, familiar_threshold: f64) -> Self {
        if discover <= familiar_threshold {
            Self::Familiar
        } else {
            let span = (1.0 - familiar_threshold).max(f64::EPSILON);
            let wildness = ((discover - familiar_threshold) / span).clamp(0.0, 1.0);
            Self::Outside { wildness }
        }
    }
}

/// Seed list for a mood.
#[must_use]
pub fn seeds_for_mood(mood: f64) -> &'static [&'static str] {
    if mood < 0.35 {
        LOW_MOOD_SEEDS
    } else if mood < 0.7 {
        MID_MOOD_SEEDS
    } else {
        HIGH_MOOD_SEEDS
    }
}

/// Number of seeds to search for a given wildness, between one and all.
#[must_use]
pub fn seed_count(wildness: f64, available: usize) -> usize {
    if available == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let wanted = (wildness.clamp(0.0, 1.0) * available as f64).ceil() as usize;
    wanted.clamp(1, available)
}

/// Finds discovery tracks for one run.
pub struct DiscoveryResolver<'a> {
    provider: &'a dyn CatalogProvider,
    artists: &'a dyn ArtistCache,
    settings: &'a EngineSettings,
    scheduler: BatchScheduler,
}

impl<'a> DiscoveryResolver<'a> {
    #[must_use]
    pub fn new(
        provider: &'a dyn CatalogProvider,
        artists: &'a dyn ArtistCache,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            provider,
            artists,
            settings,
            scheduler: settings.scheduler(),
        }
    }

    /// Up to `wanted` eligible tracks absent from every known pool.
    ///
    /// # Errors
    ///
    /// Only block/cooldown store failures are errors; search failures are
    /// logged and skipped.
    pub async fn resolve<R: Rng + ?Sized>(
        &self,
        mood: f64,
        discover: f64,
        wanted: usize,
        pools: &Pools,
        filter: &FilterPredicate<'_>,
        rng: &mut R,
    ) -> Result<Vec<Track>> {
        if wanted == 0 {
            return Ok(Vec::new());
        }

        let mode = DiscoveryMode::for_level(discover, self.settings.familiar_threshold);
        debug!("Resolving {wanted} discovery tracks in {mode:?} mode");

        let found = match mode {
            DiscoveryMode::Familiar => self.search_familiar(pools).await,
            DiscoveryMode::Outside { wildness } => {
                let mut seeds = seeds_for_mood(mood).to_vec();
                seeds.shuffle(rng);
                seeds.truncate(seed_count(wildness, seeds.len()));
                self.search_seeds(&seeds, wanted).await
            }
        };

        let known = pools.known_ids();
        let mut seen = HashSet::new();
        let fresh: Vec<Track> = found
            .into_iter()
            .filter(|track| !known.contains(track.id.as_str()))
            .filter(|track| seen.insert(track.id.clone()))
            .map(|track| track.with_provenance(Provenance::Discovery))
            .collect();

        let mut eligible = filter.retain(fresh)?;
        eligible.shuffle(rng);
        eligible.truncate(wanted);
        debug!("Discovery resolved {} of {wanted} tracks", eligible.len());
        Ok(eligible)
    }

    /// One search per personal artist. Hits must credit the artist by id or
    /// by name.
    async fn search_familiar(&self, pools: &Pools) -> Vec<Track> {
        let names = pools.artist_names(&PERSONAL_CHANNELS, self.settings.familiar_artist_limit);
        if names.is_empty() {
            debug!("No personal artists to search from");
            return Vec::new();
        }

        let limit = self.settings.per_artist_limit;
        let timeout = self.settings.call_timeout();
        let results = self
            .scheduler
            .run(names, |name| async move {
                let artist_id = self.artist_id(&name).await;
                let what = format!("Searching catalog for artist `{name}'");
                let tracks = attempt(
                    timeout,
                    &what,
                    self.provider.search_catalog(&name, &[SearchKind::Track], limit),
                )
                .await
                .unwrap_or_default();

                tracks
                    .into_iter()
                    .filter(|track| {
                        artist_id
                            .as_deref()
                            .is_some_and(|id| track.credits_artist_id(id))
                            || track.credits_artist_name(&name)
                    })
                    .collect::<Vec<_>>()
            })
            .await;

        results.into_iter().flatten().collect()
    }

    /// One search per seed term.
    async fn search_seeds(&self, seeds: &[&str], wanted: usize) -> Vec<Track> {
        if seeds.is_empty() {
            return Vec::new();
        }

        let limit = wanted.div_ceil(seeds.len()) + self.settings.seed_padding;
        let timeout = self.settings.call_timeout();
        let kinds = [SearchKind::Track, SearchKind::Playlist];
        let results = self
            .scheduler
            .run(seeds.to_vec(), |seed| {
                let what = format!("Searching catalog for seed `{seed}'");
                async move {
                    attempt(timeout, &what, self.provider.search_catalog(seed, &kinds, limit))
                        .await
                        .unwrap_or_default()
                }
            })
            .await;

        results.into_iter().flatten().collect()
    }

    /// Cached catalog id for `name`, asking the provider on a miss.
    async fn artist_id(&self, name: &str) -> Option<String> {
        match self.artists.cached_artist_id(name) {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => warn!("Artist cache read failed for `{name}': {e:#}"),
        }

        let what = format!("Resolving artist `{name}'");
        let id = attempt(self.settings.call_timeout(), &what, self.provider.resolve_artist(name))
            .await
            .flatten()?;

        if let Err(e) = self.artists.cache_artist_id(name, &id) {
            warn!("Artist cache write failed for `{name}': {e:#}");
        }
        Some(id)
    }
}
