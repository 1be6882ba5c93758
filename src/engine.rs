//! # Mix Engine
//!
//! Runs one mix generation from request to result:
//!
//! ```text
//! ComputingRecipe -> FetchingPools -> ResolvingDiscovery (if any)
//!   -> Interleaving -> FillingFallback (if short) -> RecordingCooldown -> Done
//! ```
//!
//! Nothing is retried. Channel and search failures shrink the mix and may
//! leave a warning on the result; only an unusable request, a provider that
//! will not authenticate, a store that cannot be read or an empty mix end
//! the run with an error.

use crate::config::EngineSettings;
use crate::discovery::DiscoveryResolver;
use crate::error::{MixError, Result};
use crate::filter::FilterPredicate;
use crate::pools::{PoolFetcher, Pools};
use crate::provider::CatalogProvider;
use crate::recipe::{compute_recipe, Recipe};
use crate::sequence::{fill_fallback, interleave, MixEntry, Origin};
use crate::store::{ArtistCache, BlockStore, ConfigStore, CooldownStore};
use crate::track::{Channel, Track};
use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;

/// Inputs of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// 0 is mellow and personal, 1 is intense and exploratory.
    pub mood: f64,
    /// How much of the mix, and how unfamiliar, discovery tracks make up.
    pub discover: f64,
    pub target_length: usize,
    /// Tracks used within this many days are skipped. 0 disables the check.
    pub window_days: u32,
    pub allow_explicit: bool,
    /// Demo mode: no cooldown check and nothing recorded.
    pub offline: bool,
}

impl RunRequest {
    #[must_use]
    pub fn new(mood: f64, discover: f64, target_length: usize) -> Self {
        Self {
            mood,
            discover,
            target_length,
            window_days: 7,
            allow_explicit: true,
            offline: false,
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidRequest`] for a zero length or a
    /// non-finite mood or discover level.
    pub fn validate(&self) -> Result<()> {
        if self.target_length == 0 {
            return Err(MixError::InvalidRequest(
                "target length must be at least 1".to_string(),
            ));
        }
        if !self.mood.is_finite() || !self.discover.is_finite() {
            return Err(MixError::InvalidRequest(format!(
                "mood and discover must be numbers, got {} and {}",
                self.mood, self.discover
            )));
        }
        Ok(())
    }

    /// The recipe this request produces.
    #[must_use]
    pub fn recipe(&self) -> Recipe {
        compute_recipe(self.mood, self.discover, self.target_length)
    }

    fn cooldown_window(&self) -> Option<chrono::Duration> {
        if self.offline || self.window_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(self.window_days)))
        }
    }
}

/// Per-origin track counts of a finished mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixSummary {
    counts: Vec<(Origin, usize)>,
}

impl MixSummary {
    #[must_use]
    pub fn from_entries(entries: &[MixEntry]) -> Self {
        let origins = Channel::ALL
            .into_iter()
            .map(Origin::Channel)
            .chain([Origin::Discovery, Origin::Fallback]);
        let counts = origins
            .map(|origin| {
                let n = entries.iter().filter(|entry| entry.origin == origin).count();
                (origin, n)
            })
            .collect();
        Self { counts }
    }

    #[must_use]
    pub fn count(&self, origin: Origin) -> usize {
        self.counts
            .iter()
            .find(|(o, _)| *o == origin)
            .map_or(0, |(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Origin, usize)> + '_ {
        self.counts.iter().copied()
    }
}

impl fmt::Display for MixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fallback only shows up when it was used.
        let parts = self
            .counts
            .iter()
            .filter(|(origin, n)| *origin != Origin::Fallback || *n > 0)
            .map(|(origin, n)| format!("{origin} {n}"))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(" · "))
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub entries: Vec<MixEntry>,
    pub recipe: Recipe,
    pub summary: MixSummary,
    /// Set when the mix needed fallback tracks, came out short, or could
    /// not be recorded.
    pub warning: Option<String>,
}

impl RunResult {
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter().map(|entry| &entry.track)
    }

    #[must_use]
    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks().map(|track| track.id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds mixes from a provider and a set of stores.
pub struct MixEngine {
    provider: Arc<dyn CatalogProvider>,
    blocks: Arc<dyn BlockStore>,
    cooldowns: Arc<dyn CooldownStore>,
    links: Arc<dyn ConfigStore>,
    artists: Arc<dyn ArtistCache>,
    settings: EngineSettings,
}

impl MixEngine {
    /// Engine whose four stores are all backed by `store`.
    pub fn new<S>(provider: Arc<dyn CatalogProvider>, store: Arc<S>) -> Self
    where
        S: BlockStore + CooldownStore + ConfigStore + ArtistCache + 'static,
    {
        Self {
            provider,
            blocks: store.clone(),
            cooldowns: store.clone(),
            links: store.clone(),
            artists: store,
            settings: EngineSettings::default(),
        }
    }

    /// Engine with a separate collaborator for each store.
    #[must_use]
    pub fn with_stores(
        provider: Arc<dyn CatalogProvider>,
        blocks: Arc<dyn BlockStore>,
        cooldowns: Arc<dyn CooldownStore>,
        links: Arc<dyn ConfigStore>,
        artists: Arc<dyn ArtistCache>,
    ) -> Self {
        Self {
            provider,
            blocks,
            cooldowns,
            links,
            artists,
            settings: EngineSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Generates a mix, shuffling with a freshly seeded random source.
    ///
    /// # Errors
    ///
    /// See [`MixEngine::generate_with_rng`].
    pub async fn generate(&self, request: &RunRequest) -> Result<RunResult> {
        let mut rng = StdRng::from_entropy();
        self.generate_with_rng(request, &mut rng).await
    }

    /// Generates a mix, drawing every shuffle from `rng`.
    ///
    /// # Errors
    ///
    /// - [`MixError::InvalidRequest`] if the request fails validation
    /// - [`MixError::Provider`] if the provider will not authenticate
    /// - [`MixError::Store`] if a block, cooldown or link lookup fails
    /// - [`MixError::NoLinkedSources`] if nothing the recipe needs is linked
    ///   and there is no discovery share
    /// - [`MixError::NoEligibleTracks`] if the mix came out empty
    pub async fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        request: &RunRequest,
        rng: &mut R,
    ) -> Result<RunResult> {
        request.validate()?;
        self.authenticate().await?;

        debug!("Computing recipe");
        let recipe = request.recipe();
        info!("Recipe for {} tracks: {recipe}", request.target_length);

        let now = Utc::now();
        let filter = FilterPredicate::new(
            self.blocks.as_ref(),
            self.cooldowns.as_ref(),
            request.allow_explicit,
            request.cooldown_window(),
            now,
        );

        debug!("Fetching pools");
        let pools = PoolFetcher::new(self.provider.as_ref(), self.links.as_ref(), &self.settings)
            .fetch(&recipe, &filter, rng)
            .await?;
        if recipe.discovery_count == 0 && pools.all_needed_unlinked(&recipe) {
            return Err(MixError::NoLinkedSources);
        }

        let discovered = if recipe.discovery_count > 0 {
            debug!("Resolving discovery");
            DiscoveryResolver::new(self.provider.as_ref(), self.artists.as_ref(), &self.settings)
                .resolve(
                    request.mood,
                    request.discover,
                    recipe.discovery_count,
                    &pools,
                    &filter,
                    rng,
                )
                .await?
        } else {
            Vec::new()
        };

        let short_origins = short_origins(&recipe, &pools, discovered.len());

        debug!("Interleaving");
        let mut queues: Vec<(Origin, Vec<Track>)> = recipe
            .channels()
            .map(|(channel, count)| {
                let slice = pools.get(channel).eligible.iter().take(count).cloned().collect();
                (Origin::Channel(channel), slice)
            })
            .collect();
        queues.push((Origin::Discovery, discovered));
        let mut entries = interleave(queues, request.target_length);

        let mut warnings = Vec::new();
        if entries.len() < request.target_length {
            debug!("Filling fallback");
            let union: Vec<&[Track]> = pools.iter().map(|pool| pool.eligible.as_slice()).collect();
            let added = fill_fallback(&mut entries, &union, request.target_length, rng);
            if added > 0 {
                warnings.push(fallback_warning(added, &short_origins));
            }
            let missing = request.target_length - entries.len();
            if missing > 0 {
                warnings.push(format!(
                    "Mix is {missing} tracks short of the requested {}",
                    request.target_length
                ));
            }
        }

        if entries.is_empty() {
            return Err(MixError::NoEligibleTracks);
        }

        if request.offline {
            debug!("Offline run, cooldown not recorded");
        } else {
            debug!("Recording cooldown");
            let ids: Vec<String> = entries.iter().map(|entry| entry.track.id.clone()).collect();
            if let Err(e) = self.cooldowns.mark_used(&ids, Utc::now()) {
                warn!("Failed to record cooldown: {e:#}");
                warnings.push(format!("Could not record these tracks as used: {e:#}"));
            }
        }

        let summary = MixSummary::from_entries(&entries);
        info!("Generated {} tracks: {summary}", entries.len());
        let warning = (!warnings.is_empty()).then(|| warnings.join("; "));
        if let Some(warning) = &warning {
            warn!("{warning}");
        }

        Ok(RunResult {
            entries,
            recipe,
            summary,
            warning,
        })
    }

    async fn authenticate(&self) -> Result<()> {
        let timeout = self.settings.call_timeout();
        let outcome = match tokio::time::timeout(timeout, self.provider.authenticate()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!("authentication timed out after {timeout:?}")),
        };
        outcome.map_err(|source| MixError::Provider {
            provider: self.provider.name().to_string(),
            source,
        })
    }
}

/// Labels of every origin that returned fewer eligible tracks than its
/// recipe count.
fn short_origins(recipe: &Recipe, pools: &Pools, discovered: usize) -> Vec<String> {
    let mut short: Vec<String> = recipe
        .channels()
        .filter(|(channel, count)| pools.get(*channel).eligible.len() < *count)
        .map(|(channel, _)| channel.to_string())
        .collect();
    if discovered < recipe.discovery_count {
        short.push(Origin::Discovery.to_string());
    }
    short
}

fn fallback_warning(added: usize, short: &[String]) -> String {
    let noun = if added == 1 { "track" } else { "tracks" };
    if short.is_empty() {
        format!("Added {added} fallback {noun} to replace duplicates")
    } else {
        format!(
            "Added {added} fallback {noun} because {} came up short",
            short.join(", ")
        )
    }
}
