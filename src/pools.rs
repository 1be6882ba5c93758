//! Channel pool fetching.
//!
//! Every channel with a non-zero recipe count asks its linked sources for
//! more candidates than it needs, filters them and shuffles what is left.
//! Channels load concurrently and independently: a failing source only
//! empties its own share.

use crate::config::EngineSettings;
use crate::error::{MixError, Result};
use crate::filter::FilterPredicate;
use crate::provider::{attempt, CatalogProvider};
use crate::recipe::Recipe;
use crate::store::ConfigStore;
use crate::track::{Channel, Track};
use futures::future::join_all;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Outcome of loading one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    /// Recipe count was zero, nothing requested.
    Idle,
    /// No source linked for this channel.
    Unlinked,
    /// At least one source answered.
    Loaded,
    /// Every source failed or timed out.
    Failed,
}

/// Candidates for one channel in a single run.
#[derive(Debug, Clone)]
pub struct ChannelPool {
    pub channel: Channel,
    pub status: PoolStatus,
    /// Everything the provider returned, in provider order.
    pub raw: Vec<Track>,
    /// Eligible tracks, shuffled.
    pub eligible: Vec<Track>,
}

impl ChannelPool {
    fn empty(channel: Channel, status: PoolStatus) -> Self {
        Self {
            channel,
            status,
            raw: Vec::new(),
            eligible: Vec::new(),
        }
    }
}

/// Every channel's pool for a run, indexed by channel.
#[derive(Debug, Clone)]
pub struct Pools {
    pools: Vec<ChannelPool>,
}

impl Pools {
    /// Builds pools from already-filtered track lists. Useful for tests and
    /// callers that gather candidates some other way.
    #[must_use]
    pub fn from_eligible(mut lists: Vec<(Channel, Vec<Track>)>) -> Self {
        let pools = Channel::ALL
            .into_iter()
            .map(|channel| {
                match lists.iter().position(|(c, _)| *c == channel) {
                    Some(i) => {
                        let (_, tracks) = lists.swap_remove(i);
                        ChannelPool {
                            channel,
                            status: PoolStatus::Loaded,
                            raw: tracks.clone(),
                            eligible: tracks,
                        }
                    }
                    None => ChannelPool::empty(channel, PoolStatus::Idle),
                }
            })
            .collect();
        Self { pools }
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> &ChannelPool {
        &self.pools[channel.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelPool> {
        self.pools.iter()
    }

    /// Ids of every track any source returned, eligible or not.
    #[must_use]
    pub fn known_ids(&self) -> HashSet<&str> {
        self.pools
            .iter()
            .flat_map(|pool| pool.raw.iter())
            .map(|track| track.id.as_str())
            .collect()
    }

    /// Up to `limit` distinct primary artist names seen in the raw pools,
    /// in provider order. Artists whose tracks were all filtered out still
    /// count.
    #[must_use]
    pub fn artist_names(&self, channels: &[Channel], limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for channel in channels {
            for track in &self.get(*channel).raw {
                let name = track.primary_artist().trim();
                if name.is_empty() || !seen.insert(name.to_lowercase()) {
                    continue;
                }
                names.push(name.to_string());
                if names.len() >= limit {
                    return names;
                }
            }
        }
        names
    }

    /// Whether every channel the recipe needs is unlinked.
    #[must_use]
    pub fn all_needed_unlinked(&self, recipe: &Recipe) -> bool {
        let mut needed = recipe.channels().filter(|(_, count)| *count > 0).peekable();
        needed.peek().is_some()
            && needed.all(|(channel, _)| self.get(channel).status == PoolStatus::Unlinked)
    }
}

/// Loads channel pools from a provider.
pub struct PoolFetcher<'a> {
    provider: &'a dyn CatalogProvider,
    links: &'a dyn ConfigStore,
    settings: &'a EngineSettings,
}

impl<'a> PoolFetcher<'a> {
    #[must_use]
    pub fn new(
        provider: &'a dyn CatalogProvider,
        links: &'a dyn ConfigStore,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            provider,
            links,
            settings,
        }
    }

    /// Fetches, filters and shuffles a pool for every channel in `recipe`.
    ///
    /// # Errors
    ///
    /// Only store failures (reading links, blocks or cooldowns) are errors.
    /// Provider failures leave the affected pool empty.
    pub async fn fetch<R: Rng + ?Sized>(
        &self,
        recipe: &Recipe,
        filter: &FilterPredicate<'_>,
        rng: &mut R,
    ) -> Result<Pools> {
        let mut plans = Vec::new();
        for (channel, count) in recipe.channels() {
            let sources = if count == 0 {
                Vec::new()
            } else {
                self.links.linked_sources(channel).map_err(MixError::Store)?
            };
            plans.push((channel, count, sources));
        }

        let raw = join_all(
            plans
                .iter()
                .map(|(channel, count, sources)| self.load_channel(*channel, *count, sources)),
        )
        .await;

        let mut pools = Vec::with_capacity(raw.len());
        for (channel, status, tracks) in raw {
            let mut eligible = filter.retain(dedup(tracks.clone()))?;
            eligible.shuffle(rng);
            debug!(
                "{channel}: {} fetched, {} eligible ({status:?})",
                tracks.len(),
                eligible.len()
            );
            pools.push(ChannelPool {
                channel,
                status,
                raw: tracks,
                eligible,
            });
        }

        Ok(Pools { pools })
    }

    async fn load_channel(
        &self,
        channel: Channel,
        count: usize,
        sources: &[String],
    ) -> (Channel, PoolStatus, Vec<Track>) {
        if count == 0 {
            return (channel, PoolStatus::Idle, Vec::new());
        }
        if sources.is_empty() {
            info!("{channel} has no linked source, skipping");
            return (channel, PoolStatus::Unlinked, Vec::new());
        }

        let limit = self.settings.fetch_limit(count);
        let per_source = limit.div_ceil(sources.len());
        let timeout = self.settings.call_timeout();

        let results = join_all(sources.iter().map(|source| {
            let what = format!("Fetching {channel} source {source}");
            async move {
                attempt(timeout, &what, self.provider.fetch_tracks(source, per_source)).await
            }
        }))
        .await;

        let loaded = results.iter().any(Option::is_some);
        let tracks = results.into_iter().flatten().flatten().collect();
        let status = if loaded { PoolStatus::Loaded } else { PoolStatus::Failed };
        (channel, status, tracks)
    }
}

/// Drops repeated ids, keeping the first occurrence.
fn dedup(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(prefix: &str, artist: &str, n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("{prefix}{i}"), format!("Song {i}"), artist))
            .collect()
    }

    #[test]
    fn test_from_eligible_places_channels() {
        let pools = Pools::from_eligible(vec![
            (Channel::Similar, tracks("s", "A", 2)),
            (Channel::Liked, tracks("l", "B", 3)),
        ]);

        assert_eq!(pools.get(Channel::Liked).eligible.len(), 3);
        assert_eq!(pools.get(Channel::Similar).eligible.len(), 2);
        assert_eq!(pools.get(Channel::Genre).status, PoolStatus::Idle);
        assert_eq!(pools.known_ids().len(), 5);
    }

    #[test]
    fn test_artist_names_are_distinct_and_limited() {
        let mut liked = tracks("l", "Alpha", 2);
        liked.extend(tracks("m", "beta", 1));
        let mellow = vec![
            Track::new("x", "X", "ALPHA"),
            Track::new("y", "Y", "Gamma"),
            Track::new("z", "Z", "Delta"),
        ];
        let pools = Pools::from_eligible(vec![(Channel::Liked, liked), (Channel::Mellow, mellow)]);

        let names = pools.artist_names(&[Channel::Liked, Channel::Mellow], 3);
        assert_eq!(names, ["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_artist_names_include_filtered_out_artists() {
        let mut pools = Pools::from_eligible(vec![(Channel::Liked, tracks("l", "Alpha", 1))]);
        let mellow = &mut pools.pools[Channel::Mellow.index()];
        mellow.status = PoolStatus::Loaded;
        mellow.raw = tracks("m", "Resting", 2);

        let names = pools.artist_names(&[Channel::Liked, Channel::Mellow], 5);
        assert_eq!(names, ["Alpha", "Resting"]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut list = tracks("a", "A", 2);
        list.push(Track::new("a0", "Other", "B"));
        let deduped = dedup(list);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "Song 0");
    }
}
