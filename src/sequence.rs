//! Ordering selected tracks into the final mix.
//!
//! [`interleave`] merges per-channel queues round-robin so no channel plays
//! a long run of consecutive tracks. [`fill_fallback`] tops up a short mix
//! from whatever else the channels returned.

use crate::track::{Channel, Track};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Where a track in the mix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    Channel(Channel),
    Discovery,
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Channel(channel) => channel.fmt(f),
            Origin::Discovery => f.write_str("Discovery"),
            Origin::Fallback => f.write_str("Fallback"),
        }
    }
}

/// One slot of the mix.
#[derive(Debug, Clone, PartialEq)]
pub struct MixEntry {
    pub track: Track,
    pub origin: Origin,
}

/// Round-robin merge of `queues` in the given order.
///
/// Each pass takes at most one track from every non-empty queue. Repeated
/// ids are dropped, and the result never grows past `target_length`.
///
/// # Examples
///
/// ```
/// use moodmix::sequence::{interleave, Origin};
/// use moodmix::track::{Channel, Track};
///
/// let liked = vec![Track::new("a", "A", "X"), Track::new("b", "B", "X")];
/// let genre = vec![Track::new("c", "C", "Y")];
/// let mix = interleave(
///     vec![(Origin::Channel(Channel::Liked), liked), (Origin::Channel(Channel::Genre), genre)],
///     10,
/// );
/// let ids: Vec<_> = mix.iter().map(|e| e.track.id.as_str()).collect();
/// assert_eq!(ids, ["a", "c", "b"]);
/// ```
#[must_use]
pub fn interleave(queues: Vec<(Origin, Vec<Track>)>, target_length: usize) -> Vec<MixEntry> {
    let mut queues: Vec<(Origin, VecDeque<Track>)> = queues
        .into_iter()
        .map(|(origin, tracks)| (origin, VecDeque::from(tracks)))
        .collect();
    let mut seen = HashSet::new();
    let mut mix = Vec::with_capacity(target_length);

    while mix.len() < target_length && queues.iter().any(|(_, queue)| !queue.is_empty()) {
        for (origin, queue) in &mut queues {
            if mix.len() >= target_length {
                break;
            }
            let Some(track) = queue.pop_front() else {
                continue;
            };
            if seen.insert(track.id.clone()) {
                mix.push(MixEntry { track, origin: *origin });
            }
        }
    }

    mix
}

/// Appends tracks from the shuffled union of `pools` until `mix` reaches
/// `target_length` or the union runs out. Returns how many were added.
pub fn fill_fallback<R: Rng + ?Sized>(
    mix: &mut Vec<MixEntry>,
    pools: &[&[Track]],
    target_length: usize,
    rng: &mut R,
) -> usize {
    if mix.len() >= target_length {
        return 0;
    }

    let mut taken: HashSet<String> = mix.iter().map(|entry| entry.track.id.clone()).collect();
    let mut union: Vec<&Track> = pools
        .iter()
        .flat_map(|pool| pool.iter())
        .filter(|track| taken.insert(track.id.clone()))
        .collect();
    union.shuffle(rng);

    let needed = target_length - mix.len();
    let before = mix.len();
    mix.extend(union.into_iter().take(needed).map(|track| MixEntry {
        track: track.clone(),
        origin: Origin::Fallback,
    }));
    mix.len() - before
}
