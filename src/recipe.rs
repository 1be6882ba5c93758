//! Recipe calculation: how many tracks each channel contributes.
//!
//! Turns `(mood, discover, target_length)` into integer counts per channel
//! plus a discovery count. No I/O, no randomness: the same inputs always
//! produce the same recipe.

use crate::track::Channel;
use std::f64::consts::PI;
use std::fmt;

/// Discovery never takes more than this share of a mix.
pub const MAX_DISCOVERY_SHARE: f64 = 0.4;

/// Integer allocation of a mix across channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    counts: [usize; Channel::ALL.len()],
    pub discovery_count: usize,
}

impl Recipe {
    #[must_use]
    pub fn count(&self, channel: Channel) -> usize {
        self.counts[channel.index()]
    }

    /// Channels paired with their counts, in priority order.
    pub fn channels(&self) -> impl Iterator<Item = (Channel, usize)> + '_ {
        Channel::ALL.into_iter().map(|channel| (channel, self.count(channel)))
    }

    /// Sum of channel counts, excluding discovery.
    #[must_use]
    pub fn source_total(&self) -> usize {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.source_total() + self.discovery_count
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .channels()
            .map(|(channel, count)| format!("{channel} {count}"))
            .chain(std::iter::once(format!("Discovery {}", self.discovery_count)))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(" · "))
    }
}

/// Weight of one channel at the given (already clamped) mood.
#[must_use]
pub fn channel_weight(channel: Channel, mood: f64) -> f64 {
    match channel {
        // Dominant at low mood, gone by ~0.83.
        Channel::Liked => (1.0 - mood * 1.2).max(0.0),
        // Gone by ~0.67.
        Channel::Genre => (1.0 - mood * 1.5).max(0.0),
        // Peaks mid-range.
        Channel::Mellow => 0.3 + (mood * PI).sin() * 0.4,
        Channel::Station => 0.35,
        Channel::Similar => mood * 0.9,
        // Nothing until 0.4, then ramps sharply.
        Channel::Intense => ((mood - 0.4) * 2.0).max(0.0),
    }
}

/// Number of discovery tracks for a mix of `target_length`.
#[must_use]
pub fn discovery_count(discover: f64, target_length: usize) -> usize {
    let discover = clamp_unit(discover);
    if discover <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (target_length as f64 * discover * MAX_DISCOVERY_SHARE).round() as usize;
    count.min(target_length)
}

/// Computes the per-channel allocation.
///
/// The rounding residue ("drift") goes entirely to the Liked channel so the
/// grand total always equals `target_length`. When Liked has no weight at
/// this mood the residue goes to the heaviest channel instead, so channels
/// that should be silent stay at zero.
///
/// # Examples
///
/// ```
/// use moodmix::recipe::compute_recipe;
/// use moodmix::track::Channel;
///
/// let recipe = compute_recipe(0.0, 0.0, 35);
/// assert_eq!(recipe.total(), 35);
/// assert_eq!(recipe.discovery_count, 0);
/// assert_eq!(recipe.count(Channel::Intense), 0);
/// ```
#[must_use]
pub fn compute_recipe(mood: f64, discover: f64, target_length: usize) -> Recipe {
    let mood = clamp_unit(mood);
    let discovery_count = discovery_count(discover, target_length);
    let source_total = target_length - discovery_count;

    let weights = Channel::ALL.map(|channel| channel_weight(channel, mood));
    let total_weight: f64 = weights.iter().sum();

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut counts =
        weights.map(|weight| (weight / total_weight * source_total as f64).round() as usize);

    let allocated: usize = counts.iter().sum();
    let sink = drift_sink(&weights);
    if allocated < source_total {
        counts[sink] += source_total - allocated;
    } else {
        absorb_surplus(&mut counts, sink, allocated - source_total);
    }

    Recipe { counts, discovery_count }
}

/// Liked, unless it has no weight, in which case the heaviest channel.
fn drift_sink(weights: &[f64; Channel::ALL.len()]) -> usize {
    let liked = Channel::Liked.index();
    if weights[liked] > 0.0 {
        return liked;
    }
    weights
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(liked, |(i, _)| i)
}

/// Removes `surplus` from the sink first, then from the largest counts.
fn absorb_surplus(counts: &mut [usize; Channel::ALL.len()], sink: usize, mut surplus: usize) {
    let taken = surplus.min(counts[sink]);
    counts[sink] -= taken;
    surplus -= taken;

    while surplus > 0 {
        let Some((largest, _)) = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .max_by_key(|(_, count)| **count)
        else {
            break;
        };
        counts[largest] -= 1;
        surplus -= 1;
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_always_matches_target() {
        for length in [1, 2, 3, 7, 15, 35, 50, 75, 200] {
            for mood_step in 0..=20 {
                for discover_step in 0..=10 {
                    let mood = f64::from(mood_step) / 20.0;
                    let discover = f64::from(discover_step) / 10.0;
                    let recipe = compute_recipe(mood, discover, length);
                    assert_eq!(
                        recipe.total(),
                        length,
                        "mood {mood}, discover {discover}, length {length}: {recipe}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_low_mood_favours_personal_channels() {
        let recipe = compute_recipe(0.0, 0.0, 35);

        assert_eq!(recipe.discovery_count, 0);
        assert_eq!(recipe.count(Channel::Intense), 0);
        assert_eq!(recipe.count(Channel::Similar), 0);

        let liked = recipe.count(Channel::Liked);
        let genre = recipe.count(Channel::Genre);
        for channel in [Channel::Mellow, Channel::Station] {
            assert!(liked > recipe.count(channel));
            assert!(genre > recipe.count(channel));
        }
    }

    #[test]
    fn test_high_mood_favours_intense_channels() {
        let recipe = compute_recipe(1.0, 0.0, 35);

        assert_eq!(recipe.count(Channel::Genre), 0);
        assert_eq!(recipe.count(Channel::Liked), 0);

        let similar = recipe.count(Channel::Similar);
        let intense = recipe.count(Channel::Intense);
        for channel in [Channel::Mellow, Channel::Station] {
            assert!(similar > recipe.count(channel));
            assert!(intense > recipe.count(channel));
        }
        assert_eq!(recipe.total(), 35);
    }

    #[test]
    fn test_discovery_count_scaling() {
        assert_eq!(compute_recipe(0.5, 0.5, 50).discovery_count, 10);
        assert_eq!(compute_recipe(0.5, 1.0, 50).discovery_count, 20);
        assert_eq!(compute_recipe(0.5, 0.0, 50).discovery_count, 0);
        assert_eq!(compute_recipe(0.5, -1.0, 50).discovery_count, 0);
    }

    #[test]
    fn test_recipe_is_deterministic() {
        let first = compute_recipe(0.37, 0.62, 41);
        let second = compute_recipe(0.37, 0.62, 41);
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(compute_recipe(-3.0, 0.0, 20), compute_recipe(0.0, 0.0, 20));
        assert_eq!(compute_recipe(4.0, 0.0, 20), compute_recipe(1.0, 0.0, 20));
        assert_eq!(compute_recipe(f64::NAN, 0.0, 20), compute_recipe(0.0, 0.0, 20));
    }

    #[test]
    fn test_counts_stay_close_to_unrounded_share() {
        for mood_step in 0..=10 {
            let mood = f64::from(mood_step) / 10.0;
            let recipe = compute_recipe(mood, 0.0, 60);
            let weights = Channel::ALL.map(|channel| channel_weight(channel, mood));
            let total: f64 = weights.iter().sum();
            for channel in Channel::ALL {
                let share = weights[channel.index()] / total * 60.0;
                let count = recipe.count(channel) as f64;
                assert!((count - share).abs() <= 4.0, "{channel} at mood {mood}");
            }
        }
    }

    #[test]
    fn test_weights_never_sum_to_zero() {
        for step in 0..=100 {
            let mood = f64::from(step) / 100.0;
            let total: f64 = Channel::ALL.iter().map(|c| channel_weight(*c, mood)).sum();
            assert!(total >= 0.65 - 1e-9, "mood {mood} total {total}");
        }
    }

    #[test]
    fn test_surplus_never_underflows() {
        let mut counts = [0, 2, 0, 1, 0, 0];
        absorb_surplus(&mut counts, 0, 2);
        assert_eq!(counts.iter().sum::<usize>(), 1);
    }
}
