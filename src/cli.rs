//! # Command-Line Interface Module
//!
//! Command-line definitions for Moodmix, built with Clap derive macros.
//!
//! ## Commands
//!
//! - `mix`: Generate a mix from the linked channels
//! - `recipe`: Show how a mix would be split across channels
//! - `link` / `unlink` / `links`: Manage which catalog sources back each channel
//! - `block` / `unblock` / `blocked`: Manage permanently excluded tracks
//! - `cooldown`: Inspect and reset the repeat-avoidance window
//!
//! ## Examples
//!
//! ```bash
//! moodmix link liked liked-songs --catalog ~/music/catalog.json
//! moodmix mix --mood 0.7 --discover 0.3 --length 40
//! moodmix recipe --mood 1.0
//! ```

use crate::track::Channel;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Channel names accepted on the command line
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum ChannelArg {
    /// Liked songs / library
    Liked,
    /// Secondary personal list
    Mellow,
    /// Curated genre list
    Genre,
    /// Primary artist station
    Station,
    /// Similar-artist stations
    Similar,
    /// Aggregated high-intensity list
    Intense,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Liked => Channel::Liked,
            ChannelArg::Mellow => Channel::Mellow,
            ChannelArg::Genre => Channel::Genre,
            ChannelArg::Station => Channel::Station,
            ChannelArg::Similar => Channel::Similar,
            ChannelArg::Intense => Channel::Intense,
        }
    }
}

/// Main application arguments structure.
///
/// All functionality is reached through a subcommand.
#[derive(Parser)]
#[command(name = "moodmix")]
#[command(about = "Moodmix: mood-driven mixes from your own music channels")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Generate a mix
    ///
    /// Splits the requested length across the linked channels according to
    /// mood, fetches candidates from each channel, adds discovery tracks
    /// found through catalog search, and interleaves everything so no single
    /// channel dominates a stretch of the mix. Tracks used in the last
    /// `--window` days are skipped, and the new mix is recorded for the next
    /// run unless `--offline` is given.
    Mix {
        /// Mood from 0.0 (mellow, personal) to 1.0 (intense, exploratory)
        #[arg(short, long, default_value = "0.5")]
        mood: f64,

        /// Discovery level from 0.0 (none) to 1.0 (far outside your library)
        ///
        /// Discovery never takes more than 40% of the mix. Levels up to 0.5
        /// search for artists you already listen to; higher levels search
        /// mood-matched genres.
        #[arg(short, long, default_value = "0.0")]
        discover: f64,

        /// Number of tracks (defaults to the configured length)
        #[arg(short, long)]
        length: Option<usize>,

        /// Repeat-avoidance window in days (defaults to the configured window)
        #[arg(short, long)]
        window: Option<u32>,

        /// Catalog document to draw tracks from
        #[arg(long, env = "MOODMIX_CATALOG", value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,

        /// Demo mode: ignore and do not record the cooldown window
        #[arg(long)]
        offline: bool,

        /// Leave out tracks flagged as explicit
        #[arg(long)]
        no_explicit: bool,

        /// Seed the shuffles for a reproducible mix
        #[arg(long)]
        seed: Option<u64>,

        /// Show each track's channel and the run summary
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the channel allocation for a mix without fetching anything
    Recipe {
        /// Mood from 0.0 to 1.0
        #[arg(short, long, default_value = "0.5")]
        mood: f64,

        /// Discovery level from 0.0 to 1.0
        #[arg(short, long, default_value = "0.0")]
        discover: f64,

        /// Number of tracks (defaults to the configured length)
        #[arg(short, long)]
        length: Option<usize>,
    },

    /// Link a channel to one or more catalog sources
    ///
    /// Replaces any existing link. Channels linked to several sources split
    /// their fetches across all of them.
    Link {
        /// Channel to link
        channel: ChannelArg,

        /// Source ids, in the order they should be fetched
        #[arg(required = true)]
        sources: Vec<String>,

        /// Check the source ids against this catalog before linking
        #[arg(long, env = "MOODMIX_CATALOG", value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,
    },

    /// Remove a channel's link
    Unlink {
        /// Channel to unlink
        channel: ChannelArg,
    },

    /// List linked channels
    Links,

    /// Never pick this track again
    Block {
        /// Track id
        track_id: String,
    },

    /// Allow a blocked track again
    Unblock {
        /// Track id
        #[arg(value_hint = clap::ValueHint::Other)]
        track_id: String,
    },

    /// List blocked tracks
    Blocked,

    /// Manage the repeat-avoidance window
    Cooldown {
        #[command(subcommand)]
        action: CooldownAction,
    },

    /// Generate shell completions
    ///
    /// Usage: moodmix completion bash > ~/.local/share/bash-completion/completions/moodmix
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List blocked track ids for completion (hidden command)
    #[command(hide = true)]
    CompleteBlocked,
}

/// Cooldown management actions
#[derive(Subcommand, Debug)]
pub enum CooldownAction {
    /// Forget every recently used track
    Clear,

    /// Drop entries older than the window
    Prune {
        /// Window in days (defaults to the configured window)
        #[arg(short, long)]
        window: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_mix() {
        let args = Args::try_parse_from([
            "moodmix", "mix", "--mood", "0.8", "-d", "0.3", "--length", "20", "--offline",
        ])
        .unwrap();
        match args.command {
            Command::Mix {
                mood,
                discover,
                length,
                offline,
                no_explicit,
                ..
            } => {
                assert!((mood - 0.8).abs() < f64::EPSILON);
                assert!((discover - 0.3).abs() < f64::EPSILON);
                assert_eq!(length, Some(20));
                assert!(offline);
                assert!(!no_explicit);
            }
            _ => panic!("expected mix"),
        }
    }

    #[test]
    fn test_parse_link_requires_sources() {
        assert!(Args::try_parse_from(["moodmix", "link", "similar"]).is_err());
        let args = Args::try_parse_from(["moodmix", "link", "similar", "a", "b"]).unwrap();
        match args.command {
            Command::Link {
                channel, sources, ..
            } => {
                assert_eq!(Channel::from(channel), Channel::Similar);
                assert_eq!(sources, ["a", "b"]);
            }
            _ => panic!("expected link"),
        }
    }
}
