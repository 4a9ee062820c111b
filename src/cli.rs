//! Command-line interface parsing for cosmowall
//!
//! This module handles parsing of CLI arguments using clap, including the
//! date argument (an ISO date or `today`) and the flags that switch on the
//! optional wallpaper, viewer and narration actions.

use chrono::{NaiveDate, Utc};
use clap::Parser;
use thiserror::Error;

use crate::config::DEFAULT_VOICE;
use crate::ui::LayoutMode;

/// Value of the date argument that means the current UTC date
pub const TODAY: &str = "today";

/// Error types for CLI argument handling
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    /// The date is not a real calendar date in `YYYY-MM-DD` form
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    Invalid(String),

    /// No date was given and no action that works without one was requested
    #[error("Date is required unless --list-cached or --loop is used.")]
    Missing,
}

/// cosmowall - NASA Astronomy Picture of the Day downloader and viewer
#[derive(Parser, Debug)]
#[command(name = "cosmowall")]
#[command(about = "Fetch, cache, view and narrate NASA's Astronomy Picture of the Day")]
#[command(version)]
pub struct Cli {
    /// Date in ISO 8601 YYYY-MM-DD format (use 'today' for today's APOD)
    pub date: Option<String>,

    /// Shortcut for today's date (UTC)
    #[arg(long)]
    pub today: bool,

    /// Set the APOD image as the desktop background
    #[arg(long)]
    pub set_bg: bool,

    /// List cached APOD entries
    #[arg(long)]
    pub list_cached: bool,

    /// Display the APOD image using feh in fullscreen with auto-zoom
    #[arg(long)]
    pub feh: bool,

    /// View the title and explanation in the CosmoWall viewer
    #[arg(long)]
    pub cosmowall: bool,

    /// Use the side-by-side layout in the CosmoWall viewer
    #[arg(long)]
    pub side_by_side: bool,

    /// Cycle through all cached entries in the CosmoWall viewer
    #[arg(long = "loop")]
    pub cycle: bool,

    /// Start the CosmoWall viewer in fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Generate narration audio for the entry
    #[arg(long)]
    pub audio: bool,

    /// Generate (if needed) and play the narration audio
    #[arg(long)]
    pub play: bool,

    /// Voice used for narration
    #[arg(long, value_name = "VOICE", default_value = DEFAULT_VOICE)]
    pub voice: String,

    /// Regenerate narration even if an audio file already exists
    #[arg(long)]
    pub force_audio: bool,
}

/// What a run should do, derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Date to resolve, if any
    pub date: Option<NaiveDate>,
    /// Only list the cache
    pub list_cached: bool,
    /// Set the wallpaper
    pub set_bg: bool,
    /// Show the picture in feh
    pub feh: bool,
    /// Layout of the caption viewer, if it should be opened
    pub viewer: Option<LayoutMode>,
    /// Start the caption viewer in fullscreen
    pub fullscreen: bool,
    /// Generate narration
    pub audio: bool,
    /// Play narration
    pub play: bool,
    /// Narration voice
    pub voice: String,
    /// Regenerate narration
    pub force_audio: bool,
}

/// Parses a date argument
///
/// # Arguments
/// * `s` - `YYYY-MM-DD`, or `today` in any case
/// * `today` - the date `today` stands for
///
/// # Returns
/// * `Ok(NaiveDate)` for a real calendar date
/// * `Err(DateError::Invalid)` otherwise
pub fn parse_date_arg(s: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case(TODAY) {
        return Ok(today);
    }

    // chrono accepts unpadded fields, so insist on the exact shape first
    let well_formed = s.len() == 10
        && s.char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(DateError::Invalid(s.to_string()));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DateError::Invalid(s.to_string()))
}

/// The current date in UTC
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

impl RunOptions {
    /// Creates RunOptions from parsed CLI arguments
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    /// * `today` - The date `--today` and `today` resolve to
    pub fn from_cli(cli: &Cli, today: NaiveDate) -> Result<Self, DateError> {
        let date = if cli.today {
            Some(today)
        } else {
            cli.date
                .as_deref()
                .map(|s| parse_date_arg(s, today))
                .transpose()?
        };

        let viewer = if cli.cycle {
            Some(LayoutMode::Loop)
        } else if cli.cosmowall || cli.side_by_side {
            Some(if cli.side_by_side {
                LayoutMode::SideBySide
            } else {
                LayoutMode::Single
            })
        } else {
            None
        };

        if date.is_none() && !cli.list_cached && viewer != Some(LayoutMode::Loop) {
            return Err(DateError::Missing);
        }

        Ok(RunOptions {
            date,
            list_cached: cli.list_cached,
            set_bg: cli.set_bg,
            feh: cli.feh,
            viewer,
            fullscreen: cli.fullscreen,
            audio: cli.audio,
            play: cli.play,
            voice: cli.voice.clone(),
            force_audio: cli.force_audio,
        })
    }
}
