//! Runtime configuration for cosmowall
//!
//! All settings are read from the environment exactly once, at startup, into a
//! `Config` that is then passed to the parts that need it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheStore;
use crate::data::DEFAULT_API_URL;

/// Environment variable holding the NASA API key
pub const API_KEY_VAR: &str = "NASA_API_KEY";

/// Default timeout for every HTTP request
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default text-to-speech program
const DEFAULT_TTS_PROGRAM: &str = "edge-tts";

/// Default audio player command line
const DEFAULT_PLAYER: &str = "mpv --no-video";

/// Default narration voice
pub const DEFAULT_VOICE: &str = "en-US-GuyNeural";

/// Errors that can occur while building the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The NASA API key is not set
    #[error("{0} environment variable not set.")]
    MissingApiKey(&'static str),

    /// No APOD directory given and no home directory to derive one from
    #[error("Could not determine a picture directory; set APOD_DIR")]
    NoPictureDir,

    /// A numeric setting could not be parsed
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for one run of the program
#[derive(Debug, Clone)]
pub struct Config {
    /// NASA API key
    pub api_key: String,
    /// APOD metadata endpoint
    pub api_url: String,
    /// Directory holding `apod.json` and the per-date folders
    pub apod_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub timeout: Duration,
    /// Text-to-speech program
    pub tts_program: String,
    /// Audio player program followed by its arguments
    pub player: Vec<String>,
}

impl Config {
    /// Builds the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds the configuration from an explicit set of variables
    ///
    /// Recognized variables:
    /// * `NASA_API_KEY` (required)
    /// * `APOD_DIR` - defaults to `<Pictures>/apod`
    /// * `APOD_API_URL` - defaults to the public NASA endpoint
    /// * `APOD_TIMEOUT_SECS` - defaults to 30
    /// * `COSMOWALL_TTS` - defaults to `edge-tts`
    /// * `COSMOWALL_PLAYER` - defaults to `mpv --no-video`
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;

        let apod_dir = match get("APOD_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => CacheStore::default_dir().ok_or(ConfigError::NoPictureDir)?,
        };

        let timeout = match get("APOD_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidValue {
                    name: "APOD_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let player = get("COSMOWALL_PLAYER")
            .unwrap_or_else(|| DEFAULT_PLAYER.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            api_key,
            api_url: get("APOD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            apod_dir,
            timeout,
            tts_program: get("COSMOWALL_TTS").unwrap_or_else(|| DEFAULT_TTS_PROGRAM.to_string()),
            player,
        })
    }

    /// The store for this configuration's APOD directory
    pub fn store(&self) -> CacheStore {
        CacheStore::with_dir(self.apod_dir.clone())
    }
}
