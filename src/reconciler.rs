//! Cache reconciliation
//!
//! The `Reconciler` makes sure a local entry exists for a date, going to the
//! APOD service only when the store has nothing for it. It also attaches
//! narration audio to entries.
//!
//! A date moves through `unresolved -> metadata fetched -> downloading ->
//! resolved`. Only the resolved state is written to the store; rejections and
//! failures leave the store untouched, so the next run starts over.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::{CacheEntry, CacheError, CacheStore};
use crate::data::apod::partial_path;
use crate::data::{image_filename, ApodError, ApodSource, MediaType};
use crate::narration::{audio_path_for, narration_text, NarrationError, Synthesizer};

/// Errors that can occur while resolving a date
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The date's media is not a still image
    #[error("{date} is not an image (media_type={media_type}). Skipping download.")]
    NotAnImage {
        date: String,
        title: String,
        media_type: MediaType,
    },

    /// The metadata names no image URL
    #[error("No image URL found for {date}")]
    MissingImageUrl { date: String },

    /// Fetching the metadata failed
    #[error("Failed to fetch APOD metadata for {date}: {source}")]
    Metadata {
        date: String,
        #[source]
        source: ApodError,
    },

    /// Downloading or storing the picture failed
    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: ApodError,
    },

    /// Reading or writing the store failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors that can occur while attaching narration to an entry
#[derive(Debug, Error)]
pub enum AudioError {
    /// The synthesizer failed
    #[error(transparent)]
    Synthesis(#[from] NarrationError),

    /// Moving the synthesized audio into place failed
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the store failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Outcome of resolving a date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The entry was already in the store; no network access happened
    Cached(CacheEntry),
    /// The entry was fetched, downloaded and stored during this call
    Fetched(CacheEntry),
}

impl Resolution {
    /// The resolved entry
    pub fn entry(&self) -> &CacheEntry {
        match self {
            Resolution::Cached(entry) | Resolution::Fetched(entry) => entry,
        }
    }

    /// Consumes the resolution, returning the entry
    pub fn into_entry(self) -> CacheEntry {
        match self {
            Resolution::Cached(entry) | Resolution::Fetched(entry) => entry,
        }
    }

    /// Whether the entry came from the store
    pub fn is_cached(&self) -> bool {
        matches!(self, Resolution::Cached(_))
    }
}

/// Store key for a date
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Keeps the local store in step with the APOD service
#[derive(Debug, Clone)]
pub struct Reconciler<S> {
    store: CacheStore,
    source: S,
}

impl<S: ApodSource> Reconciler<S> {
    /// Creates a reconciler over `store`, fetching missing dates from `source`
    pub fn new(store: CacheStore, source: S) -> Self {
        Self { store, source }
    }

    /// The underlying store
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Ensures an entry exists for `date`
    ///
    /// # Returns
    /// * `Ok(Resolution::Cached)` - the stored entry, untouched
    /// * `Ok(Resolution::Fetched)` - a freshly downloaded and stored entry
    /// * `Err(ResolveError)` - nothing was written to the store
    pub async fn resolve(&self, date: NaiveDate) -> Result<Resolution, ResolveError> {
        let key = date_key(date);

        if let Some(entry) = self.store.get(&key)? {
            tracing::debug!(date = %key, "using cached entry");
            return Ok(Resolution::Cached(entry));
        }

        let meta = self
            .source
            .fetch_metadata(date)
            .await
            .map_err(|source| ResolveError::Metadata {
                date: key.clone(),
                source,
            })?;

        if !meta.is_image() {
            return Err(ResolveError::NotAnImage {
                date: key,
                title: meta.title,
                media_type: meta.media_type,
            });
        }

        let image_url = meta
            .image_url()
            .ok_or_else(|| ResolveError::MissingImageUrl { date: key.clone() })?
            .to_string();

        let image_path = self.download(date, &image_url).await?;

        let entry = CacheEntry {
            title: meta.title,
            explanation: meta.explanation,
            url: meta.url.unwrap_or_else(|| image_url.clone()),
            img: image_path.to_string_lossy().into_owned(),
            mp3: None,
        };

        // The picture is fully on disk before the store learns about it
        self.store.insert(&key, entry.clone())?;
        tracing::info!(date = %key, img = %entry.img, "stored new APOD entry");

        Ok(Resolution::Fetched(entry))
    }

    /// Downloads `url` into the date's directory
    async fn download(&self, date: NaiveDate, url: &str) -> Result<PathBuf, ResolveError> {
        let download_err = |source: ApodError| ResolveError::Download {
            url: url.to_string(),
            source,
        };

        let dir = self.store.entry_dir(date);
        tokio::fs::create_dir_all(&dir).await.map_err(|source| {
            download_err(ApodError::Io {
                path: dir.clone(),
                source,
            })
        })?;

        let dest = absolute(&dir.join(image_filename(url)));
        let written = self
            .source
            .download(url, &dest)
            .await
            .map_err(download_err)?;

        tracing::info!(url, bytes = written, dest = %dest.display(), "downloaded image");
        Ok(dest)
    }
}

impl<S> Reconciler<S> {
    /// Ensures narration audio exists for the entry stored under `date`
    ///
    /// Reuses an existing audio file unless `force` is set, repairing the
    /// entry's `mp3` field if it does not point at that file. Otherwise runs
    /// `synth` and records the result. A failed synthesis leaves both the
    /// store and the audio path as they were.
    pub fn ensure_audio(
        &self,
        date: &str,
        entry: &CacheEntry,
        voice: &str,
        force: bool,
        synth: &impl Synthesizer,
    ) -> Result<PathBuf, AudioError> {
        let audio_path = audio_path_for(Path::new(&entry.img));

        if audio_path.exists() && !force {
            tracing::debug!(audio = %audio_path.display(), "reusing existing narration");
        } else {
            synthesize_into(&audio_path, &narration_text(entry), voice, synth)?;
        }

        self.record_audio(date, entry, &audio_path)?;
        Ok(audio_path)
    }

    /// Points the stored entry's `mp3` at `audio_path`, writing only on change
    fn record_audio(
        &self,
        date: &str,
        entry: &CacheEntry,
        audio_path: &Path,
    ) -> Result<(), CacheError> {
        let audio = audio_path.to_string_lossy().into_owned();
        let mut entries = self.store.load()?;
        let stored = entries
            .entry(date.to_string())
            .or_insert_with(|| entry.clone());

        if stored.mp3.as_deref() == Some(audio.as_str()) {
            return Ok(());
        }

        stored.mp3 = Some(audio);
        self.store.save(&entries)
    }

    /// All stored entries, oldest first
    pub fn list(&self) -> Result<Vec<(String, CacheEntry)>, CacheError> {
        self.store.list()
    }
}

/// Runs `synth` into a hidden sibling of `audio_path`, then moves it into place
///
/// An interrupted or failed synthesis never leaves a file at `audio_path`.
fn synthesize_into(
    audio_path: &Path,
    text: &str,
    voice: &str,
    synth: &impl Synthesizer,
) -> Result<(), AudioError> {
    let part = partial_path(audio_path);
    if let Err(e) = synth.synthesize(text, voice, &part) {
        let _ = fs::remove_file(&part);
        return Err(e.into());
    }

    fs::rename(&part, audio_path).map_err(|source| AudioError::Io {
        path: audio_path.to_path_buf(),
        source,
    })
}

/// Makes `path` absolute relative to the working directory
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
