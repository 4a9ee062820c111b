//! JSON-backed store of resolved APOD entries
//!
//! Provides a `CacheStore` that keeps one pretty-printed JSON document
//! (`apod.json`) mapping `YYYY-MM-DD` dates to the cached caption and the local
//! paths of the downloaded image and narration.

use chrono::NaiveDate;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the store document inside the APOD directory
pub const STORE_FILE_NAME: &str = "apod.json";

/// Directory under the user's picture directory holding all APOD data
const APOD_DIR_NAME: &str = "apod";

/// The cached record of one date's picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Caption title
    #[serde(default)]
    pub title: String,
    /// Long-form caption text
    #[serde(default)]
    pub explanation: String,
    /// Remote URL reported by the API, kept for provenance
    #[serde(default)]
    pub url: String,
    /// Absolute path of the downloaded image
    pub img: String,
    /// Absolute path of the synthesized narration, once generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp3: Option<String>,
}

/// Errors that can occur while reading or writing the store
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store file exists but could not be read
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file or its directory could not be written
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file is not a mapping of dates to entries
    #[error("Cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes the APOD store document
///
/// Every mutation reloads the whole document, changes one key and writes the
/// whole document back. A missing file is the same as an empty store.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory holding `apod.json` and one sub-directory per date
    root: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at a custom directory
    pub fn with_dir(root: PathBuf) -> Self {
        Self { root }
    }

    /// The default APOD directory, `<Pictures>/apod`
    ///
    /// Falls back to `$HOME/Pictures` when the platform reports no picture
    /// directory.
    pub fn default_dir() -> Option<PathBuf> {
        let user_dirs = UserDirs::new()?;
        let pictures = user_dirs
            .picture_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| user_dirs.home_dir().join("Pictures"));
        Some(pictures.join(APOD_DIR_NAME))
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the store document
    pub fn path(&self) -> PathBuf {
        self.root.join(STORE_FILE_NAME)
    }

    /// Directory where the files for `date` are kept
    pub fn entry_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    /// Loads the whole store
    ///
    /// # Returns
    /// * `Ok(map)` with every entry, empty if the file does not exist yet
    /// * `Err(CacheError)` if the file cannot be read or parsed
    pub fn load(&self) -> Result<BTreeMap<String, CacheEntry>, CacheError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt { path, source })
    }

    /// Replaces the whole store document with `entries`
    pub fn save(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), CacheError> {
        let path = self.path();
        fs::create_dir_all(&self.root).map_err(|source| CacheError::Write {
            path: self.root.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;

        fs::write(&path, json).map_err(|source| CacheError::Write { path, source })
    }

    /// Looks up the entry for `date`
    pub fn get(&self, date: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.load()?.remove(date))
    }

    /// Inserts or replaces the entry for `date` and persists the store
    pub fn insert(&self, date: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.load()?;
        entries.insert(date.to_string(), entry);
        self.save(&entries)
    }

    /// All entries sorted ascending by date
    pub fn list(&self) -> Result<Vec<(String, CacheEntry)>, CacheError> {
        // BTreeMap iterates in key order, and YYYY-MM-DD sorts chronologically
        Ok(self.load()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn entry(title: &str) -> CacheEntry {
        CacheEntry {
            title: title.to_string(),
            explanation: format!("About {}", title),
            url: format!("https://apod.nasa.gov/apod/image/{}.jpg", title),
            img: format!("/tmp/apod/{}.jpg", title),
            mp3: None,
        }
    }

    #[test]
    fn test_load_returns_empty_for_missing_file() {
        let (store, _temp_dir) = create_test_store();

        let entries = store.load().expect("Load should succeed");

        assert!(entries.is_empty(), "Missing file should be an empty store");
    }

    #[test]
    fn test_insert_creates_file_in_store_directory() {
        let (store, temp_dir) = create_test_store();

        store.insert("2024-01-01", entry("nebula")).expect("Insert should succeed");

        let expected_path = temp_dir.path().join("apod.json");
        assert!(expected_path.exists(), "Store file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"2024-01-01\""));
        assert!(content.contains("\"title\": \"nebula\""));
        assert!(!content.contains("mp3"), "Absent mp3 should not be written");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, _temp_dir) = create_test_store();
        let mut entries = BTreeMap::new();
        entries.insert("2024-01-01".to_string(), entry("nebula"));
        let mut with_audio = entry("galaxy");
        with_audio.mp3 = Some("/tmp/apod/galaxy.mp3".to_string());
        entries.insert("2023-12-31".to_string(), with_audio);

        store.save(&entries).expect("Save should succeed");
        let loaded = store.load().expect("Load should succeed");

        assert_eq!(loaded, entries, "Store should survive roundtrip");
    }

    #[test]
    fn test_list_is_sorted_by_date() {
        let (store, _temp_dir) = create_test_store();

        store.insert("2024-03-05", entry("c")).unwrap();
        store.insert("2023-11-20", entry("a")).unwrap();
        store.insert("2024-01-01", entry("b")).unwrap();

        let dates: Vec<String> = store.list().unwrap().into_iter().map(|(d, _)| d).collect();

        assert_eq!(dates, vec!["2023-11-20", "2024-01-01", "2024-03-05"]);
    }

    #[test]
    fn test_insert_overwrites_existing_entry() {
        let (store, _temp_dir) = create_test_store();

        store.insert("2024-01-01", entry("first")).unwrap();
        store.insert("2024-01-01", entry("second")).unwrap();

        let result = store.get("2024-01-01").unwrap().expect("Entry should exist");
        assert_eq!(result.title, "second");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_load_accepts_entries_missing_optional_fields() {
        let (store, temp_dir) = create_test_store();
        fs::write(
            temp_dir.path().join("apod.json"),
            r#"{"2024-01-01": {"img": "/tmp/apod/x.jpg"}}"#,
        )
        .unwrap();

        let result = store.get("2024-01-01").unwrap().expect("Entry should exist");

        assert_eq!(result.title, "");
        assert_eq!(result.explanation, "");
        assert_eq!(result.img, "/tmp/apod/x.jpg");
        assert!(result.mp3.is_none());
    }

    #[test]
    fn test_load_rejects_corrupt_document() {
        let (store, temp_dir) = create_test_store();
        fs::write(temp_dir.path().join("apod.json"), "[1, 2, 3]").unwrap();

        let result = store.load();

        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_save_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("Pictures").join("apod");
        let store = CacheStore::with_dir(nested_path.clone());

        store.insert("2024-01-01", entry("nested")).expect("Insert should succeed");

        assert!(nested_path.join("apod.json").exists(), "Store file should exist");
    }

    #[test]
    fn test_entry_dir_is_named_after_date() {
        let (store, temp_dir) = create_test_store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        assert_eq!(store.entry_dir(date), temp_dir.path().join("2024-01-02"));
    }

    #[test]
    fn test_default_dir_ends_with_apod() {
        if let Some(dir) = CacheStore::default_dir() {
            assert!(dir.ends_with("apod"), "Default dir should end with apod");
        }
        // Test passes if there is no home directory (e.g. in CI)
    }
}
