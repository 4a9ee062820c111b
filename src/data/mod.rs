//! Remote data model for the APOD service
//!
//! This module contains the metadata returned by NASA's APOD endpoint and the
//! client that fetches it and downloads the pictures.

pub mod apod;

pub use apod::{image_filename, ApodClient, ApodError, ApodSource, DEFAULT_API_URL};

use serde::{Deserialize, Serialize};

/// Kind of media published for a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    /// Anything the service adds later (e.g. "other")
    #[serde(untagged)]
    Other(String),
}

impl MediaType {
    /// The name used by the API
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one date as returned by the APOD endpoint
///
/// Only the fields the cache needs are kept; `copyright`, `service_version`
/// and friends are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApodMetadata {
    /// Caption title
    #[serde(default)]
    pub title: String,
    /// Long-form caption text
    #[serde(default)]
    pub explanation: String,
    /// Standard resolution URL (or the video URL for videos)
    #[serde(default)]
    pub url: Option<String>,
    /// High definition image URL, only present for images
    #[serde(default)]
    pub hdurl: Option<String>,
    /// Kind of media published for the date
    pub media_type: MediaType,
}

impl ApodMetadata {
    /// URL of the picture to download, preferring the HD version
    pub fn image_url(&self) -> Option<&str> {
        [self.hdurl.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
    }

    /// Whether the date's media is a still image
    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_RESPONSE: &str = r#"{
        "copyright": "Someone",
        "date": "2024-01-01",
        "explanation": "A nebula in the night sky.",
        "hdurl": "https://apod.nasa.gov/apod/image/2401/nebula_big.jpg",
        "media_type": "image",
        "service_version": "v1",
        "title": "A Nebula",
        "url": "https://apod.nasa.gov/apod/image/2401/nebula.jpg"
    }"#;

    const VIDEO_RESPONSE: &str = r#"{
        "date": "2024-01-02",
        "explanation": "A video.",
        "media_type": "video",
        "service_version": "v1",
        "title": "Moving Pictures",
        "url": "https://www.youtube.com/embed/abc"
    }"#;

    #[test]
    fn test_parse_image_response() {
        let meta: ApodMetadata =
            serde_json::from_str(IMAGE_RESPONSE).expect("Failed to parse image response");

        assert_eq!(meta.title, "A Nebula");
        assert_eq!(meta.media_type, MediaType::Image);
        assert!(meta.is_image());
        assert_eq!(
            meta.image_url(),
            Some("https://apod.nasa.gov/apod/image/2401/nebula_big.jpg")
        );
    }

    #[test]
    fn test_parse_video_response() {
        let meta: ApodMetadata =
            serde_json::from_str(VIDEO_RESPONSE).expect("Failed to parse video response");

        assert_eq!(meta.media_type, MediaType::Video);
        assert!(!meta.is_image());
        assert!(meta.hdurl.is_none());
    }

    #[test]
    fn test_unknown_media_type_is_kept() {
        let meta: ApodMetadata =
            serde_json::from_str(r#"{"title": "x", "media_type": "other"}"#).unwrap();

        assert_eq!(meta.media_type, MediaType::Other("other".to_string()));
        assert_eq!(meta.media_type.to_string(), "other");
    }

    #[test]
    fn test_image_url_falls_back_to_url() {
        let meta = ApodMetadata {
            title: String::new(),
            explanation: String::new(),
            url: Some("https://x/y/pic.jpg".to_string()),
            hdurl: Some("  ".to_string()),
            media_type: MediaType::Image,
        };

        assert_eq!(meta.image_url(), Some("https://x/y/pic.jpg"));
    }

    #[test]
    fn test_image_url_missing() {
        let meta = ApodMetadata {
            title: String::new(),
            explanation: String::new(),
            url: None,
            hdurl: None,
            media_type: MediaType::Image,
        };

        assert!(meta.image_url().is_none());
    }
}
