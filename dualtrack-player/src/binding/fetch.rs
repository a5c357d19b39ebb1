//! Resource fetching
//!
//! Locators are opaque to the controller; only this module looks inside.
//! `http://` and `https://` locators are fetched with reqwest, everything
//! else is read from the local filesystem (`file://` prefix optional).

use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// Where a locator points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl ResourceLocation {
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ResourceLocation::Remote(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            ResourceLocation::Local(PathBuf::from(path))
        } else {
            ResourceLocation::Local(PathBuf::from(trimmed))
        }
    }
}

/// File extension of the locator's last path segment, ignoring query and fragment.
///
/// Used as a format hint for probing.
pub fn extension_hint(locator: &str) -> Option<String> {
    let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
    let segment = without_query.rsplit('/').next().unwrap_or(without_query);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Fetch the complete resource
pub async fn fetch(locator: &str, client: &reqwest::Client) -> Result<Vec<u8>> {
    match ResourceLocation::parse(locator) {
        ResourceLocation::Remote(url) => {
            debug!("Fetching {}", url);
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Load(format!("GET {} failed: {}", url, e)))?
                .error_for_status()
                .map_err(|e| Error::Load(format!("GET {} failed: {}", url, e)))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Load(format!("Reading body of {} failed: {}", url, e)))?;
            Ok(bytes.to_vec())
        }
        ResourceLocation::Local(path) => {
            debug!("Reading {}", path.display());
            tokio::fs::read(&path)
                .await
                .map_err(|e| Error::Load(format!("Failed to read {}: {}", path.display(), e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        assert_eq!(
            ResourceLocation::parse("https://cdn.example.com/a.flac"),
            ResourceLocation::Remote("https://cdn.example.com/a.flac".to_string())
        );
        assert!(matches!(
            ResourceLocation::parse("HTTP://cdn.example.com/a.mp3"),
            ResourceLocation::Remote(_)
        ));
    }

    #[test]
    fn test_parse_local() {
        assert_eq!(
            ResourceLocation::parse("file:///music/a.flac"),
            ResourceLocation::Local(PathBuf::from("/music/a.flac"))
        );
        assert_eq!(
            ResourceLocation::parse("music/a.mp3"),
            ResourceLocation::Local(PathBuf::from("music/a.mp3"))
        );
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(extension_hint("https://x.com/a/track.FLAC"), Some("flac".to_string()));
        assert_eq!(extension_hint("https://x.com/track.mp3?sig=abc.def"), Some("mp3".to_string()));
        assert_eq!(extension_hint("/music/track.wav#t=10"), Some("wav".to_string()));
        assert_eq!(extension_hint("https://x.com/stream"), None);
        assert_eq!(extension_hint("/music/.hidden"), None);
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_load_error() {
        let client = reqwest::Client::new();
        let err = fetch("/definitely/not/here.flac", &client).await.unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }
}
