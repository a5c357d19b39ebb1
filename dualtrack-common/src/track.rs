//! Track model
//!
//! A [`Track`] is the immutable, externally supplied description of one
//! piece of audio: display metadata plus one resource locator per rendition.
//! Locators are opaque to the player; they are handed to bindings untouched.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// One encoded variant of a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenditionId {
    /// Lossy rendition (MP3 or similar), the default selection
    #[default]
    Compressed,
    /// Lossless rendition (FLAC, WAV)
    Lossless,
}

impl RenditionId {
    /// Every rendition, in tab order
    pub const ALL: [RenditionId; 2] = [RenditionId::Compressed, RenditionId::Lossless];

    /// Short label for a selector tab
    pub fn label(&self) -> &'static str {
        match self {
            RenditionId::Compressed => "MP3",
            RenditionId::Lossless => "Lossless",
        }
    }
}

impl std::fmt::Display for RenditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenditionId::Compressed => write!(f, "compressed"),
            RenditionId::Lossless => write!(f, "lossless"),
        }
    }
}

impl FromStr for RenditionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compressed" | "mp3" => Ok(RenditionId::Compressed),
            "lossless" | "flac" => Ok(RenditionId::Lossless),
            other => Err(Error::InvalidInput(format!("Unknown rendition '{}'", other))),
        }
    }
}

/// Cover image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Artwork {
    /// Alt text for the image, falling back to "<title> artwork"
    pub fn alt_text(&self, title: &str) -> String {
        match self.alt.as_deref().map(str::trim) {
            Some(alt) if !alt.is_empty() => alt.to_string(),
            _ => format!("{} artwork", title),
        }
    }
}

/// Immutable track description
///
/// Built either in code with the `with_*` methods or from a TOML manifest:
///
/// ```toml
/// title = "Harbour Lights"
/// artist = "The Fog Signals"
///
/// [artwork]
/// url = "https://cdn.example.com/harbour.jpg"
///
/// [renditions]
/// compressed = "https://cdn.example.com/harbour.mp3"
/// lossless = "https://cdn.example.com/harbour.flac"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    title: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    artwork: Option<Artwork>,
    #[serde(default)]
    renditions: BTreeMap<RenditionId, String>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: None,
            artwork: None,
            renditions: BTreeMap::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_artwork(mut self, artwork: Artwork) -> Self {
        self.artwork = Some(artwork);
        self
    }

    /// Attach a locator for a rendition. Blank locators are ignored.
    pub fn with_rendition(mut self, id: RenditionId, locator: impl Into<String>) -> Self {
        let locator = locator.into();
        if !locator.trim().is_empty() {
            self.renditions.insert(id, locator);
        }
        self
    }

    /// Parse and validate a TOML manifest
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut track: Track = toml::from_str(content)?;
        track.renditions.retain(|_, locator| !locator.trim().is_empty());
        track.validate()?;
        Ok(track)
    }

    /// Read, parse and validate a TOML manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check the track can be played at all
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidTrack("title must not be empty".to_string()));
        }
        if self.renditions.is_empty() {
            return Err(Error::InvalidTrack(format!(
                "'{}' has no rendition locators",
                self.title
            )));
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn artwork(&self) -> Option<&Artwork> {
        self.artwork.as_ref()
    }

    /// Locator for a rendition, if the track has one
    pub fn locator(&self, id: RenditionId) -> Option<&str> {
        self.renditions.get(&id).map(String::as_str)
    }

    pub fn has_rendition(&self, id: RenditionId) -> bool {
        self.renditions.contains_key(&id)
    }

    /// Renditions this track can play, in tab order
    pub fn renditions(&self) -> impl Iterator<Item = (RenditionId, &str)> {
        self.renditions.iter().map(|(id, locator)| (*id, locator.as_str()))
    }

    /// Rendition selected when a session starts: compressed when available
    pub fn default_rendition(&self) -> RenditionId {
        if self.has_rendition(RenditionId::Compressed) {
            RenditionId::Compressed
        } else {
            self.renditions
                .keys()
                .next()
                .copied()
                .unwrap_or_default()
        }
    }
}
