//! # Dualtrack Common Library
//!
//! Shared code for the dual-rendition player including:
//! - Track model (renditions, artwork, manifest loading)
//! - Event types (PlayerEvent, SessionSnapshot, EventBus)
//! - Configuration loading
//! - Progress display helpers (`M:SS` text and percentages)

pub mod config;
pub mod error;
pub mod events;
pub mod progress;
pub mod track;

pub use error::{Error, Result};
pub use events::{EventBus, LoadState, PlayerEvent, SessionSnapshot};
pub use track::{Artwork, RenditionId, Track};
