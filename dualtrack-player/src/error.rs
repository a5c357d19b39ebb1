//! Error types for dualtrack-player
//!
//! Stale binding events are deliberately absent: they are an expected
//! outcome of reconciliation, reported as [`crate::playback::Reconciliation::Stale`].

use dualtrack_common::RenditionId;
use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendition resource failed to fetch or buffer
    #[error("Load error: {0}")]
    Load(String),

    /// Track has no locator for the requested rendition
    #[error("Unknown rendition: {0}")]
    UnknownRendition(RenditionId),

    /// Invalid request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Driver task is gone; commands can no longer be delivered
    #[error("Player stopped")]
    PlayerStopped,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] dualtrack_common::Error),
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
