//! # Dualtrack Player Library (dualtrack-player)
//!
//! Plays one track from two independently loaded renditions (compressed and
//! lossless) and lets the listener switch between them without losing
//! position or transport state.
//!
//! **Architecture:**
//! - [`binding`]: one [`binding::MediaResourceBinding`] per rendition, emitting
//!   generation-tagged events
//! - [`playback`]: the session, the reconciling controller, and the driver
//!   task that owns both
//! - [`shell`]: terminal rendering of session snapshots

pub mod binding;
pub mod error;
pub mod playback;
pub mod shell;

pub use error::{Error, Result};
pub use playback::{PlaybackController, PlayerDriver, PlayerHandle};
