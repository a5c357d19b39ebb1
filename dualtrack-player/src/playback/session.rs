//! Playback session state
//!
//! The session is owned by [`super::PlaybackController`] and only mutated by
//! it; everything outside this module reads it through accessors or a
//! [`SessionSnapshot`].

use crate::binding::Generation;
use dualtrack_common::events::{LoadState, SessionSnapshot};
use dualtrack_common::progress;
use dualtrack_common::RenditionId;
use uuid::Uuid;

/// The listener's desired transport state, independent of what is audible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportIntent {
    pub playing: bool,
}

/// Session state for one mounted track
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub(super) session_id: Uuid,
    pub(super) active_rendition: RenditionId,
    pub(super) generation: Generation,
    pub(super) transport_intent: TransportIntent,
    pub(super) position: f64,
    pub(super) duration: Option<f64>,
    pub(super) load_state: LoadState,
}

impl PlaybackSession {
    pub fn new(active_rendition: RenditionId) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            active_rendition,
            generation: Generation::INITIAL,
            transport_intent: TransportIntent::default(),
            position: 0.0,
            duration: None,
            load_state: LoadState::Idle,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn active_rendition(&self) -> RenditionId {
        self.active_rendition
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn transport_intent(&self) -> TransportIntent {
        self.transport_intent
    }

    pub fn is_playing(&self) -> bool {
        self.transport_intent.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Position as a fraction of the known duration, 0 when unknown
    pub fn handoff_fraction(&self) -> f64 {
        progress::fraction(self.position, self.duration.unwrap_or(0.0))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_rendition: self.active_rendition,
            playing: self.transport_intent.playing,
            position: self.position,
            duration: self.duration,
            load_state: self.load_state,
            generation: self.generation.value(),
        }
    }
}
