//! Event types for the dualtrack event system
//!
//! Provides the observable session snapshot, the events broadcast after
//! each reconciliation step, and the EventBus that carries them to any
//! presentation layer.

use crate::progress;
use crate::track::RenditionId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Load progress of the active rendition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Nothing attached yet
    #[default]
    Idle,
    /// Fetching/buffering, duration not known yet
    Loading,
    /// Duration known, transport commands take effect
    Ready,
    /// Resource failed to load or failed while playing
    Error,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Ready => write!(f, "ready"),
            LoadState::Error => write!(f, "error"),
        }
    }
}

/// Read-only view of a playback session
///
/// Produced after every reconciliation step; the presentation layer renders
/// exclusively from this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active_rendition: RenditionId,
    /// Transport intent, not necessarily what is audible right now
    pub playing: bool,
    /// Seconds
    pub position: f64,
    /// Seconds, `None` while unknown
    pub duration: Option<f64>,
    pub load_state: LoadState,
    /// Current switch epoch
    pub generation: u64,
}

impl SessionSnapshot {
    /// Known duration, or 0 when unknown
    pub fn duration_or_zero(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    /// Progress bar fill in `[0, 100]`
    pub fn percentage(&self) -> f64 {
        progress::percentage(self.position, self.duration_or_zero())
    }

    pub fn position_text(&self) -> String {
        progress::format_time(self.position)
    }

    pub fn duration_text(&self) -> String {
        progress::format_time(self.duration_or_zero())
    }

    /// Transport controls are disabled once the active rendition failed
    pub fn controls_enabled(&self) -> bool {
        self.load_state != LoadState::Error
    }

    /// Restart needs something attached
    pub fn restart_enabled(&self) -> bool {
        self.load_state != LoadState::Idle
    }
}

/// Events broadcast by the player
///
/// Serializable so a front end can forward them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Session state changed after a command or a binding event
    SnapshotChanged {
        session_id: Uuid,
        snapshot: SessionSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active rendition switched; the new rendition is loading
    RenditionSwitched {
        session_id: Uuid,
        from: RenditionId,
        to: RenditionId,
        generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active rendition reported a load or runtime error
    LoadFailed {
        session_id: Uuid,
        rendition: RenditionId,
        generation: u64,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active rendition played to the end
    PlaybackEnded {
        session_id: Uuid,
        rendition: RenditionId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            PlayerEvent::SnapshotChanged { session_id, .. }
            | PlayerEvent::RenditionSwitched { session_id, .. }
            | PlayerEvent::LoadFailed { session_id, .. }
            | PlayerEvent::PlaybackEnded { session_id, .. } => *session_id,
        }
    }
}

/// One-to-many broadcaster for [`PlayerEvent`]s
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and
/// lose the oldest events instead of blocking the player.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use dualtrack_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
