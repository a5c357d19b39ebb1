//! Playback controller
//!
//! Reconciles user intent (play, pause, seek, switch rendition, restart)
//! against asynchronous, possibly out-of-order binding events.
//!
//! The controller performs no I/O. Every operation mutates the session and
//! appends [`BindingCommand`]s to an outbox; the driver drains the outbox and
//! executes the commands in order, awaiting each one. A rendition switch
//! therefore always emits `Pause(old)` before `Load(new)`, and the driver
//! only starts the load once the pause has resolved.
//!
//! Staleness is decided by the generation token alone: each switch (or
//! retry) increments it, and binding events tagged with an older generation
//! are discarded without touching the session.

use super::session::PlaybackSession;
use crate::binding::{BindingEvent, BindingEventKind, Generation};
use crate::error::{Error, Result};
use dualtrack_common::config::PlaybackSettings;
use dualtrack_common::events::{LoadState, SessionSnapshot};
use dualtrack_common::{RenditionId, Track};
use tracing::{debug, info, warn};

/// Request for one binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingOp {
    Load,
    Play,
    Pause,
    /// Seconds
    Seek(f64),
}

/// A request addressed to the binding of `rendition`, issued under `generation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingCommand {
    pub rendition: RenditionId,
    pub generation: Generation,
    pub op: BindingOp,
}

/// Outcome of feeding a binding event to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Event belonged to the live binding and was applied
    Applied,
    /// Event came from a superseded load cycle or an inactive binding
    Stale {
        event_generation: Generation,
        current_generation: Generation,
    },
}

/// Position carried across a switch until the new rendition is ready
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingHandoff {
    generation: Generation,
    fraction: f64,
}

/// Synchronization controller for one track
pub struct PlaybackController {
    track: Track,
    session: PlaybackSession,
    pending_handoff: Option<PendingHandoff>,
    outbox: Vec<BindingCommand>,
    handoff_end_guard: f64,
}

impl PlaybackController {
    /// Controller with default playback settings
    pub fn new(track: Track) -> Self {
        Self::with_settings(track, &PlaybackSettings::default())
    }

    pub fn with_settings(track: Track, settings: &PlaybackSettings) -> Self {
        let session = PlaybackSession::new(track.default_rendition());
        info!(
            "Session {} created for '{}' on {}",
            session.session_id(),
            track.title(),
            session.active_rendition()
        );
        Self {
            track,
            session,
            pending_handoff: None,
            outbox: Vec::new(),
            handoff_end_guard: settings.handoff_end_guard_secs.max(0.0),
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Fraction that will be applied at the next `Ready`, if a load is pending
    pub fn pending_handoff_fraction(&self) -> Option<f64> {
        self.pending_handoff
            .filter(|pending| pending.generation == self.session.generation)
            .map(|pending| pending.fraction)
    }

    /// Take the commands issued since the last drain, in issue order
    pub fn drain_commands(&mut self) -> Vec<BindingCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Switch the audible rendition, carrying position and transport intent.
    ///
    /// Selecting the active rendition is a no-op, except after a load error
    /// where it retries.
    pub fn select_rendition(&mut self, id: RenditionId) -> Result<()> {
        if !self.track.has_rendition(id) {
            return Err(Error::UnknownRendition(id));
        }

        if id == self.session.active_rendition {
            if self.session.load_state == LoadState::Error {
                info!("Re-selecting {} after error, retrying", id);
                self.begin_load(id);
            }
            return Ok(());
        }

        info!(
            "Switching rendition {} -> {} (playing: {})",
            self.session.active_rendition, id, self.session.transport_intent.playing
        );
        self.begin_load(id);
        Ok(())
    }

    /// Reload the active rendition after a load error
    pub fn retry(&mut self) {
        if self.session.load_state != LoadState::Error {
            debug!("Retry ignored in state {}", self.session.load_state);
            return;
        }
        info!("Retrying {}", self.session.active_rendition);
        self.begin_load(self.session.active_rendition);
    }

    /// Start a fresh generation loading `id`, silencing the current binding first
    fn begin_load(&mut self, id: RenditionId) {
        let fraction = match self.pending_handoff_fraction() {
            // A switch superseding an unfinished one keeps the position the
            // unfinished one was carrying
            Some(pending) if self.session.load_state == LoadState::Loading => pending,
            _ => self.session.handoff_fraction(),
        };

        if self.session.transport_intent.playing {
            self.issue(self.session.active_rendition, BindingOp::Pause);
        }

        self.session.generation = self.session.generation.next();
        self.session.active_rendition = id;
        self.session.load_state = LoadState::Loading;

        self.issue(id, BindingOp::Load);
        self.pending_handoff = Some(PendingHandoff {
            generation: self.session.generation,
            fraction,
        });

        debug!(
            "{} loading under {} with handoff fraction {:.4}",
            id, self.session.generation, fraction
        );
    }

    pub fn play(&mut self) {
        info!("Play requested on {}", self.session.active_rendition);
        self.session.transport_intent.playing = true;

        match self.session.load_state {
            LoadState::Ready => self.issue(self.session.active_rendition, BindingOp::Play),
            LoadState::Idle => {
                // Nothing fetched yet: the first play is the initial load
                self.session.load_state = LoadState::Loading;
                self.pending_handoff = Some(PendingHandoff {
                    generation: self.session.generation,
                    fraction: 0.0,
                });
                self.issue(self.session.active_rendition, BindingOp::Load);
            }
            LoadState::Loading => debug!("Play deferred until ready"),
            LoadState::Error => debug!("Play suppressed until the rendition is retried"),
        }
    }

    pub fn pause(&mut self) {
        info!("Pause requested on {}", self.session.active_rendition);
        self.session.transport_intent.playing = false;
        self.issue(self.session.active_rendition, BindingOp::Pause);
    }

    pub fn toggle(&mut self) {
        if self.session.transport_intent.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek to a fraction of the duration. No-op while the duration is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if !self.snapshot().controls_enabled() {
            debug!("Seek ignored, {} failed to load", self.session.active_rendition);
            return;
        }

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        let duration = match self.session.duration {
            Some(duration) if duration > 0.0 && duration.is_finite() => duration,
            _ => {
                debug!("Seek to {:.3} ignored, duration unknown", fraction);
                return;
            }
        };

        let target = fraction * duration;
        info!("Seek to {:.2}s on {}", target, self.session.active_rendition);
        self.issue(self.session.active_rendition, BindingOp::Seek(target));
        self.session.position = target;
        self.redirect_pending_handoff(fraction);
    }

    /// Jump back to the start without touching transport intent.
    ///
    /// Ignored until something has been loaded, and after a load error.
    pub fn restart(&mut self) {
        let snapshot = self.snapshot();
        if !snapshot.restart_enabled() || !snapshot.controls_enabled() {
            debug!("Restart ignored in state {}", snapshot.load_state);
            return;
        }
        info!("Restart on {}", self.session.active_rendition);
        self.issue(self.session.active_rendition, BindingOp::Seek(0.0));
        self.session.position = 0.0;
        self.redirect_pending_handoff(0.0);
    }

    /// A seek made while the new rendition loads replaces the carried position
    fn redirect_pending_handoff(&mut self, fraction: f64) {
        if self.session.load_state != LoadState::Loading {
            return;
        }
        if let Some(pending) = self.pending_handoff.as_mut() {
            if pending.generation == self.session.generation {
                pending.fraction = fraction;
            }
        }
    }

    /// Apply a binding event if it belongs to the live binding
    pub fn handle_event(&mut self, event: BindingEvent) -> Reconciliation {
        let current = self.session.generation;
        if event.generation != current || event.rendition != self.session.active_rendition {
            debug!(
                "Discarding stale {:?} from {} ({}), current is {} ({})",
                event.kind, event.rendition, event.generation, self.session.active_rendition, current
            );
            return Reconciliation::Stale {
                event_generation: event.generation,
                current_generation: current,
            };
        }

        match event.kind {
            BindingEventKind::Ready { duration } => self.on_ready(duration),
            BindingEventKind::TimeAdvanced { time } => {
                if time.is_finite() {
                    self.session.position = time.max(0.0);
                }
            }
            BindingEventKind::Ended => {
                info!("{} ended", self.session.active_rendition);
                self.session.position = 0.0;
                self.session.transport_intent.playing = false;
            }
            BindingEventKind::Error { reason } => {
                warn!(
                    "{} failed ({}): {}",
                    self.session.active_rendition, current, reason
                );
                self.session.load_state = LoadState::Error;
                self.pending_handoff = None;
            }
        }

        Reconciliation::Applied
    }

    fn on_ready(&mut self, duration: f64) {
        let duration = Some(duration).filter(|d| d.is_finite() && *d >= 0.0);
        let fraction = self
            .pending_handoff
            .take()
            .filter(|pending| pending.generation == self.session.generation)
            .map(|pending| pending.fraction)
            .unwrap_or(0.0);

        let position = match duration {
            Some(duration) if duration > 0.0 => {
                let latest = (duration - self.handoff_end_guard).max(0.0);
                (fraction * duration).min(latest)
            }
            _ => 0.0,
        };

        self.session.duration = duration;
        self.session.load_state = LoadState::Ready;
        self.session.position = position;

        info!(
            "{} ready: duration {:?}, resuming at {:.2}s (playing: {})",
            self.session.active_rendition,
            duration,
            position,
            self.session.transport_intent.playing
        );

        let active = self.session.active_rendition;
        self.issue(active, BindingOp::Seek(position));
        if self.session.transport_intent.playing {
            self.issue(active, BindingOp::Play);
        }
    }

    fn issue(&mut self, rendition: RenditionId, op: BindingOp) {
        self.outbox.push(BindingCommand {
            rendition,
            generation: self.session.generation,
            op,
        });
    }
}
