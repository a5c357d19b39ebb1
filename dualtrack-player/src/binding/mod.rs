//! Media resource bindings
//!
//! A binding is the live handle to one rendition's network-backed audio
//! resource. It accepts requests (`load`, `play_request`, `pause_request`,
//! `seek_to`) and reports progress asynchronously as [`BindingEvent`]s.
//!
//! Every event is tagged with the rendition and the [`Generation`] of the
//! load cycle that produced it. The controller compares that tag against its
//! own current generation and drops anything older, which is what makes a
//! rendition switch safe while the previous binding still has traffic in
//! flight.
//!
//! Per binding, events are causally ordered: `Ready` at most once per load
//! cycle, then any number of `TimeAdvanced`, then at most one of `Ended` or
//! `Error`. Nothing is guaranteed across bindings.

use async_trait::async_trait;
use dualtrack_common::RenditionId;
use tokio::sync::mpsc;

pub mod fetch;
pub mod probe;
pub mod resource;

pub use resource::AudioResourceBinding;

/// Rendition-switch epoch
///
/// Incremented by the controller on every switch (and retry). Events tagged
/// with anything but the current value are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Generation = Generation(0);

    pub fn new(value: u64) -> Self {
        Generation(value)
    }

    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Payload of a binding event
#[derive(Debug, Clone, PartialEq)]
pub enum BindingEventKind {
    /// Resource buffered far enough to know its duration (seconds).
    /// Non-finite for resources without a known length.
    Ready { duration: f64 },

    /// Playback clock moved (seconds)
    TimeAdvanced { time: f64 },

    /// Played to the end
    Ended,

    /// Failed to load, or failed while playing
    Error { reason: String },
}

/// A binding event tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEvent {
    pub rendition: RenditionId,
    pub generation: Generation,
    pub kind: BindingEventKind,
}

impl BindingEvent {
    pub fn new(rendition: RenditionId, generation: Generation, kind: BindingEventKind) -> Self {
        Self {
            rendition,
            generation,
            kind,
        }
    }
}

/// Sending half shared by all bindings of one player
pub type EventSink = mpsc::UnboundedSender<BindingEvent>;

/// Receiving half, owned by the driver
pub type EventStream = mpsc::UnboundedReceiver<BindingEvent>;

/// Create the binding → driver event channel
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Capability contract every rendition binding implements
///
/// All transport methods are *requests*: their audible effect happens later
/// and a newer request supersedes an older one that has not taken effect yet
/// (last writer wins, nothing is queued).
#[async_trait]
pub trait MediaResourceBinding: Send {
    /// Rendition this binding plays
    fn rendition(&self) -> RenditionId;

    /// Start fetching/buffering. Events of this load cycle carry `generation`.
    ///
    /// Starting a new cycle abandons the previous one. Must not be called
    /// before the rendition is selected.
    async fn load(&mut self, generation: Generation);

    /// Ask for audible playback
    async fn play_request(&mut self);

    /// Ask for silence. Resolves once output has actually stopped.
    async fn pause_request(&mut self);

    /// Ask for a new position (seconds). No effect before `Ready`.
    async fn seek_to(&mut self, time: f64);

    /// Release the resource. The binding may be loaded again afterwards.
    async fn shutdown(&mut self) {}
}
