//! Scripted binding that records the requests it receives
//!
//! The spy never emits events by itself. Tests inject `Ready`, `TimeAdvanced`,
//! `Ended` and `Error` through the shared [`EventSink`] so that arrival order
//! (including late and stale events) is fully under test control.

use async_trait::async_trait;
use dualtrack_common::RenditionId;
use dualtrack_player::binding::{
    BindingEvent, BindingEventKind, EventSink, Generation, MediaResourceBinding,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// What a binding was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SpyCall {
    Load(Generation),
    Play,
    PauseStarted,
    /// `pause_request` resolved: output is silent
    PauseDone,
    Seek(f64),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SpyEntry {
    pub rendition: RenditionId,
    pub call: SpyCall,
    pub timestamp: Instant,
}

/// Call log shared by every spy of one player
#[derive(Clone, Default)]
pub struct SpyLog {
    entries: Arc<Mutex<Vec<SpyEntry>>>,
}

impl SpyLog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, rendition: RenditionId, call: SpyCall) {
        self.entries.lock().await.push(SpyEntry {
            rendition,
            call,
            timestamp: Instant::now(),
        });
    }

    pub async fn entries(&self) -> Vec<SpyEntry> {
        self.entries.lock().await.clone()
    }

    /// Calls in order, without timestamps
    pub async fn calls(&self) -> Vec<(RenditionId, SpyCall)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|entry| (entry.rendition, entry.call.clone()))
            .collect()
    }

    pub async fn calls_for(&self, rendition: RenditionId) -> Vec<SpyCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|(r, _)| *r == rendition)
            .map(|(_, call)| call)
            .collect()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Index of the first call matching `predicate`
    pub async fn position(&self, predicate: impl Fn(RenditionId, &SpyCall) -> bool) -> Option<usize> {
        self.calls()
            .await
            .iter()
            .position(|(rendition, call)| predicate(*rendition, call))
    }
}

/// Binding double for one rendition
pub struct BindingSpy {
    rendition: RenditionId,
    log: SpyLog,
    /// How long output takes to fall silent after a pause request
    pause_latency: Duration,
}

impl BindingSpy {
    pub fn new(rendition: RenditionId, log: SpyLog) -> Self {
        Self {
            rendition,
            log,
            pause_latency: Duration::from_millis(20),
        }
    }

    pub fn boxed(rendition: RenditionId, log: &SpyLog) -> Box<dyn MediaResourceBinding> {
        Box::new(Self::new(rendition, log.clone()))
    }
}

#[async_trait]
impl MediaResourceBinding for BindingSpy {
    fn rendition(&self) -> RenditionId {
        self.rendition
    }

    async fn load(&mut self, generation: Generation) {
        self.log.record(self.rendition, SpyCall::Load(generation)).await;
    }

    async fn play_request(&mut self) {
        self.log.record(self.rendition, SpyCall::Play).await;
    }

    async fn pause_request(&mut self) {
        self.log.record(self.rendition, SpyCall::PauseStarted).await;
        tokio::time::sleep(self.pause_latency).await;
        self.log.record(self.rendition, SpyCall::PauseDone).await;
    }

    async fn seek_to(&mut self, time: f64) {
        self.log.record(self.rendition, SpyCall::Seek(time)).await;
    }

    async fn shutdown(&mut self) {
        self.log.record(self.rendition, SpyCall::Shutdown).await;
    }
}

/// Inject an event as if `rendition`'s binding had produced it
pub fn inject(sink: &EventSink, rendition: RenditionId, generation: Generation, kind: BindingEventKind) {
    sink.send(BindingEvent::new(rendition, generation, kind))
        .expect("driver dropped its event stream");
}
