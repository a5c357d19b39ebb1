//! Fetch-probe-clock binding
//!
//! [`AudioResourceBinding`] is the concrete binding used for both renditions.
//! A load cycle runs as one tokio task:
//!
//! 1. fetch the locator (optionally bounded by `load_timeout_ms`)
//! 2. probe the container for its duration and emit `Ready`
//! 3. run a playback clock, emitting `TimeAdvanced` every
//!    `time_update_interval_ms` while playing and `Ended` at the end
//!
//! Transport and seek requests travel on `watch` channels, so only the most
//! recent request is ever observed by the clock.

use super::{
    fetch, probe, BindingEvent, BindingEventKind, EventSink, Generation, MediaResourceBinding,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use dualtrack_common::config::PlaybackSettings;
use dualtrack_common::RenditionId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Binding for one rendition of a track
pub struct AudioResourceBinding {
    rendition: RenditionId,
    locator: String,
    settings: PlaybackSettings,
    client: reqwest::Client,
    events: EventSink,
    cycle: Option<LoadCycle>,
}

/// Handles to the task of the current load cycle
struct LoadCycle {
    generation: Generation,
    /// Requested transport: true = playing
    transport: watch::Sender<bool>,
    /// Requested seek target (seconds)
    seek: watch::Sender<Option<f64>>,
    /// Whether the clock is currently audible
    audible: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl Drop for LoadCycle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl AudioResourceBinding {
    pub fn new(
        rendition: RenditionId,
        locator: impl Into<String>,
        settings: PlaybackSettings,
        events: EventSink,
    ) -> Self {
        Self::with_client(rendition, locator, settings, events, reqwest::Client::new())
    }

    /// Share one HTTP client (connection pool) between bindings
    pub fn with_client(
        rendition: RenditionId,
        locator: impl Into<String>,
        settings: PlaybackSettings,
        events: EventSink,
        client: reqwest::Client,
    ) -> Self {
        Self {
            rendition,
            locator: locator.into(),
            settings,
            client,
            events,
            cycle: None,
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Generation of the running load cycle, if any
    pub fn loaded_generation(&self) -> Option<Generation> {
        self.cycle.as_ref().map(|cycle| cycle.generation)
    }

    /// Whether the clock is producing sound right now
    pub fn is_audible(&self) -> bool {
        self.cycle
            .as_ref()
            .map(|cycle| *cycle.audible.borrow())
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaResourceBinding for AudioResourceBinding {
    fn rendition(&self) -> RenditionId {
        self.rendition
    }

    async fn load(&mut self, generation: Generation) {
        if let Some(previous) = self.cycle.take() {
            debug!(
                "{}: abandoning load cycle {} for {}",
                self.rendition, previous.generation, generation
            );
        }

        info!("{}: loading {} ({})", self.rendition, self.locator, generation);

        let (transport_tx, transport_rx) = watch::channel(false);
        let (seek_tx, seek_rx) = watch::channel(None);
        let (audible_tx, audible_rx) = watch::channel(false);

        let cycle = CycleTask {
            rendition: self.rendition,
            generation,
            locator: self.locator.clone(),
            settings: self.settings.clone(),
            client: self.client.clone(),
            events: self.events.clone(),
            transport: transport_rx,
            seek: seek_rx,
            audible: audible_tx,
        };

        self.cycle = Some(LoadCycle {
            generation,
            transport: transport_tx,
            seek: seek_tx,
            audible: audible_rx,
            task: tokio::spawn(cycle.run()),
        });
    }

    async fn play_request(&mut self) {
        match &self.cycle {
            Some(cycle) => {
                cycle.transport.send_replace(true);
            }
            None => debug!("{}: play request before load ignored", self.rendition),
        }
    }

    async fn pause_request(&mut self) {
        let Some(cycle) = &self.cycle else {
            return;
        };
        cycle.transport.send_replace(false);

        // Resolve only once the clock has gone quiet. A finished or aborted
        // task drops its sender, which counts as silent.
        let mut audible = cycle.audible.clone();
        let _ = audible.wait_for(|audible| !*audible).await;
    }

    async fn seek_to(&mut self, time: f64) {
        if let Some(cycle) = &self.cycle {
            cycle.seek.send_replace(Some(time));
        }
    }

    async fn shutdown(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            debug!("{}: released {}", self.rendition, cycle.generation);
        }
    }
}

/// State moved into the load cycle task
struct CycleTask {
    rendition: RenditionId,
    generation: Generation,
    locator: String,
    settings: PlaybackSettings,
    client: reqwest::Client,
    events: EventSink,
    transport: watch::Receiver<bool>,
    seek: watch::Receiver<Option<f64>>,
    audible: watch::Sender<bool>,
}

impl CycleTask {
    async fn run(self) {
        let duration = match self.buffer().await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("{}: load failed ({}): {}", self.rendition, self.generation, e);
                self.emit(BindingEventKind::Error {
                    reason: e.to_string(),
                });
                return;
            }
        };

        self.run_clock(duration).await;
    }

    /// Fetch and probe, bounded by the configured timeout
    async fn buffer(&self) -> Result<Option<f64>> {
        let work = async {
            let bytes = fetch::fetch(&self.locator, &self.client).await?;
            let extension = fetch::extension_hint(&self.locator);
            tokio::task::spawn_blocking(move || {
                probe::probe_duration(bytes, extension.as_deref())
            })
            .await
            .map_err(|e| Error::Load(format!("Probe task failed: {}", e)))?
        };

        match self.settings.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                Error::Load(format!("Timed out after {} ms", limit.as_millis()))
            })?,
            None => work.await,
        }
    }

    fn emit(&self, kind: BindingEventKind) {
        // Receiver gone means the player is shutting down
        let _ = self
            .events
            .send(BindingEvent::new(self.rendition, self.generation, kind));
    }

    async fn run_clock(self, duration: Option<f64>) {
        let CycleTask {
            rendition,
            generation,
            settings,
            events,
            mut transport,
            mut seek,
            audible,
            ..
        } = self;
        let emit = |kind: BindingEventKind| {
            let _ = events.send(BindingEvent::new(rendition, generation, kind));
        };

        // Requests made before Ready have no effect. Mark them seen before
        // announcing Ready so that anything sent in reaction to Ready counts.
        seek.borrow_and_update();
        let mut playing = *transport.borrow_and_update();
        let end = duration.filter(|d| d.is_finite() && *d > 0.0);

        emit(BindingEventKind::Ready {
            duration: duration.unwrap_or(f64::INFINITY),
        });

        let mut position = 0.0_f64;
        let mut last = Instant::now();
        audible.send_replace(playing);

        let mut ticker = tokio::time::interval(settings.time_update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !playing {
                        continue;
                    }
                    let now = Instant::now();
                    position += now.duration_since(last).as_secs_f64();
                    last = now;

                    match end {
                        Some(end) if position >= end => {
                            // Rewind and halt until a fresh play request
                            position = 0.0;
                            playing = false;
                            audible.send_replace(false);
                            debug!("{}: reached end ({})", rendition, generation);
                            emit(BindingEventKind::Ended);
                        }
                        _ => emit(BindingEventKind::TimeAdvanced { time: position }),
                    }
                }
                changed = transport.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let requested = *transport.borrow_and_update();
                    let now = Instant::now();
                    if playing {
                        position += now.duration_since(last).as_secs_f64();
                    }
                    last = now;
                    playing = requested;
                    audible.send_replace(playing);
                }
                changed = seek.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(target) = *seek.borrow_and_update() {
                        let upper = end.unwrap_or(f64::MAX);
                        position = if target.is_finite() { target.clamp(0.0, upper) } else { 0.0 };
                        last = Instant::now();
                    }
                }
            }
        }

        audible.send_replace(false);
    }
}
