//! Player driver
//!
//! The driver is the single task that owns the [`PlaybackController`] and
//! every binding. User commands and binding events are multiplexed into one
//! loop, so session state is only ever mutated from here.
//!
//! After each step the controller's outbox is executed in order, awaiting
//! every binding call. That await is what sequences a switch: the old
//! binding's `pause_request` resolves (output silent) before the new
//! binding's `load` starts.

use super::controller::{BindingCommand, BindingOp, PlaybackController, Reconciliation};
use crate::binding::{
    event_channel, AudioResourceBinding, BindingEvent, BindingEventKind, EventStream,
    MediaResourceBinding,
};
use crate::error::{Error, Result};
use dualtrack_common::config::PlaybackSettings;
use dualtrack_common::events::{EventBus, PlayerEvent, SessionSnapshot};
use dualtrack_common::{RenditionId, Track};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the user command channel
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// User-facing operations accepted by the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    SelectRendition(RenditionId),
    Play,
    Pause,
    Toggle,
    SeekToFraction(f64),
    Restart,
    Retry,
}

enum DriverMessage {
    Command {
        command: PlayerCommand,
        reply: oneshot::Sender<Result<SessionSnapshot>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Task owning the controller and the bindings
pub struct PlayerDriver {
    controller: PlaybackController,
    bindings: HashMap<RenditionId, Box<dyn MediaResourceBinding>>,
    binding_events: EventStream,
    messages: mpsc::Receiver<DriverMessage>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    event_bus: Arc<EventBus>,
}

impl PlayerDriver {
    /// Wire a controller to its bindings.
    ///
    /// `binding_events` must be the receiving half of the sink the bindings
    /// were built with. Every rendition the track has a locator for needs a
    /// binding.
    pub fn new(
        controller: PlaybackController,
        bindings: Vec<Box<dyn MediaResourceBinding>>,
        binding_events: EventStream,
        event_bus: Arc<EventBus>,
    ) -> Result<(Self, PlayerHandle)> {
        let bindings: HashMap<_, _> = bindings
            .into_iter()
            .map(|binding| (binding.rendition(), binding))
            .collect();

        for (rendition, _) in controller.track().renditions() {
            if !bindings.contains_key(&rendition) {
                return Err(Error::Config(format!(
                    "No binding supplied for rendition {}",
                    rendition
                )));
            }
        }

        let (tx, messages) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let handle = PlayerHandle {
            session_id: controller.session().session_id(),
            messages: tx,
            snapshots: snapshot_rx,
            event_bus: Arc::clone(&event_bus),
        };

        let driver = Self {
            controller,
            bindings,
            binding_events,
            messages,
            snapshot_tx,
            event_bus,
        };

        Ok((driver, handle))
    }

    /// Build a driver with one [`AudioResourceBinding`] per rendition of `track`
    pub fn for_track(track: Track, settings: &PlaybackSettings) -> Result<(Self, PlayerHandle)> {
        track.validate()?;

        let (sink, stream) = event_channel();
        let client = reqwest::Client::new();
        let bindings: Vec<Box<dyn MediaResourceBinding>> = track
            .renditions()
            .map(|(rendition, locator)| {
                Box::new(AudioResourceBinding::with_client(
                    rendition,
                    locator,
                    settings.clone(),
                    sink.clone(),
                    client.clone(),
                )) as Box<dyn MediaResourceBinding>
            })
            .collect();

        let event_bus = Arc::new(EventBus::new(settings.event_bus_capacity));
        let controller = PlaybackController::with_settings(track, settings);
        Self::new(controller, bindings, stream, event_bus)
    }

    /// Run the driver on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Event loop; returns after shutdown or once every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Player driver started for session {}",
            self.controller.session().session_id()
        );

        loop {
            tokio::select! {
                message = self.messages.recv() => match message {
                    Some(DriverMessage::Command { command, reply }) => {
                        let result = self.handle_command(command).await;
                        let _ = reply.send(result.map(|_| self.controller.snapshot()));
                    }
                    Some(DriverMessage::Shutdown { done }) => {
                        self.release_bindings().await;
                        let _ = done.send(());
                        info!("Player driver stopped");
                        return;
                    }
                    None => break,
                },
                Some(event) = self.binding_events.recv() => {
                    self.handle_binding_event(event).await;
                }
            }
        }

        self.release_bindings().await;
        info!("Player driver stopped, all handles dropped");
    }

    async fn handle_command(&mut self, command: PlayerCommand) -> Result<()> {
        debug!("Command: {:?}", command);
        let before = self.controller.snapshot();

        match command {
            PlayerCommand::SelectRendition(id) => self.controller.select_rendition(id)?,
            PlayerCommand::Play => self.controller.play(),
            PlayerCommand::Pause => self.controller.pause(),
            PlayerCommand::Toggle => self.controller.toggle(),
            PlayerCommand::SeekToFraction(fraction) => self.controller.seek_to_fraction(fraction),
            PlayerCommand::Restart => self.controller.restart(),
            PlayerCommand::Retry => self.controller.retry(),
        }

        let after = self.controller.snapshot();
        if before.active_rendition != after.active_rendition {
            self.event_bus.emit_lossy(PlayerEvent::RenditionSwitched {
                session_id: self.session_id(),
                from: before.active_rendition,
                to: after.active_rendition,
                generation: after.generation,
                timestamp: chrono::Utc::now(),
            });
        }

        self.flush().await;
        Ok(())
    }

    async fn handle_binding_event(&mut self, event: BindingEvent) {
        let rendition = event.rendition;
        let generation = event.generation;
        let kind = event.kind.clone();

        match self.controller.handle_event(event) {
            Reconciliation::Applied => {}
            Reconciliation::Stale { .. } => return,
        }

        match kind {
            BindingEventKind::Error { reason } => {
                self.event_bus.emit_lossy(PlayerEvent::LoadFailed {
                    session_id: self.session_id(),
                    rendition,
                    generation: generation.value(),
                    reason,
                    timestamp: chrono::Utc::now(),
                });
            }
            BindingEventKind::Ended => {
                self.event_bus.emit_lossy(PlayerEvent::PlaybackEnded {
                    session_id: self.session_id(),
                    rendition,
                    timestamp: chrono::Utc::now(),
                });
            }
            BindingEventKind::Ready { .. } | BindingEventKind::TimeAdvanced { .. } => {}
        }

        self.flush().await;
    }

    /// Execute queued binding commands in order, then publish the snapshot
    async fn flush(&mut self) {
        loop {
            let commands = self.controller.drain_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                self.execute(command).await;
            }
        }
        self.publish();
    }

    async fn execute(&mut self, command: BindingCommand) {
        let Some(binding) = self.bindings.get_mut(&command.rendition) else {
            warn!("No binding for {}, dropping {:?}", command.rendition, command.op);
            return;
        };

        debug!(
            "{} <- {:?} ({})",
            command.rendition, command.op, command.generation
        );

        match command.op {
            BindingOp::Load => binding.load(command.generation).await,
            BindingOp::Play => binding.play_request().await,
            BindingOp::Pause => binding.pause_request().await,
            BindingOp::Seek(time) => binding.seek_to(time).await,
        }
    }

    fn publish(&self) {
        let snapshot = self.controller.snapshot();
        let changed = self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });

        if changed {
            self.event_bus.emit_lossy(PlayerEvent::SnapshotChanged {
                session_id: self.session_id(),
                snapshot,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    async fn release_bindings(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.shutdown().await;
        }
    }

    fn session_id(&self) -> Uuid {
        self.controller.session().session_id()
    }
}

/// Cloneable front end to a running [`PlayerDriver`]
#[derive(Clone)]
pub struct PlayerHandle {
    session_id: Uuid,
    messages: mpsc::Sender<DriverMessage>,
    snapshots: watch::Receiver<SessionSnapshot>,
    event_bus: Arc<EventBus>,
}

impl PlayerHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Send a command and wait for the snapshot after it was applied
    pub async fn send(&self, command: PlayerCommand) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.messages
            .send(DriverMessage::Command { command, reply })
            .await
            .map_err(|_| Error::PlayerStopped)?;
        response.await.map_err(|_| Error::PlayerStopped)?
    }

    pub async fn select_rendition(&self, id: RenditionId) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::SelectRendition(id)).await
    }

    pub async fn play(&self) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::Pause).await
    }

    pub async fn toggle(&self) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::Toggle).await
    }

    pub async fn seek_to_fraction(&self, fraction: f64) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::SeekToFraction(fraction)).await
    }

    pub async fn restart(&self) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::Restart).await
    }

    pub async fn retry(&self) -> Result<SessionSnapshot> {
        self.send(PlayerCommand::Retry).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_bus.subscribe()
    }

    /// Stop the driver and release every binding
    pub async fn shutdown(&self) -> Result<()> {
        let (done, finished) = oneshot::channel();
        self.messages
            .send(DriverMessage::Shutdown { done })
            .await
            .map_err(|_| Error::PlayerStopped)?;
        finished.await.map_err(|_| Error::PlayerStopped)
    }
}
