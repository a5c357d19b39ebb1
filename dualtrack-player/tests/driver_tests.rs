//! Player driver integration tests
//!
//! Run the real driver task against spy bindings. Binding events are
//! injected through the shared sink; commands go through the handle.

mod helpers;

use dualtrack_common::events::{LoadState, PlayerEvent, SessionSnapshot};
use dualtrack_common::{EventBus, RenditionId, Track};
use dualtrack_player::binding::{event_channel, BindingEventKind, EventSink, Generation};
use dualtrack_player::playback::{PlaybackController, PlayerDriver, PlayerHandle};
use dualtrack_player::Error;
use helpers::{inject, BindingSpy, SpyCall, SpyLog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const MP3: RenditionId = RenditionId::Compressed;
const FLAC: RenditionId = RenditionId::Lossless;
const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    handle: PlayerHandle,
    sink: EventSink,
    log: SpyLog,
    task: JoinHandle<()>,
}

fn track() -> Track {
    Track::new("Harbour Lights")
        .with_rendition(MP3, "https://cdn.example.com/harbour.mp3")
        .with_rendition(FLAC, "https://cdn.example.com/harbour.flac")
}

fn start(track: Track) -> Harness {
    let log = SpyLog::new();
    let (sink, stream) = event_channel();
    let bindings = track
        .renditions()
        .map(|(rendition, _)| BindingSpy::boxed(rendition, &log))
        .collect();

    let controller = PlaybackController::new(track);
    let (driver, handle) =
        PlayerDriver::new(controller, bindings, stream, Arc::new(EventBus::new(100)))
            .expect("every rendition has a binding");

    Harness {
        handle,
        sink,
        log,
        task: driver.spawn(),
    }
}

async fn wait_for_snapshot(
    handle: &PlayerHandle,
    mut predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut snapshots = handle.watch();
    let snapshot = tokio::time::timeout(WAIT, snapshots.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for snapshot")
        .expect("driver stopped")
        .clone();
    snapshot
}

async fn next_matching(
    events: &mut broadcast::Receiver<PlayerEvent>,
    predicate: impl Fn(&PlayerEvent) -> bool,
) -> PlayerEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event bus closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Play the compressed rendition until it reports ready with `duration`
async fn start_playing(harness: &Harness, duration: f64) {
    let snapshot = harness.handle.play().await.unwrap();
    assert_eq!(snapshot.load_state, LoadState::Loading);

    inject(&harness.sink, MP3, Generation::INITIAL, BindingEventKind::Ready { duration });
    wait_for_snapshot(&harness.handle, |s| s.load_state == LoadState::Ready).await;
}

#[tokio::test]
async fn test_initial_play_loads_then_starts() {
    let harness = start(track());
    start_playing(&harness, 100.0).await;

    assert_eq!(
        harness.log.calls_for(MP3).await,
        vec![
            SpyCall::Load(Generation::INITIAL),
            SpyCall::Seek(0.0),
            SpyCall::Play
        ]
    );
    assert!(harness.log.calls_for(FLAC).await.is_empty());
}

#[tokio::test]
async fn test_switch_waits_for_silence_before_loading() {
    let harness = start(track());
    start_playing(&harness, 100.0).await;
    inject(&harness.sink, MP3, Generation::INITIAL, BindingEventKind::TimeAdvanced { time: 25.0 });
    wait_for_snapshot(&harness.handle, |s| s.position == 25.0).await;
    harness.log.clear().await;

    let snapshot = harness.handle.select_rendition(FLAC).await.unwrap();
    assert_eq!(snapshot.active_rendition, FLAC);
    assert_eq!(snapshot.load_state, LoadState::Loading);
    assert_eq!(snapshot.generation, 1);
    assert!(snapshot.playing);

    let entries = harness.log.entries().await;
    let pause_done = entries
        .iter()
        .position(|e| e.rendition == MP3 && e.call == SpyCall::PauseDone)
        .expect("old rendition paused");
    let load = entries
        .iter()
        .position(|e| e.rendition == FLAC && e.call == SpyCall::Load(Generation::new(1)))
        .expect("new rendition loaded");
    assert!(pause_done < load);
    assert!(entries[load].timestamp >= entries[pause_done].timestamp);

    inject(&harness.sink, FLAC, Generation::new(1), BindingEventKind::Ready { duration: 120.0 });
    let snapshot = wait_for_snapshot(&harness.handle, |s| s.load_state == LoadState::Ready).await;
    assert_eq!(snapshot.position, 30.0);
    assert_eq!(snapshot.duration, Some(120.0));

    assert_eq!(
        harness.log.calls_for(FLAC).await,
        vec![
            SpyCall::Load(Generation::new(1)),
            SpyCall::Seek(30.0),
            SpyCall::Play
        ]
    );
}

#[tokio::test]
async fn test_stale_ready_after_switching_back() {
    let harness = start(track());
    start_playing(&harness, 100.0).await;

    harness.handle.select_rendition(FLAC).await.unwrap();
    let snapshot = harness.handle.select_rendition(MP3).await.unwrap();
    assert_eq!(snapshot.generation, 2);

    // Lossless finishes loading only after the user already went back
    inject(&harness.sink, FLAC, Generation::new(1), BindingEventKind::Ready { duration: 90.0 });
    inject(&harness.sink, MP3, Generation::new(2), BindingEventKind::Ready { duration: 200.0 });

    let snapshot = wait_for_snapshot(&harness.handle, |s| s.load_state == LoadState::Ready).await;
    assert_eq!(snapshot.active_rendition, MP3);
    assert_eq!(snapshot.duration, Some(200.0));

    let flac_calls = harness.log.calls_for(FLAC).await;
    assert!(!flac_calls.contains(&SpyCall::Play));
    assert!(!flac_calls.iter().any(|call| matches!(call, SpyCall::Seek(_))));
}

#[tokio::test]
async fn test_ended_rewinds_and_reports() {
    let harness = start(track());
    let mut events = harness.handle.subscribe();
    start_playing(&harness, 100.0).await;

    inject(&harness.sink, MP3, Generation::INITIAL, BindingEventKind::TimeAdvanced { time: 99.5 });
    inject(&harness.sink, MP3, Generation::INITIAL, BindingEventKind::Ended);

    let snapshot = wait_for_snapshot(&harness.handle, |s| !s.playing).await;
    assert_eq!(snapshot.position, 0.0);

    let ended = next_matching(&mut events, |e| matches!(e, PlayerEvent::PlaybackEnded { .. })).await;
    assert_eq!(ended.session_id(), harness.handle.session_id());
}

#[tokio::test]
async fn test_load_error_reported_then_retried() {
    let harness = start(track());
    let mut events = harness.handle.subscribe();
    harness.handle.play().await.unwrap();

    inject(
        &harness.sink,
        MP3,
        Generation::INITIAL,
        BindingEventKind::Error {
            reason: "HTTP 503".to_string(),
        },
    );
    let snapshot = wait_for_snapshot(&harness.handle, |s| s.load_state == LoadState::Error).await;
    assert!(!snapshot.controls_enabled());

    match next_matching(&mut events, |e| matches!(e, PlayerEvent::LoadFailed { .. })).await {
        PlayerEvent::LoadFailed { rendition, reason, .. } => {
            assert_eq!(rendition, MP3);
            assert_eq!(reason, "HTTP 503");
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Transport stays disabled until a reload
    harness.handle.play().await.unwrap();
    assert!(!harness.log.calls_for(MP3).await.contains(&SpyCall::Play));

    let snapshot = harness.handle.retry().await.unwrap();
    assert_eq!(snapshot.load_state, LoadState::Loading);
    assert_eq!(snapshot.generation, 1);
    assert!(harness
        .log
        .calls_for(MP3)
        .await
        .contains(&SpyCall::Load(Generation::new(1))));
}

#[tokio::test]
async fn test_switch_emits_rendition_switched() {
    let harness = start(track());
    let mut events = harness.handle.subscribe();

    harness.handle.select_rendition(FLAC).await.unwrap();

    match next_matching(&mut events, |e| matches!(e, PlayerEvent::RenditionSwitched { .. })).await {
        PlayerEvent::RenditionSwitched { from, to, generation, .. } => {
            assert_eq!(from, MP3);
            assert_eq!(to, FLAC);
            assert_eq!(generation, 1);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_rendition_is_rejected() {
    let harness = start(Track::new("Single").with_rendition(MP3, "single.mp3"));
    let err = harness.handle.select_rendition(FLAC).await.unwrap_err();
    assert!(matches!(err, Error::UnknownRendition(FLAC)));
    assert_eq!(harness.handle.snapshot().active_rendition, MP3);
}

#[tokio::test]
async fn test_missing_binding_is_config_error() {
    let log = SpyLog::new();
    let (_sink, stream) = event_channel();
    let result = PlayerDriver::new(
        PlaybackController::new(track()),
        vec![BindingSpy::boxed(MP3, &log)],
        stream,
        Arc::new(EventBus::new(10)),
    );
    assert!(matches!(result.err(), Some(Error::Config(_))));
}

#[tokio::test]
async fn test_shutdown_releases_bindings() {
    let harness = start(track());
    harness.handle.shutdown().await.unwrap();
    tokio::time::timeout(WAIT, harness.task)
        .await
        .expect("driver did not stop")
        .unwrap();

    let calls = harness.log.calls().await;
    assert!(calls.contains(&(MP3, SpyCall::Shutdown)));
    assert!(calls.contains(&(FLAC, SpyCall::Shutdown)));

    assert!(matches!(harness.handle.play().await, Err(Error::PlayerStopped)));
}

#[tokio::test]
async fn test_seek_ignored_after_failed_switch() {
    let harness = start(track());
    start_playing(&harness, 100.0).await;
    harness.handle.select_rendition(FLAC).await.unwrap();

    inject(
        &harness.sink,
        FLAC,
        Generation::new(1),
        BindingEventKind::Error {
            reason: "HTTP 404".to_string(),
        },
    );
    wait_for_snapshot(&harness.handle, |s| s.load_state == LoadState::Error).await;

    let snapshot = harness.handle.seek_to_fraction(0.5).await.unwrap();
    assert_eq!(snapshot.position, 0.0);
    let snapshot = harness.handle.restart().await.unwrap();
    assert_eq!(snapshot.load_state, LoadState::Error);

    let flac_calls = harness.log.calls_for(FLAC).await;
    assert!(!flac_calls.iter().any(|call| matches!(call, SpyCall::Seek(_))));
}
