//! Test helpers for dualtrack-player integration tests
//!
//! - BindingSpy: scripted binding that records every request it receives
//! - audio_generator: deterministic WAV files for the real binding

#![allow(dead_code)]

pub mod audio_generator;
pub mod binding_spy;

pub use audio_generator::{generate_silent_wav, write_track_manifest};
pub use binding_spy::{inject, BindingSpy, SpyCall, SpyEntry, SpyLog};
