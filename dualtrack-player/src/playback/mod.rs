//! Playback session, controller and driver

pub mod controller;
pub mod driver;
pub mod session;

pub use controller::{BindingCommand, BindingOp, PlaybackController, Reconciliation};
pub use driver::{PlayerCommand, PlayerDriver, PlayerHandle};
pub use session::{PlaybackSession, TransportIntent};
