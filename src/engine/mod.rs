//! Purchase automation engine.
//!
//! The engine is a state machine driven by `step()`: watch the countdown in
//! the shop via OCR, fire the buy sequence when it reaches 0:01, verify the
//! purchase took, and decide from a before/after currency comparison whether
//! to arm for the next restock or finish.

pub mod config;
pub mod control;
pub mod currency;
pub mod filter;
pub mod observer;
pub mod purchase;
pub mod runner;
pub mod state;
pub mod verify;

pub use config::RunConfig;
pub use control::RunControl;
pub use observer::{ChannelSink, ObserverEvent, ObserverSink};
pub use runner::Engine;
pub use state::EngineState;
