//! Input injection.
//!
//! The engine drives purchases through the [`ClickInjector`] capability so
//! the state machine can be exercised in tests with a recording fake. The
//! real backend on Windows synthesizes hardware-level events via SendInput.

use anyhow::Result;
use rand::Rng;

#[cfg(windows)]
pub mod win;

#[cfg(windows)]
pub use win::SendInputClicker;

/// Keys the engine needs to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
}

/// Injects pointer and key events at absolute screen coordinates.
pub trait ClickInjector: Send {
    fn click(&mut self, x: i32, y: i32) -> Result<()>;
    fn key_press(&mut self, key: Key) -> Result<()>;
}

/// Offsets a coordinate pair by up to `jitter_px` in each axis so repeated
/// clicks don't land on the exact same pixel.
pub fn apply_jitter(x: i32, y: i32, jitter_px: i32) -> (i32, i32) {
    if jitter_px <= 0 {
        return (x, y);
    }
    let mut rng = rand::thread_rng();
    (
        x + rng.gen_range(-jitter_px..=jitter_px),
        y + rng.gen_range(-jitter_px..=jitter_px),
    )
}
