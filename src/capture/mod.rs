//! Frame acquisition.
//!
//! The engine only sees the [`FrameSource`] trait: a non-blocking, best-effort
//! "give me the most recent frame" call. The Windows Graphics Capture backend
//! lives in `screen.rs`; tests substitute scripted sources.

#[cfg(windows)]
pub mod screen;
#[cfg(windows)]
pub mod window;

use image::{ImageBuffer, Rgba};

use crate::regions::Region;

/// One captured frame, RGBA, never mutated after capture.
pub type Frame = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Produces the most recent captured frame on demand.
///
/// `capture` must not block waiting for a new frame: if nothing has arrived
/// yet it returns `None` and the caller decides whether to retry.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Frame>;
}

/// Crops a frame to a named region, clamped to the frame bounds.
///
/// Returns `None` when the region lies entirely outside the frame.
pub fn crop_frame(frame: &Frame, region: &Region) -> Option<Frame> {
    let (w, h) = frame.dimensions();

    let x0 = region.left.max(0) as u32;
    let y0 = region.top.max(0) as u32;
    if x0 >= w || y0 >= h {
        return None;
    }
    let cw = region.width().min(w - x0);
    let ch = region.height().min(h - y0);
    if cw == 0 || ch == 0 {
        return None;
    }

    Some(image::imageops::crop_imm(frame, x0, y0, cw, ch).to_image())
}

/// Samples the pixel at (x, y), clamped to the frame bounds.
pub fn pixel_at(frame: &Frame, x: i32, y: i32) -> Rgba<u8> {
    let (w, h) = frame.dimensions();
    let px = (x.max(0) as u32).min(w.saturating_sub(1));
    let py = (y.max(0) as u32).min(h.saturating_sub(1));
    *frame.get_pixel(px, py)
}
