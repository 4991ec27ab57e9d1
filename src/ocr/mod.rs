//! Text recognition.
//!
//! The engine consumes the [`TextRecognizer`] capability: hand it a cropped
//! image, get back whatever text was read, possibly empty. Recognition
//! failures are swallowed into empty text and never surfaced as errors; the
//! timer filter downstream treats empty text as noise.

pub mod engine;
pub mod preprocess;

pub use engine::TesseractRecognizer;

use crate::capture::Frame;

/// Recognizes text in an image region.
pub trait TextRecognizer: Send {
    /// Returns recognized text, or an empty string when nothing was read or
    /// the backend failed.
    fn recognize(&mut self, image: &Frame) -> String;
}
