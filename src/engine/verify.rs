//! Color-based purchase verification.
//!
//! OCR is too slow and too flaky for the tight buy-verify loop, so the
//! purchase signal is a single pixel sample: the confirmation marker has a
//! stable color, and a small Euclidean distance from it means the marker is
//! on screen.

use image::Rgba;

use crate::capture::{pixel_at, Frame};
use crate::regions::Region;

/// Euclidean distance between a sampled pixel and a reference RGB color.
pub fn color_distance(pixel: Rgba<u8>, reference: [u8; 3]) -> f32 {
    let dr = pixel[0] as f32 - reference[0] as f32;
    let dg = pixel[1] as f32 - reference[1] as f32;
    let db = pixel[2] as f32 - reference[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Samples the center of `region` and reports whether it is within
/// `threshold` of the reference color.
pub fn region_matches_color(
    frame: &Frame,
    region: &Region,
    reference: [u8; 3],
    threshold: f32,
) -> bool {
    let (cx, cy) = region.center();
    let pixel = pixel_at(frame, cx, cy);
    color_distance(pixel, reference) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    #[test]
    fn test_color_distance_exact_match() {
        assert_eq!(color_distance(Rgba([175, 109, 65, 255]), [175, 109, 65]), 0.0);
    }

    #[test]
    fn test_color_distance_known_value() {
        // (3, 4, 0) offset -> distance 5
        let d = color_distance(Rgba([178, 113, 65, 255]), [175, 109, 65]);
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_region_match_within_threshold() {
        let frame: Frame = ImageBuffer::from_pixel(20, 20, Rgba([175, 109, 65, 255]));
        let region = Region {
            left: 5,
            top: 5,
            right: 15,
            bottom: 15,
        };
        assert!(region_matches_color(&frame, &region, [175, 109, 65], 50.0));
        assert!(!region_matches_color(&frame, &region, [0, 0, 0], 50.0));
    }
}
