//! Image preprocessing ahead of text recognition.
//!
//! The countdown digits sit on a background whose lighting shifts with the
//! scene behind the UI, so a fixed threshold misfires. The pipeline here is
//! grayscale → mean-adaptive binarization → modest upscale. The currency
//! readout is high-contrast and recognizes better from the raw crop, so it
//! skips this entirely.

use image::{GrayImage, ImageBuffer, Luma, Rgba};

use crate::capture::Frame;

/// Neighborhood size for the adaptive threshold, in pixels (odd).
const ADAPTIVE_WINDOW: u32 = 11;

/// Constant subtracted from the local mean before comparing.
const ADAPTIVE_C: i32 = 2;

/// Upscale factor applied after binarization. Larger factors amplify edge
/// aliasing more than they help recognition.
const UPSCALE: f32 = 1.5;

/// Full preprocessing pipeline for the countdown region.
pub fn prepare_timer_crop(crop: &Frame) -> Frame {
    let gray = to_grayscale(crop);
    let binary = adaptive_binarize(&gray, ADAPTIVE_WINDOW, ADAPTIVE_C);
    let scaled = upscale(&binary, UPSCALE);
    gray_to_rgba(&scaled)
}

/// Converts an RGBA frame to grayscale using the BT.601 luma weights.
pub fn to_grayscale(img: &Frame) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = ImageBuffer::new(w, h);
    for (x, y, pixel) in img.enumerate_pixels() {
        let luma = 0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
        out.put_pixel(x, y, Luma([luma as u8]));
    }
    out
}

/// Binarizes against the local mean: pixels brighter than the mean of their
/// `window`-sized neighborhood minus `c` become white, the rest black.
///
/// Uses a summed-area table so the cost is independent of window size.
pub fn adaptive_binarize(img: &GrayImage, window: u32, c: i32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    // integral[y][x] = sum of pixels above and left of (x, y), exclusive
    let mut integral = vec![0u64; ((w + 1) * (h + 1)) as usize];
    let stride = (w + 1) as usize;
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += img.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let half = (window / 2) as i64;
    let mut out = ImageBuffer::new(w, h);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - half).max(0) as usize;
            let y0 = (y - half).max(0) as usize;
            let x1 = ((x + half + 1).min(w as i64)) as usize;
            let y1 = ((y + half + 1).min(h as i64)) as usize;

            let count = ((x1 - x0) * (y1 - y0)) as i64;
            let sum = (integral[y1 * stride + x1] + integral[y0 * stride + x0]) as i64
                - (integral[y0 * stride + x1] + integral[y1 * stride + x0]) as i64;
            let mean = sum / count;

            let value = if (img.get_pixel(x as u32, y as u32)[0] as i64) > mean - c as i64 {
                255u8
            } else {
                0u8
            };
            out.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    out
}

/// Upscales a grayscale image by `factor` with Catmull-Rom filtering.
pub fn upscale(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let nw = ((w as f32 * factor) as u32).max(1);
    let nh = ((h as f32 * factor) as u32).max(1);
    image::imageops::resize(img, nw, nh, image::imageops::FilterType::CatmullRom)
}

/// Expands a grayscale image back to RGBA for the recognizer interface.
pub fn gray_to_rgba(img: &GrayImage) -> Frame {
    let (w, h) = img.dimensions();
    let mut out = ImageBuffer::new(w, h);
    for (x, y, pixel) in img.enumerate_pixels() {
        let v = pixel[0];
        out.put_pixel(x, y, Rgba([v, v, v, 255]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_grayscale() {
        let mut img: Frame = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_adaptive_binarize_uniform_image() {
        // A uniform image sits exactly at its local mean, so mean - c keeps
        // every pixel white.
        let img = GrayImage::from_pixel(16, 16, Luma([128]));
        let out = adaptive_binarize(&img, 11, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_adaptive_binarize_separates_dark_text() {
        // Bright background with a dark strip: the strip should go black.
        let mut img = GrayImage::from_pixel(21, 21, Luma([220]));
        for y in 8..13 {
            for x in 0..21 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let out = adaptive_binarize(&img, 11, 2);
        assert_eq!(out.get_pixel(10, 10)[0], 0);
        assert_eq!(out.get_pixel(10, 0)[0], 255);
    }

    #[test]
    fn test_upscale_dimensions() {
        let img = GrayImage::new(20, 10);
        let scaled = upscale(&img, 1.5);
        assert_eq!(scaled.dimensions(), (30, 15));
    }

    #[test]
    fn test_prepare_timer_crop_dimensions() {
        let crop: Frame = ImageBuffer::new(40, 20);
        let prepared = prepare_timer_crop(&crop);
        assert_eq!(prepared.dimensions(), (60, 30));
    }
}
