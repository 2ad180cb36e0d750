// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive local-mean binarization. Ink becomes foreground (255) so that
// contour extraction and border trimming both operate on printed strokes.

use image::{GrayImage, Luma};
use markscan_core::profile::BinarizeParams;
use tracing::{debug, instrument};

use super::integral::IntegralImage;

/// Foreground (ink) value in binarized rasters.
pub const INK: u8 = 255;
/// Background (paper) value in binarized rasters.
pub const PAPER: u8 = 0;

/// Local-mean adaptive thresholding.
///
/// For each pixel the threshold is the mean intensity of its
/// `(2 * block_radius + 1)` square neighbourhood (clamped at the borders)
/// minus `offset`. Pixels strictly darker than the threshold are ink.
#[derive(Debug, Clone, Copy)]
pub struct Binarizer {
    block_radius: u32,
    offset: i32,
}

impl Binarizer {
    pub fn new(params: &BinarizeParams) -> Self {
        Self {
            block_radius: params.block_radius,
            offset: params.offset,
        }
    }

    pub fn binarize(&self, gray: &GrayImage) -> GrayImage {
        self.binarize_with(gray, &IntegralImage::new(gray))
    }

    /// Binarize with a precomputed summed-area table of `gray`.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn binarize_with(&self, gray: &GrayImage, integral: &IntegralImage) -> GrayImage {
        let (width, height) = gray.dimensions();

        let mut output = GrayImage::new(width, height);
        let mut ink_pixels: u64 = 0;

        for y in 0..height {
            for x in 0..width {
                let local_mean = integral.region_mean(x, y, self.block_radius);
                let threshold = (local_mean as i32 - self.offset).clamp(0, 255) as u8;
                let pixel_val = gray.get_pixel(x, y).0[0];
                let binary = if pixel_val < threshold {
                    ink_pixels += 1;
                    INK
                } else {
                    PAPER
                };
                output.put_pixel(x, y, Luma([binary]));
            }
        }

        debug!(ink_pixels, "Binarization complete");
        output
    }
}
