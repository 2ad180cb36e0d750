// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Summed-area table over a grayscale raster. Backs the adaptive binarizer,
// the orientation-mark windows and the bubble slot sums.

use image::GrayImage;

/// Integral (summed-area table) of a grayscale image.
///
/// `table[y * (width+1) + x]` holds the sum of all pixels in the rectangle
/// `[0, x) x [0, y)`. The table is `(width+1) x (height+1)` with a zero
/// border row and column.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    table: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = (w + 1) as usize;
        let mut table = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            for x in 0..w {
                row_sum += gray.get_pixel(x, y).0[0] as u64;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                table[idx] = row_sum + table[above];
            }
        }

        Self {
            width: w,
            height: h,
            table,
        }
    }

    /// Sum of pixels in `[x0, x1) x [y0, y1)`, clamped to the image.
    pub fn sum(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let x1 = x1.min(self.width) as usize;
        let y1 = y1.min(self.height) as usize;
        let x0 = (x0 as usize).min(x1);
        let y0 = (y0 as usize).min(y1);
        let stride = (self.width + 1) as usize;

        // S = I[y1][x1] - I[y0][x1] - I[y1][x0] + I[y0][x0]
        self.table[y1 * stride + x1] + self.table[y0 * stride + x0]
            - self.table[y0 * stride + x1]
            - self.table[y1 * stride + x0]
    }

    /// Mean of the square neighbourhood of `radius` around `(cx, cy)`,
    /// clamped to the image bounds.
    pub fn region_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let x0 = cx.saturating_sub(radius);
        let y0 = cy.saturating_sub(radius);
        let x1 = cx.saturating_add(radius).saturating_add(1).min(self.width);
        let y1 = cy.saturating_add(radius).saturating_add(1).min(self.height);

        let area = (x1.saturating_sub(x0) as u64) * (y1.saturating_sub(y0) as u64);
        if area == 0 {
            return 128.0;
        }
        self.sum(x0, y0, x1, y1) as f64 / area as f64
    }

    /// Sum over `[x0, x1) x [y0, y1)` in signed coordinates, where every
    /// pixel outside the image counts as `outside`.
    pub fn padded_sum(&self, x0: i64, y0: i64, x1: i64, y1: i64, outside: u8) -> u64 {
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }
        let total = ((x1 - x0) * (y1 - y0)) as u64;

        let cx0 = x0.clamp(0, self.width as i64) as u32;
        let cy0 = y0.clamp(0, self.height as i64) as u32;
        let cx1 = x1.clamp(0, self.width as i64) as u32;
        let cy1 = y1.clamp(0, self.height as i64) as u32;
        let inside = (cx1.saturating_sub(cx0) as u64) * (cy1.saturating_sub(cy0) as u64);

        self.sum(cx0, cy0, cx1, cy1) + (total - inside) * outside as u64
    }
}
