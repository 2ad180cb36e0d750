// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border-band trimming of answer blocks.

use image::GrayImage;
use markscan_core::profile::TrimParams;
use tracing::trace;

use super::segment::AnswerBlock;
use crate::raster::{INK, crop_clamped};

/// Lines removed from each side of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimOffsets {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

/// Crops answer blocks to the content inside their printed borders.
///
/// Each side is scanned inward for at most `scan_depth` lines. A line is
/// solid when more than `solid_ratio` of its pixels are ink. The side's
/// offset is the first non-solid line after a solid run; without such a
/// transition the side is left alone.
#[derive(Debug, Clone, Copy)]
pub struct BlockTrimmer {
    scan_depth: u32,
    solid_ratio: f32,
}

impl BlockTrimmer {
    pub fn new(params: &TrimParams) -> Self {
        Self {
            scan_depth: params.scan_depth,
            solid_ratio: params.solid_ratio,
        }
    }

    /// Offsets for a binarized block.
    pub fn offsets(&self, binary: &GrayImage) -> TrimOffsets {
        let (w, h) = binary.dimensions();
        let row_solid = |y: u32| self.is_solid((0..w).filter(|&x| is_ink(binary, x, y)).count(), w);
        let col_solid = |x: u32| self.is_solid((0..h).filter(|&y| is_ink(binary, x, y)).count(), h);

        let mut offsets = TrimOffsets {
            top: self.side_offset(h, |i| row_solid(i)),
            bottom: self.side_offset(h, |i| row_solid(h - 1 - i)),
            left: self.side_offset(w, |i| col_solid(i)),
            right: self.side_offset(w, |i| col_solid(w - 1 - i)),
        };

        // Never trim an axis away entirely.
        if offsets.top + offsets.bottom >= h {
            offsets.top = 0;
            offsets.bottom = 0;
        }
        if offsets.left + offsets.right >= w {
            offsets.left = 0;
            offsets.right = 0;
        }
        offsets
    }

    /// Crop both rasters of a block by the offsets found in its binary image.
    pub fn trim(&self, block: &AnswerBlock) -> AnswerBlock {
        let o = self.offsets(&block.binary);
        let (w, h) = block.binary.dimensions();
        let width = w - o.left - o.right;
        let height = h - o.top - o.bottom;
        trace!(question = block.question, ?o, "Block trimmed");

        AnswerBlock {
            question: block.question,
            raw: crop_clamped(&block.raw, o.left, o.top, width, height),
            binary: crop_clamped(&block.binary, o.left, o.top, width, height),
        }
    }

    fn is_solid(&self, ink: usize, len: u32) -> bool {
        ink as f32 > self.solid_ratio * len as f32
    }

    fn side_offset(&self, lines: u32, mut solid: impl FnMut(u32) -> bool) -> u32 {
        let depth = self.scan_depth.min(lines);
        let mut in_band = false;
        for i in 0..depth {
            if solid(i) {
                in_band = true;
            } else if in_band {
                return i;
            }
        }
        0
    }
}

fn is_ink(binary: &GrayImage, x: u32, y: u32) -> bool {
    binary.get_pixel(x, y).0[0] == INK
}
