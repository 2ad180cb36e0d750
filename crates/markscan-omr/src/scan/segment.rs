// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid segmentation of a canonical paper into per-question answer blocks.

use image::GrayImage;
use markscan_core::error::{MarkscanError, Result};
use markscan_core::profile::GridParams;
use tracing::{debug, instrument};

use crate::raster::crop_clamped;

/// Pixel rectangle of one question on the canonical paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBounds {
    pub question: usize,
    pub column: u32,
    pub row: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Raw and binarized pixels of one question.
#[derive(Debug, Clone)]
pub struct AnswerBlock {
    pub question: usize,
    pub raw: GrayImage,
    pub binary: GrayImage,
}

impl AnswerBlock {
    pub fn dimensions(&self) -> (u32, u32) {
        self.raw.dimensions()
    }
}

/// Splits canonical papers into the profile's column-major question grid.
#[derive(Debug, Clone)]
pub struct GridSegmenter {
    grid: GridParams,
}

impl GridSegmenter {
    /// Fails with `InvalidProfile` when the grid is malformed.
    pub fn new(grid: &GridParams) -> Result<Self> {
        grid.validate()?;
        Ok(Self { grid: grid.clone() })
    }

    /// Number of questions the grid holds.
    pub fn capacity(&self) -> usize {
        self.grid.rows as usize * self.grid.columns as usize
    }

    /// y-coordinate of the boundary above `row` (`row == rows` gives the
    /// bottom of the last row).
    pub fn row_boundary(&self, row: u32) -> u32 {
        let [top, bottom] = self.grid.row_range;
        let span = (bottom - top) as u64;
        top + (row as u64 * span / self.grid.rows as u64) as u32
    }

    /// Padded bounds of `question`. Questions run down each column first.
    ///
    /// `None` when `question` is not below [`GridSegmenter::capacity`].
    pub fn bounds(&self, question: usize) -> Option<BlockBounds> {
        let rows = self.grid.rows as usize;
        let column = question / rows;
        let row = (question % rows) as u32;
        let [left, right] = *self.grid.column_bounds.get(column)?;
        let pad = self.grid.padding;

        let x = left.saturating_sub(pad);
        let y = self.row_boundary(row).saturating_sub(pad);
        let x_end = right + pad;
        let y_end = self.row_boundary(row + 1) + pad;

        Some(BlockBounds {
            question,
            column: column as u32,
            row,
            x,
            y,
            width: x_end - x,
            height: y_end - y,
        })
    }

    /// Crop the first `questions` blocks out of a rectified paper.
    #[instrument(skip(self, raw, binary))]
    pub fn segment(
        &self,
        raw: &GrayImage,
        binary: &GrayImage,
        questions: usize,
    ) -> Result<Vec<AnswerBlock>> {
        if questions > self.capacity() {
            return Err(MarkscanError::InvalidRequest(format!(
                "{} questions requested but the grid holds {}",
                questions,
                self.capacity()
            )));
        }

        let blocks: Vec<AnswerBlock> = (0..questions)
            .filter_map(|question| {
                let b = self.bounds(question)?;
                Some(AnswerBlock {
                    question,
                    raw: crop_clamped(raw, b.x, b.y, b.width, b.height),
                    binary: crop_clamped(binary, b.x, b.y, b.width, b.height),
                })
            })
            .collect();

        debug!(blocks = blocks.len(), "Paper segmented");
        Ok(blocks)
    }
}
