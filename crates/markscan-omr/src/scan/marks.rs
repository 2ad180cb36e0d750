// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble mark detection. Two interchangeable strategies share one slot
// layout: the trimmed block minus side margins, split into equal slots.

use image::GrayImage;
use markscan_core::profile::{MarkParams, MarkStrategyKind};
use markscan_core::types::MarkedOptions;
use tracing::debug;

use crate::raster::IntegralImage;

/// Decides which options of one answer block are marked.
pub trait MarkDetector: Send + Sync {
    /// Marked options of a trimmed raw block, or `None` when the block is
    /// too small to hold the option slots.
    fn detect(&self, block: &GrayImage) -> Option<MarkedOptions>;

    /// Which rule this detector applies.
    fn strategy(&self) -> MarkStrategyKind;
}

/// Build the detector named by a profile.
pub fn detector_for(params: &MarkParams) -> Box<dyn MarkDetector> {
    match params.strategy {
        MarkStrategyKind::Single => Box::new(SingleMark::new(params)),
        MarkStrategyKind::Multi => Box::new(MultiMark::new(params)),
    }
}

/// Horizontal division of a block into option slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub option_count: usize,
    pub side_margin: u32,
}

impl SlotLayout {
    pub fn slot_width(&self, block_width: u32) -> u32 {
        block_width.saturating_sub(2 * self.side_margin) / self.option_count as u32
    }

    /// `[start, end)` columns of every slot, or `None` when slots would be
    /// empty.
    pub fn slots(&self, block_width: u32) -> Option<Vec<(u32, u32)>> {
        let sw = self.slot_width(block_width);
        if sw == 0 {
            return None;
        }
        Some(
            (0..self.option_count as u32)
                .map(|j| {
                    let start = self.side_margin + j * sw;
                    (start, start + sw)
                })
                .collect(),
        )
    }

    /// Intensity sum of every slot over rows `[top, bottom)`.
    fn sums(&self, block: &GrayImage, top: u32, bottom: u32) -> Option<Vec<f64>> {
        if bottom <= top {
            return None;
        }
        let slots = self.slots(block.width())?;
        let integral = IntegralImage::new(block);
        Some(
            slots
                .into_iter()
                .map(|(x0, x1)| integral.sum(x0, top, x1, bottom) as f64)
                .collect(),
        )
    }
}

// -- Single mark --------------------------------------------------------------

/// Exactly one answer: the darkest slot within a band near the block top.
#[derive(Debug, Clone, Copy)]
pub struct SingleMark {
    layout: SlotLayout,
    band: [u32; 2],
}

impl SingleMark {
    pub fn new(params: &MarkParams) -> Self {
        Self {
            layout: SlotLayout {
                option_count: params.option_count,
                side_margin: params.side_margin,
            },
            band: params.band,
        }
    }

    /// Index of the minimum sum; the lowest index wins ties.
    pub fn decide(sums: &[f64]) -> MarkedOptions {
        let mut best = 0;
        for (i, &sum) in sums.iter().enumerate().skip(1) {
            if sum < sums[best] {
                best = i;
            }
        }
        MarkedOptions::single(best)
    }
}

impl MarkDetector for SingleMark {
    fn detect(&self, block: &GrayImage) -> Option<MarkedOptions> {
        let bottom = self.band[1].min(block.height());
        let sums = self.layout.sums(block, self.band[0], bottom)?;
        Some(Self::decide(&sums))
    }

    fn strategy(&self) -> MarkStrategyKind {
        MarkStrategyKind::Single
    }
}

// -- Multi mark ---------------------------------------------------------------

/// Zero or more answers, gated by how uneven the slot brightness is.
///
/// Nothing is reported unless the coefficient of variation of the slot sums
/// exceeds `min_variation`; then every slot darker than
/// `mean - deviation_factor * sd` is marked. Uniform or blank blocks report
/// no marks.
#[derive(Debug, Clone, Copy)]
pub struct MultiMark {
    layout: SlotLayout,
    vertical_margin: u32,
    min_variation: f64,
    deviation_factor: f64,
}

impl MultiMark {
    pub fn new(params: &MarkParams) -> Self {
        Self {
            layout: SlotLayout {
                option_count: params.option_count,
                side_margin: params.side_margin,
            },
            vertical_margin: params.vertical_margin,
            min_variation: params.min_variation,
            deviation_factor: params.deviation_factor,
        }
    }

    pub fn decide(&self, sums: &[f64]) -> MarkedOptions {
        let mut marked = MarkedOptions::none();
        if sums.is_empty() {
            return marked;
        }

        let n = sums.len() as f64;
        let mean = sums.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return marked;
        }
        let variance = sums.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let sd = variance.sqrt();
        let variation = sd / mean;

        if variation <= self.min_variation {
            debug!(variation, "Slot brightness uniform; no marks reported");
            return marked;
        }

        let threshold = mean - self.deviation_factor * sd;
        for (i, &sum) in sums.iter().enumerate() {
            if sum < threshold {
                marked.insert(i);
            }
        }
        marked
    }
}

impl MarkDetector for MultiMark {
    fn detect(&self, block: &GrayImage) -> Option<MarkedOptions> {
        let top = self.vertical_margin;
        let bottom = block.height().saturating_sub(self.vertical_margin);
        let sums = self.layout.sums(block, top, bottom)?;
        Some(self.decide(&sums))
    }

    fn strategy(&self) -> MarkStrategyKind {
        MarkStrategyKind::Multi
    }
}
