// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: paper location, rectification, grid segmentation,
// block trimming and bubble mark detection.

pub mod locate;
pub mod marks;
pub mod quad;
pub mod rectify;
pub mod segment;
pub mod trim;

pub use locate::{Candidate, PaperLocator, Selection};
pub use marks::{MarkDetector, MultiMark, SingleMark, SlotLayout, detector_for};
pub use quad::{Quad, Vertex};
pub use rectify::PaperRectifier;
pub use segment::{AnswerBlock, BlockBounds, GridSegmenter};
pub use trim::{BlockTrimmer, TrimOffsets};
