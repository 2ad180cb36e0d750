// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// markscan-omr — Optical mark recognition for photographed answer sheets.
//
// Provides raster primitives (adaptive binarization, summed-area tables,
// cropping), the scanning pipeline (paper location, rectification, grid
// segmentation, border trimming, bubble mark detection), identifier barcode
// decoding and the photograph/paper orchestration on top of them.

pub mod barcode;
pub mod paper;
pub mod photo;
pub mod raster;
pub mod scan;
pub mod synthetic;

// Re-export the primary structs so callers can use `markscan_omr::SheetScanner` etc.
pub use barcode::{BarcodeDecoder, Deadline, DecodeOutcome, NullDecoder};
pub use paper::{Paper, PaperReader};
pub use photo::{Photograph, SheetScanner};
pub use scan::{MarkDetector, MultiMark, SingleMark};

#[cfg(feature = "qr")]
pub use barcode::QrDecoder;
