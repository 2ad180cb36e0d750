// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster primitives: integral images, adaptive binarization, cropping and
// fingerprinting.

pub mod binarize;
pub mod integral;
pub mod ops;

pub use binarize::{Binarizer, INK, PAPER};
pub use integral::IntegralImage;
pub use ops::{crop_clamped, decode_gray, ensure_not_empty, raster_digest};
