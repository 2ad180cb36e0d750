// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Markscan.
//
// Only boundary-contract violations surface as errors. Conditions the
// pipeline recovers from (missing papers, unreadable barcodes) are recorded
// as `Note`s on the affected entity instead.

use thiserror::Error;

/// Top-level error type for all Markscan operations.
#[derive(Debug, Error)]
pub enum MarkscanError {
    // -- Input errors --
    #[error("image decoding failed: {0}")]
    ImageDecode(String),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    // -- Configuration errors --
    #[error("invalid calibration profile: {0}")]
    InvalidProfile(String),

    // -- Geometry errors --
    #[error("geometry error: {0}")]
    Geometry(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarkscanError>;
