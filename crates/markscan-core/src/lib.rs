// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markscan: core types, calibration profiles and error definitions shared
// across all crates.

pub mod diagnostics;
pub mod error;
pub mod profile;
pub mod types;

pub use diagnostics::{Diagnostics, Note, Severity};
pub use error::{MarkscanError, Result};
pub use profile::CalibrationProfile;
pub use types::*;
