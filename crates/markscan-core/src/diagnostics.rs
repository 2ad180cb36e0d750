// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recoverable pipeline conditions, recorded as data on the photograph or
// paper they concern.
//
// Nothing here aborts processing. Each note carries a severity and renders to
// a single plain-English line for the output report.

use std::fmt;

/// How a recovered condition affected the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fewer papers than requested were found; the ones found are complete.
    Shortfall,
    /// A collaborator failed and a fallback value was substituted.
    Recovered,
    /// Part of a paper could not be read; the affected answers are empty.
    Degraded,
}

/// One recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    /// Size-consistent paper candidates ran out before the requested count.
    PapersMissing { missing: usize },
    /// The barcode decoder exceeded its time budget.
    BarcodeTimedOut { timeout_ms: u64 },
    /// The barcode decoder ran but found no payload.
    BarcodeUnreadable { reason: String },
    /// A located candidate could not be warped onto the template.
    RectificationFailed { candidate: usize, reason: String },
    /// A trimmed answer block is too small to hold the option slots.
    BlockTooSmall {
        question: usize,
        width: u32,
        height: u32,
    },
}

impl Note {
    pub fn severity(&self) -> Severity {
        match self {
            Note::PapersMissing { .. } => Severity::Shortfall,
            Note::BarcodeTimedOut { .. } | Note::BarcodeUnreadable { .. } => Severity::Recovered,
            Note::RectificationFailed { .. } => Severity::Shortfall,
            Note::BlockTooSmall { .. } => Severity::Degraded,
        }
    }

    /// Plain-English line written into reports.
    pub fn message(&self) -> String {
        match self {
            Note::PapersMissing { missing } => format!("{missing} paper(s) not detected."),
            Note::BarcodeTimedOut { timeout_ms } => {
                format!("Could not decode datamatrix. (timed out after {timeout_ms} ms)")
            }
            Note::BarcodeUnreadable { reason } => {
                format!("Could not decode datamatrix. ({reason})")
            }
            Note::RectificationFailed { candidate, reason } => {
                format!("Paper candidate {candidate} could not be rectified. ({reason})")
            }
            Note::BlockTooSmall {
                question,
                width,
                height,
            } => format!(
                "Question {} block is too small to read ({width}x{height}).",
                question + 1
            ),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Append-only diagnostic log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    notes: Vec<Note>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Rendered messages in recording order.
    pub fn lines(&self) -> Vec<String> {
        self.notes.iter().map(Note::message).collect()
    }
}
