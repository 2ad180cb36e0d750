// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Markscan: marked option sets, scan requests and the
// serialisable per-paper / per-photograph reports.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{MarkscanError, Result};

/// Largest option alphabet a template may use (letters A-Z).
pub const MAX_OPTIONS: usize = 26;

/// Set of marked answer options for one question.
///
/// Stored as a bit set over the option alphabet; index 0 is `A`. Serialises
/// as the string of marked letters in alphabetical order, so an unmarked
/// question is `""` and a double mark on A and C is `"AC"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MarkedOptions(u32);

impl MarkedOptions {
    /// No option marked.
    pub fn none() -> Self {
        Self(0)
    }

    /// Exactly one option marked.
    ///
    /// Panics when `index` lies outside the alphabet, which is a programming
    /// error: detectors only produce indices below the profile's option count.
    pub fn single(index: usize) -> Self {
        let mut set = Self::none();
        set.insert(index);
        set
    }

    /// Mark the option at `index`.
    pub fn insert(&mut self, index: usize) {
        assert!(index < MAX_OPTIONS, "option index {index} out of range");
        self.0 |= 1 << index;
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_OPTIONS && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Marked indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_OPTIONS).filter(|&i| self.contains(i))
    }

    /// Marked letters in alphabetical order.
    pub fn letters(&self) -> String {
        self.indices().map(option_letter).collect()
    }

    /// Parse a string of option letters such as `"BD"`.
    pub fn from_letters(letters: &str) -> Result<Self> {
        let mut set = Self::none();
        for c in letters.chars() {
            let index = letter_index(c).ok_or_else(|| {
                MarkscanError::InvalidRequest(format!("'{c}' is not an option letter"))
            })?;
            set.insert(index);
        }
        Ok(set)
    }
}

impl fmt::Display for MarkedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

impl Serialize for MarkedOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.letters())
    }
}

impl<'de> Deserialize<'de> for MarkedOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LettersVisitor;

        impl Visitor<'_> for LettersVisitor {
            type Value = MarkedOptions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string of option letters A-Z")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                MarkedOptions::from_letters(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(LettersVisitor)
    }
}

/// Letter for an option index (0 → 'A').
pub fn option_letter(index: usize) -> char {
    debug_assert!(index < MAX_OPTIONS);
    (b'A' + index as u8) as char
}

fn letter_index(c: char) -> Option<usize> {
    c.is_ascii_uppercase().then(|| (c as u8 - b'A') as usize)
}

/// What the caller expects to find in one photograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Number of answer papers photographed together.
    pub papers: usize,
    /// Number of questions to read on every paper.
    pub questions: usize,
}

impl ScanRequest {
    pub fn new(papers: usize, questions: usize) -> Self {
        Self { papers, questions }
    }
}

/// Machine-readable result for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperReport {
    pub test_id: String,
    pub paper_id: String,
    /// Marked options, one entry per question in grid order.
    pub answers: Vec<MarkedOptions>,
    /// Paper-level diagnostic messages.
    pub diagnostics: Vec<String>,
}

/// Machine-readable result for one photograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoReport {
    /// Hex SHA-256 of the source raster (dimensions and pixels).
    pub photo_digest: String,
    pub papers: Vec<PaperReport>,
    /// Photograph-level diagnostic messages (e.g. paper shortfall).
    pub diagnostics: Vec<String>,
}

impl PhotoReport {
    /// Render the report as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a report previously produced by [`PhotoReport::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
