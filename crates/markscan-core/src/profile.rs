// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Calibration profiles: the geometry and thresholds of one printed sheet
// template. Every algorithm in the pipeline is parameterised by a profile,
// so a new sheet layout is a new JSON document, not new code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarkscanError, Result};
use crate::types::MAX_OPTIONS;

/// Complete description of an answer-sheet template.
///
/// Shared read-only by every photograph processed against the same template.
/// Missing top-level sections in a JSON document fall back to the classic
/// template returned by [`CalibrationProfile::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    /// Template name (e.g. "classic-60").
    pub name: String,
    /// Template revision, bumped whenever printed geometry changes.
    pub version: u32,
    pub binarize: BinarizeParams,
    pub locate: LocateParams,
    pub rectify: RectifyParams,
    pub grid: GridParams,
    pub trim: TrimParams,
    pub marks: MarkParams,
    pub barcode: BarcodeParams,
}

/// Adaptive (local mean) thresholding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarizeParams {
    /// Neighbourhood radius; the window is `2 * block_radius + 1` pixels wide.
    pub block_radius: u32,
    /// A pixel is ink when darker than the local mean minus this offset.
    pub offset: i32,
}

/// Candidate paper search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateParams {
    /// Polygon approximation tolerance in pixels.
    pub poly_epsilon: f64,
    /// Minimum candidate area as a fraction of the second-largest candidate.
    pub size_consistency: f64,
}

/// Orientation and projective rectification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectifyParams {
    /// Canonical paper width in pixels.
    pub paper_width: u32,
    /// Canonical paper height in pixels.
    pub paper_height: u32,
    /// Template positions of the located quadrilateral's corners.
    ///
    /// Index 0 is the corner that ends the edge carrying the orientation
    /// mark; the remaining corners follow in contour order, so index 3 is
    /// the corner that starts the marked edge.
    pub template_corners: [[f32; 2]; 4],
    /// How far beyond the opposite edge midpoint the reference points sit,
    /// as a multiple of the midline length.
    pub ref_point_ratio: f32,
    /// Half-width of the reference sampling window as a fraction of the
    /// mean edge length.
    pub ref_point_range: f32,
}

/// Answer block grid of the canonical paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub rows: u32,
    pub columns: u32,
    /// `[left, right]` x-coordinates of every column.
    pub column_bounds: Vec<[u32; 2]>,
    /// `[top, bottom]` y-coordinates spanned by all rows.
    pub row_range: [u32; 2],
    /// Outward expansion of every block, absorbing rectification jitter.
    pub padding: u32,
}

/// Border band removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimParams {
    /// Number of lines inspected from each side.
    pub scan_depth: u32,
    /// Fraction of ink pixels above which a line counts as solid.
    pub solid_ratio: f32,
}

/// Which bubble detection rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkStrategyKind {
    /// Exactly one answer per question: the darkest slot.
    Single,
    /// Zero or more answers per question, statistically gated.
    Multi,
}

/// Bubble slot layout and decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkParams {
    /// Number of answer options per question.
    pub option_count: usize,
    /// Pixels ignored at the left and right of a trimmed block.
    pub side_margin: u32,
    /// `[start, end)` rows scanned by the single-mark rule.
    pub band: [u32; 2],
    /// Rows ignored at the top and bottom by the multi-mark rule.
    pub vertical_margin: u32,
    /// Coefficient of variation a block must exceed before any slot is
    /// considered marked (multi-mark rule).
    pub min_variation: f64,
    /// A slot is marked when its sum is below `mean - deviation_factor * sd`.
    pub deviation_factor: f64,
    pub strategy: MarkStrategyKind,
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Identifier barcode location and decoding policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeParams {
    /// Barcode position on the canonical paper.
    pub region: Region,
    /// Decoder time budget in milliseconds.
    pub timeout_ms: u64,
    /// Leading payload characters forming the test identifier.
    pub test_id_len: usize,
    /// Test identifier assigned when decoding fails.
    pub test_id_sentinel: String,
    /// Paper identifier assigned when decoding fails.
    pub paper_id_sentinel: String,
}

impl Default for CalibrationProfile {
    /// The classic 60-question template (15 rows x 4 columns, options A-E).
    fn default() -> Self {
        Self {
            name: "classic-60".into(),
            version: 1,
            binarize: BinarizeParams {
                block_radius: 14,
                offset: 8,
            },
            locate: LocateParams {
                poly_epsilon: 4.0,
                size_consistency: 0.7,
            },
            rectify: RectifyParams {
                paper_width: 875,
                paper_height: 1240,
                template_corners: [[764.0, 307.0], [49.0, 307.0], [49.0, 1128.0], [764.0, 1128.0]],
                ref_point_ratio: 1.053,
                ref_point_range: 0.012,
            },
            grid: GridParams {
                rows: 15,
                columns: 4,
                column_bounds: vec![[87, 227], [266, 406], [446, 586], [624, 764]],
                row_range: [306, 1126],
                padding: 12,
            },
            trim: TrimParams {
                scan_depth: 22,
                solid_ratio: 0.5,
            },
            marks: MarkParams {
                option_count: 5,
                side_margin: 7,
                band: [7, 30],
                vertical_margin: 7,
                min_variation: 0.065,
                deviation_factor: 1.5,
                strategy: MarkStrategyKind::Single,
            },
            barcode: BarcodeParams {
                region: Region::new(740, 40, 100, 100),
                timeout_ms: 3000,
                test_id_len: 5,
                test_id_sentinel: "?????".into(),
                paper_id_sentinel: "???".into(),
            },
        }
    }
}

impl CalibrationProfile {
    /// Number of questions the grid can hold.
    pub fn capacity(&self) -> usize {
        self.grid.rows as usize * self.grid.columns as usize
    }

    /// Parse and validate a profile from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Save the profile as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check the profile for internal consistency.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MarkscanError::InvalidProfile(msg));

        if self.binarize.block_radius == 0 {
            return invalid("binarize.block_radius must be positive".into());
        }
        if !(self.locate.poly_epsilon.is_finite() && self.locate.poly_epsilon > 0.0) {
            return invalid(format!(
                "locate.poly_epsilon must be positive, got {}",
                self.locate.poly_epsilon
            ));
        }
        if !(self.locate.size_consistency > 0.0 && self.locate.size_consistency <= 1.0) {
            return invalid(format!(
                "locate.size_consistency must be in (0, 1], got {}",
                self.locate.size_consistency
            ));
        }

        let rectify = &self.rectify;
        if rectify.paper_width == 0 || rectify.paper_height == 0 {
            return invalid("rectify paper size must be non-zero".into());
        }
        if rectify
            .template_corners
            .iter()
            .flatten()
            .any(|v| !v.is_finite())
        {
            return invalid("rectify.template_corners must be finite".into());
        }
        if rectify.ref_point_ratio <= 1.0 {
            return invalid(format!(
                "rectify.ref_point_ratio must exceed 1.0, got {}",
                rectify.ref_point_ratio
            ));
        }
        if rectify.ref_point_range <= 0.0 {
            return invalid("rectify.ref_point_range must be positive".into());
        }

        self.grid.validate()?;

        if self.trim.scan_depth == 0 {
            return invalid("trim.scan_depth must be positive".into());
        }
        if !(self.trim.solid_ratio > 0.0 && self.trim.solid_ratio < 1.0) {
            return invalid("trim.solid_ratio must be in (0, 1)".into());
        }

        let marks = &self.marks;
        if marks.option_count == 0 || marks.option_count > MAX_OPTIONS {
            return invalid(format!(
                "marks.option_count must be in 1..={MAX_OPTIONS}, got {}",
                marks.option_count
            ));
        }
        if marks.band[0] >= marks.band[1] {
            return invalid("marks.band is empty".into());
        }
        if marks.min_variation < 0.0 || marks.deviation_factor < 0.0 {
            return invalid("marks thresholds must be non-negative".into());
        }

        let region = &self.barcode.region;
        if region.width == 0 || region.height == 0 {
            return invalid("barcode.region must be non-empty".into());
        }

        Ok(())
    }
}

impl GridParams {
    /// Check the grid on its own; [`CalibrationProfile::validate`] runs this too.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MarkscanError::InvalidProfile(msg));

        if self.rows == 0 || self.columns == 0 {
            return invalid("grid must have at least one row and one column".into());
        }
        if self.column_bounds.len() != self.columns as usize {
            return invalid(format!(
                "grid.column_bounds has {} entries for {} columns",
                self.column_bounds.len(),
                self.columns
            ));
        }
        if let Some(bad) = self.column_bounds.iter().position(|[l, r]| l >= r) {
            return invalid(format!("grid.column_bounds[{bad}] is empty"));
        }
        if self.row_range[0] >= self.row_range[1] {
            return invalid("grid.row_range is empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        let profile = CalibrationProfile::default();
        profile.validate().expect("classic template must validate");
        assert_eq!(profile.capacity(), 60);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classic.json");

        let mut profile = CalibrationProfile::default();
        profile.name = "classic-60-rev2".into();
        profile.marks.strategy = MarkStrategyKind::Multi;
        profile.to_json_file(&path).unwrap();

        let loaded = CalibrationProfile::from_json_file(&path).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn missing_sections_fall_back_to_classic_template() {
        let profile = CalibrationProfile::from_json_str(
            r#"{ "name": "custom", "version": 3, "marks": {
                "option_count": 4, "side_margin": 5, "band": [5, 25],
                "vertical_margin": 5, "min_variation": 0.05,
                "deviation_factor": 1.5, "strategy": "multi" } }"#,
        )
        .unwrap();

        assert_eq!(profile.name, "custom");
        assert_eq!(profile.marks.option_count, 4);
        assert_eq!(profile.marks.strategy, MarkStrategyKind::Multi);
        assert_eq!(profile.grid, CalibrationProfile::default().grid);
    }

    #[test]
    fn column_bounds_must_match_column_count() {
        let mut profile = CalibrationProfile::default();
        profile.grid.column_bounds.pop();
        assert!(matches!(
            profile.validate(),
            Err(MarkscanError::InvalidProfile(_))
        ));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let mut value = serde_json::to_value(CalibrationProfile::default()).unwrap();
        value["marks"]["strategy"] = serde_json::Value::String("fuzzy".into());
        let result = CalibrationProfile::from_json_str(&value.to_string());
        assert!(matches!(result, Err(MarkscanError::Serialization(_))));
    }

    #[test]
    fn inverted_row_range_is_rejected_on_its_own() {
        let mut grid = CalibrationProfile::default().grid;
        grid.row_range = [1200, 400];
        assert!(matches!(grid.validate(), Err(MarkscanError::InvalidProfile(_))));

        let mut profile = CalibrationProfile::default();
        profile.grid = grid;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn too_many_options_are_rejected() {
        let mut profile = CalibrationProfile::default();
        profile.marks.option_count = MAX_OPTIONS + 1;
        assert!(profile.validate().is_err());
    }
}
