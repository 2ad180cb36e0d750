// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper-level processing: one rectified sheet in, identifiers and answers out.

use image::GrayImage;
use markscan_core::CalibrationProfile;
use markscan_core::diagnostics::{Diagnostics, Note, Severity};
use markscan_core::error::Result;
use markscan_core::profile::BarcodeParams;
use markscan_core::types::{MarkedOptions, PaperReport};
use tracing::{debug, info, instrument, warn};

use crate::barcode::{BarcodeDecoder, NullDecoder, read_ids};
use crate::raster::Binarizer;
use crate::scan::{BlockTrimmer, GridSegmenter, MarkDetector, detector_for};

/// Result of reading one rectified paper.
#[derive(Debug, Clone)]
pub struct Paper {
    index: usize,
    test_id: String,
    paper_id: String,
    answers: Vec<MarkedOptions>,
    diagnostics: Diagnostics,
    raw: Option<GrayImage>,
    binary: Option<GrayImage>,
}

impl Paper {
    /// Rank of the paper's candidate in the photograph (largest first).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }

    /// Marked options per question, in grid order.
    pub fn answers(&self) -> &[MarkedOptions] {
        &self.answers
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Rectified raw image, when retained.
    pub fn raw(&self) -> Option<&GrayImage> {
        self.raw.as_ref()
    }

    /// Rectified binarized image, when retained.
    pub fn binary(&self) -> Option<&GrayImage> {
        self.binary.as_ref()
    }

    pub fn report(&self) -> PaperReport {
        PaperReport {
            test_id: self.test_id.clone(),
            paper_id: self.paper_id.clone(),
            answers: self.answers.clone(),
            diagnostics: self.diagnostics.lines(),
        }
    }
}

/// Reads identifiers and answers from canonical paper images.
pub struct PaperReader {
    binarizer: Binarizer,
    segmenter: GridSegmenter,
    trimmer: BlockTrimmer,
    detector: Box<dyn MarkDetector>,
    decoder: Box<dyn BarcodeDecoder>,
    barcode: BarcodeParams,
}

impl PaperReader {
    /// Reader for `profile` with the profile's detector and no barcode
    /// decoder.
    ///
    /// Fails with `InvalidProfile` when the profile does not validate.
    pub fn new(profile: &CalibrationProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            binarizer: Binarizer::new(&profile.binarize),
            segmenter: GridSegmenter::new(&profile.grid)?,
            trimmer: BlockTrimmer::new(&profile.trim),
            detector: detector_for(&profile.marks),
            decoder: Box::new(NullDecoder),
            barcode: profile.barcode.clone(),
        })
    }

    pub fn set_decoder(&mut self, decoder: Box<dyn BarcodeDecoder>) {
        self.decoder = decoder;
    }

    pub fn set_detector(&mut self, detector: Box<dyn MarkDetector>) {
        self.detector = detector;
    }

    pub fn detector(&self) -> &dyn MarkDetector {
        self.detector.as_ref()
    }

    /// Read the first `questions` answers of a rectified paper.
    #[instrument(skip(self, raw), fields(width = raw.width(), height = raw.height()))]
    pub fn read(
        &self,
        index: usize,
        raw: GrayImage,
        questions: usize,
        retain_images: bool,
    ) -> Result<Paper> {
        let binary = self.binarizer.binarize(&raw);
        let mut diagnostics = Diagnostics::new();

        let (ids, note) = read_ids(self.decoder.as_ref(), &binary, &self.barcode);
        if let Some(note) = note {
            record(&mut diagnostics, note);
        }

        let blocks = self.segmenter.segment(&raw, &binary, questions)?;
        let mut answers = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let trimmed = self.trimmer.trim(block);
            match self.detector.detect(&trimmed.raw) {
                Some(marked) => {
                    debug!(question = block.question, marks = %marked, "Block read");
                    answers.push(marked);
                }
                None => {
                    let (width, height) = trimmed.dimensions();
                    record(
                        &mut diagnostics,
                        Note::BlockTooSmall {
                            question: block.question,
                            width,
                            height,
                        },
                    );
                    answers.push(MarkedOptions::none());
                }
            }
        }

        let (raw, binary) = if retain_images {
            (Some(raw), Some(binary))
        } else {
            (None, None)
        };

        Ok(Paper {
            index,
            test_id: ids.test_id,
            paper_id: ids.paper_id,
            answers,
            diagnostics,
            raw,
            binary,
        })
    }
}

/// Log a note at the level its severity calls for, then keep it.
pub(crate) fn record(diagnostics: &mut Diagnostics, note: Note) {
    let severity = note.severity();
    match severity {
        Severity::Recovered => info!(?severity, "{note}"),
        Severity::Shortfall | Severity::Degraded => warn!(?severity, "{note}"),
    }
    diagnostics.push(note);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{DotCodeDecoder, SheetSpec};
    use markscan_core::profile::{GridParams, MarkStrategyKind};

    fn answers(marks: &[&str]) -> Vec<MarkedOptions> {
        marks
            .iter()
            .map(|m| MarkedOptions::from_letters(m).unwrap())
            .collect()
    }

    #[test]
    fn reads_answers_and_identifiers_from_a_canonical_sheet() {
        let profile = CalibrationProfile::default();
        let spec = SheetSpec::new("MATH1042", answers(&["A", "C", "E", "B", "D", "A"]));
        let sheet = spec.render(&profile).unwrap();

        let mut reader = PaperReader::new(&profile).unwrap();
        reader.set_decoder(Box::new(DotCodeDecoder));
        let paper = reader.read(0, sheet, 6, false).unwrap();

        assert_eq!(paper.test_id(), "MATH1");
        assert_eq!(paper.paper_id(), "042");
        assert_eq!(paper.answers(), spec.answers.as_slice());
        assert!(paper.diagnostics().is_empty());
        assert!(paper.raw().is_none() && paper.binary().is_none());
    }

    #[test]
    fn undecodable_barcode_gets_sentinels_but_answers_are_read() {
        let profile = CalibrationProfile::default();
        let spec = SheetSpec::new("", answers(&["B", "B", "D"]));
        let reader = PaperReader::new(&profile).unwrap();

        let paper = reader.read(0, spec.render(&profile).unwrap(), 3, true).unwrap();
        assert_eq!(paper.test_id(), "?????");
        assert_eq!(paper.paper_id(), "???");
        assert_eq!(paper.answers(), spec.answers.as_slice());
        assert_eq!(paper.diagnostics().len(), 1);
        assert_eq!(paper.raw().map(|r| r.dimensions()), Some((875, 1240)));
        assert!(paper.binary().is_some());
    }

    #[test]
    fn multi_strategy_reports_blank_questions_as_empty() {
        let mut profile = CalibrationProfile::default();
        profile.marks.strategy = MarkStrategyKind::Multi;
        let spec = SheetSpec::new("QUIZ9001", answers(&["C", "", "A", ""]));

        let mut reader = PaperReader::new(&profile).unwrap();
        reader.set_decoder(Box::new(DotCodeDecoder));
        assert_eq!(reader.detector().strategy(), MarkStrategyKind::Multi);

        let paper = reader.read(0, spec.render(&profile).unwrap(), 4, false).unwrap();
        assert_eq!(paper.answers(), spec.answers.as_slice());
        let report = paper.report();
        assert_eq!(report.test_id, "QUIZ9");
        assert_eq!(report.answers.len(), 4);
    }

    #[test]
    fn slivers_become_empty_answers_with_a_note() {
        let mut profile = CalibrationProfile::default();
        profile.grid = GridParams {
            rows: 1,
            columns: 1,
            column_bounds: vec![[100, 104]],
            row_range: [100, 200],
            padding: 0,
        };
        let reader = PaperReader::new(&profile).unwrap();
        let blank = GrayImage::from_pixel(875, 1240, image::Luma([255]));

        let paper = reader.read(0, blank, 1, false).unwrap();
        assert_eq!(paper.answers(), &[MarkedOptions::none()]);
        assert!(
            paper
                .diagnostics()
                .iter()
                .any(|n| matches!(n, Note::BlockTooSmall { question: 0, .. }))
        );
    }

    #[test]
    fn malformed_profiles_are_refused() {
        let mut profile = CalibrationProfile::default();
        profile.grid.row_range = [1126, 306];
        assert!(PaperReader::new(&profile).is_err());

        let mut profile = CalibrationProfile::default();
        profile.grid.column_bounds.clear();
        assert!(PaperReader::new(&profile).is_err());
    }

    #[test]
    fn recorded_notes_keep_order_whatever_their_severity() {
        let mut diagnostics = Diagnostics::new();
        let notes = [
            Note::BarcodeUnreadable {
                reason: "no symbol".into(),
            },
            Note::BlockTooSmall {
                question: 4,
                width: 2,
                height: 30,
            },
            Note::PapersMissing { missing: 1 },
        ];
        for note in notes.clone() {
            record(&mut diagnostics, note);
        }

        let severities: Vec<Severity> = diagnostics.iter().map(Note::severity).collect();
        assert_eq!(
            severities,
            [Severity::Recovered, Severity::Degraded, Severity::Shortfall]
        );
        assert_eq!(diagnostics.iter().cloned().collect::<Vec<_>>(), notes);
    }
}
