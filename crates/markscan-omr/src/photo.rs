// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photograph-level orchestration.
//
// One `scan` call owns one photograph from start to finish: binarize, locate
// the requested papers, rectify each candidate and read it. Recoverable
// conditions become notes on the photograph or paper; only malformed input,
// invalid profiles and invalid requests are returned as errors.

use std::thread;

use image::GrayImage;
use markscan_core::CalibrationProfile;
use markscan_core::diagnostics::{Diagnostics, Note};
use markscan_core::error::{MarkscanError, Result};
use markscan_core::types::{PhotoReport, ScanRequest};
use tracing::{info, instrument};

use crate::barcode::BarcodeDecoder;
use crate::paper::{Paper, PaperReader, record};
use crate::raster::{Binarizer, IntegralImage, decode_gray, ensure_not_empty, raster_digest};
use crate::scan::{MarkDetector, PaperLocator, PaperRectifier};

/// Everything extracted from one photograph.
#[derive(Debug, Clone)]
pub struct Photograph {
    raw: GrayImage,
    binary: GrayImage,
    digest: String,
    papers: Vec<Paper>,
    diagnostics: Diagnostics,
}

impl Photograph {
    pub fn raw(&self) -> &GrayImage {
        &self.raw
    }

    pub fn binary(&self) -> &GrayImage {
        &self.binary
    }

    /// Hex SHA-256 of the source raster.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Papers in selection order (largest candidate first).
    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn report(&self) -> PhotoReport {
        PhotoReport {
            photo_digest: self.digest.clone(),
            papers: self.papers.iter().map(Paper::report).collect(),
            diagnostics: self.diagnostics.lines(),
        }
    }
}

/// Runs the full pipeline against one calibration profile.
///
/// ```rust,no_run
/// use markscan_core::{CalibrationProfile, ScanRequest};
/// use markscan_omr::SheetScanner;
///
/// # fn main() -> markscan_core::Result<()> {
/// let scanner = SheetScanner::new(CalibrationProfile::default())?;
/// let bytes = std::fs::read("photo.jpg")?;
/// let photo = scanner.scan_bytes(&bytes, ScanRequest::new(2, 60))?;
/// println!("{}", photo.report().to_json()?);
/// # Ok(())
/// # }
/// ```
pub struct SheetScanner {
    profile: CalibrationProfile,
    binarizer: Binarizer,
    locator: PaperLocator,
    rectifier: PaperRectifier,
    reader: PaperReader,
    retain_images: bool,
}

impl SheetScanner {
    /// Scanner for a validated profile, with the profile's mark detector and
    /// no barcode decoder.
    pub fn new(profile: CalibrationProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            binarizer: Binarizer::new(&profile.binarize),
            locator: PaperLocator::new(&profile.locate),
            rectifier: PaperRectifier::new(&profile.rectify)?,
            reader: PaperReader::new(&profile)?,
            retain_images: false,
            profile,
        })
    }

    pub fn with_decoder(mut self, decoder: impl BarcodeDecoder + 'static) -> Self {
        self.reader.set_decoder(Box::new(decoder));
        self
    }

    /// Replace the detector chosen by the profile's mark strategy.
    pub fn with_detector(mut self, detector: Box<dyn MarkDetector>) -> Self {
        self.reader.set_detector(detector);
        self
    }

    /// Keep each paper's rectified images after its answers are read.
    pub fn retain_images(mut self, retain: bool) -> Self {
        self.retain_images = retain;
        self
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Scan a grayscale photograph.
    #[instrument(
        skip(self, raw),
        fields(width = raw.width(), height = raw.height(), papers = request.papers, questions = request.questions)
    )]
    pub fn scan(&self, raw: GrayImage, request: ScanRequest) -> Result<Photograph> {
        self.check_request(&request)?;
        ensure_not_empty(&raw)?;

        let digest = raster_digest(&raw);
        let integral = IntegralImage::new(&raw);
        let binary = self.binarizer.binarize_with(&raw, &integral);
        let selection = self.locator.locate(&binary, request.papers);

        let mut diagnostics = Diagnostics::new();
        if selection.missing > 0 {
            record(
                &mut diagnostics,
                Note::PapersMissing {
                    missing: selection.missing,
                },
            );
        }

        let mut papers = Vec::with_capacity(selection.accepted.len());
        for (index, candidate) in selection.accepted.iter().enumerate() {
            match self.rectifier.rectify(&raw, &integral, &candidate.quad) {
                Ok(canonical) => {
                    let paper =
                        self.reader
                            .read(index, canonical, request.questions, self.retain_images)?;
                    papers.push(paper);
                }
                Err(MarkscanError::Geometry(reason)) => {
                    record(
                        &mut diagnostics,
                        Note::RectificationFailed {
                            candidate: index,
                            reason,
                        },
                    );
                }
                Err(err) => return Err(err),
            }
        }

        info!(papers = papers.len(), notes = diagnostics.len(), "Photograph scanned");
        Ok(Photograph {
            raw,
            binary,
            digest,
            papers,
            diagnostics,
        })
    }

    /// Decode image bytes (JPEG, PNG, ...) and scan them.
    pub fn scan_bytes(&self, data: &[u8], request: ScanRequest) -> Result<Photograph> {
        let raw = decode_gray(data)?;
        self.scan(raw, request)
    }

    /// Scan independent photographs in parallel, one thread each.
    ///
    /// Results are returned in input order.
    pub fn scan_many(&self, photos: Vec<GrayImage>, request: ScanRequest) -> Vec<Result<Photograph>> {
        thread::scope(|scope| {
            let handles: Vec<_> = photos
                .into_iter()
                .map(|raw| scope.spawn(move || self.scan(raw, request)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }

    fn check_request(&self, request: &ScanRequest) -> Result<()> {
        if request.papers == 0 {
            return Err(MarkscanError::InvalidRequest(
                "at least one paper must be requested".into(),
            ));
        }
        let capacity = self.profile.capacity();
        if request.questions > capacity {
            return Err(MarkscanError::InvalidRequest(format!(
                "{} questions requested but the {} template holds {}",
                request.questions, self.profile.name, capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::MultiMark;
    use crate::synthetic::{DotCodeDecoder, SheetSpec, place_on_canvas, rotate, tilt};
    use image::{DynamicImage, ImageFormat, Luma};
    use markscan_core::profile::MarkStrategyKind;
    use markscan_core::types::MarkedOptions;
    use std::io::Cursor;

    const MARGIN: u32 = 60;

    fn scanner() -> SheetScanner {
        SheetScanner::new(CalibrationProfile::default())
            .unwrap()
            .with_decoder(DotCodeDecoder)
    }

    /// Answers cycling through A-E, one per question.
    fn cycling(questions: usize, shift: usize) -> Vec<MarkedOptions> {
        (0..questions)
            .map(|q| MarkedOptions::single((q + shift) % 5))
            .collect()
    }

    fn sheet(payload: &str, answers: Vec<MarkedOptions>) -> (SheetSpec, GrayImage) {
        let spec = SheetSpec::new(payload, answers);
        let img = spec.render(&CalibrationProfile::default()).unwrap();
        (spec, img)
    }

    #[test]
    fn single_sheet_is_read_end_to_end() {
        let (spec, img) = sheet("CHEM7123", cycling(60, 0));
        let photo = place_on_canvas(&[img], MARGIN);

        let result = scanner().scan(photo, ScanRequest::new(1, 60)).unwrap();
        assert!(result.diagnostics().is_empty());
        assert_eq!(result.papers().len(), 1);

        let paper = &result.papers()[0];
        assert_eq!(paper.test_id(), "CHEM7");
        assert_eq!(paper.paper_id(), "123");
        assert_eq!(paper.answers(), spec.answers.as_slice());
        assert!(paper.diagnostics().is_empty());
    }

    #[test]
    fn every_quarter_turn_reads_the_same() {
        let (spec, img) = sheet("GEO01009", cycling(60, 3));
        let photo = place_on_canvas(&[img], MARGIN);
        let scanner = scanner();

        for turns in 0..4 {
            let result = scanner
                .scan(rotate(&photo, turns), ScanRequest::new(1, 60))
                .unwrap();
            let paper = &result.papers()[0];
            assert_eq!(paper.test_id(), "GEO01", "rotation {}", turns * 90);
            assert_eq!(paper.paper_id(), "009", "rotation {}", turns * 90);
            assert_eq!(paper.answers(), spec.answers.as_slice(), "rotation {}", turns * 90);
        }
    }

    #[test]
    fn tilted_off_axis_photograph_reads_the_same() {
        let (spec, img) = sheet("OPTI2024", cycling(60, 1));
        // Wide margin so the turned corners stay inside the photograph.
        let photo = place_on_canvas(&[img], 250);
        let scanner = scanner();

        for (degrees, keystone) in [(-10.0, 0.02), (-10.0, 0.0), (8.0, 0.015)] {
            let skewed = tilt(&photo, degrees, keystone).unwrap();
            let result = scanner.scan(skewed, ScanRequest::new(1, 60)).unwrap();
            assert!(result.diagnostics().is_empty(), "{degrees} degrees");
            let paper = &result.papers()[0];
            assert_eq!(paper.test_id(), "OPTI2", "{degrees} degrees");
            assert_eq!(paper.paper_id(), "024", "{degrees} degrees");
            assert_eq!(paper.answers(), spec.answers.as_slice(), "{degrees} degrees");
        }
    }

    #[test]
    fn two_sheets_in_one_photograph() {
        let (left_spec, left) = sheet("PHYS1001", cycling(30, 1));
        let (right_spec, right) = sheet("PHYS1002", cycling(30, 4));
        let photo = place_on_canvas(&[left, right], MARGIN);

        let result = scanner().scan(photo, ScanRequest::new(2, 30)).unwrap();
        assert!(result.diagnostics().is_empty());
        let papers = result.papers();
        assert_eq!(papers.len(), 2);
        // Equal areas keep discovery order: the left sheet is found first.
        assert_eq!(papers[0].paper_id(), "001");
        assert_eq!(papers[0].answers(), left_spec.answers.as_slice());
        assert_eq!(papers[1].paper_id(), "002");
        assert_eq!(papers[1].answers(), right_spec.answers.as_slice());
        assert_eq!(papers[1].index(), 1);
    }

    #[test]
    fn shortfall_is_reported_not_fatal() {
        let (_, a) = sheet("HIST3001", cycling(10, 0));
        let (_, b) = sheet("HIST3002", cycling(10, 2));
        let photo = place_on_canvas(&[a, b], MARGIN);

        let result = scanner().scan(photo, ScanRequest::new(3, 10)).unwrap();
        assert_eq!(result.papers().len(), 2);
        assert_eq!(
            result.diagnostics().iter().collect::<Vec<_>>(),
            vec![&Note::PapersMissing { missing: 1 }]
        );
        assert_eq!(result.report().diagnostics, vec!["1 paper(s) not detected."]);
    }

    #[test]
    fn blank_photograph_has_no_papers() {
        let blank = GrayImage::from_pixel(400, 300, Luma([240]));
        let result = scanner().scan(blank, ScanRequest::new(2, 10)).unwrap();
        assert!(result.papers().is_empty());
        assert_eq!(result.report().diagnostics, vec!["2 paper(s) not detected."]);
    }

    #[test]
    fn identical_input_gives_identical_json() {
        let (_, img) = sheet("ECON5555", cycling(60, 2));
        let photo = place_on_canvas(&[img], MARGIN);
        let scanner = scanner();

        let first = scanner.scan(photo.clone(), ScanRequest::new(1, 60)).unwrap();
        let second = scanner.scan(photo, ScanRequest::new(1, 60)).unwrap();
        let first_json = first.report().to_json().unwrap();
        assert_eq!(first_json, second.report().to_json().unwrap());
        assert_eq!(first.digest().len(), 64);
    }

    #[test]
    fn images_are_dropped_unless_retained() {
        let (_, img) = sheet("ART00001", cycling(5, 0));
        let photo = place_on_canvas(&[img], MARGIN);

        let dropped = scanner().scan(photo.clone(), ScanRequest::new(1, 5)).unwrap();
        assert!(dropped.papers()[0].raw().is_none());

        let kept = scanner()
            .retain_images(true)
            .scan(photo, ScanRequest::new(1, 5))
            .unwrap();
        let paper = &kept.papers()[0];
        assert_eq!(paper.raw().map(|r| r.dimensions()), Some((875, 1240)));
        assert_eq!(paper.binary().map(|b| b.dimensions()), Some((875, 1240)));
        assert_eq!(kept.binary().dimensions(), kept.raw().dimensions());
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let img = GrayImage::from_pixel(50, 50, Luma([255]));
        let scanner = scanner();
        assert!(matches!(
            scanner.scan(img.clone(), ScanRequest::new(0, 10)),
            Err(MarkscanError::InvalidRequest(_))
        ));
        assert!(matches!(
            scanner.scan(img, ScanRequest::new(1, 61)),
            Err(MarkscanError::InvalidRequest(_))
        ));
        assert!(matches!(
            scanner.scan(GrayImage::new(0, 0), ScanRequest::new(1, 10)),
            Err(MarkscanError::EmptyImage { .. })
        ));
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let mut profile = CalibrationProfile::default();
        profile.grid.rows = 0;
        assert!(matches!(
            SheetScanner::new(profile),
            Err(MarkscanError::InvalidProfile(_))
        ));

        let mut profile = CalibrationProfile::default();
        profile.rectify.template_corners =
            [[0.0, 0.0], [50.0, 50.0], [100.0, 100.0], [150.0, 150.0]];
        assert!(matches!(
            SheetScanner::new(profile),
            Err(MarkscanError::InvalidProfile(_))
        ));
    }

    #[test]
    fn encoded_photographs_are_decoded_first() {
        let (_, img) = sheet("LANG4040", cycling(8, 1));
        let photo = place_on_canvas(&[img], MARGIN);
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(photo)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let result = scanner().scan_bytes(&png, ScanRequest::new(1, 8)).unwrap();
        assert_eq!(result.papers()[0].test_id(), "LANG4");

        assert!(matches!(
            scanner().scan_bytes(b"not an image", ScanRequest::new(1, 8)),
            Err(MarkscanError::ImageDecode(_))
        ));
    }

    #[test]
    fn many_photographs_keep_input_order() {
        let photos: Vec<GrayImage> = ["MANY1001", "MANY1002", "MANY1003"]
            .iter()
            .map(|payload| place_on_canvas(&[sheet(payload, cycling(4, 0)).1], MARGIN))
            .collect();

        let results = scanner().scan_many(photos, ScanRequest::new(1, 4));
        let ids: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().papers()[0].paper_id().to_owned())
            .collect();
        assert_eq!(ids, ["001", "002", "003"]);
    }

    #[test]
    fn multi_strategy_reads_blank_questions() {
        let mut answers = cycling(12, 0);
        answers[3] = MarkedOptions::none();
        answers[7] = MarkedOptions::none();
        let (spec, img) = sheet("MULT0001", answers);
        let photo = place_on_canvas(&[img], MARGIN);

        let mut profile = CalibrationProfile::default();
        profile.marks.strategy = MarkStrategyKind::Multi;
        let scanner = SheetScanner::new(profile.clone())
            .unwrap()
            .with_decoder(DotCodeDecoder);
        let result = scanner.scan(photo.clone(), ScanRequest::new(1, 12)).unwrap();
        assert_eq!(result.papers()[0].answers(), spec.answers.as_slice());

        // The same rule injected directly behaves identically.
        let injected = SheetScanner::new(CalibrationProfile::default())
            .unwrap()
            .with_detector(Box::new(MultiMark::new(&profile.marks)));
        let result = injected.scan(photo, ScanRequest::new(1, 12)).unwrap();
        assert_eq!(result.papers()[0].answers(), spec.answers.as_slice());
    }
}
