// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the markscan-omr pipeline, run on a synthetic
// photograph holding one classic 60-question sheet.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::GrayImage;

use markscan_core::{CalibrationProfile, MarkedOptions, ScanRequest};
use markscan_omr::SheetScanner;
use markscan_omr::raster::{Binarizer, IntegralImage};
use markscan_omr::scan::{PaperLocator, PaperRectifier};
use markscan_omr::synthetic::{DotCodeDecoder, SheetSpec, place_on_canvas};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn photograph(profile: &CalibrationProfile) -> Option<GrayImage> {
    let answers = (0..60).map(|q| MarkedOptions::single(q % 5)).collect();
    let sheet = SheetSpec::new("BENCH001", answers).render(profile).ok()?;
    Some(place_on_canvas(&[sheet], 60))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Binarize, locate the single paper and warp it onto the template.
fn bench_locate_and_rectify(c: &mut Criterion) {
    let profile = CalibrationProfile::default();
    let (Some(photo), Ok(rectifier)) = (photograph(&profile), PaperRectifier::new(&profile.rectify)) else {
        return;
    };
    let binarizer = Binarizer::new(&profile.binarize);
    let locator = PaperLocator::new(&profile.locate);

    c.bench_function("locate_and_rectify (one sheet)", |b| {
        b.iter(|| {
            let integral = IntegralImage::new(black_box(&photo));
            let binary = binarizer.binarize_with(&photo, &integral);
            let selection = locator.locate(&binary, 1);
            for candidate in &selection.accepted {
                black_box(rectifier.rectify(&photo, &integral, &candidate.quad).ok());
            }
        });
    });
}

/// Whole photograph to report, including identifiers and 60 answers.
fn bench_full_scan(c: &mut Criterion) {
    let profile = CalibrationProfile::default();
    let Some(photo) = photograph(&profile) else {
        return;
    };
    let Ok(scanner) = SheetScanner::new(profile) else {
        return;
    };
    let scanner = scanner.with_decoder(DotCodeDecoder);

    c.bench_function("full_scan (one sheet, 60 questions)", |b| {
        b.iter(|| {
            let result = scanner.scan(black_box(photo.clone()), ScanRequest::new(1, 60));
            black_box(result.map(|p| p.report()).ok());
        });
    });
}

criterion_group!(benches, bench_locate_and_rectify, bench_full_scan);
criterion_main!(benches);
