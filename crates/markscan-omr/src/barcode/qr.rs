// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR symbol decoding with the pure-Rust `rqrr` crate, for sheets that print
// their identifiers as QR codes.

use std::time::Duration;

use image::GrayImage;
use tracing::{debug, instrument};

use super::{BarcodeDecoder, DecodeOutcome};
use crate::raster::INK;

/// Decodes the first readable QR symbol in the region.
///
/// `rqrr` has no cancellation hook; wrap it in [`super::Deadline`] to bound
/// its running time.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl BarcodeDecoder for QrDecoder {
    #[instrument(skip_all, fields(width = region.width(), height = region.height()))]
    fn decode(&self, region: &GrayImage, _timeout: Duration) -> DecodeOutcome {
        let (w, h) = region.dimensions();
        // rqrr expects dark modules as low values; binarized ink is 255.
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
                INK - region.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        debug!(grids = grids.len(), "QR grids detected");
        if grids.is_empty() {
            return DecodeOutcome::Unreadable("no QR symbol found".into());
        }

        let mut last_error = String::new();
        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => return DecodeOutcome::Decoded(content),
                Err(err) => last_error = format!("{err:?}"),
            }
        }
        DecodeOutcome::Unreadable(format!("QR symbol could not be decoded: {last_error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_region_is_unreadable() {
        let outcome = QrDecoder.decode(&GrayImage::new(100, 100), Duration::from_secs(1));
        assert!(matches!(outcome, DecodeOutcome::Unreadable(_)));
    }
}
