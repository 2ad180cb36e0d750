// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster helpers: decoding photographs, bounds-clamped cropping and
// fingerprinting of source rasters.

use image::GrayImage;
use image::imageops;
use markscan_core::error::{MarkscanError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Decode encoded image bytes (JPEG, PNG, ...) into a grayscale raster.
///
/// A zero-area image is a malformed input and is rejected.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_gray(data: &[u8]) -> Result<GrayImage> {
    let img = image::load_from_memory(data).map_err(|err| {
        MarkscanError::ImageDecode(format!("failed to decode photograph: {}", err))
    })?;
    let gray = img.to_luma8();
    ensure_not_empty(&gray)?;
    debug!(
        width = gray.width(),
        height = gray.height(),
        "Photograph decoded from bytes"
    );
    Ok(gray)
}

/// Reject rasters without pixels.
pub fn ensure_not_empty(img: &GrayImage) -> Result<()> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(MarkscanError::EmptyImage { width, height });
    }
    Ok(())
}

/// Crop a rectangle, clamping it to the image bounds.
///
/// A rectangle lying entirely outside the image yields an empty raster.
pub fn crop_clamped(img: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    let (img_w, img_h) = img.dimensions();
    if x >= img_w || y >= img_h {
        return GrayImage::new(0, 0);
    }
    let safe_w = width.min(img_w - x);
    let safe_h = height.min(img_h - y);
    imageops::crop_imm(img, x, y, safe_w, safe_h).to_image()
}

/// Lowercase hex SHA-256 of a raster's dimensions and pixels.
pub fn raster_digest(img: &GrayImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_le_bytes());
    hasher.update(img.height().to_le_bytes());
    hasher.update(img.as_raw());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_bytes(img: GrayImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn decodes_png_to_gray() {
        let bytes = png_bytes(GrayImage::from_pixel(12, 7, Luma([99])));
        let gray = decode_gray(&bytes).unwrap();
        assert_eq!(gray.dimensions(), (12, 7));
        assert_eq!(gray.get_pixel(3, 3).0[0], 99);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = decode_gray(b"definitely not an image");
        assert!(matches!(result, Err(MarkscanError::ImageDecode(_))));
    }

    #[test]
    fn empty_raster_is_rejected() {
        let result = ensure_not_empty(&GrayImage::new(0, 10));
        assert!(matches!(
            result,
            Err(MarkscanError::EmptyImage {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn crop_is_clamped_to_bounds() {
        let img = GrayImage::from_fn(10, 10, |x, y| Luma([(x + 10 * y) as u8]));
        let crop = crop_clamped(&img, 8, 7, 5, 5);
        assert_eq!(crop.dimensions(), (2, 3));
        assert_eq!(crop.get_pixel(0, 0).0[0], 78);

        assert_eq!(crop_clamped(&img, 10, 0, 3, 3).dimensions(), (0, 0));
    }

    #[test]
    fn digest_depends_on_shape_and_pixels() {
        let a = GrayImage::from_pixel(4, 2, Luma([1]));
        let b = GrayImage::from_pixel(2, 4, Luma([1]));
        let mut c = a.clone();
        c.put_pixel(0, 0, Luma([2]));

        assert_eq!(raster_digest(&a), raster_digest(&a.clone()));
        assert_ne!(raster_digest(&a), raster_digest(&b));
        assert_ne!(raster_digest(&a), raster_digest(&c));
        assert_eq!(raster_digest(&a).len(), 64);
    }
}
