// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic answer sheets for tests, benchmarks and calibration checks.
//
// A rendered sheet follows a profile's geometry: a table frame whose outer
// corners are the template corners, cell borders along the grid, one row of
// bubbles per question, the solid orientation mark beside the marked edge
// and a dot code carrying the identifier payload in the barcode region.
// Sheets are pasted onto a white backdrop, so the table frame is the only
// paper-sized contour in a photograph.

use std::time::Duration;

use image::{GrayImage, Luma, imageops};
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use markscan_core::CalibrationProfile;
use markscan_core::error::Result;
use markscan_core::profile::{MarkParams, Region};
use markscan_core::types::MarkedOptions;

use crate::barcode::{BarcodeDecoder, DecodeOutcome};
use crate::raster::INK;
use crate::scan::{GridSegmenter, SlotLayout};

/// Thickness of the outer table frame.
pub const FRAME_THICKNESS: u32 = 6;
/// Thickness of the cell border lines.
pub const LINE_THICKNESS: u32 = 2;
/// Radius of a printed bubble.
pub const BUBBLE_RADIUS: i64 = 10;
/// Distance from the top of a cell's content to its bubble centres.
pub const BUBBLE_OFFSET: u32 = 18;
/// Size of the orientation mark.
pub const MARK_SIZE: (u32, u32) = (40, 60);
/// Maximum payload length of the dot code.
pub const DOT_CODE_CAPACITY: usize = 8;

const WHITE: u8 = 255;
const PRINT: u8 = 0;
const PENCIL: u8 = 30;
const DOT_PITCH: u32 = 12;
const DOT_SIZE: u32 = 6;
const DOT_INSET: u32 = 3;
const DOT_MARGIN: u32 = 2;

/// Content of one synthetic paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSpec {
    /// Identifier payload (ASCII, at most [`DOT_CODE_CAPACITY`] bytes). An
    /// empty payload prints no dot code.
    pub payload: String,
    /// Options to pencil in, one entry per question.
    pub answers: Vec<MarkedOptions>,
}

impl SheetSpec {
    pub fn new(payload: impl Into<String>, answers: Vec<MarkedOptions>) -> Self {
        Self {
            payload: payload.into(),
            answers,
        }
    }

    /// Render the canonical paper image for `profile`.
    pub fn render(&self, profile: &CalibrationProfile) -> Result<GrayImage> {
        let rectify = &profile.rectify;
        let mut sheet = GrayImage::from_pixel(rectify.paper_width, rectify.paper_height, Luma([WHITE]));
        let frame = Frame::from_corners(&rectify.template_corners);
        let segmenter = GridSegmenter::new(&profile.grid)?;

        draw_table(&mut sheet, profile, &segmenter, &frame);
        draw_orientation_mark(&mut sheet, profile);
        draw_dot_code(&mut sheet, &profile.barcode.region, &self.payload);

        for (question, marked) in self.answers.iter().enumerate().take(profile.capacity()) {
            let cell = content_box(profile, &segmenter, &frame, question);
            draw_bubbles(&mut sheet, &cell, &profile.marks, marked);
        }
        Ok(sheet)
    }
}

/// Paste sheets side by side on a white photograph, `margin` pixels apart.
pub fn place_on_canvas(sheets: &[GrayImage], margin: u32) -> GrayImage {
    let width = margin + sheets.iter().map(|s| s.width() + margin).sum::<u32>();
    let height = sheets.iter().map(GrayImage::height).max().unwrap_or(0) + 2 * margin;
    let mut canvas = GrayImage::from_pixel(width, height, Luma([WHITE]));

    let mut x = margin;
    for sheet in sheets {
        imageops::replace(&mut canvas, sheet, x as i64, margin as i64);
        x += sheet.width() + margin;
    }
    canvas
}

/// Rotate clockwise by `quarter_turns` right angles.
pub fn rotate(img: &GrayImage, quarter_turns: u32) -> GrayImage {
    match quarter_turns % 4 {
        0 => img.clone(),
        1 => imageops::rotate90(img),
        2 => imageops::rotate180(img),
        _ => imageops::rotate270(img),
    }
}

/// Turn a photograph by `degrees` about its centre and pull the top corners
/// inwards by `keystone` of the width, as a camera held slightly off-axis
/// would. The size is kept; uncovered pixels are white.
pub fn tilt(img: &GrayImage, degrees: f32, keystone: f32) -> Option<GrayImage> {
    let (w, h) = (img.width() as f32, img.height() as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let pull = keystone * w;

    let from = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let shifted = [(pull, 0.0), (w - pull, 0.0), (w, h), (0.0, h)];
    let to = shifted.map(|(x, y)| {
        let (dx, dy) = (x - cx, y - cy);
        (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
    });

    let projection = Projection::from_control_points(from, to)?;
    Some(warp(img, &projection, Interpolation::Bilinear, Luma([WHITE])))
}

/// Reads the dot code printed by [`SheetSpec::render`].
///
/// Row `i` of the code holds payload byte `i`, most significant bit on the
/// left; an all-blank row ends the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotCodeDecoder;

impl BarcodeDecoder for DotCodeDecoder {
    fn decode(&self, region: &GrayImage, _timeout: Duration) -> DecodeOutcome {
        let (w, h) = region.dimensions();
        let mut payload = String::new();

        for row in 0..DOT_CODE_CAPACITY as u32 {
            let mut byte = 0u8;
            for bit in 0..8 {
                let (x, y) = dot_origin(bit, row);
                let (cx, cy) = (x + DOT_INSET + DOT_SIZE / 2, y + DOT_INSET + DOT_SIZE / 2);
                if cx < w && cy < h && region.get_pixel(cx, cy).0[0] == INK {
                    byte |= 0x80 >> bit;
                }
            }
            if byte == 0 {
                break;
            }
            payload.push(byte as char);
        }

        if payload.is_empty() {
            DecodeOutcome::Unreadable("no dot code found".into())
        } else {
            DecodeOutcome::Decoded(payload)
        }
    }
}

/// Inclusive pixel bounds of the table frame.
struct Frame {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Frame {
    fn from_corners(corners: &[[f32; 2]; 4]) -> Self {
        let xs = corners.map(|c| c[0].round().max(0.0) as u32);
        let ys = corners.map(|c| c[1].round().max(0.0) as u32);
        Self {
            left: xs.iter().copied().min().unwrap_or(0),
            top: ys.iter().copied().min().unwrap_or(0),
            right: xs.iter().copied().max().unwrap_or(0),
            bottom: ys.iter().copied().max().unwrap_or(0),
        }
    }
}

/// Half-open content rectangle of one cell, inside its border lines.
struct Cell {
    left: u32,
    top: u32,
    right: u32,
}

fn content_box(
    profile: &CalibrationProfile,
    segmenter: &GridSegmenter,
    frame: &Frame,
    question: usize,
) -> Cell {
    let rows = profile.grid.rows as usize;
    let column = question / rows;
    let row = (question % rows) as u32;
    let [l, r] = profile.grid.column_bounds[column];

    Cell {
        left: (l + LINE_THICKNESS).max(frame.left + FRAME_THICKNESS),
        top: (segmenter.row_boundary(row) + LINE_THICKNESS).max(frame.top + FRAME_THICKNESS),
        right: (r - 1).min(frame.right + 1 - FRAME_THICKNESS),
    }
}

fn draw_table(sheet: &mut GrayImage, profile: &CalibrationProfile, segmenter: &GridSegmenter, f: &Frame) {
    let t = FRAME_THICKNESS;
    let (x_end, y_end) = (f.right + 1, f.bottom + 1);
    fill(sheet, f.left, f.top, x_end, f.top + t, PRINT);
    fill(sheet, f.left, y_end - t, x_end, y_end, PRINT);
    fill(sheet, f.left, f.top, f.left + t, y_end, PRINT);
    fill(sheet, x_end - t, f.top, x_end, y_end, PRINT);

    for row in 1..profile.grid.rows {
        let y = segmenter.row_boundary(row);
        fill(sheet, f.left, y, x_end, y + LINE_THICKNESS, PRINT);
    }
    for &[l, r] in &profile.grid.column_bounds {
        fill(sheet, l, f.top, l + LINE_THICKNESS, y_end, PRINT);
        fill(sheet, r - 1, f.top, r + 1, y_end, PRINT);
    }
}

/// Solid block over the reference point beyond the marked edge, which runs
/// from template corner 3 to template corner 0.
fn draw_orientation_mark(sheet: &mut GrayImage, profile: &CalibrationProfile) {
    let c = &profile.rectify.template_corners;
    let ratio = profile.rectify.ref_point_ratio;
    let near = [(c[3][0] + c[0][0]) / 2.0, (c[3][1] + c[0][1]) / 2.0];
    let far = [(c[1][0] + c[2][0]) / 2.0, (c[1][1] + c[2][1]) / 2.0];
    let cx = far[0] + ratio * (near[0] - far[0]);
    let cy = far[1] + ratio * (near[1] - far[1]);

    let (w, h) = MARK_SIZE;
    let x0 = (cx - w as f32 / 2.0).round().max(0.0) as u32;
    let y0 = (cy - h as f32 / 2.0).round().max(0.0) as u32;
    fill(sheet, x0, y0, x0 + w, y0 + h, PRINT);
}

fn draw_dot_code(sheet: &mut GrayImage, region: &Region, payload: &str) {
    for (row, byte) in payload.bytes().take(DOT_CODE_CAPACITY).enumerate() {
        for bit in 0..8 {
            if byte & (0x80 >> bit) == 0 {
                continue;
            }
            let (x, y) = dot_origin(bit, row as u32);
            let (x, y) = (region.x + x + DOT_INSET, region.y + y + DOT_INSET);
            fill(sheet, x, y, x + DOT_SIZE, y + DOT_SIZE, PRINT);
        }
    }
}

/// Top-left corner of a dot cell, relative to the barcode region.
fn dot_origin(bit: u32, row: u32) -> (u32, u32) {
    (DOT_MARGIN + DOT_PITCH * bit, DOT_MARGIN + DOT_PITCH * row)
}

fn draw_bubbles(sheet: &mut GrayImage, cell: &Cell, marks: &MarkParams, marked: &MarkedOptions) {
    let layout = SlotLayout {
        option_count: marks.option_count,
        side_margin: marks.side_margin,
    };
    let Some(slots) = layout.slots(cell.right.saturating_sub(cell.left)) else {
        return;
    };
    let cy = (cell.top + BUBBLE_OFFSET) as i64;
    for (option, (x0, x1)) in slots.into_iter().enumerate() {
        let cx = (cell.left + (x0 + x1) / 2) as i64;
        if marked.contains(option) {
            draw_disc(sheet, cx, cy, PENCIL);
        } else {
            draw_ring(sheet, cx, cy, PRINT);
        }
    }
}

fn draw_disc(sheet: &mut GrayImage, cx: i64, cy: i64, value: u8) {
    let r = BUBBLE_RADIUS;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put(sheet, cx + dx, cy + dy, value);
            }
        }
    }
}

fn draw_ring(sheet: &mut GrayImage, cx: i64, cy: i64, value: u8) {
    let r = BUBBLE_RADIUS;
    for dy in -r..=r {
        for dx in -r..=r {
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            if (d - r as f64).abs() < 0.5 {
                put(sheet, cx + dx, cy + dy, value);
            }
        }
    }
}

fn put(sheet: &mut GrayImage, x: i64, y: i64, value: u8) {
    if x >= 0 && y >= 0 && (x as u32) < sheet.width() && (y as u32) < sheet.height() {
        sheet.put_pixel(x as u32, y as u32, Luma([value]));
    }
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the sheet.
fn fill(sheet: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
    for y in y0..y1.min(sheet.height()) {
        for x in x0..x1.min(sheet.width()) {
            sheet.put_pixel(x, y, Luma([value]));
        }
    }
}
