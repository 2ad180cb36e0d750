// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper rectification: orientation from the printed calibration mark, then a
// projective warp of the photograph onto the canonical template.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use markscan_core::error::{MarkscanError, Result};
use markscan_core::profile::RectifyParams;
use tracing::{debug, instrument};

use super::quad::{Quad, Vertex};
use crate::raster::IntegralImage;

/// Warps located quadrilaterals onto the canonical paper.
#[derive(Debug, Clone)]
pub struct PaperRectifier {
    params: RectifyParams,
    template_winding: f64,
}

impl PaperRectifier {
    /// Fails when the template corners enclose no area.
    pub fn new(params: &RectifyParams) -> Result<Self> {
        let template = Quad::new(params.template_corners.map(|[x, y]| (x, y)));
        let template_winding = template.signed_area();
        if template_winding.abs() < 1.0 {
            return Err(MarkscanError::InvalidProfile(
                "rectify.template_corners are degenerate".into(),
            ));
        }
        Ok(Self {
            params: params.clone(),
            template_winding,
        })
    }

    /// Canonical output size `(width, height)`.
    pub fn paper_size(&self) -> (u32, u32) {
        (self.params.paper_width, self.params.paper_height)
    }

    /// Reorder a located quadrilateral to run the same way as the template.
    pub fn normalise(&self, quad: &Quad) -> Quad {
        quad.with_winding_of(self.template_winding)
    }

    /// Calibration points just beyond each edge.
    ///
    /// Point `i` lies on the line joining the midpoint of edge `i + 2` to the
    /// midpoint of edge `i`, `ref_point_ratio` midline lengths from the
    /// former, i.e. slightly outside edge `i`.
    pub fn reference_points(&self, quad: &Quad) -> [Vertex; 4] {
        let ratio = self.params.ref_point_ratio;
        std::array::from_fn(|i| {
            let near = quad.edge_midpoint(i);
            let far = quad.edge_midpoint(i + 2);
            (
                far.0 + ratio * (near.0 - far.0),
                far.1 + ratio * (near.1 - far.1),
            )
        })
    }

    /// Half-width of the square sampling window around a reference point.
    pub fn window_half_width(&self, quad: &Quad) -> f32 {
        self.params.ref_point_range * quad.mean_edge_length()
    }

    /// Raw intensity sums of the four reference windows.
    ///
    /// Pixels outside the photograph count as white.
    pub fn reference_sums(&self, raw: &IntegralImage, quad: &Quad) -> [u64; 4] {
        let half = self.window_half_width(quad);
        let points = self.reference_points(quad);
        points.map(|(x, y)| {
            raw.padded_sum(
                (x - half).floor() as i64,
                (y - half).floor() as i64,
                (x + half).floor() as i64,
                (y + half).floor() as i64,
                255,
            )
        })
    }

    /// Index of the edge carrying the orientation mark (the darkest window;
    /// the lowest index wins ties).
    pub fn orientation(&self, raw: &IntegralImage, quad: &Quad) -> usize {
        let sums = self.reference_sums(raw, quad);
        let mut best = 0;
        for (i, &sum) in sums.iter().enumerate().skip(1) {
            if sum < sums[best] {
                best = i;
            }
        }
        debug!(?sums, edge = best, "Orientation mark located");
        best
    }

    /// Vertices of `quad` in template corner order.
    ///
    /// The marked edge runs from vertex `r` to vertex `r + 1`; vertex
    /// `r + 1` becomes template corner 0 and vertex `r` template corner 3.
    pub fn canonical_corners(&self, raw: &IntegralImage, quad: &Quad) -> [Vertex; 4] {
        let quad = self.normalise(quad);
        let r = self.orientation(raw, &quad);
        let v = quad.vertices();
        [v[(r + 1) % 4], v[(r + 2) % 4], v[(r + 3) % 4], v[r]]
    }

    /// Resample the photograph into a canonical paper image.
    ///
    /// `integral` must be the summed-area table of `raw`.
    #[instrument(skip_all, fields(area = quad.area()))]
    pub fn rectify(&self, raw: &GrayImage, integral: &IntegralImage, quad: &Quad) -> Result<GrayImage> {
        let src = self.canonical_corners(integral, quad);
        let corners = &self.params.template_corners;
        let dst: [Vertex; 4] = std::array::from_fn(|i| (corners[i][0], corners[i][1]));

        let projection = Projection::from_control_points(src, dst).ok_or_else(|| {
            MarkscanError::Geometry(format!(
                "no projective transform maps {:?} onto the template",
                src
            ))
        })?;

        let (width, height) = self.paper_size();
        let mut output = GrayImage::new(width, height);
        warp_into(
            raw,
            &projection,
            Interpolation::Bilinear,
            Luma([255u8]),
            &mut output,
        );

        debug!(width, height, "Paper rectified");
        Ok(output)
    }
}
