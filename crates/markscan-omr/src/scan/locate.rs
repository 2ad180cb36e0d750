// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper location: convex quadrilateral contours in the binarized photograph,
// selected largest-first under a size-consistency rule.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;
use markscan_core::profile::LocateParams;
use tracing::{debug, info, instrument, trace};

use super::quad::Quad;

/// A convex quadrilateral found in the photograph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub quad: Quad,
    pub area: f64,
}

/// Outcome of paper selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Accepted candidates, largest first. Never longer than the request.
    pub accepted: Vec<Candidate>,
    /// Requested papers that could not be matched to a candidate.
    pub missing: usize,
}

/// Finds paper boundaries in a binarized photograph.
#[derive(Debug, Clone, Copy)]
pub struct PaperLocator {
    poly_epsilon: f64,
    size_consistency: f64,
}

impl PaperLocator {
    pub fn new(params: &LocateParams) -> Self {
        Self {
            poly_epsilon: params.poly_epsilon,
            size_consistency: params.size_consistency,
        }
    }

    /// Locate up to `requested` papers.
    #[instrument(skip(self, binary), fields(width = binary.width(), height = binary.height()))]
    pub fn locate(&self, binary: &GrayImage, requested: usize) -> Selection {
        let candidates = self.candidates(binary);
        let selection = self.select(candidates, requested);
        info!(
            requested,
            accepted = selection.accepted.len(),
            missing = selection.missing,
            "Paper location complete"
        );
        selection
    }

    /// Every convex quadrilateral contour, stable-sorted by area descending.
    ///
    /// Outer and hole borders are both considered. Candidates of equal area
    /// keep their contour discovery order.
    pub fn candidates(&self, binary: &GrayImage) -> Vec<Candidate> {
        let contours = find_contours::<i32>(binary);
        let mut candidates = Vec::new();

        for contour in &contours {
            if contour.points.len() < 4 {
                continue;
            }
            let polygon = approximate_closed(&contour.points, self.poly_epsilon);
            if polygon.len() != 4 {
                continue;
            }
            let quad = Quad::new([
                (polygon[0].x as f32, polygon[0].y as f32),
                (polygon[1].x as f32, polygon[1].y as f32),
                (polygon[2].x as f32, polygon[2].y as f32),
                (polygon[3].x as f32, polygon[3].y as f32),
            ]);
            if !quad.is_convex() {
                continue;
            }
            let area = quad.area();
            trace!(area, vertices = ?quad.vertices(), "Quadrilateral contour");
            candidates.push(Candidate { quad, area });
        }

        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
        debug!(
            contours = contours.len(),
            quads = candidates.len(),
            "Candidate quadrilaterals collected"
        );
        candidates
    }

    /// Apply the size-consistency rule to candidates sorted largest first.
    ///
    /// Rank `i` is accepted while its area is at least `size_consistency`
    /// times the second-largest area (the largest when only one exists). The
    /// first rejection, or running out of candidates, ends selection.
    pub fn select(&self, candidates: Vec<Candidate>, requested: usize) -> Selection {
        let reference = candidates
            .get(1)
            .or_else(|| candidates.first())
            .map(|c| c.area)
            .unwrap_or(0.0);
        let min_area = self.size_consistency * reference;

        let mut accepted = Vec::with_capacity(requested.min(candidates.len()));
        for candidate in candidates.into_iter().take(requested) {
            if candidate.area < min_area {
                debug!(
                    rank = accepted.len(),
                    area = candidate.area,
                    min_area,
                    "Candidate rejected by size consistency"
                );
                break;
            }
            accepted.push(candidate);
        }

        Selection {
            missing: requested - accepted.len(),
            accepted,
        }
    }
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The contour is split between two mutually distant points: `a`, farthest
/// from the first point, and `b`, farthest from `a`. Both lie on the convex
/// hull, so each arc between them is simplified as an open chain and the
/// traversal start never becomes a forced vertex.
fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (i, j) = (a.min(b), a.max(b));

    let mut polygon = approximate_polygon_dp(&points[i..=j], epsilon, false);
    let mut wrap = points[j..].to_vec();
    wrap.extend_from_slice(&points[..=i]);
    let closing = approximate_polygon_dp(&wrap, epsilon, false);

    // Each arc ends where the other begins.
    polygon.pop();
    polygon.extend(closing);
    polygon.pop();
    polygon
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let dx = (p.x - origin.x) as i64;
            let dy = (p.y - origin.y) as i64;
            dx * dx + dy * dy
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
