// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral geometry shared by the locator and the rectifier.

use imageproc::geometry::oriented_contour_area;
use imageproc::point::Point;

/// A point in image coordinates (x right, y down).
pub type Vertex = (f32, f32);

/// Four vertices in contour order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    vertices: [Vertex; 4],
}

impl Quad {
    pub fn new(vertices: [Vertex; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vertex; 4] {
        &self.vertices
    }

    /// Signed shoelace area. With y pointing down, a negative value means the
    /// vertices run counter-clockwise on screen.
    pub fn signed_area(&self) -> f64 {
        oriented_contour_area(&self.vertices.map(|(x, y)| Point::new(x, y)))
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Strictly convex: every corner turns the same way and none is flat.
    pub fn is_convex(&self) -> bool {
        let v = &self.vertices;
        let mut sign = 0.0f64;
        for i in 0..4 {
            let a = v[i];
            let b = v[(i + 1) % 4];
            let c = v[(i + 2) % 4];
            let cross = (b.0 - a.0) as f64 * (c.1 - b.1) as f64
                - (b.1 - a.1) as f64 * (c.0 - b.0) as f64;
            if cross == 0.0 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Same corners traversed in the opposite direction, keeping vertex 0.
    pub fn reversed(&self) -> Self {
        let [a, b, c, d] = self.vertices;
        Self::new([a, d, c, b])
    }

    /// Reorder so the signed area has the same sign as `reference`.
    pub fn with_winding_of(self, reference: f64) -> Self {
        if self.signed_area().signum() == reference.signum() {
            self
        } else {
            self.reversed()
        }
    }

    /// Midpoint of edge `i`, running from vertex `i` to vertex `i + 1`.
    pub fn edge_midpoint(&self, i: usize) -> Vertex {
        let a = self.vertices[i % 4];
        let b = self.vertices[(i + 1) % 4];
        ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
    }

    pub fn mean_edge_length(&self) -> f32 {
        (0..4)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % 4];
                ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
            })
            .sum::<f32>()
            / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Quad {
        Quad::new([(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)])
    }

    #[test]
    fn shoelace_area_rectangle() {
        let area = rect().area();
        assert!((area - 50.0).abs() < 1e-9, "Expected 50.0, got {}", area);
    }

    #[test]
    fn signed_area_of_irregular_quad() {
        let quad = Quad::new([(3.0, 4.0), (5.0, 11.0), (12.0, 8.0), (9.0, 5.0)]);
        assert!((quad.signed_area() + 35.0).abs() < 1e-9);
        assert!((quad.reversed().signed_area() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_flips_winding_only() {
        let quad = rect();
        let reversed = quad.reversed();
        assert_eq!(reversed.vertices()[0], quad.vertices()[0]);
        assert!(quad.signed_area() > 0.0);
        assert!(reversed.signed_area() < 0.0);
        assert_eq!(quad.with_winding_of(-1.0), reversed);
        assert_eq!(quad.with_winding_of(1.0), quad);
    }

    #[test]
    fn convexity() {
        assert!(rect().is_convex());
        assert!(rect().reversed().is_convex());

        let dart = Quad::new([(0.0, 0.0), (10.0, 0.0), (2.0, 2.0), (0.0, 10.0)]);
        assert!(!dart.is_convex());

        let flat = Quad::new([(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        assert!(!flat.is_convex());
    }

    #[test]
    fn midpoints_and_edge_length() {
        let quad = rect();
        assert_eq!(quad.edge_midpoint(0), (5.0, 0.0));
        assert_eq!(quad.edge_midpoint(3), (0.0, 2.5));
        assert!((quad.mean_edge_length() - 7.5).abs() < 1e-6);
    }
}
