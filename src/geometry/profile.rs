// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 2D profiles for extrusion

use nalgebra::Point2;
use std::f64::consts::PI;

/// Closed simple polygon in the XY plane
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub points: Vec<Point2<f64>>,
}

impl Profile {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    pub fn from_pairs(points: &[[f64; 2]]) -> Self {
        Self::new(points.iter().map(|p| Point2::new(p[0], p[1])).collect())
    }

    pub fn circle(radius: f64, segments: u32) -> Self {
        let segments = segments.max(3);
        Self::new(
            (0..segments)
                .map(|i| {
                    let angle = 2.0 * PI * i as f64 / segments as f64;
                    Point2::new(radius * angle.cos(), radius * angle.sin())
                })
                .collect(),
        )
    }

    pub fn square(width: f64, depth: f64, center: bool) -> Self {
        let (x0, y0) = if center {
            (-width / 2.0, -depth / 2.0)
        } else {
            (0.0, 0.0)
        };
        Self::new(vec![
            Point2::new(x0, y0),
            Point2::new(x0 + width, y0),
            Point2::new(x0 + width, y0 + depth),
            Point2::new(x0, y0 + depth),
        ])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for counter-clockwise winding
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            / 2.0
    }

    /// Same polygon with counter-clockwise winding
    pub fn to_ccw(&self) -> Profile {
        let mut points = self.points.clone();
        if self.signed_area() < 0.0 {
            points.reverse();
        }
        Profile::new(points)
    }

    /// Ear-clipping triangulation of a counter-clockwise simple polygon.
    ///
    /// Returns index triples into `points`, or `None` when no ear can be
    /// found (self-intersecting or degenerate input).
    pub fn triangulate(&self) -> Option<Vec<[usize; 3]>> {
        let n = self.points.len();
        if n < 3 {
            return None;
        }

        let mut remaining: Vec<usize> = (0..n).collect();
        let mut triangles = Vec::with_capacity(n - 2);

        while remaining.len() > 3 {
            let m = remaining.len();
            let ear = (0..m).find(|&i| {
                let prev = remaining[(i + m - 1) % m];
                let curr = remaining[i];
                let next = remaining[(i + 1) % m];
                self.is_ear(prev, curr, next, &remaining)
            });

            match ear {
                Some(i) => {
                    let prev = remaining[(i + m - 1) % m];
                    let next = remaining[(i + 1) % m];
                    triangles.push([prev, remaining[i], next]);
                    remaining.remove(i);
                }
                None => {
                    // Collinear leftovers: drop a zero-area corner and retry
                    let flat = (0..m).find(|&i| {
                        let prev = self.points[remaining[(i + m - 1) % m]];
                        let curr = self.points[remaining[i]];
                        let next = self.points[remaining[(i + 1) % m]];
                        cross(prev, curr, next).abs() < 1e-12
                    })?;
                    remaining.remove(flat);
                }
            }
        }

        if remaining.len() == 3 {
            triangles.push([remaining[0], remaining[1], remaining[2]]);
        }
        Some(triangles)
    }

    fn is_ear(&self, prev: usize, curr: usize, next: usize, remaining: &[usize]) -> bool {
        let a = self.points[prev];
        let b = self.points[curr];
        let c = self.points[next];

        if cross(a, b, c) <= 1e-12 {
            return false;
        }

        remaining
            .iter()
            .filter(|&&i| i != prev && i != curr && i != next)
            .all(|&i| !point_in_triangle(self.points[i], a, b, c))
    }
}

fn cross(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_in_triangle(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation() {
        let square = Profile::square(2.0, 2.0, true);
        assert!((square.signed_area() - 4.0).abs() < 1e-12);

        let mut reversed = square.clone();
        reversed.points.reverse();
        assert!(reversed.signed_area() < 0.0);
        assert!(reversed.to_ccw().signed_area() > 0.0);
    }

    #[test]
    fn test_triangulate_convex() {
        let tris = Profile::circle(1.0, 12).triangulate().unwrap();
        assert_eq!(tris.len(), 10);
    }

    #[test]
    fn test_triangulate_concave_l_shape() {
        let l = Profile::from_pairs(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ]);
        let tris = l.triangulate().unwrap();
        assert_eq!(tris.len(), 4);

        let area: f64 = tris
            .iter()
            .map(|t| cross(l.points[t[0]], l.points[t[1]], l.points[t[2]]) / 2.0)
            .sum();
        assert!((area - 3.0).abs() < 1e-9);
    }
}
