//! Geometric primitives for chip region analysis.
//!
//! This module provides point and polygon types together with the algorithms
//! the detector needs on traced contours: shoelace area, convex hull and the
//! minimum-area enclosing rectangle (rotating calipers over the hull edges).

use imageproc::contours::Contour;
use imageproc::point::Point as ImageProcPoint;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a point from an imageproc contour point.
    pub fn from_imageproc_point(p: ImageProcPoint<u32>) -> Self {
        Self {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A closed polygon, typically a traced contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The vertices in traversal order; the last vertex connects to the first.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned rectangle polygon from corner coordinates.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }

    /// Creates a polygon from an imageproc contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|&p| Point::from_imageproc_point(p))
            .collect();
        Self { points }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Calculates the enclosed area using the shoelace formula.
    ///
    /// Returns 0.0 if the polygon has fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let n = self.points.len();
        let mut area = 0.0f64;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x as f64 * self.points[j].y as f64;
            area -= self.points[j].x as f64 * self.points[i].y as f64;
        }
        (area.abs() / 2.0) as f32
    }

    /// Calculates the perimeter of the closed polygon.
    pub fn perimeter(&self) -> f32 {
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].distance(&self.points[(i + 1) % n]))
            .sum()
    }

    /// Mean of the vertices.
    pub fn centroid(&self) -> Point {
        if self.points.is_empty() {
            return Point::new(0.0, 0.0);
        }
        let n = self.points.len() as f32;
        Point::new(
            self.points.iter().map(|p| p.x).sum::<f32>() / n,
            self.points.iter().map(|p| p.y).sum::<f32>() / n,
        )
    }

    /// Computes the convex hull with Andrew's monotone chain.
    ///
    /// Collinear and duplicate points are dropped. Polygons with fewer than
    /// three points are returned unchanged.
    pub fn convex_hull(&self) -> Polygon {
        if self.points.len() < 3 {
            return self.clone();
        }

        let mut points = self.points.clone();
        points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        points.dedup();

        if points.len() < 3 {
            return Polygon::new(points);
        }

        let mut lower: Vec<Point> = Vec::with_capacity(points.len());
        for &p in &points {
            while lower.len() >= 2
                && cross_product(&lower[lower.len() - 2], &lower[lower.len() - 1], &p) <= 0.0
            {
                lower.pop();
            }
            lower.push(p);
        }

        let mut upper: Vec<Point> = Vec::with_capacity(points.len());
        for &p in points.iter().rev() {
            while upper.len() >= 2
                && cross_product(&upper[upper.len() - 2], &upper[upper.len() - 1], &p) <= 0.0
            {
                upper.pop();
            }
            upper.push(p);
        }

        // The last point of each chain is the first point of the other.
        lower.pop();
        upper.pop();
        lower.extend(upper);
        Polygon::new(lower)
    }

    /// Computes the minimum-area rectangle enclosing every vertex.
    ///
    /// Uses the rotating calipers idea: the optimal rectangle has one side
    /// collinear with a convex hull edge, so every hull edge is tried as a
    /// reference direction. The returned rectangle's `width` is measured
    /// along the direction given by `angle`.
    ///
    /// If the polygon has fewer than 3 points or its hull is degenerate,
    /// returns the axis-aligned bounding rectangle.
    pub fn min_area_rect(&self) -> MinAreaRect {
        let hull = self.convex_hull();
        let hull_points = &hull.points;

        if hull_points.len() < 3 {
            return self.axis_aligned_rect();
        }

        let mut min_area = f32::MAX;
        let mut min_rect = self.axis_aligned_rect();

        let n = hull_points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let origin = hull_points[i];

            let edge_x = hull_points[j].x - origin.x;
            let edge_y = hull_points[j].y - origin.y;
            let edge_length = edge_x.hypot(edge_y);
            if edge_length < f32::EPSILON {
                continue;
            }

            let (nx, ny) = (edge_x / edge_length, edge_y / edge_length);
            let (px, py) = (-ny, nx);

            let mut min_n = f32::MAX;
            let mut max_n = f32::MIN;
            let mut min_p = f32::MAX;
            let mut max_p = f32::MIN;

            for point in hull_points {
                let dx = point.x - origin.x;
                let dy = point.y - origin.y;

                let proj_n = nx * dx + ny * dy;
                min_n = min_n.min(proj_n);
                max_n = max_n.max(proj_n);

                let proj_p = px * dx + py * dy;
                min_p = min_p.min(proj_p);
                max_p = max_p.max(proj_p);
            }

            let width = max_n - min_n;
            let height = max_p - min_p;
            let area = width * height;

            if area < min_area {
                min_area = area;

                let center_n = (min_n + max_n) / 2.0;
                let center_p = (min_p + max_p) / 2.0;

                min_rect = MinAreaRect {
                    center: Point::new(
                        origin.x + center_n * nx + center_p * px,
                        origin.y + center_n * ny + center_p * py,
                    ),
                    width,
                    height,
                    angle: ny.atan2(nx) * 180.0 / PI,
                };
            }
        }

        min_rect
    }

    fn axis_aligned_rect(&self) -> MinAreaRect {
        let (Some((min_x, max_x)), Some((min_y, max_y))) = (
            self.points.iter().map(|p| p.x).minmax().into_option(),
            self.points.iter().map(|p| p.y).minmax().into_option(),
        ) else {
            return MinAreaRect::default();
        };

        MinAreaRect {
            center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            width: max_x - min_x,
            height: max_y - min_y,
            angle: 0.0,
        }
    }
}

/// Cross product of `p1->p2` and `p1->p3`.
///
/// Positive for a counter-clockwise turn in a y-up frame, negative for a
/// clockwise turn, zero when the points are collinear.
fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
}

/// A rotated rectangle, as returned by [`Polygon::min_area_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinAreaRect {
    /// The center point of the rectangle.
    pub center: Point,
    /// Extent along the `angle` direction.
    pub width: f32,
    /// Extent perpendicular to the `angle` direction.
    pub height: f32,
    /// Direction of the width axis in degrees, image coordinates (y down).
    pub angle: f32,
}

impl Default for MinAreaRect {
    fn default() -> Self {
        Self {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        }
    }
}

impl MinAreaRect {
    /// Area of the rectangle.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Gets the length of the shorter side of the rectangle.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// The four corners, starting at the corner opposite both axes and
    /// walking along the width axis first.
    pub fn box_points(&self) -> [Point; 4] {
        let rad = self.angle * PI / 180.0;
        let (sin_a, cos_a) = rad.sin_cos();
        let w_2 = self.width / 2.0;
        let h_2 = self.height / 2.0;

        [(-w_2, -h_2), (w_2, -h_2), (w_2, h_2), (-w_2, h_2)].map(|(x, y)| {
            Point::new(
                x * cos_a - y * sin_a + self.center.x,
                x * sin_a + y * cos_a + self.center.y,
            )
        })
    }
}
