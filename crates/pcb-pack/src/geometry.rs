//! Planar geometry kernel.
//!
//! Everything here is pure and stateless. Points are `glam::DVec2`; the
//! helpers below add the segment, rectangle and polygon operations the
//! packer needs on top of glam's vector algebra.

use glam::DVec2;
use serde::{Deserialize, Serialize};

pub type Point = DVec2;

/// Tolerance for coincidence, collinearity and boundary tests.
pub const EPSILON: f64 = 1e-9;

/// Slack for clearance comparisons (overlap, containment, touching a loop).
/// Covers the grid the boolean step snaps coordinates to.
pub const CLEARANCE_TOLERANCE: f64 = 1e-5;

/// Rotates `v` counter-clockwise about the origin by `degrees`.
pub fn rotate_degrees(v: Point, degrees: f64) -> Point {
    // Exact results for the quarter turns keep axis-aligned footprints exact.
    match normalize_degrees(degrees) {
        d if d == 0.0 => v,
        d if d == 90.0 => DVec2::new(-v.y, v.x),
        d if d == 180.0 => DVec2::new(-v.x, -v.y),
        d if d == 270.0 => DVec2::new(v.y, -v.x),
        d => DVec2::from_angle(d.to_radians()).rotate(v),
    }
}

/// Maps an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    if (360.0 - normalized).abs() < EPSILON {
        0.0
    } else {
        normalized
    }
}

pub(crate) fn points_equal(a: Point, b: Point) -> bool {
    a.distance_squared(b) <= EPSILON * EPSILON
}

/// A directed segment. Direction matters for loop orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn vector(&self) -> Point {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.vector().length()
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() <= EPSILON
    }

    pub fn midpoint(&self) -> Point {
        self.start.lerp(self.end, 0.5)
    }

    pub fn point_at(&self, t: f64) -> Point {
        self.start.lerp(self.end, t)
    }

    /// Parametric position of the projection of `p`, clamped to `[0, 1]`.
    pub fn project(&self, p: Point) -> f64 {
        let d = self.vector();
        let len_sq = d.length_squared();
        if len_sq <= EPSILON * EPSILON {
            return 0.0;
        }
        ((p - self.start).dot(d) / len_sq).clamp(0.0, 1.0)
    }

    pub fn closest_point(&self, p: Point) -> Point {
        self.point_at(self.project(p))
    }

    pub fn distance_to_point(&self, p: Point) -> f64 {
        self.closest_point(p).distance(p)
    }

    /// Unit normal pointing to the left of the direction of travel.
    pub fn left_normal(&self) -> Option<Point> {
        self.vector().try_normalize().map(|d| d.perp())
    }

    pub fn is_horizontal(&self) -> bool {
        (self.end.y - self.start.y).abs() <= EPSILON
    }

    pub fn is_vertical(&self) -> bool {
        (self.end.x - self.start.x).abs() <= EPSILON
    }

    pub fn reversed(&self) -> Segment {
        Segment::new(self.end, self.start)
    }

    /// Intersection point of two segments, if they cross or touch.
    ///
    /// Collinear overlapping segments return the first shared endpoint.
    pub fn intersect(&self, other: &Segment) -> Option<Point> {
        let r = self.vector();
        let s = other.vector();
        let denom = r.perp_dot(s);
        let qp = other.start - self.start;

        if denom.abs() <= EPSILON {
            if qp.perp_dot(r).abs() > EPSILON {
                return None;
            }
            return [other.start, other.end, self.start, self.end]
                .into_iter()
                .find(|&p| {
                    self.distance_to_point(p) <= EPSILON && other.distance_to_point(p) <= EPSILON
                });
        }

        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        let range = -EPSILON..=1.0 + EPSILON;
        if range.contains(&t) && range.contains(&u) {
            Some(self.point_at(t.clamp(0.0, 1.0)))
        } else {
            None
        }
    }

    /// X coordinate where the segment crosses the horizontal line `y`,
    /// using the half-open rule so shared vertices are counted once.
    pub(crate) fn crossing_x(&self, y: f64) -> Option<f64> {
        let (a, b) = (self.start, self.end);
        if (a.y > y) == (b.y > y) {
            return None;
        }
        Some(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
    }

    /// Y coordinate where the segment crosses the vertical line `x`.
    pub(crate) fn crossing_y(&self, x: f64) -> Option<f64> {
        let (a, b) = (self.start, self.end);
        if (a.x > x) == (b.x > x) {
            return None;
        }
        Some(a.y + (x - a.x) * (b.y - a.y) / (b.x - a.x))
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_center_size(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    /// Smallest rectangle containing all `points`, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        DVec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn translate(&self, offset: Point) -> Self {
        Self::new(
            self.min_x + offset.x,
            self.min_y + offset.y,
            self.max_x + offset.x,
            self.max_y + offset.y,
        )
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// True when the interiors intersect. Touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x < other.max_x - CLEARANCE_TOLERANCE
            && other.min_x < self.max_x - CLEARANCE_TOLERANCE
            && self.min_y < other.max_y - CLEARANCE_TOLERANCE
            && other.min_y < self.max_y - CLEARANCE_TOLERANCE
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x - CLEARANCE_TOLERANCE
            && p.x <= self.max_x + CLEARANCE_TOLERANCE
            && p.y >= self.min_y - CLEARANCE_TOLERANCE
            && p.y <= self.max_y + CLEARANCE_TOLERANCE
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x >= self.min_x - CLEARANCE_TOLERANCE
            && other.max_x <= self.max_x + CLEARANCE_TOLERANCE
            && other.min_y >= self.min_y - CLEARANCE_TOLERANCE
            && other.max_y <= self.max_y + CLEARANCE_TOLERANCE
    }

    /// Corners in counter-clockwise order starting at the bottom left.
    pub fn corners(&self) -> [Point; 4] {
        [
            DVec2::new(self.min_x, self.min_y),
            DVec2::new(self.max_x, self.min_y),
            DVec2::new(self.max_x, self.max_y),
            DVec2::new(self.min_x, self.max_y),
        ]
    }

    /// Half extent of the rectangle projected onto the unit direction `n`.
    pub fn half_extent_along(&self, n: Point) -> f64 {
        (n.x.abs() * self.width() + n.y.abs() * self.height()) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Outside,
    Boundary,
}

fn polygon_edges(outline: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    let n = outline.len();
    (0..n).map(move |i| Segment::new(outline[i], outline[(i + 1) % n]))
}

/// Classifies `p` against a closed polygon given by its vertices.
///
/// Points within [`EPSILON`] of an edge are on the boundary; everything else
/// is decided by even-odd ray casting.
pub fn point_in_outline(p: Point, outline: &[Point]) -> PointLocation {
    point_in_outline_within(p, outline, EPSILON)
}

/// [`point_in_outline`] with a caller-chosen boundary tolerance.
pub(crate) fn point_in_outline_within(
    p: Point,
    outline: &[Point],
    tolerance: f64,
) -> PointLocation {
    if outline.len() < 3 {
        return PointLocation::Outside;
    }
    if polygon_edges(outline).any(|edge| edge.distance_to_point(p) <= tolerance) {
        return PointLocation::Boundary;
    }
    if crossings_to_the_right(p, polygon_edges(outline)) % 2 == 1 {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// Number of edges crossed by a ray cast from `p` towards +x.
pub(crate) fn crossings_to_the_right(p: Point, edges: impl Iterator<Item = Segment>) -> usize {
    edges
        .filter_map(|edge| edge.crossing_x(p.y))
        .filter(|&x| x > p.x)
        .count()
}

/// Shoelace signed area. Positive for counter-clockwise vertex order.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    polygon_edges(points)
        .map(|edge| edge.start.perp_dot(edge.end))
        .sum::<f64>()
        / 2.0
}

/// Area centroid of a simple polygon. Degenerate polygons fall back to the
/// mean of their vertices.
pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let area = signed_area(points);
    if area.abs() <= EPSILON {
        let sum: Point = points.iter().copied().sum();
        return Some(sum / points.len() as f64);
    }
    let weighted: Point = polygon_edges(points)
        .map(|edge| (edge.start + edge.end) * edge.start.perp_dot(edge.end))
        .sum();
    Some(weighted / (6.0 * area))
}

/// Convex hull by Andrew's monotone chain.
///
/// Returns the hull vertices in counter-clockwise order with collinear
/// points removed. Fewer than three distinct points are returned as-is.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| points_equal(*a, *b));

    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: Point, a: Point, b: Point| (a - o).perp_dot(b - o);

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2
            && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= EPSILON
        {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= EPSILON
        {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn can_merge(a: &Segment, b: &Segment) -> bool {
    if !points_equal(a.end, b.start) {
        return false;
    }
    let (Some(da), Some(db)) = (a.vector().try_normalize(), b.vector().try_normalize()) else {
        return false;
    };
    da.perp_dot(db).abs() <= 1e-7 && da.dot(db) > 0.0
}

/// Merges adjacent collinear segments pointing the same way.
///
/// When the chain is closed (the last segment ends where the first starts)
/// the merge also wraps around, so a loop never starts in the middle of a
/// straight run.
pub fn simplify_collinear_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments.iter().filter(|s| !s.is_degenerate()) {
        match merged.last_mut() {
            Some(last) if can_merge(last, segment) => last.end = segment.end,
            _ => merged.push(*segment),
        }
    }

    if merged.len() >= 2 {
        let first = merged[0];
        let last = merged[merged.len() - 1];
        if points_equal(last.end, first.start) && can_merge(&last, &first) {
            merged.pop();
            merged[0].start = last.start;
        }
    }

    merged
}

/// Chains closed polygon vertices into directed segments.
pub fn segments_from_points(points: &[Point]) -> Vec<Segment> {
    if points.len() < 2 {
        return Vec::new();
    }
    polygon_edges(points).collect()
}
