//! Free-space outlines around everything already placed.
//!
//! The outline is the boundary of `allowed region - union(grown footprints)`.
//! The boolean difference is delegated to `i_overlay`; this module only
//! interprets its output. Each shape's first contour is its outer boundary
//! and the rest are its holes. Contours are re-wound to match the convention
//! below before they are classified by signed area. Degenerate faces are
//! dropped and collinear runs are merged.
//!
//! Orientation convention: free space always lies to the left of a directed
//! loop segment. An [`LoopKind::Outer`] loop (counter-clockwise, positive
//! area) encloses free space, so free space is its geometric interior. A
//! [`LoopKind::Hole`] loop (clockwise, negative area) encloses a forbidden
//! island, so free space is its geometric exterior.

use glam::DVec2;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

use crate::error::{PackError, Result};
use crate::footprint::packed_footprint;
use crate::geometry::{
    crossings_to_the_right, segments_from_points, signed_area, simplify_collinear_segments, Point,
    PointLocation, Rect, Segment, CLEARANCE_TOLERANCE, EPSILON,
};
use crate::types::{Obstacle, PackedComponent};

/// Faces with less area than this are artifacts of the boolean step.
const MIN_LOOP_AREA: f64 = 1e-9;

/// Without explicit bounds the allowed region is the footprint union grown
/// by this many times its larger side (and at least [`MIN_SYNTHETIC_MARGIN`]).
const SYNTHETIC_MARGIN_SCALE: f64 = 10.0;
const MIN_SYNTHETIC_MARGIN: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// Counter-clockwise boundary enclosing free space.
    Outer,
    /// Clockwise boundary around a forbidden island.
    Hole,
}

/// A closed chain of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub segments: Vec<Segment>,
    pub signed_area: f64,
}

impl Loop {
    /// Builds a loop from polygon vertices, merging collinear runs. Returns
    /// `None` for faces without meaningful area.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let signed_area = signed_area(points);
        if signed_area.abs() < MIN_LOOP_AREA {
            return None;
        }
        let segments = simplify_collinear_segments(&segments_from_points(points));
        if segments.len() < 3 {
            return None;
        }
        Some(Self {
            segments,
            signed_area,
        })
    }

    pub fn kind(&self) -> LoopKind {
        if self.signed_area > 0.0 {
            LoopKind::Outer
        } else {
            LoopKind::Hole
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.segments.iter().map(|s| s.start).collect()
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::from_points(self.segments.iter().map(|s| s.start))
    }
}

/// Unit normal of `segment` pointing into free space.
///
/// Free space lies left of travel on both loop kinds, so this is the left
/// normal for outer loops and holes alike. `_kind` only documents which
/// loop the segment came from.
pub fn outward_normal(segment: &Segment, _kind: LoopKind) -> Result<Point> {
    segment.left_normal().ok_or_else(|| {
        PackError::degenerate(format!(
            "zero-length segment at ({:.6}, {:.6}) has no outward normal",
            segment.start.x, segment.start.y
        ))
    })
}

fn all_segments(loops: &[Loop]) -> impl Iterator<Item = Segment> + '_ {
    loops.iter().flat_map(|l| l.segments.iter().copied())
}

/// Classifies `p` against the free space described by `loops`: `Inside`
/// means free, `Outside` means forbidden. Points within
/// [`CLEARANCE_TOLERANCE`] of a loop are on the boundary.
pub fn locate(p: Point, loops: &[Loop]) -> PointLocation {
    if all_segments(loops).any(|s| s.distance_to_point(p) <= CLEARANCE_TOLERANCE) {
        return PointLocation::Boundary;
    }
    if crossings_to_the_right(p, all_segments(loops)) % 2 == 1 {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// True when `p` is strictly inside forbidden space.
pub fn is_forbidden(p: Point, loops: &[Loop]) -> bool {
    locate(p, loops) == PointLocation::Outside
}

/// Distance from `p` to the nearest loop segment.
pub fn distance_to_outline(p: Point, loops: &[Loop]) -> f64 {
    all_segments(loops)
        .map(|s| s.distance_to_point(p))
        .fold(f64::INFINITY, f64::min)
}

/// The `(loop index, segment index)` of the segment nearest to `p`, if it is
/// within `tolerance`.
pub fn segment_at(p: Point, loops: &[Loop], tolerance: f64) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (li, l) in loops.iter().enumerate() {
        for (si, s) in l.segments.iter().enumerate() {
            let d = s.distance_to_point(p);
            if d <= tolerance && best.is_none_or(|(_, bd)| d < bd) {
                best = Some(((li, si), d));
            }
        }
    }
    best.map(|(index, _)| index)
}

/// Reverses `points` unless their winding already matches `counter_clockwise`.
fn wound(points: Vec<Point>, counter_clockwise: bool) -> Vec<Point> {
    if (signed_area(&points) > 0.0) == counter_clockwise {
        points
    } else {
        points.into_iter().rev().collect()
    }
}

fn to_contour(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

fn synthetic_allowed_region(rects: &[Rect]) -> Vec<Point> {
    let union = rects
        .iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0));
    let margin =
        (union.width().max(union.height()) * SYNTHETIC_MARGIN_SCALE).max(MIN_SYNTHETIC_MARGIN);
    union.expand(margin).corners().to_vec()
}

/// Builds the free-space loops around `placed` components and `obstacles`.
///
/// Footprints and obstacles are grown by `min_gap / 2`. The allowed region
/// is `bounds_outline` when given, otherwise a large synthetic box around
/// the footprints. Never fails; an empty result means there is no free
/// space at all.
pub fn build_outline(
    placed: &[PackedComponent],
    obstacles: &[Obstacle],
    min_gap: f64,
    bounds_outline: Option<&[Point]>,
) -> Vec<Loop> {
    let half_gap = min_gap / 2.0;
    let rects: Vec<Rect> = placed
        .iter()
        .map(packed_footprint)
        .chain(obstacles.iter().map(Obstacle::rect))
        .map(|r| r.expand(half_gap))
        .collect();

    let allowed = wound(
        match bounds_outline {
            Some(outline) if outline.len() >= 3 => outline.to_vec(),
            _ => synthetic_allowed_region(&rects),
        },
        true,
    );

    if rects.is_empty() {
        return Loop::from_points(&allowed).into_iter().collect();
    }

    let subject: Vec<Vec<[f64; 2]>> = vec![to_contour(&allowed)];
    let clip: Vec<Vec<[f64; 2]>> = rects
        .iter()
        .filter(|r| r.width() > EPSILON && r.height() > EPSILON)
        .map(|r| to_contour(&r.corners()))
        .collect();

    let shapes = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);

    // Outer boundary first, holes after; the engine's own winding is ignored.
    let loops: Vec<Loop> = shapes
        .into_iter()
        .flat_map(|shape| shape.into_iter().enumerate())
        .filter_map(|(index, contour)| {
            let points: Vec<Point> = contour.into_iter().map(|[x, y]| DVec2::new(x, y)).collect();
            Loop::from_points(&wound(points, index == 0))
        })
        .collect();

    log::trace!(
        "outline: {} rects -> {} outer / {} hole loops",
        rects.len(),
        loops.iter().filter(|l| l.kind() == LoopKind::Outer).count(),
        loops.iter().filter(|l| l.kind() == LoopKind::Hole).count()
    );

    loops
}
