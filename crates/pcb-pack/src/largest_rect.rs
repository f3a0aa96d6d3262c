//! Largest axis-aligned free rectangle anchored at a point.
//!
//! A horizontal scan through the anchor finds the corridor of free space it
//! can see. The corridor is cut into vertical slabs at every vertical edge
//! inside it, each slab gets the nearest edge above and below its midline,
//! and every contiguous run of slabs containing the anchor is a candidate
//! rectangle. Quadratic in the number of slabs.

use crate::error::PackError;
use crate::geometry::{Point, Rect, EPSILON};
use crate::outline::{is_forbidden, outward_normal, Loop};
use crate::solver::{Solver, SolverStatus};
use crate::visualize::{GraphicsObject, Visualize};

/// How far an anchor may be from a loop and still count as sitting on it.
const ANCHOR_TOLERANCE: f64 = 1e-6;
/// Step taken off the boundary into free space before scanning.
const PROBE_STEP: f64 = 1e-6;
const SCAN_NUDGE: f64 = 1e-7;

/// The free corridor through an anchor, split into slabs.
#[derive(Debug, Clone)]
struct Scan {
    probe: Point,
    /// Slab boundaries from left to right; slab `i` spans `edges[i]..edges[i + 1]`.
    edges: Vec<f64>,
    tops: Vec<f64>,
    bottoms: Vec<f64>,
    anchor_slab: usize,
}

impl Scan {
    fn new(anchor: Point, loops: &[Loop], bounds: Option<&Rect>) -> Option<Self> {
        let probe = probe_point(anchor, loops);
        if is_forbidden(probe, loops) {
            return None;
        }
        if bounds.is_some_and(|b| !b.contains_point(probe)) {
            return None;
        }

        let segments = || loops.iter().flat_map(|l| l.segments.iter());
        let scan_y = scan_line(probe.y, loops);

        let crossings: Vec<f64> = segments().filter_map(|s| s.crossing_x(scan_y)).collect();
        let mut left = crossings
            .iter()
            .copied()
            .filter(|&x| x < probe.x)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut right = crossings
            .iter()
            .copied()
            .filter(|&x| x > probe.x)
            .fold(f64::INFINITY, f64::min);
        if let Some(b) = bounds {
            left = left.max(b.min_x);
            right = right.min(b.max_x);
        }
        if !left.is_finite() || !right.is_finite() || right - left <= EPSILON {
            return None;
        }

        let mut edges: Vec<f64> = segments()
            .filter(|s| s.is_vertical() && !s.is_degenerate())
            .map(|s| s.start.x)
            .filter(|&x| x > left + EPSILON && x < right - EPSILON)
            .collect();
        edges.push(left);
        edges.push(right);
        edges.sort_by(f64::total_cmp);
        edges.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

        let mut tops = Vec::with_capacity(edges.len() - 1);
        let mut bottoms = Vec::with_capacity(edges.len() - 1);
        for w in edges.windows(2) {
            let mid = (w[0] + w[1]) / 2.0;
            let ys: Vec<f64> = segments().filter_map(|s| s.crossing_y(mid)).collect();
            let mut top = ys
                .iter()
                .copied()
                .filter(|&y| y > scan_y)
                .fold(f64::INFINITY, f64::min);
            let mut bottom = ys
                .iter()
                .copied()
                .filter(|&y| y < scan_y)
                .fold(f64::NEG_INFINITY, f64::max);
            if let Some(b) = bounds {
                top = top.min(b.max_y);
                bottom = bottom.max(b.min_y);
            }
            tops.push(top);
            bottoms.push(bottom);
        }

        let anchor_slab = edges
            .windows(2)
            .position(|w| probe.x <= w[1])
            .unwrap_or(edges.len() - 2);

        Some(Self {
            probe,
            edges,
            tops,
            bottoms,
            anchor_slab,
        })
    }

    fn slab_count(&self) -> usize {
        self.tops.len()
    }

    /// Best rectangle among the slab runs starting at `start` and containing
    /// the anchor slab.
    fn best_from(&self, start: usize) -> Option<Rect> {
        let mut top = f64::INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for i in start..self.anchor_slab {
            top = top.min(self.tops[i]);
            bottom = bottom.max(self.bottoms[i]);
        }

        let mut best: Option<Rect> = None;
        for end in self.anchor_slab..self.slab_count() {
            top = top.min(self.tops[end]);
            bottom = bottom.max(self.bottoms[end]);
            if !(top.is_finite() && bottom.is_finite()) || top - bottom <= EPSILON {
                continue;
            }
            let rect = Rect::new(self.edges[start], bottom, self.edges[end + 1], top);
            if best.is_none_or(|b| rect.area() > b.area() + EPSILON) {
                best = Some(rect);
            }
        }
        best
    }
}

/// Steps off the boundary into free space when the anchor sits on a loop.
///
/// On a vertex both adjacent segments are within reach, and the step follows
/// the bisector of their normals.
fn probe_point(anchor: Point, loops: &[Loop]) -> Point {
    let direction = loops
        .iter()
        .flat_map(|l| l.segments.iter().map(move |s| (s, l.kind())))
        .filter(|(s, _)| s.distance_to_point(anchor) <= ANCHOR_TOLERANCE)
        .filter_map(|(s, kind)| outward_normal(s, kind).ok())
        .fold(Point::ZERO, |sum, normal| sum + normal);
    match direction.try_normalize() {
        Some(direction) => anchor + direction * PROBE_STEP,
        None => anchor,
    }
}

/// Moves the scan line off any vertex so every crossing is unambiguous.
fn scan_line(y: f64, loops: &[Loop]) -> f64 {
    let mut scan_y = y;
    for _ in 0..8 {
        let on_vertex = loops
            .iter()
            .flat_map(|l| l.segments.iter())
            .any(|s| (s.start.y - scan_y).abs() <= EPSILON);
        if !on_vertex {
            break;
        }
        scan_y += SCAN_NUDGE;
    }
    scan_y
}

fn pick_larger(best: Option<Rect>, candidate: Option<Rect>) -> Option<Rect> {
    match (best, candidate) {
        (Some(b), Some(c)) if c.area() > b.area() + EPSILON => Some(c),
        (None, c) => c,
        (b, _) => b,
    }
}

/// Largest free axis-aligned rectangle containing `anchor`, capped by
/// `bounds`. `None` when the anchor is not in free space.
pub fn largest_rect(anchor: Point, loops: &[Loop], bounds: Option<&Rect>) -> Option<Rect> {
    let scan = Scan::new(anchor, loops, bounds)?;
    (0..=scan.anchor_slab).fold(None, |best, start| pick_larger(best, scan.best_from(start)))
}

/// Step-wise form of [`largest_rect`]: one slab run start per step.
#[derive(Debug, Clone)]
pub struct LargestRectSolver {
    anchor: Point,
    loops: Vec<Loop>,
    bounds: Option<Rect>,
    scan: Option<Scan>,
    next_start: usize,
    best: Option<Rect>,
    status: SolverStatus,
    is_setup: bool,
}

impl LargestRectSolver {
    pub fn new(anchor: Point, loops: Vec<Loop>, bounds: Option<Rect>) -> Self {
        Self {
            anchor,
            loops,
            bounds,
            scan: None,
            next_start: 0,
            best: None,
            status: SolverStatus::Running,
            is_setup: false,
        }
    }

    pub fn result(&self) -> Option<Rect> {
        self.best
    }
}

impl Solver for LargestRectSolver {
    fn setup(&mut self) {
        if self.is_setup {
            return;
        }
        self.is_setup = true;
        self.scan = Scan::new(self.anchor, &self.loops, self.bounds.as_ref());
        if self.scan.is_none() {
            self.status = SolverStatus::Solved;
        }
    }

    fn step(&mut self) {
        self.setup();
        if self.status.is_terminal() {
            return;
        }
        let Some(scan) = &self.scan else {
            self.status = SolverStatus::Solved;
            return;
        };
        self.best = pick_larger(self.best, scan.best_from(self.next_start));
        if self.next_start >= scan.anchor_slab {
            self.status = SolverStatus::Solved;
        } else {
            self.next_start += 1;
        }
    }

    fn status(&self) -> SolverStatus {
        self.status
    }

    fn failure(&self) -> Option<&PackError> {
        None
    }
}

impl Visualize for LargestRectSolver {
    fn visualize(&self) -> GraphicsObject {
        let mut graphics = GraphicsObject::titled("Largest free rectangle");
        graphics.loops(&self.loops);
        graphics.point(self.anchor, "anchor", "red");
        if let Some(scan) = &self.scan {
            if let (Some(&left), Some(&right)) = (scan.edges.first(), scan.edges.last()) {
                graphics.line(
                    vec![Point::new(left, scan.probe.y), Point::new(right, scan.probe.y)],
                    "gray",
                );
            }
        }
        if let Some(best) = &self.best {
            graphics.rect(best, "rgba(0,200,0,0.25)", "largest free rect");
        }
        graphics
    }
}
