//! Best position along one outline segment.
//!
//! The component center is constrained to sit against the segment on its
//! free side. Within that constraint the solver runs iteratively reweighted
//! least squares towards the target points: plain averaging minimizes the
//! sum of squared distances, Weiszfeld weights (`1 / distance`) minimize the
//! sum of distances.

use std::rc::Rc;

use crate::error::{PackError, Result};
use crate::geometry::{Point, Rect, Segment};
use crate::outline::{distance_to_outline, is_forbidden, outward_normal, Loop, LoopKind};
use crate::solver::{Solver, SolverStatus};
use crate::types::PackPlacementStrategy;
use crate::visualize::{GraphicsObject, Visualize};

pub const MAX_IRLS_ITERATIONS: usize = 50;
pub const CONVERGENCE_EPSILON: f64 = 1e-6;
/// Extra clearance added when pushing a candidate out of forbidden space.
pub const COLLISION_BUFFER: f64 = 0.1;
const MIN_WEIGHT_DISTANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SegmentSolver {
    segment: Segment,
    normal: Point,
    targets: Vec<Point>,
    /// Grown footprint relative to the component center.
    footprint: Rect,
    objective: PackPlacementStrategy,
    loops: Rc<[Loop]>,

    position: Point,
    iterations: usize,
    converged: bool,
    status: SolverStatus,
    is_setup: bool,
}

impl SegmentSolver {
    /// Fails with [`PackError::GeometryDegenerate`] when the segment has no
    /// outward normal.
    pub fn new(
        segment: Segment,
        kind: LoopKind,
        targets: Vec<Point>,
        footprint: Rect,
        objective: PackPlacementStrategy,
        loops: Rc<[Loop]>,
    ) -> Result<Self> {
        let normal = outward_normal(&segment, kind)?;
        Ok(Self {
            segment,
            normal,
            targets,
            footprint,
            objective,
            loops,
            position: segment.midpoint(),
            iterations: 0,
            converged: false,
            status: SolverStatus::Running,
            is_setup: false,
        })
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn normal(&self) -> Point {
        self.normal
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Point on the segment the current candidate rests against.
    pub fn contact_point(&self) -> Point {
        self.segment.closest_point(self.position)
    }

    /// Distance from the center to the footprint edge facing the segment.
    fn standoff(&self) -> f64 {
        self.footprint
            .corners()
            .iter()
            .map(|c| -c.dot(self.normal))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Projects `p` onto the segment, backs the footprint off into free
    /// space and pushes it clear of any forbidden region its corners fall in.
    pub fn constrain(&self, p: Point) -> Point {
        let on_segment = self.segment.closest_point(p);
        let center = on_segment + self.normal * self.standoff();

        let depth = self
            .footprint
            .translate(center)
            .corners()
            .into_iter()
            .filter(|&corner| is_forbidden(corner, &self.loops))
            .map(|corner| distance_to_outline(corner, &self.loops))
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));

        match depth {
            Some(depth) => center + self.normal * (depth + COLLISION_BUFFER),
            None => center,
        }
    }

    fn weighted_target(&self) -> Point {
        let mut sum = Point::ZERO;
        let mut total = 0.0;
        for &target in &self.targets {
            let weight = match self.objective {
                PackPlacementStrategy::MinimumSumDistanceToNetwork => {
                    1.0 / self.position.distance(target).max(MIN_WEIGHT_DISTANCE)
                }
                _ => 1.0,
            };
            sum += target * weight;
            total += weight;
        }
        sum / total
    }

    fn nearest_target(&self) -> Option<Point> {
        self.targets.iter().copied().min_by(|a, b| {
            self.segment
                .distance_to_point(*a)
                .total_cmp(&self.segment.distance_to_point(*b))
        })
    }

    fn finish(&mut self, converged: bool) {
        self.converged = converged;
        self.status = SolverStatus::Solved;
    }
}

impl Solver for SegmentSolver {
    fn setup(&mut self) {
        if self.is_setup {
            return;
        }
        self.is_setup = true;

        if self.targets.is_empty() {
            self.position = self.constrain(self.segment.midpoint());
            self.finish(true);
            return;
        }

        if self.objective == PackPlacementStrategy::ShortestConnectionAlongOutline {
            if let Some(nearest) = self.nearest_target() {
                self.position = self.constrain(nearest);
            }
            self.finish(true);
            return;
        }

        self.position = self.constrain(self.segment.midpoint());
    }

    fn step(&mut self) {
        self.setup();
        if self.status.is_terminal() {
            return;
        }

        let next = self.constrain(self.weighted_target());
        let movement = next.distance(self.position);
        self.position = next;
        self.iterations += 1;

        if movement < CONVERGENCE_EPSILON {
            self.finish(true);
        } else if self.iterations >= MAX_IRLS_ITERATIONS {
            log::debug!(
                "IRLS did not converge within {MAX_IRLS_ITERATIONS} iterations (last move {movement:.3e}); keeping ({:.4}, {:.4})",
                self.position.x,
                self.position.y
            );
            self.finish(false);
        }
    }

    fn status(&self) -> SolverStatus {
        self.status
    }

    fn failure(&self) -> Option<&PackError> {
        None
    }
}

impl Visualize for SegmentSolver {
    fn visualize(&self) -> GraphicsObject {
        let mut graphics = GraphicsObject::titled("Segment solver");
        graphics.loops(&self.loops);
        graphics.line(vec![self.segment.start, self.segment.end], "red");
        for (i, &target) in self.targets.iter().enumerate() {
            graphics.point(target, format!("target {i}"), "green");
        }
        graphics.point(
            self.position,
            format!("candidate (iteration {})", self.iterations),
            "red",
        );
        graphics.rect(&self.footprint.translate(self.position), "rgba(255,0,0,0.2)", "footprint");
        graphics
    }
}
