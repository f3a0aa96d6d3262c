//! Places one component against the outline of everything placed so far.
//!
//! Every (outline segment, rotation) pair is an attempt with its own
//! [`SegmentSolver`]. The placer advances one attempt's solver per step,
//! scores and validates the finished candidate, and keeps the best one.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{PackError, Result};
use crate::footprint::{
    does_component_violate_bounds, does_component_violate_bounds_outline, local_footprint,
    pack_component, packed_footprint, rotate_pads, RotatedPad,
};
use crate::geometry::{Point, Rect, EPSILON};
use crate::largest_rect::largest_rect;
use crate::outline::{is_forbidden, Loop};
use crate::segment_solver::SegmentSolver;
use crate::solver::{Solver, SolverStatus};
use crate::types::{InputComponent, Obstacle, PackInput, PackPlacementStrategy, PackedComponent};
use crate::visualize::{GraphicsObject, Visualize};

/// Placement knobs shared by every placer of one pack run.
#[derive(Debug, Clone)]
pub struct PlacementContext {
    pub obstacles: Vec<Obstacle>,
    pub min_gap: f64,
    pub objective: PackPlacementStrategy,
    pub bounds: Option<Rect>,
    pub bounds_outline: Option<Vec<Point>>,
    /// Box capping the largest free rectangle search.
    pub global_bounds: Option<Rect>,
    pub default_direction: Point,
}

impl PlacementContext {
    pub fn from_input(input: &PackInput) -> Self {
        Self {
            obstacles: input.obstacles.clone(),
            min_gap: input.min_gap,
            objective: input.pack_placement_strategy,
            bounds: input.bounds,
            bounds_outline: input.bounds_outline.clone(),
            global_bounds: input.global_bounds(),
            default_direction: input.default_direction,
        }
    }

    fn half_gap(&self) -> f64 {
        self.min_gap / 2.0
    }
}

/// A pad of the component being placed paired with an already placed pad on
/// the same network.
#[derive(Debug, Clone, PartialEq)]
struct PadLink {
    network_id: String,
    /// Offset of the new pad from the candidate center.
    offset: Point,
    /// Absolute center of the placed pad.
    target: Point,
}

impl PadLink {
    /// Where the candidate center must be for the two pads to coincide.
    fn center_target(&self) -> Point {
        self.target - self.offset
    }

    fn distance(&self, center: Point) -> f64 {
        (center + self.offset).distance(self.target)
    }
}

/// One (segment, rotation) pair under evaluation.
#[derive(Debug, Clone)]
struct Attempt {
    loop_index: usize,
    segment_index: usize,
    rotation: f64,
    pads: Vec<RotatedPad>,
    links: Vec<PadLink>,
    solver: SegmentSolver,
}

#[derive(Debug, Clone)]
struct Candidate {
    component: PackedComponent,
    score: f64,
    loop_index: usize,
    segment_index: usize,
}

#[derive(Debug, Clone)]
enum PlacerState {
    Idle,
    Evaluating(Box<Attempt>),
    Solved(PackedComponent),
    Failed(PackError),
}

#[derive(Debug, Clone)]
pub struct SingleComponentPlacer {
    component: InputComponent,
    placed: Vec<PackedComponent>,
    loops: Rc<[Loop]>,
    context: PlacementContext,

    /// `(loop index, segment index, rotation)` in evaluation order.
    pairs: Vec<(usize, usize, f64)>,
    next_pair: usize,
    fallback: Point,
    state: PlacerState,
    best: Option<Candidate>,
    evaluated: usize,
    rejected: usize,
    is_setup: bool,
}

impl SingleComponentPlacer {
    pub fn new(
        component: InputComponent,
        placed: Vec<PackedComponent>,
        loops: Vec<Loop>,
        context: PlacementContext,
    ) -> Self {
        Self {
            component,
            placed,
            loops: Rc::from(loops),
            context,
            pairs: Vec::new(),
            next_pair: 0,
            fallback: Point::ZERO,
            state: PlacerState::Idle,
            best: None,
            evaluated: 0,
            rejected: 0,
            is_setup: false,
        }
    }

    pub fn component_id(&self) -> &str {
        &self.component.component_id
    }

    /// The placed component once the placer has solved.
    pub fn result(&self) -> Option<&PackedComponent> {
        match &self.state {
            PlacerState::Solved(component) => Some(component),
            _ => None,
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|c| c.score)
    }

    pub fn attempts_total(&self) -> usize {
        self.pairs.len()
    }

    pub fn attempts_evaluated(&self) -> usize {
        self.evaluated
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    /// Point unconnected components are pulled towards: beyond the edge of
    /// the placed footprints in the default direction.
    fn fallback_point(&self) -> Point {
        let union = self
            .placed
            .iter()
            .map(packed_footprint)
            .reduce(|a, b| a.union(&b));
        let Some(union) = union else {
            return Point::ZERO;
        };
        let direction = self
            .context
            .default_direction
            .try_normalize()
            .unwrap_or(Point::X);
        let own = local_footprint(&rotate_pads(&self.component, 0.0));
        let reach = union.half_extent_along(direction)
            + own.half_extent_along(direction)
            + self.context.min_gap;
        union.center() + direction * reach
    }

    fn links(&self, pads: &[RotatedPad]) -> Vec<PadLink> {
        let mut links = Vec::new();
        for pad in pads {
            for placed_pad in self.placed.iter().flat_map(|c| c.pads.iter()) {
                if placed_pad.network_id == pad.network_id {
                    links.push(PadLink {
                        network_id: pad.network_id.clone(),
                        offset: pad.offset,
                        target: placed_pad.absolute_center,
                    });
                }
            }
        }
        links
    }

    fn start_attempt(&self, index: usize) -> Result<Attempt> {
        let (loop_index, segment_index, rotation) = self.pairs[index];
        let l = &self.loops[loop_index];
        let segment = l.segments[segment_index];

        let pads = rotate_pads(&self.component, rotation);
        let links = self.links(&pads);
        let targets = if links.is_empty() {
            vec![self.fallback]
        } else {
            links.iter().map(PadLink::center_target).collect()
        };
        let footprint = local_footprint(&pads).expand(self.context.half_gap());

        let solver = SegmentSolver::new(
            segment,
            l.kind(),
            targets,
            footprint,
            self.context.objective,
            Rc::clone(&self.loops),
        )?;

        Ok(Attempt {
            loop_index,
            segment_index,
            rotation,
            pads,
            links,
            solver,
        })
    }

    fn score(&self, center: Point, links: &[PadLink]) -> f64 {
        if links.is_empty() {
            return center.distance(self.fallback);
        }
        match self.context.objective {
            PackPlacementStrategy::MinimumSumDistanceToNetwork => {
                links.iter().map(|link| link.distance(center)).sum()
            }
            PackPlacementStrategy::MinimumSumSquaredDistanceToNetwork => links
                .iter()
                .map(|link| link.distance(center).powi(2))
                .sum(),
            PackPlacementStrategy::ShortestConnectionAlongOutline => {
                let mut shortest: BTreeMap<&str, f64> = BTreeMap::new();
                for link in links {
                    let d = link.distance(center);
                    shortest
                        .entry(link.network_id.as_str())
                        .and_modify(|best| *best = best.min(d))
                        .or_insert(d);
                }
                shortest.values().sum()
            }
        }
    }

    /// Why `candidate` cannot be placed, if it cannot.
    fn rejection(&self, attempt: &Attempt, candidate: &PackedComponent) -> Option<&'static str> {
        let half_gap = self.context.half_gap();
        let center = candidate.center;
        let footprint = packed_footprint(candidate).expand(half_gap);

        let corners = attempt
            .pads
            .iter()
            .flat_map(|pad| pad.local_rect.expand(half_gap).translate(center).corners())
            .chain(footprint.corners());
        for corner in corners {
            if is_forbidden(corner, &self.loops) {
                return Some("corner in forbidden space");
            }
        }

        if self
            .placed
            .iter()
            .any(|other| footprint.overlaps(&packed_footprint(other).expand(half_gap)))
        {
            return Some("overlaps a placed component");
        }
        if self
            .context
            .obstacles
            .iter()
            .any(|obstacle| footprint.overlaps(&obstacle.rect().expand(half_gap)))
        {
            return Some("overlaps an obstacle");
        }

        if let Some(bounds) = &self.context.bounds {
            if does_component_violate_bounds(candidate, bounds, self.context.min_gap) {
                return Some("outside bounds");
            }
        }
        if let Some(outline) = &self.context.bounds_outline {
            if does_component_violate_bounds_outline(candidate, outline, self.context.min_gap) {
                return Some("outside bounds outline");
            }
        }

        let anchor = attempt.solver.contact_point();
        if largest_rect(anchor, &self.loops, self.context.global_bounds.as_ref()).is_none() {
            return Some("no free rectangle at the contact point");
        }

        None
    }

    fn evaluate(&mut self, attempt: &Attempt) {
        self.evaluated += 1;
        let center = attempt.solver.position();
        let candidate = pack_component(&self.component, center, attempt.rotation);

        if let Some(reason) = self.rejection(attempt, &candidate) {
            self.rejected += 1;
            log::trace!(
                "{}: loop {} segment {} rotation {}: rejected ({reason})",
                self.component.component_id,
                attempt.loop_index,
                attempt.segment_index,
                attempt.rotation
            );
            return;
        }

        let score = self.score(center, &attempt.links);
        log::trace!(
            "{}: loop {} segment {} rotation {}: ({:.4}, {:.4}) score {score:.6}",
            self.component.component_id,
            attempt.loop_index,
            attempt.segment_index,
            attempt.rotation,
            center.x,
            center.y
        );

        if self
            .best
            .as_ref()
            .is_none_or(|best| score + EPSILON < best.score)
        {
            self.best = Some(Candidate {
                component: candidate,
                score,
                loop_index: attempt.loop_index,
                segment_index: attempt.segment_index,
            });
        }
    }

    /// Moves on to the next pair, or finishes once every pair is evaluated.
    fn advance(&mut self) {
        if self.next_pair >= self.pairs.len() {
            self.finish();
            return;
        }
        let index = self.next_pair;
        self.next_pair += 1;
        self.state = match self.start_attempt(index) {
            Ok(attempt) => PlacerState::Evaluating(Box::new(attempt)),
            Err(err) => PlacerState::Failed(err),
        };
    }

    fn finish(&mut self) {
        self.state = match &self.best {
            Some(best) => {
                log::debug!(
                    "placed {} at ({:.4}, {:.4}) rotation {} on loop {} segment {} (score {:.6}, {} of {} candidates rejected)",
                    self.component.component_id,
                    best.component.center.x,
                    best.component.center.y,
                    best.component.ccw_rotation_offset_degrees,
                    best.loop_index,
                    best.segment_index,
                    best.score,
                    self.rejected,
                    self.evaluated
                );
                PlacerState::Solved(best.component.clone())
            }
            None => PlacerState::Failed(PackError::NoValidPlacement {
                component_id: self.component.component_id.clone(),
            }),
        };
    }
}

impl Solver for SingleComponentPlacer {
    fn setup(&mut self) {
        if self.is_setup {
            return;
        }
        self.is_setup = true;

        let rotations = self.component.allowed_rotations();
        self.pairs = self
            .loops
            .iter()
            .enumerate()
            .flat_map(|(li, l)| (0..l.segments.len()).map(move |si| (li, si)))
            .flat_map(|(li, si)| rotations.iter().map(move |&r| (li, si, r)))
            .collect();
        self.fallback = self.fallback_point();

        log::trace!(
            "{}: {} attempts over {} loops",
            self.component.component_id,
            self.pairs.len(),
            self.loops.len()
        );
    }

    fn step(&mut self) {
        self.setup();
        match std::mem::replace(&mut self.state, PlacerState::Idle) {
            PlacerState::Idle => self.advance(),
            PlacerState::Evaluating(mut attempt) => {
                attempt.solver.step();
                if attempt.solver.status().is_terminal() {
                    self.evaluate(&attempt);
                    self.advance();
                } else {
                    self.state = PlacerState::Evaluating(attempt);
                }
            }
            terminal => self.state = terminal,
        }
    }

    fn status(&self) -> SolverStatus {
        match self.state {
            PlacerState::Idle | PlacerState::Evaluating(_) => SolverStatus::Running,
            PlacerState::Solved(_) => SolverStatus::Solved,
            PlacerState::Failed(_) => SolverStatus::Failed,
        }
    }

    fn failure(&self) -> Option<&PackError> {
        match &self.state {
            PlacerState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl Visualize for SingleComponentPlacer {
    fn visualize(&self) -> GraphicsObject {
        let mut graphics = GraphicsObject::titled(format!(
            "Placing {} ({}/{} attempts)",
            self.component.component_id,
            self.evaluated,
            self.pairs.len()
        ));
        graphics.loops(&self.loops);
        for placed in &self.placed {
            graphics.rect(
                &packed_footprint(placed),
                "rgba(0,0,255,0.2)",
                placed.component_id.clone(),
            );
        }
        for obstacle in &self.context.obstacles {
            graphics.rect(&obstacle.rect(), "rgba(128,128,128,0.4)", obstacle.obstacle_id.clone());
        }
        if let PlacerState::Evaluating(attempt) = &self.state {
            let mut solver = attempt.solver.visualize();
            solver.lines.clear();
            graphics.line(
                vec![attempt.solver.segment().start, attempt.solver.segment().end],
                "red",
            );
            graphics.extend(solver);
        }
        if let Some(best) = &self.best {
            graphics.rect(
                &packed_footprint(&best.component),
                "rgba(0,200,0,0.3)",
                format!("best {} ({:.3})", self.component.component_id, best.score),
            );
        }
        if !self.placed.is_empty() && self.is_setup {
            graphics.point(self.fallback, "fallback", "gray");
        }
        graphics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::build_outline;
    use crate::types::{InputPad, Size};
    use glam::DVec2;

    fn single_pad(id: &str, net: &str, size: f64) -> InputComponent {
        InputComponent {
            component_id: id.to_string(),
            pads: vec![InputPad {
                pad_id: format!("{id}.1"),
                network_id: net.to_string(),
                shape: Default::default(),
                size: Size::new(size, size),
                offset: DVec2::ZERO,
            }],
            available_rotation_degrees: Vec::new(),
        }
    }

    fn context(input: &PackInput) -> PlacementContext {
        PlacementContext::from_input(input)
    }

    fn placer_for(
        component: InputComponent,
        placed: Vec<PackedComponent>,
        input: &PackInput,
    ) -> SingleComponentPlacer {
        let loops = build_outline(
            &placed,
            &input.obstacles,
            input.min_gap,
            input.allowed_outline().as_deref(),
        );
        SingleComponentPlacer::new(component, placed, loops, context(input))
    }

    #[test]
    fn test_connected_component_lands_next_to_its_network() {
        let input = PackInput::new(Vec::new()).with_min_gap(0.5);
        let first = pack_component(&single_pad("A", "N1", 1.0), DVec2::ZERO, 0.0);
        let mut placer = placer_for(single_pad("B", "N1", 1.0), vec![first.clone()], &input);

        placer.solve(10_000).unwrap();
        let placed = placer.result().unwrap();
        assert_ne!(placed.center, DVec2::ZERO);
        // Touching the first pad across exactly one gap
        assert!((placed.center.length() - 1.5).abs() < 1e-6, "{:?}", placed.center);
        assert!(
            !packed_footprint(placed)
                .expand(0.25)
                .overlaps(&packed_footprint(&first).expand(0.25))
        );
    }

    #[test]
    fn test_unconnected_component_follows_default_direction() {
        let input = PackInput::new(Vec::new())
            .with_min_gap(0.5)
            .with_default_direction(DVec2::NEG_Y);
        let first = pack_component(&single_pad("A", "N1", 1.0), DVec2::ZERO, 0.0);
        let mut placer = placer_for(single_pad("B", "OTHER", 1.0), vec![first], &input);

        placer.solve(10_000).unwrap();
        let placed = placer.result().unwrap();
        assert!(placed.center.y < -1.0, "{:?}", placed.center);
        assert!(placed.center.x.abs() < 1e-6);
    }

    #[test]
    fn test_only_allowed_rotations_are_tried() {
        let input = PackInput::new(Vec::new()).with_min_gap(0.2);
        let first = pack_component(&single_pad("A", "N1", 1.0), DVec2::ZERO, 0.0);
        let mut component = single_pad("B", "N1", 1.0);
        component.available_rotation_degrees = vec![90.0];

        let mut placer = placer_for(component, vec![first], &input);
        placer.solve(10_000).unwrap();
        assert_eq!(placer.result().unwrap().ccw_rotation_offset_degrees, 90.0);
        assert_eq!(placer.attempts_evaluated(), placer.attempts_total());
    }

    #[test]
    fn test_no_room_fails_with_component_id() {
        // Bounds leave no room beside the first component
        let input = PackInput::new(Vec::new())
            .with_min_gap(0.0)
            .with_bounds(Rect::new(-1.0, -1.0, 1.0, 1.0));
        let first = pack_component(&single_pad("A", "N1", 2.0), DVec2::ZERO, 0.0);
        let mut placer = placer_for(single_pad("B", "N1", 1.0), vec![first], &input);

        let err = placer.solve(10_000).unwrap_err();
        assert_eq!(
            err,
            PackError::NoValidPlacement {
                component_id: "B".to_string()
            }
        );
        assert_eq!(placer.status(), SolverStatus::Failed);
        assert!(placer.result().is_none());
    }

    #[test]
    fn test_each_step_advances_one_child_step() {
        let input = PackInput::new(Vec::new()).with_min_gap(0.5);
        let first = pack_component(&single_pad("A", "N1", 1.0), DVec2::ZERO, 0.0);
        let mut placer = placer_for(single_pad("B", "N1", 1.0), vec![first], &input);

        placer.step();
        assert_eq!(placer.status(), SolverStatus::Running);
        assert_eq!(placer.attempts_evaluated(), 0);
        assert!(placer.attempts_total() > 0);
        let snapshot = placer.visualize();
        assert!(snapshot.title.unwrap().starts_with("Placing B"));
        assert!(!snapshot.lines.is_empty());
    }
}
