//! Top-level packing loop.
//!
//! The engine orders the components, pins the first one at the origin and
//! then places the rest one at a time, each through a fresh
//! [`SingleComponentPlacer`] built against the outline of everything packed
//! so far.

use std::collections::{HashSet, VecDeque};

use crate::error::{PackError, Result};
use crate::footprint::{
    does_component_violate_bounds, does_component_violate_bounds_outline, local_footprint,
    pack_component, packed_footprint, rotate_pads,
};
use crate::geometry::{Point, Rect};
use crate::outline::build_outline;
use crate::placer::{PlacementContext, SingleComponentPlacer};
use crate::solver::{Solver, SolverStatus};
use crate::types::{InputComponent, PackInput, PackOrderStrategy, PackOutput, PackedComponent};
use crate::visualize::{GraphicsObject, Visualize};

#[derive(Debug, Clone)]
enum EngineState {
    Idle,
    Packing,
    Solved,
    Failed(PackError),
}

#[derive(Debug, Clone)]
pub struct PackEngine {
    input: PackInput,
    context: PlacementContext,
    queue: VecDeque<InputComponent>,
    packed: Vec<PackedComponent>,
    active: Option<Box<SingleComponentPlacer>>,
    state: EngineState,
    total: usize,
    is_setup: bool,
}

impl PackEngine {
    pub fn new(input: PackInput) -> Self {
        let context = PlacementContext::from_input(&input);
        Self {
            input,
            context,
            queue: VecDeque::new(),
            packed: Vec::new(),
            active: None,
            state: EngineState::Idle,
            total: 0,
            is_setup: false,
        }
    }

    pub fn input(&self) -> &PackInput {
        &self.input
    }

    /// Components packed so far, in placement order.
    pub fn packed(&self) -> &[PackedComponent] {
        &self.packed
    }

    /// Components still waiting for a placer.
    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.active.is_some())
    }

    pub fn active_placer(&self) -> Option<&SingleComponentPlacer> {
        self.active.as_deref()
    }

    /// The full result. Only available once every component is packed.
    pub fn output(&self) -> Option<PackOutput> {
        match self.state {
            EngineState::Solved => Some(PackOutput {
                components: self.packed.clone(),
            }),
            _ => None,
        }
    }

    fn fail(&mut self, err: PackError) {
        log::debug!("packing failed: {err}");
        self.active = None;
        self.state = EngineState::Failed(err);
    }

    fn finish(&mut self) {
        log::debug!("packed {} components", self.packed.len());
        self.state = EngineState::Solved;
    }

    /// Pins the head of the queue at the origin. A head that would land on
    /// an obstacle stays queued and goes through a regular placer instead.
    fn place_first(&mut self) -> Result<()> {
        let Some(head) = self.queue.front() else {
            return Ok(());
        };
        let rotation = head.allowed_rotations()[0];
        let first = pack_component(head, Point::ZERO, rotation);

        let out_of_bounds = self
            .input
            .bounds
            .is_some_and(|b| does_component_violate_bounds(&first, &b, self.input.min_gap))
            || self.input.bounds_outline.as_deref().is_some_and(|outline| {
                does_component_violate_bounds_outline(&first, outline, self.input.min_gap)
            });
        if out_of_bounds {
            return Err(PackError::OutOfBounds {
                component_id: first.component_id,
            });
        }

        let half_gap = self.input.min_gap / 2.0;
        let footprint = packed_footprint(&first).expand(half_gap);
        if let Some(obstacle) = self
            .input
            .obstacles
            .iter()
            .find(|o| footprint.overlaps(&o.rect().expand(half_gap)))
        {
            log::debug!(
                "{} would cover obstacle {} at the origin; placing it against the obstacles",
                first.component_id,
                obstacle.obstacle_id
            );
            return Ok(());
        }

        self.queue.pop_front();
        log::debug!(
            "[1/{}] pinned {} at the origin (rotation {rotation})",
            self.total,
            first.component_id
        );
        self.packed.push(first);
        Ok(())
    }

    fn start_next(&mut self) {
        let Some(component) = self.queue.pop_front() else {
            self.finish();
            return;
        };
        let loops = build_outline(
            &self.packed,
            &self.input.obstacles,
            self.input.min_gap,
            self.input.allowed_outline().as_deref(),
        );
        log::debug!(
            "[{}/{}] placing {} against {} loops",
            self.packed.len() + 1,
            self.total,
            component.component_id,
            loops.len()
        );
        self.active = Some(Box::new(SingleComponentPlacer::new(
            component,
            self.packed.clone(),
            loops,
            self.context.clone(),
        )));
    }
}

impl Solver for PackEngine {
    fn setup(&mut self) {
        if self.is_setup {
            return;
        }
        self.is_setup = true;

        if let Err(err) = validate(&self.input) {
            self.fail(err);
            return;
        }

        self.queue =
            order_components(&self.input.components, self.input.pack_order_strategy).into();
        self.total = self.queue.len();
        log::debug!(
            "packing {} components ({:?}, {:?}, min gap {})",
            self.total,
            self.input.pack_order_strategy,
            self.input.pack_placement_strategy,
            self.input.min_gap
        );

        if let Err(err) = self.place_first() {
            self.fail(err);
            return;
        }

        if self.queue.is_empty() {
            self.finish();
        } else {
            self.state = EngineState::Packing;
        }
    }

    fn step(&mut self) {
        self.setup();
        if self.status().is_terminal() {
            return;
        }

        let Some(mut placer) = self.active.take() else {
            self.start_next();
            return;
        };

        placer.step();
        match placer.status() {
            SolverStatus::Running => self.active = Some(placer),
            SolverStatus::Solved => {
                if let Some(component) = placer.result() {
                    self.packed.push(component.clone());
                }
                if self.queue.is_empty() {
                    self.finish();
                }
            }
            SolverStatus::Failed => {
                let err = placer.failure().cloned().unwrap_or_else(|| {
                    PackError::NoValidPlacement {
                        component_id: placer.component_id().to_string(),
                    }
                });
                self.fail(err);
            }
        }
    }

    fn status(&self) -> SolverStatus {
        match self.state {
            EngineState::Idle | EngineState::Packing => SolverStatus::Running,
            EngineState::Solved => SolverStatus::Solved,
            EngineState::Failed(_) => SolverStatus::Failed,
        }
    }

    fn failure(&self) -> Option<&PackError> {
        match &self.state {
            EngineState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl Visualize for PackEngine {
    fn visualize(&self) -> GraphicsObject {
        if let Some(placer) = &self.active {
            return placer.visualize();
        }
        let mut graphics = GraphicsObject::titled(format!(
            "Packed {}/{} components",
            self.packed.len(),
            self.total
        ));
        if let Some(outline) = self.input.allowed_outline() {
            let mut closed = outline.clone();
            if let Some(&first) = outline.first() {
                closed.push(first);
            }
            graphics.line(closed, "black");
        }
        for obstacle in &self.input.obstacles {
            graphics.rect(&obstacle.rect(), "rgba(128,128,128,0.4)", obstacle.obstacle_id.clone());
        }
        for component in &self.packed {
            graphics.rect(
                &packed_footprint(component),
                "rgba(0,0,255,0.2)",
                component.component_id.clone(),
            );
            for pad in &component.pads {
                graphics.point(pad.absolute_center, pad.pad_id.clone(), "blue");
            }
        }
        graphics
    }
}

/// Footprint area at the first allowed rotation.
fn footprint_area(component: &InputComponent) -> f64 {
    local_footprint(&rotate_pads(component, component.allowed_rotations()[0])).area()
}

/// Placement order. Sorting is stable, so equal areas keep input order.
pub fn order_components(
    components: &[InputComponent],
    strategy: PackOrderStrategy,
) -> Vec<InputComponent> {
    let mut ordered = components.to_vec();
    match strategy {
        PackOrderStrategy::LargestToSmallest => {
            ordered.sort_by(|a, b| footprint_area(b).total_cmp(&footprint_area(a)))
        }
        PackOrderStrategy::SmallestToLargest => {
            ordered.sort_by(|a, b| footprint_area(a).total_cmp(&footprint_area(b)))
        }
        PackOrderStrategy::InputOrder => {}
    }
    ordered
}

fn invalid(message: String) -> PackError {
    PackError::InvalidInput(message)
}

fn finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Rejects input no placement could make sense of.
pub fn validate(input: &PackInput) -> Result<()> {
    if !input.min_gap.is_finite() || input.min_gap < 0.0 {
        return Err(invalid(format!(
            "min_gap must be a non-negative number, got {}",
            input.min_gap
        )));
    }
    if !finite(input.default_direction) {
        return Err(invalid("default_direction must be finite".to_string()));
    }

    let mut seen = HashSet::new();
    for component in &input.components {
        let id = &component.component_id;
        if !seen.insert(id.as_str()) {
            return Err(invalid(format!("duplicate component id '{id}'")));
        }
        if let Some(r) = component
            .available_rotation_degrees
            .iter()
            .find(|r| !r.is_finite())
        {
            return Err(invalid(format!("component '{id}' has rotation {r}")));
        }
        for pad in &component.pads {
            let size_ok = pad.size.x.is_finite()
                && pad.size.y.is_finite()
                && pad.size.x >= 0.0
                && pad.size.y >= 0.0;
            if !size_ok {
                return Err(invalid(format!(
                    "pad '{}' of '{id}' has invalid size {} x {}",
                    pad.pad_id, pad.size.x, pad.size.y
                )));
            }
            if !finite(pad.offset) {
                return Err(invalid(format!(
                    "pad '{}' of '{id}' has a non-finite offset",
                    pad.pad_id
                )));
            }
        }
    }

    for obstacle in &input.obstacles {
        let ok = finite(obstacle.absolute_center)
            && obstacle.width.is_finite()
            && obstacle.height.is_finite()
            && obstacle.width >= 0.0
            && obstacle.height >= 0.0;
        if !ok {
            return Err(invalid(format!(
                "obstacle '{}' has invalid geometry",
                obstacle.obstacle_id
            )));
        }
    }

    if let Some(bounds) = &input.bounds {
        let corners_ok = finite(Point::new(bounds.min_x, bounds.min_y))
            && finite(Point::new(bounds.max_x, bounds.max_y));
        if !corners_ok || bounds.min_x > bounds.max_x || bounds.min_y > bounds.max_y {
            return Err(invalid(format!("bounds {bounds:?} are not a valid box")));
        }
    }
    if let Some(outline) = &input.bounds_outline {
        if outline.len() < 3 || !outline.iter().all(|&p| finite(p)) {
            return Err(invalid(
                "bounds_outline needs at least three finite points".to_string(),
            ));
        }
        if Rect::from_points(outline.iter().copied()).is_none_or(|r| r.area() <= 0.0) {
            return Err(invalid("bounds_outline encloses no area".to_string()));
        }
    }

    Ok(())
}

/// Packs every component of `input` or reports why one could not be placed.
pub fn pack(input: PackInput) -> Result<PackOutput> {
    let max_iterations = input.max_iterations;
    let mut engine = PackEngine::new(input);
    engine.solve(max_iterations)?;
    Ok(PackOutput {
        components: engine.packed,
    })
}
