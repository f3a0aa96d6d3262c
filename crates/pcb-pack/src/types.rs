//! Input and output schema of the packer.
//!
//! The JSON form uses snake_case keys and `{ "x": .., "y": .. }` points.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Serde adapter storing a [`Point`] as `{ "x": .., "y": .. }`.
pub(crate) mod xy {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xy {
        x: f64,
        y: f64,
    }

    pub fn serialize<S: Serializer>(p: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        Xy { x: p.x, y: p.y }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let Xy { x, y } = Xy::deserialize(deserializer)?;
        Ok(DVec2::new(x, y))
    }

    pub mod vec {
        use super::*;

        pub fn serialize<S: Serializer>(
            points: &[Point],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let xy: Vec<Xy> = points.iter().map(|p| Xy { x: p.x, y: p.y }).collect();
            xy.serialize(serializer)
        }
    }

    pub mod option_vec {
        use super::*;

        pub fn serialize<S: Serializer>(
            points: &Option<Vec<Point>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let xy: Option<Vec<Xy>> = points
                .as_ref()
                .map(|points| points.iter().map(|p| Xy { x: p.x, y: p.y }).collect());
            xy.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<Point>>, D::Error> {
            let xy = Option::<Vec<Xy>>::deserialize(deserializer)?;
            Ok(xy.map(|xy| xy.into_iter().map(|Xy { x, y }| DVec2::new(x, y)).collect()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadShape {
    #[default]
    Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Size {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPad {
    pub pad_id: String,
    pub network_id: String,
    #[serde(default)]
    pub shape: PadShape,
    pub size: Size,
    #[serde(with = "xy")]
    pub offset: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputComponent {
    pub component_id: String,
    pub pads: Vec<InputPad>,
    /// Allowed counter-clockwise rotations. Empty means `[0]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_rotation_degrees: Vec<f64>,
}

impl InputComponent {
    pub fn allowed_rotations(&self) -> Vec<f64> {
        if self.available_rotation_degrees.is_empty() {
            vec![0.0]
        } else {
            self.available_rotation_degrees.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedPad {
    pub pad_id: String,
    pub network_id: String,
    #[serde(default)]
    pub shape: PadShape,
    pub size: Size,
    #[serde(with = "xy")]
    pub offset: Point,
    #[serde(with = "xy")]
    pub absolute_center: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedComponent {
    pub component_id: String,
    #[serde(with = "xy")]
    pub center: Point,
    pub ccw_rotation_offset_degrees: f64,
    pub pads: Vec<PackedPad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub obstacle_id: String,
    #[serde(with = "xy")]
    pub absolute_center: Point,
    pub width: f64,
    pub height: f64,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.absolute_center, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackOrderStrategy {
    #[default]
    LargestToSmallest,
    SmallestToLargest,
    InputOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackPlacementStrategy {
    MinimumSumDistanceToNetwork,
    #[default]
    MinimumSumSquaredDistanceToNetwork,
    ShortestConnectionAlongOutline,
}

fn default_direction() -> Point {
    DVec2::X
}

fn default_max_iterations() -> usize {
    1_000_000
}

/// Everything the pack engine needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackInput {
    pub components: Vec<InputComponent>,
    #[serde(default)]
    pub min_gap: f64,
    #[serde(default)]
    pub pack_order_strategy: PackOrderStrategy,
    #[serde(default)]
    pub pack_placement_strategy: PackPlacementStrategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstacles: Vec<Obstacle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(
        default,
        with = "xy::option_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub bounds_outline: Option<Vec<Point>>,
    /// Where unconnected components go relative to the existing footprint.
    #[serde(default = "default_direction", with = "xy")]
    pub default_direction: Point,
    /// Step budget for [`crate::Solver::solve`].
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl PackInput {
    pub fn new(components: Vec<InputComponent>) -> Self {
        Self {
            components,
            min_gap: 0.0,
            pack_order_strategy: PackOrderStrategy::default(),
            pack_placement_strategy: PackPlacementStrategy::default(),
            obstacles: Vec::new(),
            bounds: None,
            bounds_outline: None,
            default_direction: default_direction(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn with_min_gap(mut self, min_gap: f64) -> Self {
        self.min_gap = min_gap;
        self
    }

    pub fn with_order_strategy(mut self, strategy: PackOrderStrategy) -> Self {
        self.pack_order_strategy = strategy;
        self
    }

    pub fn with_placement_strategy(mut self, strategy: PackPlacementStrategy) -> Self {
        self.pack_placement_strategy = strategy;
        self
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_bounds_outline(mut self, outline: Vec<Point>) -> Self {
        self.bounds_outline = Some(outline);
        self
    }

    pub fn with_default_direction(mut self, direction: Point) -> Self {
        self.default_direction = direction;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// The allowed region as a polygon: the explicit outline wins over the box.
    pub fn allowed_outline(&self) -> Option<Vec<Point>> {
        self.bounds_outline
            .clone()
            .or_else(|| self.bounds.map(|b| b.corners().to_vec()))
    }

    /// Axis-aligned box around the allowed region, if there is one.
    pub fn global_bounds(&self) -> Option<Rect> {
        match &self.bounds_outline {
            Some(outline) => Rect::from_points(outline.iter().copied()),
            None => self.bounds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackOutput {
    pub components: Vec<PackedComponent>,
}
