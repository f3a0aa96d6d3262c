//! # pcb-pack
//!
//! Constructive packing of PCB component footprints.
//!
//! Components are rigid groups of rectangular pads, each tagged with a
//! network. They are placed one at a time: every new component is slid
//! along the outline of everything already placed and settles where its
//! pads sit closest to the pads they connect to, without overlapping
//! anything by less than the minimum gap.
//!
//! ## Features
//!
//! - Free-space outlines with holes, built by polygon boolean difference
//! - Per-segment IRLS search for sum and sum-of-squares objectives
//! - Largest free rectangle check for every candidate
//! - Optional rectangular or polygonal bounds and fixed obstacles
//! - Cooperative stepping with read-only snapshots of every solver
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::DVec2;
//! use pcb_pack::{pack, InputComponent, InputPad, PackInput, Size};
//!
//! let resistor = |id: &str, left: &str, right: &str| InputComponent {
//!     component_id: id.to_string(),
//!     pads: vec![
//!         InputPad {
//!             pad_id: format!("{id}.1"),
//!             network_id: left.to_string(),
//!             shape: Default::default(),
//!             size: Size::new(0.6, 0.6),
//!             offset: DVec2::new(-0.5, 0.0),
//!         },
//!         InputPad {
//!             pad_id: format!("{id}.2"),
//!             network_id: right.to_string(),
//!             shape: Default::default(),
//!             size: Size::new(0.6, 0.6),
//!             offset: DVec2::new(0.5, 0.0),
//!         },
//!     ],
//!     available_rotation_degrees: vec![0.0, 90.0],
//! };
//!
//! let input = PackInput::new(vec![resistor("R1", "VCC", "OUT"), resistor("R2", "OUT", "GND")])
//!     .with_min_gap(0.25);
//!
//! let output = pack(input).unwrap();
//! assert_eq!(output.components.len(), 2);
//! ```
//!
//! ## Stepping
//!
//! [`PackEngine`], [`SingleComponentPlacer`], [`SegmentSolver`] and
//! [`LargestRectSolver`] all implement [`Solver`] and [`Visualize`], so a
//! debugger can advance them one step at a time and draw their state.

pub mod engine;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod largest_rect;
pub mod outline;
pub mod placer;
pub mod segment_solver;
pub mod solver;
pub mod types;
pub mod visualize;

pub use engine::{pack, PackEngine};
pub use error::{PackError, Result};
pub use footprint::{
    does_component_violate_bounds, does_component_violate_bounds_outline, find_overlaps,
    pack_component, packed_footprint, Overlap,
};
pub use geometry::{convex_hull, point_in_outline, Point, PointLocation, Rect, Segment};
pub use largest_rect::{largest_rect, LargestRectSolver};
pub use outline::{build_outline, Loop, LoopKind};
pub use placer::{PlacementContext, SingleComponentPlacer};
pub use segment_solver::SegmentSolver;
pub use solver::{Solver, SolverStatus};
pub use types::{
    InputComponent, InputPad, Obstacle, PackInput, PackOrderStrategy, PackOutput,
    PackPlacementStrategy, PackedComponent, PackedPad, PadShape, Size,
};
pub use visualize::{GraphicsObject, Visualize};
