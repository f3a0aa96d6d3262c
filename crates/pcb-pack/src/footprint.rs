//! Footprint geometry of components: rotating pads, bounding boxes and the
//! clearance checks shared by the solvers and the `check` command.
//!
//! Every footprint and obstacle is grown by half the minimum gap, so two
//! grown footprints that just touch are exactly `min_gap` apart.

use glam::DVec2;

use crate::geometry::{
    point_in_outline_within, rotate_degrees, segments_from_points, Point, PointLocation, Rect,
    Segment, CLEARANCE_TOLERANCE,
};
use crate::types::{InputComponent, InputPad, Obstacle, PackedComponent, PackedPad, Size};

/// A pad after applying the component rotation, still relative to the
/// component center.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedPad {
    pub pad_id: String,
    pub network_id: String,
    pub offset: Point,
    /// Axis-aligned box of the rotated pad, relative to the component center.
    pub local_rect: Rect,
}

/// Box of a pad of `size` rotated about its own center, centered at the origin.
fn rotated_pad_box(size: &Size, rotation: f64) -> Rect {
    let half = DVec2::new(size.x / 2.0, size.y / 2.0);
    let corners = [
        DVec2::new(-half.x, -half.y),
        DVec2::new(half.x, -half.y),
        DVec2::new(half.x, half.y),
        DVec2::new(-half.x, half.y),
    ];
    Rect::from_points(corners.map(|c| rotate_degrees(c, rotation)))
        .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0))
}

pub fn rotate_pad(pad: &InputPad, rotation: f64) -> RotatedPad {
    let offset = rotate_degrees(pad.offset, rotation);
    RotatedPad {
        pad_id: pad.pad_id.clone(),
        network_id: pad.network_id.clone(),
        offset,
        local_rect: rotated_pad_box(&pad.size, rotation).translate(offset),
    }
}

pub fn rotate_pads(component: &InputComponent, rotation: f64) -> Vec<RotatedPad> {
    component
        .pads
        .iter()
        .map(|pad| rotate_pad(pad, rotation))
        .collect()
}

/// Bounding box of rotated pads relative to the component center. A
/// component without pads is a point.
pub fn local_footprint(pads: &[RotatedPad]) -> Rect {
    pads.iter()
        .map(|pad| pad.local_rect)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0))
}

pub fn packed_footprint(component: &PackedComponent) -> Rect {
    component
        .pads
        .iter()
        .map(|pad| {
            rotated_pad_box(&pad.size, component.ccw_rotation_offset_degrees)
                .translate(pad.absolute_center)
        })
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| Rect::from_center_size(component.center, 0.0, 0.0))
}

/// Instantiates a component at `center` with the given rotation.
pub fn pack_component(component: &InputComponent, center: Point, rotation: f64) -> PackedComponent {
    PackedComponent {
        component_id: component.component_id.clone(),
        center,
        ccw_rotation_offset_degrees: rotation,
        pads: component
            .pads
            .iter()
            .map(|pad| PackedPad {
                pad_id: pad.pad_id.clone(),
                network_id: pad.network_id.clone(),
                shape: pad.shape,
                size: pad.size,
                offset: pad.offset,
                absolute_center: center + rotate_degrees(pad.offset, rotation),
            })
            .collect(),
    }
}

/// True when the grown footprint leaves the axis-aligned bounds.
pub fn does_component_violate_bounds(
    component: &PackedComponent,
    bounds: &Rect,
    min_gap: f64,
) -> bool {
    !bounds.contains_rect(&packed_footprint(component).expand(min_gap / 2.0))
}

/// True when the grown footprint is not fully inside the bounds polygon.
pub fn does_component_violate_bounds_outline(
    component: &PackedComponent,
    outline: &[Point],
    min_gap: f64,
) -> bool {
    rect_violates_outline(&packed_footprint(component).expand(min_gap / 2.0), outline)
}

pub(crate) fn rect_violates_outline(rect: &Rect, outline: &[Point]) -> bool {
    if outline.len() < 3 {
        return false;
    }
    if rect
        .corners()
        .iter()
        .any(|&corner| {
            point_in_outline_within(corner, outline, CLEARANCE_TOLERANCE) == PointLocation::Outside
        })
    {
        return true;
    }
    // Corners inside but a reflex vertex poking into the rect
    let interior = rect.expand(-CLEARANCE_TOLERANCE);
    if outline.iter().any(|&v| {
        v.x > interior.min_x && v.x < interior.max_x && v.y > interior.min_y && v.y < interior.max_y
    }) {
        return true;
    }
    // Or an edge of the outline passing through it
    let rect_edges = segments_from_points(&interior.corners());
    segments_from_points(outline)
        .iter()
        .any(|edge| rect_edges.iter().any(|r| crosses(edge, r)))
}

fn crosses(a: &Segment, b: &Segment) -> bool {
    let side = |s: &Segment, p: Point| s.vector().perp_dot(p - s.start);
    let (a1, a2) = (side(a, b.start), side(a, b.end));
    let (b1, b2) = (side(b, a.start), side(b, a.end));
    a1 * a2 < 0.0 && b1 * b2 < 0.0
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlap {
    Components { a: String, b: String },
    Obstacle { component_id: String, obstacle_id: String },
}

impl std::fmt::Display for Overlap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Overlap::Components { a, b } => write!(f, "{a} overlaps {b}"),
            Overlap::Obstacle {
                component_id,
                obstacle_id,
            } => write!(f, "{component_id} overlaps obstacle {obstacle_id}"),
        }
    }
}

/// All clearance violations among packed components and obstacles.
pub fn find_overlaps(
    packed: &[PackedComponent],
    obstacles: &[Obstacle],
    min_gap: f64,
) -> Vec<Overlap> {
    let half_gap = min_gap / 2.0;
    let footprints: Vec<Rect> = packed
        .iter()
        .map(|c| packed_footprint(c).expand(half_gap))
        .collect();

    let mut overlaps = Vec::new();
    for i in 0..packed.len() {
        for j in (i + 1)..packed.len() {
            if footprints[i].overlaps(&footprints[j]) {
                overlaps.push(Overlap::Components {
                    a: packed[i].component_id.clone(),
                    b: packed[j].component_id.clone(),
                });
            }
        }
        for obstacle in obstacles {
            if footprints[i].overlaps(&obstacle.rect().expand(half_gap)) {
                overlaps.push(Overlap::Obstacle {
                    component_id: packed[i].component_id.clone(),
                    obstacle_id: obstacle.obstacle_id.clone(),
                });
            }
        }
    }
    overlaps
}
