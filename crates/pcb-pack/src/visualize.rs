//! Read-only snapshots of solver state for interactive debuggers.

use serde::Serialize;

use crate::geometry::{Point, Rect};
use crate::outline::{Loop, LoopKind};
use crate::types::xy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VizPoint {
    #[serde(with = "xy")]
    pub point: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VizLine {
    #[serde(with = "xy::vec")]
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VizRect {
    #[serde(with = "xy")]
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Geometric primitives describing a solver's current state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphicsObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub points: Vec<VizPoint>,
    pub lines: Vec<VizLine>,
    pub rects: Vec<VizRect>,
}

impl GraphicsObject {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn point(&mut self, point: Point, label: impl Into<String>, color: &str) {
        self.points.push(VizPoint {
            point,
            label: Some(label.into()),
            color: Some(color.to_string()),
        });
    }

    pub fn line(&mut self, points: Vec<Point>, color: &str) {
        self.lines.push(VizLine {
            points,
            stroke_color: Some(color.to_string()),
            label: None,
        });
    }

    pub fn rect(&mut self, rect: &Rect, fill: &str, label: impl Into<String>) {
        self.rects.push(VizRect {
            center: rect.center(),
            width: rect.width(),
            height: rect.height(),
            fill: Some(fill.to_string()),
            label: Some(label.into()),
        });
    }

    /// Draws every loop closed, outer loops and holes in different colors.
    pub fn loops(&mut self, loops: &[Loop]) {
        for l in loops {
            let mut points = l.points();
            if let Some(&first) = points.first() {
                points.push(first);
            }
            let color = match l.kind() {
                LoopKind::Outer => "blue",
                LoopKind::Hole => "orange",
            };
            self.line(points, color);
        }
    }

    pub fn extend(&mut self, other: GraphicsObject) {
        self.points.extend(other.points);
        self.lines.extend(other.lines);
        self.rects.extend(other.rects);
    }
}

/// Implemented by every solver. Must not change solver state.
pub trait Visualize {
    fn visualize(&self) -> GraphicsObject;
}
