//! Per-instance curve geometry and obstacle list
//!
//! A curve split by a system break is drawn several times; each drawn
//! instance gets its own `CurvePositioner`, rebuilt on every layout pass.

use serde::{Deserialize, Serialize};

use super::bezier::{bezier_at_position, BezierCurve};
use crate::models::{BoundingBox, CurveDirection, CurveId, ObjectId, Point, SpanningType};

/// What a spanned element refers to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpannedKind {
    /// A notated object of the score in the given layer
    Element {
        id: ObjectId,
        layer_n: u32,
        tuplet_num: bool,
    },
    /// A tie of the same system, by index into the system's ties
    Tie { index: usize, layer_n: u32 },
}

/// An obstacle below or above the horizontal span of a curve
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpannedElement {
    pub kind: SpannedKind,
    pub bbox: BoundingBox,
    /// The obstacle is expected below the curve
    pub is_below: bool,
    /// Judged irrelevant; stays set until the list is collected again
    pub discarded: bool,
}

impl SpannedElement {
    pub fn new(kind: SpannedKind, bbox: BoundingBox, is_below: bool) -> Self {
        Self {
            kind,
            bbox,
            is_below,
            discarded: false,
        }
    }

    pub fn layer_n(&self) -> u32 {
        match self.kind {
            SpannedKind::Element { layer_n, .. } | SpannedKind::Tie { layer_n, .. } => layer_n,
        }
    }
}

/// Vertical overlap of an obstacle with a curve at the obstacle's left and right edges
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalAdjustment {
    pub left: f64,
    pub right: f64,
    /// Nothing overlaps: the obstacle can be ignored for good
    pub discard: bool,
}

impl DirectionalAdjustment {
    pub fn max(&self) -> f64 {
        self.left.max(self.right)
    }

    pub fn collides(&self) -> bool {
        self.left > 0.0 || self.right > 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurvePositioner {
    pub curve: CurveId,
    pub system: usize,
    pub staff_n: u32,
    pub spanning_type: SpanningType,
    points: [Point; 4],
    dir: CurveDirection,
    thickness: f64,
    spanned_elements: Vec<SpannedElement>,
    requested_staff_space: f64,
}

impl CurvePositioner {
    pub fn new(curve: CurveId, system: usize, staff_n: u32, spanning_type: SpanningType) -> Self {
        Self {
            curve,
            system,
            staff_n,
            spanning_type,
            points: [Point::default(); 4],
            dir: CurveDirection::None,
            thickness: 0.0,
            spanned_elements: Vec::new(),
            requested_staff_space: 0.0,
        }
    }

    /// Store freshly computed geometry
    pub fn update_curve_params(&mut self, points: [Point; 4], thickness: f64, dir: CurveDirection) {
        self.points = points;
        self.thickness = thickness;
        self.dir = dir;
    }

    /// Direction only, for collecting before any geometry exists
    pub fn set_dir(&mut self, dir: CurveDirection) {
        self.dir = dir;
    }

    pub fn update_points(&mut self, bezier: &BezierCurve) {
        self.points = bezier.points();
    }

    pub fn points(&self) -> [Point; 4] {
        self.points
    }

    pub fn dir(&self) -> CurveDirection {
        self.dir
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Whether there is anything to position
    pub fn has_content(&self) -> bool {
        self.dir != CurveDirection::None && self.points[0].x < self.points[3].x
    }

    pub fn requested_staff_space(&self) -> f64 {
        self.requested_staff_space
    }

    pub fn set_requested_staff_space(&mut self, space: f64) {
        self.requested_staff_space = space;
    }

    pub fn spanned_elements(&self) -> &[SpannedElement] {
        &self.spanned_elements
    }

    pub fn spanned_elements_mut(&mut self) -> &mut [SpannedElement] {
        &mut self.spanned_elements
    }

    pub fn set_spanned_elements(&mut self, elements: Vec<SpannedElement>) {
        self.spanned_elements = elements;
    }

    pub fn clear_spanned_elements(&mut self) {
        self.spanned_elements.clear();
    }

    pub fn move_front_horizontal(&mut self, distance: f64) {
        self.points[0].x += distance;
        self.points[1].x += distance;
    }

    pub fn move_back_horizontal(&mut self, distance: f64) {
        self.points[2].x += distance;
        self.points[3].x += distance;
    }

    pub fn move_front_vertical(&mut self, distance: f64) {
        self.points[0].y += distance;
        self.points[1].y += distance;
    }

    pub fn move_back_vertical(&mut self, distance: f64) {
        self.points[2].y += distance;
        self.points[3].y += distance;
    }

    /// Vertical overlap between the curve and an obstacle
    ///
    /// Obstacles expected below the curve are compared against the curve's
    /// lower outline, the others against its upper outline, keeping `margin`
    /// of clearance. The result is measured at the obstacle's left and right
    /// edges, or at the endpoints when the obstacle reaches past them.
    pub fn calc_directional_left_right_adjustment(
        &self,
        bbox: &BoundingBox,
        is_below: bool,
        margin: f64,
        horizontal_overlap: bool,
    ) -> DirectionalAdjustment {
        let p1 = self.points[0];
        let p2 = self.points[3];

        if horizontal_overlap && (p2.x < bbox.left + margin || p1.x > bbox.right + margin) {
            return DirectionalAdjustment::default();
        }

        let angle = BezierCurve::from_points(self.points).chord_angle();
        let (top_bezier, bottom_bezier) =
            BezierCurve::from_points(self.points).thick_outlines(self.thickness, angle);

        let (outline, offset) = if is_below {
            (&bottom_bezier, -margin)
        } else {
            (&top_bezier, margin)
        };
        let left_y = if p1.x < bbox.left {
            bezier_at_position(outline, bbox.left) + offset
        } else {
            p1.y + offset
        };
        let right_y = if p2.x > bbox.right {
            bezier_at_position(outline, bbox.right) + offset
        } else {
            p2.y + offset
        };

        let (left, right) = if is_below {
            ((bbox.top - left_y).max(0.0), (bbox.top - right_y).max(0.0))
        } else {
            ((left_y - bbox.bottom).max(0.0), (right_y - bbox.bottom).max(0.0))
        };

        DirectionalAdjustment {
            left,
            right,
            discard: left == 0.0 && right == 0.0,
        }
    }

    pub fn calc_directional_adjustment(
        &self,
        bbox: &BoundingBox,
        is_below: bool,
        margin: f64,
    ) -> DirectionalAdjustment {
        self.calc_directional_left_right_adjustment(bbox, is_below, margin, true)
    }
}
