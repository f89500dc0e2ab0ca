//! Collision filtering and near-end collision detection

use super::bezier::{bezier_at_position, BezierCurve};
use super::positioner::{CurvePositioner, SpannedKind};
use crate::models::Point;

/// Obstacles this close to an endpoint (as a fraction of the span) may belong to the other voice
const NEAR_END_RATIO: f64 = 0.05;

/// Collision severity near both ends of a curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NearEndCollision {
    pub metric_at_start: f64,
    pub metric_at_end: f64,
    /// Secondary endpoints were used
    pub end_points_adjusted: bool,
}

impl NearEndCollision {
    pub fn start_exceeds(&self, threshold: f64) -> bool {
        self.metric_at_start > threshold
    }

    pub fn end_exceeds(&self, threshold: f64) -> bool {
        self.metric_at_end > threshold
    }
}

/// Layers of the anchors the curve is attached to
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnchorLayers {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// Mark spanned elements which lie completely on the other side of the curve
///
/// Such an obstacle is only discarded next to an endpoint and when it belongs
/// to another layer than that endpoint's anchor. Ties are always discarded
/// there, tuplet numbers anywhere.
pub fn filter_spanned_elements(
    positioner: &mut CurvePositioner,
    bezier: &BezierCurve,
    margin: f64,
    anchors: AnchorLayers,
) {
    if bezier.is_degenerate() {
        return;
    }
    let dist = bezier.span();

    let mut discards = Vec::new();
    for (index, element) in positioner.spanned_elements().iter().enumerate() {
        if element.discarded {
            continue;
        }

        let intersection = positioner
            .calc_directional_adjustment(&element.bbox, element.is_below, margin)
            .max();
        let distance_ratio = (element.bbox.center_x() - bezier.p1.x) / dist;

        if intersection <= element.bbox.height() + 4.0 * margin {
            continue;
        }

        let mut discard = false;
        if distance_ratio < NEAR_END_RATIO {
            discard = differs_from_anchor(element.kind, anchors.start);
        } else if distance_ratio > 1.0 - NEAR_END_RATIO {
            discard = differs_from_anchor(element.kind, anchors.end);
        }
        if let SpannedKind::Element {
            tuplet_num: true, ..
        } = element.kind
        {
            discard = true;
        }

        if discard {
            discards.push(index);
        }
    }

    if !discards.is_empty() {
        log::debug!(
            "curve {}: discarding {} spanned element(s) on the far side",
            positioner.curve.0,
            discards.len()
        );
    }
    let elements = positioner.spanned_elements_mut();
    for index in discards {
        elements[index].discarded = true;
    }
}

fn differs_from_anchor(kind: SpannedKind, anchor_layer: Option<u32>) -> bool {
    match kind {
        SpannedKind::Element { layer_n, .. } => anchor_layer != Some(layer_n),
        SpannedKind::Tie { .. } => true,
    }
}

/// Accumulate the ratio of intersection to distance from each endpoint
///
/// Both edges of every colliding obstacle are evaluated on the curve; the
/// distance is floored at 1 so obstacles touching an endpoint stay finite.
pub fn detect_collisions_near_end(
    positioner: &CurvePositioner,
    bezier: &BezierCurve,
    margin: f64,
) -> NearEndCollision {
    let mut collision = NearEndCollision::default();
    if bezier.is_degenerate() {
        return collision;
    }
    let points = bezier.points();

    for element in positioner.spanned_elements() {
        if element.discarded {
            continue;
        }
        let adjustment = positioner.calc_directional_left_right_adjustment(
            &element.bbox,
            element.is_below,
            margin,
            true,
        );
        if !adjustment.collides() {
            continue;
        }

        let x_left = bezier.p1.x.max(element.bbox.left);
        let x_right = bezier.p2.x.min(element.bbox.right);
        for (x, intersection) in [(x_left, adjustment.left), (x_right, adjustment.right)] {
            let point = Point::new(x, bezier_at_position(&points, x));
            let dist_start = bezier.p1.distance(point).max(1.0);
            let dist_end = bezier.p2.distance(point).max(1.0);
            collision.metric_at_start = collision.metric_at_start.max(intersection / dist_start);
            collision.metric_at_end = collision.metric_at_end.max(intersection / dist_end);
        }
    }

    collision
}
