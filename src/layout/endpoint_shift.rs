//! Vertical endpoint shift for collisions close to the ends of a curve
//!
//! Collisions within the full shift radius of an endpoint move it by their
//! whole depth. Between the full and the partial radius the depth is weighted
//! down quadratically; beyond that the control points take over.

use super::bezier::BezierCurve;
use super::positioner::CurvePositioner;
use crate::models::{CurveDirection, SpanningType};

/// Maximal vertical shift of the left and right endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EndPointShift {
    pub left: f64,
    pub right: f64,
}

impl EndPointShift {
    pub fn is_zero(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }

    /// Account for a collision of `intersection` at `ratio` of the span
    ///
    /// `is_below` tells on which side of the curve the obstacle lies; only
    /// ends curving towards the obstacle are moved.
    pub fn add_collision(
        &mut self,
        ratio: f64,
        intersection: f64,
        flexibility: f64,
        is_below: bool,
        dir: CurveDirection,
        spanning_type: SpanningType,
    ) {
        let (full, partial) = calc_shift_radii(true, flexibility, spanning_type);
        if ratio < partial && dir.is_start_above() == is_below {
            let weighted = if ratio > full {
                intersection * calc_quadratic_interpolation(partial, full, ratio)
            } else {
                intersection
            };
            self.left = self.left.max(weighted);
        }

        let (full, partial) = calc_shift_radii(false, flexibility, spanning_type);
        if ratio > 1.0 - partial && dir.is_end_above() == is_below {
            let weighted = if ratio < 1.0 - full {
                intersection * calc_quadratic_interpolation(1.0 - partial, 1.0 - full, ratio)
            } else {
                intersection
            };
            self.right = self.right.max(weighted);
        }
    }
}

/// Full and partial shift radius for one side
///
/// Broken ends are always fully flexible.
pub fn calc_shift_radii(for_left: bool, flexibility: f64, spanning_type: SpanningType) -> (f64, f64) {
    let broken = if for_left {
        !spanning_type.has_start()
    } else {
        !spanning_type.has_end()
    };
    let flexibility = if broken { 1.0 } else { flexibility };

    let full = 0.05 + flexibility * 0.15;
    (full, full * 3.0)
}

/// Quadratic function which is 0 at `zero_at` and 1 at `one_at`
pub fn calc_quadratic_interpolation(zero_at: f64, one_at: f64, arg: f64) -> f64 {
    debug_assert!(zero_at != one_at);
    let a = 1.0 / (one_at - zero_at);
    let b = zero_at / (zero_at - one_at);
    (a * arg + b).powi(2)
}

/// Endpoint shift required by the spanned elements of the positioner
///
/// Elements found to be clear of the curve are discarded on the way.
pub fn calc_end_point_shift(
    positioner: &mut CurvePositioner,
    bezier: &BezierCurve,
    flexibility: f64,
    margin: f64,
) -> EndPointShift {
    let mut shift = EndPointShift::default();
    if bezier.is_degenerate() {
        return shift;
    }
    let dist = bezier.span();
    let dir = positioner.dir();
    let spanning_type = positioner.spanning_type;

    let mut discards = Vec::new();
    for (index, element) in positioner.spanned_elements().iter().enumerate() {
        if element.discarded {
            continue;
        }
        let adjustment = positioner.calc_directional_left_right_adjustment(
            &element.bbox,
            element.is_below,
            margin,
            true,
        );
        if adjustment.discard {
            discards.push(index);
            continue;
        }
        if !adjustment.collides() {
            continue;
        }

        let x_left = bezier.p1.x.max(element.bbox.left);
        shift.add_collision(
            (x_left - bezier.p1.x) / dist,
            adjustment.left,
            flexibility,
            element.is_below,
            dir,
            spanning_type,
        );
        let x_right = bezier.p2.x.min(element.bbox.right);
        shift.add_collision(
            (x_right - bezier.p1.x) / dist,
            adjustment.right,
            flexibility,
            element.is_below,
            dir,
            spanning_type,
        );
    }

    let elements = positioner.spanned_elements_mut();
    for index in discards {
        elements[index].discarded = true;
    }
    shift
}

/// Move the endpoints outwards and blend the shift into the control points
pub fn apply_end_point_shift(bezier: &mut BezierCurve, shift: EndPointShift) {
    if shift.is_zero() {
        return;
    }
    let sign_left = if bezier.is_left_control_above() { 1.0 } else { -1.0 };
    let sign_right = if bezier.is_right_control_above() { 1.0 } else { -1.0 };
    // Positions of the control points along the unshifted chord
    let (lambda1, lambda2) = bezier.estimate_curve_param_for_control_points();
    bezier.p1.y += sign_left * shift.left;
    bezier.p2.y += sign_right * shift.right;
    if bezier.p1.x != bezier.p2.x {
        bezier.c1.y +=
            sign_left * (1.0 - lambda1) * shift.left + sign_right * lambda1 * shift.right;
        bezier.c2.y +=
            sign_left * (1.0 - lambda2) * shift.left + sign_right * lambda2 * shift.right;
    }
    bezier.update_control_point_params();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    #[test]
    fn test_shift_radii() {
        let (full, partial) = calc_shift_radii(true, 0.0, SpanningType::StartEnd);
        assert!((full - 0.05).abs() < 1e-12);
        assert!((partial - 0.15).abs() < 1e-12);

        // Broken start is fully flexible
        let (full, partial) = calc_shift_radii(true, 0.0, SpanningType::End);
        assert!((full - 0.2).abs() < 1e-12);
        assert!((partial - 0.6).abs() < 1e-12);
        let (full, _) = calc_shift_radii(false, 0.0, SpanningType::End);
        assert!((full - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_quadratic_interpolation() {
        assert!(calc_quadratic_interpolation(0.15, 0.05, 0.15).abs() < 1e-12);
        assert!((calc_quadratic_interpolation(0.15, 0.05, 0.05) - 1.0).abs() < 1e-12);
        let mid = calc_quadratic_interpolation(0.15, 0.05, 0.1);
        assert!((mid - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_collision_weighting() {
        let mut shift = EndPointShift::default();
        // Fully inside the radius
        shift.add_collision(0.02, 10.0, 0.0, true, CurveDirection::Above, SpanningType::StartEnd);
        assert_eq!(shift.left, 10.0);
        assert_eq!(shift.right, 0.0);

        // Partially weighted near the end
        shift.add_collision(0.9, 8.0, 0.0, true, CurveDirection::Above, SpanningType::StartEnd);
        assert!(shift.right > 0.0 && shift.right < 8.0);

        // Obstacles above an above curve do not move the endpoints
        let mut other = EndPointShift::default();
        other.add_collision(0.02, 10.0, 0.0, false, CurveDirection::Above, SpanningType::StartEnd);
        assert!(other.is_zero());
    }

    #[test]
    fn test_apply_shift_moves_controls() {
        let mut bezier = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(25.0, 10.0),
            Point::new(75.0, 10.0),
            Point::new(100.0, 0.0),
        );
        bezier.update_control_point_params();
        apply_end_point_shift(&mut bezier, EndPointShift { left: 4.0, right: 0.0 });
        assert_eq!(bezier.p1.y, 4.0);
        assert_eq!(bezier.p2.y, 0.0);
        assert!((bezier.c1.y - 13.0).abs() < 1e-9);
        assert!((bezier.c2.y - 11.0).abs() < 1e-9);
    }
}
