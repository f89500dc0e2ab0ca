//! Control point placement from halfplane constraints
//!
//! Every collision yields a constraint `a·x + b·y ≥ c` on the vertical shifts
//! `x`, `y` of the two control points, with `a` and `b` the Bézier basis
//! weights of the control points where the collision happens. The solver
//! picks one direction in the `(x, y)` quadrant and walks along it until all
//! constraints hold.

use std::f64::consts::FRAC_PI_4;

use super::bezier::{bezier_param_at_position, control_point_weights, BezierCurve};
use super::positioner::CurvePositioner;
use super::shape::rotate_slope;
use crate::models::{slope, BulgeEntry, Point};

/// Constraints closer than this to the middle (as a fraction of the span) are kept
const MAX_CENTER_DISTANCE: f64 = 0.45;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlPointConstraint {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl ControlPointConstraint {
    /// Constraint for pushing the curve at parameter `t` by `c`
    pub fn at_param(t: f64, c: f64) -> Self {
        let (a, b) = control_point_weights(t);
        Self { a, b, c }
    }
}

/// Result of the vertical control point solve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlPointAdjustment {
    pub left_shift: f64,
    pub right_shift: f64,
    /// Obstacles are below the curve, so it moves upwards
    pub move_upwards: bool,
    pub requested_staff_space: f64,
}

/// Solve the constraints along a single averaged direction
///
/// Each constraint contributes the angle of the normal of its boundary
/// weighted by the distance of the boundary to the origin. The mean angle is
/// clamped towards `π/4` depending on `symmetry`.
pub fn solve_control_point_constraints(
    constraints: &[ControlPointConstraint],
    symmetry: f64,
) -> (f64, f64) {
    if constraints.is_empty() {
        return (0.0, 0.0);
    }

    let mut weight_sum = 0.0;
    let mut weighted_angle_sum = 0.0;
    for constraint in constraints {
        let weight = constraint.c / constraint.a.hypot(constraint.b);
        weighted_angle_sum += weight * (constraint.b / constraint.a).atan();
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        return (0.0, 0.0);
    }

    let angle = (weighted_angle_sum / weight_sum)
        .max(symmetry * FRAC_PI_4)
        .min((2.0 - symmetry) * FRAC_PI_4);
    let slope = angle.tan();

    let x_max = constraints
        .iter()
        .map(|c| c.c / (c.a + slope * c.b))
        .fold(0.0, f64::max);

    (x_max, slope * x_max)
}

/// Long curves get their control offsets adjusted; with high symmetry short ones keep theirs
pub fn allow_control_offset_adjustment(bezier: &BezierCurve, symmetry: f64, unit: f64) -> bool {
    bezier.p1.distance(bezier.p2) > symmetry * 40.0 * unit
}

/// Horizontal control point offsets derived from obstacle corners
///
/// Starting with the slopes `p1-c1` and `p2-c2`, every obstacle corner on
/// the inner side of the curve may demand a steeper departure. The offset
/// follows from the control height and the steepest slope, but never drops
/// below a twentieth of the span. Returns `None` if no slope is available.
pub fn calc_control_point_offset(
    positioner: &CurvePositioner,
    bezier: &BezierCurve,
    margin: f64,
) -> Option<(f64, f64)> {
    if bezier.is_degenerate() {
        return None;
    }

    let mut left_slope_max = slope(bezier.p1, bezier.c1).abs();
    let mut right_slope_max = slope(bezier.p2, bezier.c2).abs();
    let left_above = bezier.is_left_control_above();
    let right_above = bezier.is_right_control_above();

    for element in positioner.spanned_elements() {
        if element.discarded {
            continue;
        }
        let y = if element.is_below {
            element.bbox.top
        } else {
            element.bbox.bottom
        };
        let corner_left = Point::new(element.bbox.left, y);
        let corner_right = Point::new(element.bbox.right, y);

        if corner_left.x > bezier.p1.x + margin && left_above == element.is_below {
            let s = slope(bezier.p1, corner_left);
            if s > 0.0 && left_above {
                left_slope_max = left_slope_max.max(rotate_slope(s, 10.0, 2.5, true));
            }
            if s < 0.0 && !left_above {
                left_slope_max = left_slope_max.max(rotate_slope(-s, 10.0, 2.5, true));
            }
        }

        if corner_right.x < bezier.p2.x - margin && right_above == element.is_below {
            let s = slope(bezier.p2, corner_right);
            if s < 0.0 && right_above {
                right_slope_max = right_slope_max.max(rotate_slope(-s, 10.0, 2.5, true));
            }
            if s > 0.0 && !right_above {
                right_slope_max = right_slope_max.max(rotate_slope(s, 10.0, 2.5, true));
            }
        }
    }

    if left_slope_max == 0.0 || right_slope_max == 0.0 {
        return None;
    }

    let min_offset = bezier.span() / 20.0;
    let mut left_offset = min_offset;
    if bezier.left_control_offset() > 0.0 {
        left_offset = left_offset.max(bezier.left_control_height().abs() / left_slope_max);
    }
    let mut right_offset = min_offset;
    if bezier.right_control_offset() > 0.0 {
        right_offset = right_offset.max(bezier.right_control_height().abs() / right_slope_max);
    }
    Some((left_offset, right_offset))
}

/// Build constraints from the colliding spanned elements and solve them
///
/// Obstacles below and above the curve are gathered separately and the side
/// with the deeper collision wins. Elements clear of the curve are discarded.
pub fn calc_control_point_vertical_shift(
    positioner: &mut CurvePositioner,
    bezier: &BezierCurve,
    symmetry: f64,
    margin: f64,
) -> ControlPointAdjustment {
    let mut adjustment = ControlPointAdjustment::default();
    if bezier.is_degenerate() {
        return adjustment;
    }

    let mut above_constraints = Vec::new();
    let mut below_constraints = Vec::new();
    let mut max_intersection_above: f64 = 0.0;
    let mut max_intersection_below: f64 = 0.0;

    let dist = bezier.span();
    let points = bezier.points();

    let mut discards = Vec::new();
    for (index, element) in positioner.spanned_elements().iter().enumerate() {
        if element.discarded {
            continue;
        }
        let collision = positioner.calc_directional_left_right_adjustment(
            &element.bbox,
            element.is_below,
            margin,
            true,
        );
        if collision.discard {
            discards.push(index);
            continue;
        }
        if !collision.collides() {
            continue;
        }

        let (constraints, max_intersection) = if element.is_below {
            (&mut below_constraints, &mut max_intersection_below)
        } else {
            (&mut above_constraints, &mut max_intersection_above)
        };

        let x_left = bezier.p1.x.max(element.bbox.left);
        let x_right = bezier.p2.x.min(element.bbox.right);
        for (x, intersection) in [(x_left, collision.left), (x_right, collision.right)] {
            let ratio = (x - bezier.p1.x) / dist;
            // Collisions close to the endpoints would demand huge shifts
            if (0.5 - ratio).abs() < MAX_CENTER_DISTANCE && intersection > 0.0 {
                let t = bezier_param_at_position(&points, x);
                constraints.push(ControlPointConstraint::at_param(t, intersection));
                *max_intersection = max_intersection.max(intersection);
            }
        }
    }

    let elements = positioner.spanned_elements_mut();
    for index in discards {
        elements[index].discarded = true;
    }

    if max_intersection_above > max_intersection_below {
        (adjustment.left_shift, adjustment.right_shift) =
            solve_control_point_constraints(&above_constraints, symmetry);
        adjustment.move_upwards = false;
    } else {
        (adjustment.left_shift, adjustment.right_shift) =
            solve_control_point_constraints(&below_constraints, symmetry);
        adjustment.move_upwards = true;
    }

    adjustment.requested_staff_space =
        requested_staff_space(bezier, margin, max_intersection_above, max_intersection_below);
    adjustment
}

/// Extra staff distance a curve needs to fit
///
/// Mixed curves need the vertical distance of their endpoints plus some
/// margin; obstacles on both sides add up.
pub fn requested_staff_space(
    bezier: &BezierCurve,
    margin: f64,
    max_intersection_above: f64,
    max_intersection_below: f64,
) -> f64 {
    let left_above = bezier.is_left_control_above();
    let right_above = bezier.is_right_control_above();
    let mut space = match (left_above, right_above) {
        (true, false) => (bezier.p1.y - bezier.p2.y + 6.0 * margin).max(0.0),
        (false, true) => (bezier.p2.y - bezier.p1.y + 6.0 * margin).max(0.0),
        _ => 0.0,
    };
    if max_intersection_above > 0.0 && max_intersection_below > 0.0 {
        space = space.max(max_intersection_above + max_intersection_below);
    }
    space
}

/// Add the solved shifts to the control heights
///
/// Heights are measured per side, so a shift counts positively on sides
/// whose control point lies in the direction of the move.
pub fn apply_control_point_adjustment(bezier: &mut BezierCurve, adjustment: &ControlPointAdjustment) {
    let left_sign = if bezier.is_left_control_above() == adjustment.move_upwards {
        1.0
    } else {
        -1.0
    };
    bezier.set_left_control_height(bezier.left_control_height() + left_sign * adjustment.left_shift);
    let right_sign = if bezier.is_right_control_above() == adjustment.move_upwards {
        1.0
    } else {
        -1.0
    };
    bezier.set_right_control_height(
        bezier.right_control_height() + right_sign * adjustment.right_shift,
    );
    bezier.update_control_points();
}

/// Place the control points from prescribed bulge entries
///
/// Inadmissible entries (non-positive distance, position outside the open
/// interval 0..100) are dropped. The control offsets are spread to cover the
/// prescribed positions, then one constraint per entry fixes the heights.
pub fn adjust_from_bulge(bezier: &mut BezierCurve, bulge: &[BulgeEntry], unit: f64) {
    if bezier.is_degenerate() {
        return;
    }

    let entries: Vec<&BulgeEntry> = bulge
        .iter()
        .filter(|e| e.distance > 0.0 && e.position > 0.0 && e.position < 100.0)
        .collect();

    let mut lambda_min: f64 = 0.66;
    let mut lambda_max: f64 = 0.33;
    for entry in &entries {
        let lambda = entry.position / 100.0;
        lambda_min = lambda_min.min(lambda);
        lambda_max = lambda_max.max(lambda);
    }

    lambda_min /= 2.0;
    lambda_max = 1.0 - (1.0 - lambda_max) / 2.0;
    let x_min = (1.0 - lambda_min) * bezier.p1.x + lambda_min * bezier.p2.x;
    let x_max = (1.0 - lambda_max) * bezier.p1.x + lambda_max * bezier.p2.x;
    bezier.set_left_control_offset(x_min - bezier.p1.x);
    bezier.set_right_control_offset(bezier.p2.x - x_max);
    bezier.update_control_points();

    let points = bezier.points();
    let constraints: Vec<ControlPointConstraint> = entries
        .iter()
        .map(|entry| {
            let lambda = entry.position / 100.0;
            let x = (1.0 - lambda) * bezier.p1.x + lambda * bezier.p2.x;
            let t = bezier_param_at_position(&points, x);
            ControlPointConstraint::at_param(t, entry.distance * unit)
        })
        .collect();

    let (left_shift, right_shift) = solve_control_point_constraints(&constraints, 0.0);
    bezier.set_left_control_height(bezier.left_control_height() + left_shift);
    bezier.set_right_control_height(bezier.right_control_height() + right_shift);
    bezier.update_control_points();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::positioner::{SpannedElement, SpannedKind};
    use crate::models::{BoundingBox, CurveDirection, CurveId, ObjectId, SpanningType};

    #[test]
    fn test_empty_constraints() {
        assert_eq!(solve_control_point_constraints(&[], 0.5), (0.0, 0.0));
    }

    #[test]
    fn test_solution_satisfies_all_constraints() {
        let constraints = [
            ControlPointConstraint::at_param(0.3, 5.0),
            ControlPointConstraint::at_param(0.5, 8.0),
            ControlPointConstraint::at_param(0.8, 3.0),
        ];
        for symmetry in [0.0, 0.5, 1.0] {
            let (x, y) = solve_control_point_constraints(&constraints, symmetry);
            for c in &constraints {
                assert!(c.a * x + c.b * y >= c.c - 1e-9);
            }
        }
    }

    #[test]
    fn test_full_symmetry_gives_equal_shifts() {
        let constraints = [ControlPointConstraint::at_param(0.3, 5.0)];
        let (x, y) = solve_control_point_constraints(&constraints, 1.0);
        assert!((x - y).abs() < 1e-9);
    }

    #[test]
    fn test_deeper_collision_shifts_more() {
        let shallow = solve_control_point_constraints(&[ControlPointConstraint::at_param(0.5, 2.0)], 0.0);
        let deep = solve_control_point_constraints(&[ControlPointConstraint::at_param(0.5, 6.0)], 0.0);
        assert!(deep.0 > shallow.0);
        assert!(deep.1 > shallow.1);
    }

    fn flat_curve() -> BezierCurve {
        let mut bezier = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, 8.0),
            Point::new(80.0, 8.0),
            Point::new(100.0, 0.0),
        );
        bezier.update_control_point_params();
        bezier
    }

    #[test]
    fn test_vertical_shift_clears_obstacle() {
        let mut bezier = flat_curve();
        let mut positioner = CurvePositioner::new(CurveId(0), 0, 1, SpanningType::StartEnd);
        positioner.update_curve_params(bezier.points(), 0.5, CurveDirection::Above);
        positioner.set_spanned_elements(vec![SpannedElement::new(
            SpannedKind::Element {
                id: ObjectId(1),
                layer_n: 1,
                tuplet_num: false,
            },
            BoundingBox::new(45.0, 55.0, 12.0, 0.0),
            true,
        )]);

        let adjustment = calc_control_point_vertical_shift(&mut positioner, &bezier, 0.0, 1.0);
        assert!(adjustment.move_upwards);
        assert!(adjustment.left_shift > 0.0 && adjustment.right_shift > 0.0);
        assert_eq!(adjustment.requested_staff_space, 0.0);

        apply_control_point_adjustment(&mut bezier, &adjustment);
        positioner.update_points(&bezier);
        let after = positioner.calc_directional_adjustment(
            &BoundingBox::new(45.0, 55.0, 12.0, 0.0),
            true,
            1.0,
        );
        assert!(after.max() < 1e-6);
    }

    #[test]
    fn test_requested_space_for_mixed_curve() {
        let mut bezier = BezierCurve::new(
            Point::new(0.0, 10.0),
            Point::new(20.0, 15.0),
            Point::new(80.0, -5.0),
            Point::new(100.0, 0.0),
        );
        bezier.set_control_sides(true, false);
        assert_eq!(requested_staff_space(&bezier, 1.0, 0.0, 0.0), 16.0);
        assert_eq!(requested_staff_space(&bezier, 1.0, 10.0, 12.0), 22.0);
    }

    #[test]
    fn test_bulge_lifts_curve() {
        let mut bezier = flat_curve();
        let before = bezier.y_at_x(50.0);
        adjust_from_bulge(
            &mut bezier,
            &[
                BulgeEntry {
                    distance: 6.0,
                    position: 50.0,
                },
                BulgeEntry {
                    distance: -1.0,
                    position: 20.0,
                },
            ],
            2.0,
        );
        assert!(bezier.y_at_x(50.0) >= before + 12.0 - 1e-6);
    }
}
