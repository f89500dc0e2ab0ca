//! Shape correction: minimal departure angle and convexity

use super::bezier::BezierCurve;
use crate::models::{slope, CurveDirection, Point};

/// Rotate a slope by `degrees`, or double it once it is past `doubling_bound`
///
/// Doubling keeps steep slopes from tipping over the vertical.
pub fn rotate_slope(slope: f64, degrees: f64, doubling_bound: f64, upwards: bool) -> f64 {
    debug_assert!(degrees >= 0.0);
    debug_assert!(doubling_bound >= 0.0);

    if upwards && slope >= doubling_bound {
        return slope * 2.0;
    }
    if !upwards && slope <= -doubling_bound {
        return slope * 2.0;
    }
    let sign = if upwards { 1.0 } else { -1.0 };
    (slope.atan() + sign * degrees.to_radians()).tan()
}

/// Minimal departure angle in degrees
///
/// Short and angled curves get up to 15 degrees more, unless a control point
/// sits horizontally outside its half of the span.
pub fn min_control_point_angle(bezier: &BezierCurve, angle_degrees: f64, unit: f64, base: f64) -> f64 {
    let angle = angle_degrees.abs();
    let distance = bezier.span() / unit;

    let mut increment = (angle / 4.0).min(15.0);
    let factor = (1.0 - (distance - 8.0) / 8.0).clamp(0.0, 1.0);

    let mid2 = bezier.p1.x + bezier.p2.x;
    if bezier.c1.x < bezier.p1.x || 2.0 * bezier.c1.x > mid2 {
        increment = 0.0;
    }
    if bezier.c2.x > bezier.p2.x || 2.0 * bezier.c2.x < mid2 {
        increment = 0.0;
    }

    base + increment * factor
}

/// Angles enforced by the shape corrector
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeAngles {
    /// Minimal angle between chord and control direction, in degrees
    pub min_control_angle: f64,
    /// Minimal angle between both control directions, in degrees
    pub convexity_angle: f64,
}

impl Default for ShapeAngles {
    fn default() -> Self {
        Self {
            min_control_angle: 30.0,
            convexity_angle: 3.0,
        }
    }
}

/// Correct flat or non-convex curves
///
/// Works in the frame where the chord is horizontal. Mixed curves are left
/// alone.
pub fn adjust_slur_shape(bezier: &mut BezierCurve, dir: CurveDirection, unit: f64, angles: ShapeAngles) {
    if bezier.is_degenerate() {
        return;
    }
    let above = match dir {
        CurveDirection::Above => true,
        CurveDirection::Below => false,
        _ => return,
    };

    let angle = bezier.chord_angle();
    let origin = bezier.p1;
    bezier.rotate(-angle, origin);
    bezier.update_control_point_params();

    // Minimal height, unless the midpoint would be lifted by more than 6 units
    let sign = if above { 1.0 } else { -1.0 };
    let shifted_midpoint = Point::new(
        (bezier.p1.x + bezier.p2.x) / 2.0,
        (bezier.p1.y + bezier.p2.y) / 2.0 + sign * 6.0 * unit,
    );
    let min_angle =
        min_control_point_angle(bezier, angle.to_degrees(), unit, angles.min_control_angle);
    let ignore_left = bezier.c1.x <= bezier.p1.x;
    let ignore_right = bezier.c2.x >= bezier.p2.x;
    let mut slope_left = slope(bezier.p1, bezier.c1);
    let mut slope_right = slope(bezier.p2, bezier.c2);
    let slope_base = slope(bezier.p1, bezier.p2);

    if above {
        let min_left = rotate_slope(slope_base, min_angle, 1.0, true)
            .min(slope(bezier.p1, shifted_midpoint));
        slope_left = slope_left.max(min_left);
        let min_right = rotate_slope(slope_base, min_angle, 1.0, false)
            .max(slope(bezier.p2, shifted_midpoint));
        slope_right = slope_right.min(min_right);
    } else {
        let min_left = rotate_slope(slope_base, min_angle, 1.0, false)
            .max(slope(bezier.p1, shifted_midpoint));
        slope_left = slope_left.min(min_left);
        let min_right = rotate_slope(slope_base, min_angle, 1.0, true)
            .min(slope(bezier.p2, shifted_midpoint));
        slope_right = slope_right.max(min_right);
    }
    apply_slopes(bezier, slope_left, slope_right, sign, ignore_left, ignore_right);

    // Convexity
    let convexity = angles.convexity_angle;
    if above {
        let min_left = rotate_slope(slope(bezier.p1, bezier.c2), convexity, 10.0, true);
        slope_left = slope_left.max(min_left);
        let min_right = rotate_slope(slope(bezier.p2, bezier.c1), convexity, 10.0, false);
        slope_right = slope_right.min(min_right);
    } else {
        let min_left = rotate_slope(slope(bezier.p1, bezier.c2), convexity, 10.0, false);
        slope_left = slope_left.min(min_left);
        let min_right = rotate_slope(slope(bezier.p2, bezier.c1), convexity, 10.0, true);
        slope_right = slope_right.max(min_right);
    }
    apply_slopes(bezier, slope_left, slope_right, sign, ignore_left, ignore_right);

    bezier.rotate(angle, origin);
    clamp_control_point_order(bezier);
}

/// Keep `p1.x <= c1.x <= c2.x <= p2.x`
///
/// Rotating the control points back from a steep chord can push them past
/// the endpoints.
pub fn clamp_control_point_order(bezier: &mut BezierCurve) {
    bezier.c1.x = bezier.c1.x.max(bezier.p1.x);
    bezier.c2.x = bezier.c2.x.max(bezier.c1.x);
    bezier.c2.x = bezier.c2.x.min(bezier.p2.x);
    bezier.c1.x = bezier.c1.x.min(bezier.c2.x);

    bezier.update_control_point_params();
}

fn apply_slopes(
    bezier: &mut BezierCurve,
    slope_left: f64,
    slope_right: f64,
    sign: f64,
    ignore_left: bool,
    ignore_right: bool,
) {
    if !ignore_left {
        bezier.set_left_control_height(slope_left * sign * bezier.left_control_offset());
    }
    if !ignore_right {
        bezier.set_right_control_height(slope_right * -sign * bezier.right_control_offset());
    }
    bezier.update_control_points();
}
