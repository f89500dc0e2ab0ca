//! Outer curves around inner curves, and curves sharing an anchor
//!
//! Runs once all curves on a staff have been positioned individually. Inner
//! curves act as obstacles for the curves enclosing them; curves sharing an
//! endpoint are pulled apart so they do not merge into one stroke.

use super::bezier::{bezier_at_position, bezier_param_at_position, point_at_bezier, BezierCurve};
use super::endpoint_shift::{apply_end_point_shift, EndPointShift};
use super::positioner::CurvePositioner;
use super::shape::{adjust_slur_shape, ShapeAngles};
use super::solver::{solve_control_point_constraints, ControlPointAdjustment, ControlPointConstraint};
use crate::models::{CurveDirection, CurveKind, CurveSpec, Point, ScoreSnapshot, SpanningType};

/// Whether `inner` is drawn inside `outer`
///
/// Both curves bow the same way, the anchors of the inner curve lie within
/// the horizontal range of the outer one (without both coinciding, unless a
/// phrase mark encloses a slur), their layers overlap and everything sits on
/// one staff.
pub fn has_inner_curve(
    snapshot: &ScoreSnapshot,
    outer: &CurveSpec,
    outer_dir: CurveDirection,
    inner: &CurveSpec,
    inner_dir: CurveDirection,
) -> bool {
    if outer_dir != inner_dir || outer_dir.is_mixed() || outer_dir == CurveDirection::None {
        return false;
    }
    let (Some(outer_start), Some(outer_end), Some(inner_start), Some(inner_end)) =
        (outer.start, outer.end, inner.start, inner.end)
    else {
        return false;
    };
    let objects = [outer_start, outer_end, inner_start, inner_end].map(|id| snapshot.object(id));
    let [Some(os), Some(oe), Some(is), Some(ie)] = objects else {
        return false;
    };

    // Same staff everywhere
    let staff_n = os.resolved_staff_n();
    if [oe, is, ie].iter().any(|o| o.resolved_staff_n() != staff_n) {
        return false;
    }
    if [oe, is, ie].iter().any(|o| o.system != os.system) {
        return false;
    }

    // Horizontal containment
    if is.drawing_x < os.drawing_x || ie.drawing_x > oe.drawing_x {
        return false;
    }
    // Coinciding spans: only a phrase mark encloses a slur
    let coincide = (inner_start == outer_start && inner_end == outer_end)
        || (is.drawing_x == os.drawing_x && ie.drawing_x == oe.drawing_x);
    if coincide && !(outer.kind == CurveKind::Phrase && inner.kind == CurveKind::Slur) {
        return false;
    }

    // Overlapping layer ranges
    let outer_layers = layer_bounds(os.layer_n, oe.layer_n);
    let inner_layers = layer_bounds(is.layer_n, ie.layer_n);
    outer_layers.0 <= inner_layers.1 && inner_layers.0 <= outer_layers.1
}

fn layer_bounds(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

/// Endpoint shift caused by the start, midpoint and end of the inner curves
pub fn calc_outer_end_point_shift(
    bezier: &BezierCurve,
    dir: CurveDirection,
    spanning_type: SpanningType,
    inner_curves: &[[Point; 4]],
    flexibility: f64,
    margin: f64,
) -> EndPointShift {
    let mut shift = EndPointShift::default();
    if bezier.is_degenerate() {
        return shift;
    }
    let dist = bezier.span();
    let is_below = dir == CurveDirection::Above;
    let sign = if is_below { 1.0 } else { -1.0 };
    let points = bezier.points();

    for inner in inner_curves {
        let probes = [inner[0], point_at_bezier(inner, 0.5), inner[3]];
        for probe in probes {
            if probe.x < bezier.p1.x || probe.x > bezier.p2.x {
                continue;
            }
            let y = bezier_at_position(&points, probe.x);
            let intersection = (probe.y - y) * sign + 1.5 * margin;
            if intersection > 0.0 {
                let ratio = (probe.x - bezier.p1.x) / dist;
                shift.add_collision(ratio, intersection, flexibility, is_below, dir, spanning_type);
            }
        }
    }
    shift
}

/// Control point shift keeping the outer curve clear of five points per inner curve
pub fn calc_outer_control_point_shift(
    bezier: &BezierCurve,
    dir: CurveDirection,
    inner_curves: &[[Point; 4]],
    symmetry: f64,
    margin: f64,
) -> ControlPointAdjustment {
    let mut adjustment = ControlPointAdjustment::default();
    if bezier.is_degenerate() {
        return adjustment;
    }
    let dist = bezier.span();
    let sign = if dir == CurveDirection::Above { 1.0 } else { -1.0 };
    let points = bezier.points();

    let mut constraints = Vec::new();
    for inner in inner_curves {
        for step in 0..=4 {
            let probe = point_at_bezier(inner, 0.25 * f64::from(step));
            if probe.x < bezier.p1.x || probe.x > bezier.p2.x {
                continue;
            }
            let y = bezier_at_position(&points, probe.x);
            let intersection = (probe.y - y) * sign + margin;
            let ratio = (probe.x - bezier.p1.x) / dist;
            if (0.5 - ratio).abs() < 0.45 && intersection > 0.0 {
                let t = bezier_param_at_position(&points, probe.x);
                constraints.push(ControlPointConstraint::at_param(t, intersection));
            }
        }
    }

    (adjustment.left_shift, adjustment.right_shift) =
        solve_control_point_constraints(&constraints, symmetry);
    adjustment
}

/// Re-run endpoint and control point adjustment of an outer curve against its inner curves
#[allow(clippy::too_many_arguments)]
pub fn adjust_outer_curve(
    positioner: &mut CurvePositioner,
    bezier: &mut BezierCurve,
    inner_curves: &[[Point; 4]],
    flexibility: f64,
    symmetry: f64,
    margin: f64,
    unit: f64,
    angles: ShapeAngles,
) {
    let dir = positioner.dir();

    let shift = calc_outer_end_point_shift(
        bezier,
        dir,
        positioner.spanning_type,
        inner_curves,
        flexibility,
        margin,
    );
    apply_end_point_shift(bezier, shift);
    positioner.update_points(bezier);

    let adjustment = calc_outer_control_point_shift(bezier, dir, inner_curves, symmetry, margin);
    bezier.set_left_control_height(bezier.left_control_height() + adjustment.left_shift);
    bezier.set_right_control_height(bezier.right_control_height() + adjustment.right_shift);
    bezier.update_control_points();
    positioner.update_points(bezier);

    adjust_slur_shape(bezier, dir, unit, angles);
    positioner.update_points(bezier);

    log::debug!(
        "curve {}: adjusted around {} inner curve(s)",
        positioner.curve.0,
        inner_curves.len()
    );
}

/// Pull apart two curves of one staff that share an anchor
///
/// A curve ending where the other starts gives half a unit on each side. A
/// longer curve sharing the start (or end) of a shorter one is moved one
/// unit outside of it.
pub fn separate_shared_endpoints(
    first: &mut CurvePositioner,
    first_spec: &CurveSpec,
    second: &mut CurvePositioner,
    second_spec: &CurveSpec,
    unit: f64,
) {
    let points1 = first.points();
    let points2 = second.points();
    let outward = if first.dir() == CurveDirection::Below {
        -unit
    } else {
        unit
    };

    if first_spec.end.is_some()
        && first_spec.end == second_spec.start
        && points1[3].is_close(points2[0], unit)
    {
        first.move_back_horizontal(-unit / 2.0);
        second.move_front_horizontal(unit / 2.0);
    }
    if first_spec.start.is_some()
        && first_spec.start == second_spec.start
        && points1[0].is_close(points2[0], unit)
        && points1[3].x > points2[3].x
    {
        first.move_front_vertical(points2[0].y - points1[0].y + outward);
    }
    if first_spec.end.is_some()
        && first_spec.end == second_spec.end
        && points1[3].is_close(points2[3], unit)
        && points1[0].x < points2[0].x
    {
        first.move_back_vertical(points2[3].y - points1[3].y + outward);
    }
}
