//! Cubic Bézier model used by the curve engine
//!
//! Besides the four points, a curve keeps its control points in a second
//! representation: a horizontal offset from the adjacent endpoint and a
//! height above or below the chord `p1-p2`, both measured in the frame where
//! the chord is horizontal. Most adjustments are easier to express on those
//! parameters and then written back with `update_control_points`.

use crate::models::Point;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BezierCurve {
    pub p1: Point,
    pub c1: Point,
    pub c2: Point,
    pub p2: Point,
    left_control_offset: f64,
    right_control_offset: f64,
    left_control_height: f64,
    right_control_height: f64,
    left_control_above: bool,
    right_control_above: bool,
}

impl BezierCurve {
    pub fn new(p1: Point, c1: Point, c2: Point, p2: Point) -> Self {
        Self {
            p1,
            c1,
            c2,
            p2,
            left_control_above: true,
            right_control_above: true,
            ..Self::default()
        }
    }

    pub fn from_points(points: [Point; 4]) -> Self {
        Self::new(points[0], points[1], points[2], points[3])
    }

    pub fn points(&self) -> [Point; 4] {
        [self.p1, self.c1, self.c2, self.p2]
    }

    /// Horizontal span; non-positive spans have no meaningful curve
    pub fn span(&self) -> f64 {
        self.p2.x - self.p1.x
    }

    pub fn is_degenerate(&self) -> bool {
        self.p1.x >= self.p2.x
    }

    /// Angle of the chord `p1-p2`
    pub fn chord_angle(&self) -> f64 {
        (self.p2.y - self.p1.y).atan2(self.p2.x - self.p1.x)
    }

    /// Rotate all four points by `angle` around `center`
    pub fn rotate(&mut self, angle: f64, center: Point) {
        self.p1 = self.p1.rotated(angle, center);
        self.c1 = self.c1.rotated(angle, center);
        self.c2 = self.c2.rotated(angle, center);
        self.p2 = self.p2.rotated(angle, center);
    }

    pub fn set_control_sides(&mut self, left_above: bool, right_above: bool) {
        self.left_control_above = left_above;
        self.right_control_above = right_above;
    }

    pub fn is_left_control_above(&self) -> bool {
        self.left_control_above
    }

    pub fn is_right_control_above(&self) -> bool {
        self.right_control_above
    }

    pub fn left_control_offset(&self) -> f64 {
        self.left_control_offset
    }

    pub fn right_control_offset(&self) -> f64 {
        self.right_control_offset
    }

    pub fn set_left_control_offset(&mut self, offset: f64) {
        self.left_control_offset = offset;
    }

    pub fn set_right_control_offset(&mut self, offset: f64) {
        self.right_control_offset = offset;
    }

    pub fn left_control_height(&self) -> f64 {
        self.left_control_height
    }

    pub fn right_control_height(&self) -> f64 {
        self.right_control_height
    }

    pub fn set_left_control_height(&mut self, height: f64) {
        self.left_control_height = height;
    }

    pub fn set_right_control_height(&mut self, height: f64) {
        self.right_control_height = height;
    }

    pub fn set_control_height(&mut self, height: f64) {
        self.left_control_height = height;
        self.right_control_height = height;
    }

    /// Derive offsets and heights from the current control points
    pub fn update_control_point_params(&mut self) {
        let angle = self.chord_angle();
        let c1 = self.c1.rotated(-angle, self.p1);
        let c2 = self.c2.rotated(-angle, self.p1);
        let p2 = self.p2.rotated(-angle, self.p1);

        self.left_control_offset = c1.x - self.p1.x;
        self.right_control_offset = p2.x - c2.x;

        let left_sign = if self.left_control_above { 1.0 } else { -1.0 };
        let right_sign = if self.right_control_above { 1.0 } else { -1.0 };
        self.left_control_height = left_sign * (c1.y - self.p1.y);
        self.right_control_height = right_sign * (c2.y - p2.y);
    }

    /// Recompute the control points from offsets and heights
    pub fn update_control_points(&mut self) {
        let angle = self.chord_angle();
        let dist = self.p1.distance(self.p2);

        let left_sign = if self.left_control_above { 1.0 } else { -1.0 };
        let right_sign = if self.right_control_above { 1.0 } else { -1.0 };
        let c1 = Point::new(
            self.p1.x + self.left_control_offset,
            self.p1.y + left_sign * self.left_control_height,
        );
        let c2 = Point::new(
            self.p1.x + dist - self.right_control_offset,
            self.p1.y + right_sign * self.right_control_height,
        );
        self.c1 = c1.rotated(angle, self.p1);
        self.c2 = c2.rotated(angle, self.p1);
    }

    /// Estimate the curve parameters closest to the control points
    ///
    /// Projects both control points onto the chord and returns the relative
    /// positions, clamped to `[0, 1]`.
    pub fn estimate_curve_param_for_control_points(&self) -> (f64, f64) {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        let length_sq = dx * dx + dy * dy;
        if length_sq == 0.0 {
            return (0.0, 1.0);
        }
        let project = |c: Point| {
            (((c.x - self.p1.x) * dx + (c.y - self.p1.y) * dy) / length_sq).clamp(0.0, 1.0)
        };
        (project(self.c1), project(self.c2))
    }

    /// Curve parameter whose point has the given x
    pub fn param_at_x(&self, x: f64) -> f64 {
        bezier_param_at_position(&self.points(), x)
    }

    /// y of the curve at the given x
    pub fn y_at_x(&self, x: f64) -> f64 {
        bezier_at_position(&self.points(), x)
    }

    /// Upper and lower outlines of the curve drawn with `thickness`
    pub fn thick_outlines(&self, thickness: f64, angle: f64) -> ([Point; 4], [Point; 4]) {
        thick_bezier(&self.points(), thickness, angle)
    }
}

/// Evaluate the cubic Bézier given by `points` at `t`
pub fn point_at_bezier(points: &[Point; 4], t: f64) -> Point {
    let p4 = points[0].lerp(points[1], t);
    let p5 = points[1].lerp(points[2], t);
    let p6 = points[2].lerp(points[3], t);
    let p7 = p4.lerp(p5, t);
    let p8 = p5.lerp(p6, t);
    p7.lerp(p8, t)
}

/// Cubic basis weights of the two control points at `t`
pub fn control_point_weights(t: f64) -> (f64, f64) {
    (3.0 * (1.0 - t).powi(2) * t, 3.0 * (1.0 - t) * t.powi(2))
}

/// Parameter `t` at which the curve reaches `x`, found by bisection
///
/// `x` is clamped to the horizontal extent of the endpoints; a vertical chord
/// yields 0.
pub fn bezier_param_at_position(points: &[Point; 4], x: f64) -> f64 {
    let x_start = points[0].x;
    let x_end = points[3].x;
    if x_start == x_end {
        return 0.0;
    }
    let increasing = x_end > x_start;
    let x = if increasing {
        x.clamp(x_start, x_end)
    } else {
        x.clamp(x_end, x_start)
    };

    let mut lo = 0.0;
    let mut hi = 1.0;
    for _ in 0..50 {
        let mid = (lo + hi) / 2.0;
        let value = point_at_bezier(points, mid).x;
        if (value < x) == increasing {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// y of the curve at `x`
pub fn bezier_at_position(points: &[Point; 4], x: f64) -> f64 {
    point_at_bezier(points, bezier_param_at_position(points, x)).y
}

/// Offset the control points by half the thickness on either side
///
/// The offset is rotated by the chord `angle` so it stays perpendicular to it.
pub fn thick_bezier(points: &[Point; 4], thickness: f64, angle: f64) -> ([Point; 4], [Point; 4]) {
    let shift = |c: Point, dy: f64| {
        let moved = Point::new(c.x, c.y + dy);
        if angle != 0.0 {
            moved.rotated(angle, c)
        } else {
            moved
        }
    };
    let half = thickness / 2.0;
    let top = [
        points[0],
        shift(points[1], half),
        shift(points[2], half),
        points[3],
    ];
    let bottom = [
        points[0],
        shift(points[1], -half),
        shift(points[2], -half),
        points[3],
    ];
    (top, bottom)
}

/// Outlines of a curve thinning from `thickness` in the middle to `end_thickness` at the ends
pub fn tapered_bezier(
    points: &[Point; 4],
    thickness: f64,
    end_thickness: f64,
    angle: f64,
) -> ([Point; 4], [Point; 4]) {
    let (mut top, mut bottom) = thick_bezier(points, thickness, angle);
    let half = end_thickness / 2.0;
    let (sin, cos) = angle.sin_cos();
    for i in [0, 3] {
        top[i] = Point::new(points[i].x - half * sin, points[i].y + half * cos);
        bottom[i] = Point::new(points[i].x + half * sin, points[i].y - half * cos);
    }
    (top, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch() -> BezierCurve {
        let mut curve = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, 30.0),
            Point::new(80.0, 30.0),
            Point::new(100.0, 0.0),
        );
        curve.update_control_point_params();
        curve
    }

    #[test]
    fn test_control_params_horizontal_chord() {
        let curve = arch();
        assert!((curve.left_control_offset() - 20.0).abs() < 1e-9);
        assert!((curve.right_control_offset() - 20.0).abs() < 1e-9);
        assert!((curve.left_control_height() - 30.0).abs() < 1e-9);
        assert!((curve.right_control_height() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_control_params_round_trip_on_slanted_chord() {
        let mut curve = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(15.0, 40.0),
            Point::new(70.0, 55.0),
            Point::new(100.0, 30.0),
        );
        curve.update_control_point_params();
        let before = curve.points();
        curve.update_control_points();
        for (a, b) in before.iter().zip(curve.points().iter()) {
            assert!(a.is_close(*b, 1e-6), "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_height_below_side() {
        let mut curve = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, -12.0),
            Point::new(80.0, -12.0),
            Point::new(100.0, 0.0),
        );
        curve.set_control_sides(false, false);
        curve.update_control_point_params();
        assert!((curve.left_control_height() - 12.0).abs() < 1e-9);
        curve.set_control_height(20.0);
        curve.update_control_points();
        assert!((curve.c1.y + 20.0).abs() < 1e-9);
        assert!((curve.c2.y + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_param_at_x_symmetric_curve() {
        let curve = arch();
        assert!((curve.param_at_x(50.0) - 0.5).abs() < 1e-9);
        assert!(curve.param_at_x(-10.0) < 1e-9);
        assert!((curve.y_at_x(50.0) - 22.5).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_params() {
        let (l1, l2) = arch().estimate_curve_param_for_control_points();
        assert!((l1 - 0.2).abs() < 1e-9);
        assert!((l2 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_tapered_outlines_open_at_the_ends() {
        let points = arch().points();
        let (top, bottom) = tapered_bezier(&points, 4.0, 1.0, 0.0);
        assert_eq!(top[0], Point::new(0.0, 0.5));
        assert_eq!(bottom[3], Point::new(100.0, -0.5));
        // The middle keeps the full thickness
        assert!((bezier_at_position(&top, 50.0) - bezier_at_position(&bottom, 50.0) - 3.0).abs() < 0.5);

        // On a rising chord the ends open perpendicular to it
        let angle = std::f64::consts::FRAC_PI_2;
        let (top, _) = tapered_bezier(&points, 4.0, 2.0, angle);
        assert!(top[0].is_close(Point::new(-1.0, 0.0), 1e-9));
    }

    #[test]
    fn test_thick_outlines_enclose_curve() {
        let curve = arch();
        let (top, bottom) = curve.thick_outlines(4.0, 0.0);
        assert!(bezier_at_position(&top, 50.0) > curve.y_at_x(50.0));
        assert!(bezier_at_position(&bottom, 50.0) < curve.y_at_x(50.0));
    }
}
