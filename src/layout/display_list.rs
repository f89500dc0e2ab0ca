//! Positioned curves ready for rendering
//!
//! The engine hands its results over as `RenderCurve`s: four Bézier points,
//! the thickness in the middle and at the ends, and the identity of the
//! curve. Drawing backends implement `CurveSink`.

use serde::{Deserialize, Serialize};

use super::bezier::tapered_bezier;
use crate::models::{CurveDirection, CurveId, Point, SpanningType};

/// A drawn curve instance with its final control points
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RenderCurve {
    /// Identifier of the curve in the snapshot
    pub id: String,

    pub curve: CurveId,

    pub system: usize,

    pub staff_n: u32,

    /// `p1, c1, c2, p2`
    pub points: [Point; 4],

    /// Thickness at the middle of the curve
    pub thickness: f64,

    /// Thickness at both ends
    #[serde(default)]
    pub endpoint_thickness: f64,

    pub direction: CurveDirection,

    pub spanning_type: SpanningType,
}

impl RenderCurve {
    /// Filled outline of the thick curve as an SVG path
    ///
    /// The outline thins from `thickness` in the middle to
    /// `endpoint_thickness` at both ends. Coordinates are written as they
    /// are; the caller's transform maps them into the SVG's y-down space.
    pub fn to_svg_path(&self) -> String {
        let [p1, _, _, p2] = self.points;
        let angle = (p2.y - p1.y).atan2(p2.x - p1.x);
        let (top, bottom) =
            tapered_bezier(&self.points, self.thickness, self.endpoint_thickness, angle);

        let point = |p: Point| format!("{} {}", fmt(p.x), fmt(p.y));
        format!(
            "M{} C{} {} {} L{} C{} {} {} Z",
            point(top[0]),
            point(top[1]),
            point(top[2]),
            point(top[3]),
            point(bottom[3]),
            point(bottom[2]),
            point(bottom[1]),
            point(bottom[0])
        )
    }
}

/// Two decimals, trailing zeros trimmed
fn fmt(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Curve-drawing primitive of a rendering backend
pub trait CurveSink {
    fn draw_curve(&mut self, curve: &RenderCurve);
}

impl CurveSink for Vec<RenderCurve> {
    fn draw_curve(&mut self, curve: &RenderCurve) {
        self.push(curve.clone());
    }
}

/// Collects one `<path>` element per curve
#[derive(Clone, Debug, Default)]
pub struct SvgPathSink {
    pub elements: Vec<String>,
}

impl CurveSink for SvgPathSink {
    fn draw_curve(&mut self, curve: &RenderCurve) {
        self.elements.push(format!(
            r#"<path class="{}" data-curve-id="{}" d="{}"/>"#,
            curve.direction.as_str(),
            curve.id,
            curve.to_svg_path()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_curve() -> RenderCurve {
        RenderCurve {
            id: "slur-1".to_string(),
            curve: CurveId(0),
            system: 0,
            staff_n: 1,
            points: [
                Point::new(0.0, 0.0),
                Point::new(10.0, 5.0),
                Point::new(30.0, 5.0),
                Point::new(40.0, 0.0),
            ],
            thickness: 1.0,
            endpoint_thickness: 0.4,
            direction: CurveDirection::Above,
            spanning_type: SpanningType::StartEnd,
        }
    }

    #[test]
    fn test_svg_path() {
        let path = render_curve().to_svg_path();
        assert_eq!(
            path,
            "M0 0.2 C10 5.5 30 5.5 40 0.2 L40 -0.2 C30 4.5 10 4.5 0 -0.2 Z"
        );
    }

    #[test]
    fn test_svg_sink() {
        let mut sink = SvgPathSink::default();
        sink.draw_curve(&render_curve());
        assert_eq!(sink.elements.len(), 1);
        assert!(sink.elements[0].starts_with(r#"<path class="above" data-curve-id="slur-1""#));
    }

    #[test]
    fn test_format_trims_zeros() {
        assert_eq!(fmt(1.50), "1.5");
        assert_eq!(fmt(-0.001), "0");
        assert_eq!(fmt(12.0), "12");
    }
}
