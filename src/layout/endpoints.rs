//! Endpoint placement and the initial curve
//!
//! Endpoints are attached next to the noteheads, at the stem end or at the
//! staff edge for the broken ends of a curve running over a system break.
//! Secondary endpoints move to the stem tip or the far side of the anchor
//! when obstacles crowd the primary attachment.

use super::options::CurveOptions;
use super::positioner::CurvePositioner;
use crate::models::{
    BeamPosition, BoundingBox, CurveDirection, CurveSpec, NotatedObject, ObjectId, ObjectKind,
    Point, ScoreSnapshot, SpanningType, StaffPlace, StaffView, StemDirection, SystemView,
};

/// Curves shorter than this many units keep their endpoints on the noteheads
const SHORT_CURVE_UNITS: f64 = 4.0;

/// Which endpoints use their secondary attachment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SecondaryEnds {
    pub start: bool,
    pub end: bool,
}

impl SecondaryEnds {
    pub fn any(&self) -> bool {
        self.start || self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// Computes the endpoints of one drawn curve instance
pub struct EndpointPlacer<'a> {
    snapshot: &'a ScoreSnapshot,
    spec: &'a CurveSpec,
    system: &'a SystemView,
    staff: &'a StaffView,
    dir: CurveDirection,
    spanning_type: SpanningType,
}

impl<'a> EndpointPlacer<'a> {
    pub fn new(
        snapshot: &'a ScoreSnapshot,
        spec: &'a CurveSpec,
        positioner: &CurvePositioner,
        dir: CurveDirection,
    ) -> Option<Self> {
        let system = snapshot.system(positioner.system)?;
        let staff = system.staff(positioner.staff_n)?;
        Some(Self {
            snapshot,
            spec,
            system,
            staff,
            dir,
            spanning_type: positioner.spanning_type,
        })
    }

    /// Endpoints of the instance, `None` if a required anchor is missing
    pub fn place(&self, secondary: SecondaryEnds) -> Option<(Point, Point)> {
        let unit = self.staff.unit;
        let start = self.anchor(self.spec.start, self.spanning_type.has_start())?;
        let end = self.anchor(self.spec.end, self.spanning_type.has_end())?;
        let start_above = self.dir.is_start_above();
        let end_above = self.dir.is_end_above();

        let x1 = start.map_or(self.system.left, |(_, o)| o.drawing_x);
        let x2 = end.map_or(self.system.right, |(_, o)| o.drawing_x);
        let is_short = x2 - x1 < SHORT_CURVE_UNITS * unit;
        let grace_to_note = matches!(
            (start, end),
            (Some((_, s)), Some((_, e))) if s.is_grace() && !e.is_grace()
        );

        let mut p1 = Point::new(x1, self.staff.top());
        let mut p2 = Point::new(x2, self.staff.top());
        if let Some((id, object)) = start {
            p1 = self.attach(id, object, start_above, Side::Start, is_short, false, secondary.start);
        }
        if let Some((id, object)) = end {
            p2 = self.attach(id, object, end_above, Side::End, is_short, grace_to_note, secondary.end);
        }

        let pitch_shift = self.pitch_difference_shift();
        match self.spanning_type {
            SpanningType::Start => {
                p2.y = self.clamp_to_staff(p1.y, end_above) + pitch_shift;
            }
            SpanningType::End => {
                p1.y = self.clamp_to_staff(p2.y, start_above) - pitch_shift;
            }
            SpanningType::Middle => {
                p1.y = self.staff_edge(start_above);
                p2.y = p1.y;
            }
            SpanningType::StartEnd => {}
        }

        p1.y += if start_above { unit } else { -unit };
        p2.y += if end_above { unit } else { -unit };
        Some((p1, p2))
    }

    /// Resolve an anchor the instance needs; `Some(None)` if it is not needed
    #[allow(clippy::option_option)]
    fn anchor(
        &self,
        id: Option<ObjectId>,
        needed: bool,
    ) -> Option<Option<(ObjectId, &'a NotatedObject)>> {
        if !needed {
            return Some(None);
        }
        let id = id?;
        self.snapshot.object(id).map(|o| Some((id, o)))
    }

    fn staff_edge(&self, above: bool) -> f64 {
        if above {
            self.staff.top()
        } else {
            self.staff.bottom()
        }
    }

    /// Broken end: at least at the staff edge, following the attached end
    fn clamp_to_staff(&self, y: f64, above: bool) -> f64 {
        if above {
            self.staff.top().max(y)
        } else {
            self.staff.bottom().min(y)
        }
    }

    /// Vertical hint for broken instances so the partial curve does not look like a tie
    fn pitch_difference_shift(&self) -> f64 {
        if !matches!(self.spanning_type, SpanningType::Start | SpanningType::End) {
            return 0.0;
        }
        let locs = (
            self.spec.start.and_then(|id| self.snapshot.loc(id)),
            self.spec.end.and_then(|id| self.snapshot.loc(id)),
        );
        let (Some(start_loc), Some(end_loc)) = locs else {
            return 0.0;
        };
        let unit = self.staff.unit;
        (f64::from(end_loc - start_loc) * unit).clamp(-2.0 * unit, 2.0 * unit)
    }

    /// Box of the anchor; chord tones use the whole chord
    fn anchor_bbox(&self, id: ObjectId, object: &NotatedObject) -> BoundingBox {
        self.snapshot
            .chord_of(id)
            .and_then(|(chord_id, _)| self.snapshot.object(chord_id))
            .map_or(object.bbox, |chord| chord.bbox)
    }

    #[allow(clippy::too_many_arguments)]
    fn attach(
        &self,
        id: ObjectId,
        object: &NotatedObject,
        above: bool,
        side: Side,
        is_short: bool,
        grace_to_note: bool,
        secondary: bool,
    ) -> Point {
        let unit = self
            .snapshot
            .staff_of(id)
            .map_or(self.staff.unit, |staff| staff.unit);
        let drawing = self.snapshot.anchor_drawing(id);
        let stem = drawing.and_then(|d| d.stem);
        let stem_dir = stem.map(|s| s.dir);
        let stem_width = stem.map_or(0.0, |s| s.width);
        let radius = drawing.map_or(unit, |d| d.head_radius);
        // Tremolo strokes cross the stem on both sides, beams only towards the group
        let beamed_inside = drawing.is_some_and(|d| d.tremolo)
            || drawing.and_then(|d| d.beam).is_some_and(|beam| match side {
                Side::Start => beam != BeamPosition::Last,
                Side::End => beam != BeamPosition::First,
            });
        let extremes = self
            .snapshot
            .chord_of(id)
            .and_then(|(_, chord)| self.snapshot.chord_extremes(chord));
        let bbox = self.anchor_bbox(id, object);

        let mut x = object.drawing_x;
        let mut y;
        if secondary {
            // Stem tip when the stem points to the curve, otherwise the far notehead edge
            match (above, stem_dir) {
                (true, Some(StemDirection::Up)) => {
                    x += radius - stem_width / 2.0;
                    y = bbox.top;
                }
                (false, Some(StemDirection::Down)) => {
                    x -= radius - stem_width / 2.0;
                    y = bbox.bottom;
                }
                (true, _) => y = bbox.top,
                (false, _) => y = bbox.bottom,
            }
        } else if above {
            if stem_dir == Some(StemDirection::Down) || is_short {
                y = bbox.top;
            } else if beamed_inside {
                y = bbox.top;
                x += radius - stem_width;
            } else {
                if side == Side::Start {
                    x += 2.0 * unit;
                }
                y = extremes.map_or(object.drawing_y, |(_, max)| max) + 3.0 * unit;
            }
        } else if grace_to_note && side == Side::End {
            y = object.drawing_y;
            x -= 2.0 * unit;
        } else if stem_dir == Some(StemDirection::Up) || is_short {
            y = bbox.bottom;
        } else if beamed_inside {
            y = bbox.bottom;
            x -= radius - stem_width;
        } else {
            if side == Side::End {
                x -= 2.0 * unit;
            }
            y = extremes.map_or(object.drawing_y, |(min, _)| min) - 3.0 * unit;
        }

        // A flag on the curve's side of the stem counts as part of the anchor
        let stem_side = matches!(
            (above, stem_dir),
            (true, Some(StemDirection::Up)) | (false, Some(StemDirection::Down))
        );
        if let Some(flag) = self.snapshot.flag_of(id).filter(|_| stem_side) {
            if flag.bbox.left <= x && x <= flag.bbox.right {
                y = if above {
                    y.max(flag.bbox.top)
                } else {
                    y.min(flag.bbox.bottom)
                };
            }
        }

        // Portato: clear the articulations kept inside the curve
        let place = if above {
            StaffPlace::Above
        } else {
            StaffPlace::Below
        };
        for artic in drawing.map_or(&[][..], |d| d.artics.as_slice()) {
            let Some(artic) = self.snapshot.object(*artic) else {
                continue;
            };
            if let ObjectKind::Artic(data) = &artic.kind {
                if data.inside && data.place == place {
                    y = if above {
                        y.max(artic.bbox.top)
                    } else {
                        y.min(artic.bbox.bottom)
                    };
                }
            }
        }

        Point::new(x, y)
    }
}

/// Initial four points of a curve between `p1` and `p2`
///
/// Steep chords are flattened to the maximal slope (doubled when nothing is
/// spanned), then the control points are placed at a height derived from the
/// span and an offset bounded by the staff height.
pub fn calc_initial_curve(
    mut p1: Point,
    mut p2: Point,
    dir: CurveDirection,
    has_spanned: bool,
    staff: &StaffView,
    options: &CurveOptions,
) -> [Point; 4] {
    let dx = p2.x - p1.x;
    if dx <= 0.0 {
        return [p1, p1, p2, p2];
    }
    let unit = staff.unit;

    let mut max_slope = options.slur_max_slope.to_radians();
    if !has_spanned {
        max_slope *= 2.0;
    }
    let angle = (p2.y - p1.y).atan2(dx);
    if angle.abs() > max_slope {
        let side = dx * max_slope.tan();
        let above = dir == CurveDirection::Above;
        if p2.y > p1.y {
            if above {
                p1.y = p2.y - side;
            } else {
                p2.y = p1.y + side;
            }
        } else if above {
            p2.y = p1.y - side;
        } else {
            p1.y = p2.y + side;
        }
    }

    let height = (dx / options.slur_height_factor)
        .clamp(options.slur_min_height * unit, options.slur_max_height * unit)
        * 4.0
        / 3.0;
    let offset = (dx / options.slur_control_points).min(staff.height());
    let sign = |above: bool| if above { 1.0 } else { -1.0 };

    let c1 = Point::new(p1.x + offset, p1.y + sign(dir.is_start_above()) * height);
    let c2 = Point::new(p2.x - offset, p2.y + sign(dir.is_end_above()) * height);
    [p1, c1, c2, p2]
}
