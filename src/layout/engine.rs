//! Curve layout engine
//!
//! Turns every curve of a `ScoreSnapshot` into one drawn instance per
//! system it touches, runs the positioning pipeline on each instance and
//! finally adjusts the curves of each staff against each other.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::bezier::BezierCurve;
use super::collector::collect_spanned_elements;
use super::direction::select_direction;
use super::display_list::{CurveSink, RenderCurve};
use super::endpoint_shift::{apply_end_point_shift, calc_end_point_shift};
use super::endpoints::{calc_initial_curve, EndpointPlacer, SecondaryEnds};
use super::filter::{detect_collisions_near_end, filter_spanned_elements, AnchorLayers};
use super::nested::{adjust_outer_curve, has_inner_curve, separate_shared_endpoints};
use super::options::CurveOptions;
use super::positioner::CurvePositioner;
use super::shape::{adjust_slur_shape, clamp_control_point_order, ShapeAngles};
use super::solver::{
    adjust_from_bulge, allow_control_offset_adjustment, apply_control_point_adjustment,
    calc_control_point_offset, calc_control_point_vertical_shift,
};
use crate::diagnostics::{DiagnosticMark, Diagnostics, LAYER_MISMATCH};
use crate::errors::LayoutError;
use crate::models::{CurveDirection, CurveId, CurveSpec, Point, ScoreSnapshot, SpanningType};
use crate::utils::StepCounters;

/// Extra vertical space a staff needs for its curves
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StaffSpaceRequest {
    pub system: usize,
    pub staff_n: u32,
    pub space: f64,
}

/// Everything one layout run produces
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CurveLayoutResult {
    pub curves: Vec<RenderCurve>,
    pub requested_staff_space: Vec<StaffSpaceRequest>,
    pub diagnostics: Diagnostics,
    pub counters: StepCounters,
}

impl CurveLayoutResult {
    /// Hand every positioned curve to a drawing backend
    pub fn render(&self, sink: &mut impl CurveSink) {
        for curve in &self.curves {
            sink.draw_curve(curve);
        }
    }

    pub fn curve(&self, id: &str) -> impl Iterator<Item = &RenderCurve> {
        let id = id.to_string();
        self.curves.iter().filter(move |c| c.id == id)
    }
}

/// Direction of a curve, decided once, with the marks raised on the way
#[derive(Clone, Debug)]
struct CachedDirection {
    dir: CurveDirection,
    marks: Vec<DiagnosticMark>,
}

/// Positions slurs and phrase marks
///
/// Directions are kept between layout runs until `reset_directions` is
/// called; all geometry is rebuilt on every run.
#[derive(Clone, Debug)]
pub struct CurveEngine {
    options: CurveOptions,
    directions: HashMap<CurveId, CachedDirection>,
}

impl CurveEngine {
    pub fn new(options: CurveOptions) -> Result<Self, LayoutError> {
        options.validate()?;
        Ok(Self {
            options,
            directions: HashMap::new(),
        })
    }

    pub fn options(&self) -> &CurveOptions {
        &self.options
    }

    /// Cached direction of a curve, if it was laid out before
    pub fn direction(&self, curve: CurveId) -> Option<CurveDirection> {
        self.directions.get(&curve).map(|c| c.dir)
    }

    /// Forget all directions, e.g. after the encoding changed
    pub fn reset_directions(&mut self) {
        self.directions.clear();
    }

    fn shape_angles(&self) -> ShapeAngles {
        ShapeAngles {
            min_control_angle: self.options.min_control_angle,
            convexity_angle: self.options.convexity_angle,
        }
    }

    /// Lay out every curve of the snapshot
    pub fn layout(&mut self, snapshot: &ScoreSnapshot) -> Result<CurveLayoutResult, LayoutError> {
        snapshot.validate()?;

        let mut result = CurveLayoutResult::default();
        let mut instances = Vec::new();

        for (index, spec) in snapshot.curves.iter().enumerate() {
            let curve = CurveId(index);
            let cached = self
                .directions
                .entry(curve)
                .or_insert_with(|| {
                    let mut diagnostics = Diagnostics::new();
                    let dir = select_direction(snapshot, curve, spec, &mut diagnostics);
                    CachedDirection {
                        dir,
                        marks: diagnostics.marks,
                    }
                })
                .clone();
            result.diagnostics.extend(cached.marks);
            check_layers(snapshot, curve, spec, &mut result.diagnostics);

            for mut positioner in curve_instances(snapshot, curve, spec) {
                result.counters.record("instances");
                self.position_instance(snapshot, spec, &mut positioner, cached.dir, &mut result.counters);
                instances.push(positioner);
            }
        }

        self.adjust_staves(snapshot, &mut instances, &mut result.counters);

        let mut spaces: BTreeMap<(usize, u32), f64> = BTreeMap::new();
        for positioner in &instances {
            let discarded = positioner
                .spanned_elements()
                .iter()
                .filter(|e| e.discarded)
                .count();
            result.counters.record_many("discarded", discarded);

            if !positioner.has_content() {
                continue;
            }
            let Some(spec) = snapshot.curve(positioner.curve) else {
                continue;
            };
            let space = spaces
                .entry((positioner.system, positioner.staff_n))
                .or_insert(0.0);
            *space = space.max(positioner.requested_staff_space());
            let unit = snapshot
                .system(positioner.system)
                .and_then(|s| s.staff(positioner.staff_n))
                .map_or(1.0, |s| s.unit);

            result.curves.push(RenderCurve {
                id: spec.id.clone(),
                curve: positioner.curve,
                system: positioner.system,
                staff_n: positioner.staff_n,
                points: positioner.points(),
                thickness: positioner.thickness(),
                endpoint_thickness: self.options.slur_endpoint_thickness * unit,
                direction: positioner.dir(),
                spanning_type: positioner.spanning_type,
            });
        }
        result.requested_staff_space = spaces
            .into_iter()
            .filter(|(_, space)| *space > 0.0)
            .map(|((system, staff_n), space)| StaffSpaceRequest {
                system,
                staff_n,
                space,
            })
            .collect();

        log::debug!(
            "laid out {} curve instance(s): {}",
            result.curves.len(),
            result.counters.summary()
        );
        Ok(result)
    }

    /// Control sides follow the direction; heights and offsets follow the points
    fn init_bezier(points: [Point; 4], dir: CurveDirection) -> BezierCurve {
        let mut bezier = BezierCurve::from_points(points);
        bezier.set_control_sides(dir.is_start_above(), dir.is_end_above());
        bezier.update_control_point_params();
        bezier
    }

    /// Run the positioning pipeline on one drawn instance
    fn position_instance(
        &self,
        snapshot: &ScoreSnapshot,
        spec: &CurveSpec,
        positioner: &mut CurvePositioner,
        dir: CurveDirection,
        counters: &mut StepCounters,
    ) {
        let Some(staff) = snapshot
            .system(positioner.system)
            .and_then(|s| s.staff(positioner.staff_n))
            .copied()
        else {
            return;
        };
        let Some(placer) = EndpointPlacer::new(snapshot, spec, positioner, dir) else {
            return;
        };
        let Some((p1, p2)) = placer.place(SecondaryEnds::default()) else {
            return;
        };

        let options = &self.options;
        let unit = staff.unit;
        let margin = options.slur_margin * unit;
        let thickness = options.slur_midpoint_thickness * unit;
        let flexibility = options.slur_endpoint_flexibility;
        let symmetry = options.slur_symmetry;
        let anchors = AnchorLayers {
            start: spec.start.and_then(|id| snapshot.object(id)).map(|o| o.layer_n),
            end: spec.end.and_then(|id| snapshot.object(id)).map(|o| o.layer_n),
        };

        positioner.set_dir(dir);
        let collected = collect_spanned_elements(snapshot, spec, positioner, p1, p2);
        counters.record_many("collected", collected);
        let points = calc_initial_curve(p1, p2, dir, collected > 0, &staff, options);
        positioner.update_curve_params(points, thickness, dir);
        if !positioner.has_content() {
            return;
        }
        let mut bezier = Self::init_bezier(points, dir);

        // Spanned elements and secondary endpoints
        filter_spanned_elements(positioner, &bezier, margin, anchors);
        let mut near_end = detect_collisions_near_end(positioner, &bezier, margin);
        let secondary = SecondaryEnds {
            start: positioner.spanning_type.has_start()
                && near_end.start_exceeds(options.near_end_threshold),
            end: positioner.spanning_type.has_end()
                && near_end.end_exceeds(options.near_end_threshold),
        };
        if let Some((q1, q2)) = secondary.any().then(|| placer.place(secondary)).flatten() {
            let collected = collect_spanned_elements(snapshot, spec, positioner, q1, q2);
            let points = calc_initial_curve(q1, q2, dir, collected > 0, &staff, options);
            positioner.update_curve_params(points, thickness, dir);
            if !positioner.has_content() {
                return;
            }
            bezier = Self::init_bezier(points, dir);
            near_end.end_points_adjusted = true;
            filter_spanned_elements(positioner, &bezier, margin, anchors);
        }
        if near_end.end_points_adjusted {
            counters.record("secondary_endpoints");
            log::debug!(
                "curve `{}`: near-end collision {:.2}/{:.2}, using secondary endpoints",
                spec.id,
                near_end.metric_at_start,
                near_end.metric_at_end
            );
        }

        // Endpoint shift
        let shift = calc_end_point_shift(positioner, &bezier, flexibility, margin);
        if !shift.is_zero() {
            counters.record("endpoint_shifts");
        }
        apply_end_point_shift(&mut bezier, shift);
        positioner.update_points(&bezier);

        if spec.has_bulge() {
            adjust_from_bulge(&mut bezier, &spec.bulge, unit);
            adjust_slur_shape(&mut bezier, dir, unit, self.shape_angles());
            positioner.update_points(&bezier);
            return;
        }

        // Control points
        if allow_control_offset_adjustment(&bezier, symmetry, unit) {
            if let Some((left, right)) = calc_control_point_offset(positioner, &bezier, margin) {
                bezier.set_left_control_offset(left);
                bezier.set_right_control_offset(right);
                bezier.update_control_points();
                positioner.update_points(&bezier);
            }
        }

        let adjustment = calc_control_point_vertical_shift(positioner, &bezier, symmetry, margin);
        if adjustment.left_shift > 0.0 || adjustment.right_shift > 0.0 {
            counters.record("control_point_shifts");
        }
        apply_control_point_adjustment(&mut bezier, &adjustment);
        positioner.update_points(&bezier);
        positioner.set_requested_staff_space(adjustment.requested_staff_space);

        if dir.is_mixed() {
            clamp_control_point_order(&mut bezier);
        } else {
            adjust_slur_shape(&mut bezier, dir, unit, self.shape_angles());
        }
        positioner.update_points(&bezier);
    }

    /// Curves of one staff against each other: shared anchors, then outer curves
    fn adjust_staves(
        &self,
        snapshot: &ScoreSnapshot,
        instances: &mut [CurvePositioner],
        counters: &mut StepCounters,
    ) {
        let mut staves: BTreeMap<(usize, u32), Vec<usize>> = BTreeMap::new();
        for (index, positioner) in instances.iter().enumerate() {
            if positioner.has_content() {
                staves
                    .entry((positioner.system, positioner.staff_n))
                    .or_default()
                    .push(index);
            }
        }

        for ((system, staff_n), members) in staves {
            let Some(unit) = snapshot
                .system(system)
                .and_then(|s| s.staff(staff_n))
                .map(|s| s.unit)
            else {
                continue;
            };

            let mut outer_curves: Vec<(usize, Vec<usize>)> = Vec::new();
            for &i in &members {
                let mut inner = Vec::new();
                for &j in &members {
                    if i == j {
                        continue;
                    }
                    let (Some(first_spec), Some(second_spec)) = (
                        snapshot.curve(instances[i].curve),
                        snapshot.curve(instances[j].curve),
                    ) else {
                        continue;
                    };
                    if instances[j].spanning_type == SpanningType::StartEnd
                        && has_inner_curve(
                            snapshot,
                            first_spec,
                            instances[i].dir(),
                            second_spec,
                            instances[j].dir(),
                        )
                    {
                        inner.push(j);
                        continue;
                    }
                    let (first, second) = pair_mut(instances, i, j);
                    separate_shared_endpoints(first, first_spec, second, second_spec, unit);
                }
                if !inner.is_empty() {
                    outer_curves.push((i, inner));
                }
            }

            for (outer, inner) in outer_curves {
                let inner_points: Vec<[Point; 4]> =
                    inner.iter().map(|&j| instances[j].points()).collect();
                let positioner = &mut instances[outer];
                let mut bezier = Self::init_bezier(positioner.points(), positioner.dir());
                adjust_outer_curve(
                    positioner,
                    &mut bezier,
                    &inner_points,
                    self.options.slur_endpoint_flexibility,
                    self.options.slur_symmetry,
                    self.options.slur_margin * unit,
                    unit,
                    self.shape_angles(),
                );
                counters.record("outer_curves");
            }
        }
    }
}

/// Two distinct elements of a slice, mutably
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

/// Anchors in different layers are laid out, with a warning
fn check_layers(snapshot: &ScoreSnapshot, curve: CurveId, spec: &CurveSpec, diagnostics: &mut Diagnostics) {
    let layers = (
        spec.start.and_then(|id| snapshot.object(id)).map(|o| o.layer_n),
        spec.end.and_then(|id| snapshot.object(id)).map(|o| o.layer_n),
    );
    if let (Some(start), Some(end)) = layers {
        if start != end {
            diagnostics.add(DiagnosticMark::warning(
                curve,
                &spec.id,
                LAYER_MISMATCH,
                format!("curve connects layer {} to layer {}", start, end),
            ));
        }
    }
}

/// One positioner per system the curve touches
///
/// Curves with a missing anchor, or ending before they start, get none.
fn curve_instances(snapshot: &ScoreSnapshot, curve: CurveId, spec: &CurveSpec) -> Vec<CurvePositioner> {
    let anchors = (
        spec.start.and_then(|id| snapshot.object(id)),
        spec.end.and_then(|id| snapshot.object(id)),
    );
    let (Some(start), Some(end)) = anchors else {
        return Vec::new();
    };
    if start.system > end.system {
        log::debug!("curve `{}` ends on a system before its start", spec.id);
        return Vec::new();
    }

    let start_staff = start.resolved_staff_n();
    let end_staff = end.resolved_staff_n();
    if start.system == end.system {
        return vec![CurvePositioner::new(curve, start.system, start_staff, SpanningType::StartEnd)];
    }

    let mut instances = vec![CurvePositioner::new(curve, start.system, start_staff, SpanningType::Start)];
    for system in start.system + 1..end.system {
        if snapshot.system(system).and_then(|s| s.staff(start.staff_n)).is_some() {
            instances.push(CurvePositioner::new(curve, system, start.staff_n, SpanningType::Middle));
        }
    }
    instances.push(CurvePositioner::new(curve, end.system, end_staff, SpanningType::End));
    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SnapshotBuilder, StemDirection};

    #[test]
    fn test_instances_per_system() {
        let mut builder = SnapshotBuilder::with_systems(3);
        let a = builder.note(0, 10.0, 2, Some(StemDirection::Up));
        let b = builder.note(2, 20.0, 2, Some(StemDirection::Up));
        let curve = builder.curve(CurveSpec::new("s", a, b));
        let snapshot = builder.build();

        let instances = curve_instances(&snapshot, curve, &snapshot.curves[curve.0]);
        let types: Vec<SpanningType> = instances.iter().map(|p| p.spanning_type).collect();
        assert_eq!(
            types,
            vec![SpanningType::Start, SpanningType::Middle, SpanningType::End]
        );
    }

    #[test]
    fn test_direction_is_cached_until_reset() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 10.0, 2, Some(StemDirection::Up));
        let b = builder.note(0, 40.0, 2, Some(StemDirection::Up));
        let curve = builder.curve(CurveSpec::new("s", a, b));
        let mut snapshot = builder.build();

        let mut engine = CurveEngine::new(CurveOptions::default()).unwrap();
        engine.layout(&snapshot).unwrap();
        assert_eq!(engine.direction(curve), Some(CurveDirection::Below));

        // Flipping the stems does not change a cached direction
        for object in &mut snapshot.objects {
            if let crate::models::ObjectKind::Note(note) = &mut object.kind {
                if let Some(stem) = note.drawing.stem.as_mut() {
                    stem.dir = StemDirection::Down;
                }
            }
        }
        engine.layout(&snapshot).unwrap();
        assert_eq!(engine.direction(curve), Some(CurveDirection::Below));

        engine.reset_directions();
        engine.layout(&snapshot).unwrap();
        assert_eq!(engine.direction(curve), Some(CurveDirection::Above));
    }

    #[test]
    fn test_layer_mismatch_is_reported() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note_in_layer(0, 10.0, 2, Some(StemDirection::Up), 1);
        let b = builder.note_in_layer(0, 40.0, 2, Some(StemDirection::Up), 2);
        builder.curve(CurveSpec::new("s", a, b));
        let snapshot = builder.build();

        let mut engine = CurveEngine::new(CurveOptions::default()).unwrap();
        let result = engine.layout(&snapshot).unwrap();
        assert_eq!(result.diagnostics.of_kind(LAYER_MISMATCH).count(), 1);
        assert_eq!(result.curves.len(), 1);
    }

    #[test]
    fn test_pair_mut() {
        let mut values = [1, 2, 3];
        let (a, b) = pair_mut(&mut values, 2, 0);
        std::mem::swap(a, b);
        assert_eq!(values, [3, 2, 1]);
    }
}
