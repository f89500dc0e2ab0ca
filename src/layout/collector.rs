//! Spanned-element collection
//!
//! Gathers every obstacle under the horizontal span of one drawn curve
//! instance: notated objects of the relevant staves and layers, plus the
//! ties already placed on the same system.

use std::collections::HashSet;

use super::positioner::{CurvePositioner, SpannedElement, SpannedKind};
use crate::models::{
    CurveDirection, CurveSpec, NotatedObject, ObjectId, ObjectKind, Point, ScoreSnapshot,
    SpanningType, SystemView,
};

/// Inclusive range of layer numbers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerRange {
    pub min: u32,
    pub max: u32,
}

impl LayerRange {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, layer_n: u32) -> bool {
        (self.min..=self.max).contains(&layer_n)
    }
}

/// Collect the spanned elements of a curve instance between `p1` and `p2`
///
/// Replaces the positioner's previous list and returns the number of
/// collected elements.
pub fn collect_spanned_elements(
    snapshot: &ScoreSnapshot,
    spec: &CurveSpec,
    positioner: &mut CurvePositioner,
    p1: Point,
    p2: Point,
) -> usize {
    positioner.clear_spanned_elements();
    let Some(system) = snapshot.system(positioner.system) else {
        return 0;
    };
    let (x_min, x_max) = (p1.x.min(p2.x), p1.x.max(p2.x));
    let start = spec.start.and_then(|id| snapshot.object(id));
    let end = spec.end.and_then(|id| snapshot.object(id));

    let start_staff = start.map(|o| o.resolved_staff_n());
    let end_staff = end.map(|o| o.resolved_staff_n());
    let mut staves: Vec<u32> = [start_staff, end_staff, Some(positioner.staff_n)]
        .into_iter()
        .flatten()
        .collect();
    staves.sort_unstable();
    staves.dedup();

    let excluded = excluded_objects(snapshot, spec);
    let candidates: Vec<(ObjectId, &NotatedObject)> = container_objects(snapshot, system, spec, positioner)
        .filter_map(|id| snapshot.object(id).map(|o| (id, o)))
        .filter(|(id, o)| {
            !excluded.contains(id)
                && staves.contains(&o.resolved_staff_n())
                && !o.bbox.is_degenerate()
                && o.bbox.overlaps_horizontally(x_min, x_max)
        })
        .collect();

    let layers = layer_range(snapshot, spec, &candidates);
    let dir = positioner.dir();

    let mut elements = Vec::new();
    for (id, object) in candidates {
        if !layers.contains(object.layer_n) {
            continue;
        }
        let kind = SpannedKind::Element {
            id,
            layer_n: object.layer_n,
            tuplet_num: matches!(object.kind, ObjectKind::TupletNum),
        };
        let is_below = is_obstacle_below(
            dir,
            object.resolved_staff_n(),
            object.bbox.center_x(),
            object.bbox.center_y(),
            start_staff,
            end_staff,
            p1,
            p2,
        );
        elements.push(SpannedElement::new(kind, object.bbox, is_below));
    }

    for (index, tie) in system.ties.iter().enumerate() {
        if !layers.contains(tie.layer_n) || !staves.contains(&tie.staff_n) {
            continue;
        }
        let bbox = tie.bounding_box();
        if bbox.is_degenerate() || !bbox.overlaps_horizontally(x_min, x_max) {
            continue;
        }
        let is_below = is_obstacle_below(
            dir,
            tie.staff_n,
            bbox.center_x(),
            bbox.center_y(),
            start_staff,
            end_staff,
            p1,
            p2,
        );
        elements.push(SpannedElement::new(
            SpannedKind::Tie {
                index,
                layer_n: tie.layer_n,
            },
            bbox,
            is_below,
        ));
    }

    log::debug!(
        "curve `{}`: collected {} spanned element(s) in layers {}..={}",
        spec.id,
        elements.len(),
        layers.min,
        layers.max
    );
    let count = elements.len();
    positioner.set_spanned_elements(elements);
    count
}

/// Objects of the smallest container holding both anchors
///
/// A curve within one measure only looks at that measure; anything else
/// (several measures, broken instances) searches the whole system.
fn container_objects<'a>(
    snapshot: &'a ScoreSnapshot,
    system: &'a SystemView,
    spec: &CurveSpec,
    positioner: &CurvePositioner,
) -> Box<dyn Iterator<Item = ObjectId> + 'a> {
    let start = spec.start.and_then(|id| snapshot.object(id));
    let end = spec.end.and_then(|id| snapshot.object(id));
    if let (Some(start), Some(end)) = (start, end) {
        if positioner.spanning_type == SpanningType::StartEnd
            && start.system == end.system
            && start.measure == end.measure
        {
            if let Some(measure) = system.measures.get(start.measure) {
                return Box::new(measure.objects.iter().copied());
            }
        }
    }
    Box::new(system.measures.iter().flat_map(|m| m.objects.iter().copied()))
}

/// Whether `id` is `root` or one of its descendants
fn descends_from(snapshot: &ScoreSnapshot, id: ObjectId, root: ObjectId) -> bool {
    let mut current = Some(id);
    // Parent chains are short (chord, note, accid); the bound guards cycles
    for _ in 0..8 {
        match current {
            Some(c) if c == root => return true,
            Some(c) => current = snapshot.object(c).and_then(|o| o.parent),
            None => return false,
        }
    }
    false
}

/// The anchors with their descendants and ancestors
///
/// Accidentals of the end anchor are kept: the curve has to clear them.
fn excluded_objects(snapshot: &ScoreSnapshot, spec: &CurveSpec) -> HashSet<ObjectId> {
    let mut excluded = HashSet::new();
    for anchor in [spec.start, spec.end].into_iter().flatten() {
        let mut current = snapshot.object(anchor).and_then(|o| o.parent);
        while let Some(id) = current {
            if !excluded.insert(id) {
                break;
            }
            current = snapshot.object(id).and_then(|o| o.parent);
        }
        excluded.insert(anchor);
    }

    for (index, object) in snapshot.objects.iter().enumerate() {
        let id = ObjectId(index);
        let from_start = spec.start.is_some_and(|s| descends_from(snapshot, id, s));
        let from_end = spec.end.is_some_and(|e| descends_from(snapshot, id, e));
        if from_end && !from_start && matches!(object.kind, ObjectKind::Accid) {
            continue;
        }
        if from_start || from_end {
            excluded.insert(id);
        }
        // Chord tones of a chord anchor
        if let ObjectKind::Note(note) = &object.kind {
            if note.chord.is_some_and(|c| Some(c) == spec.start || Some(c) == spec.end) {
                excluded.insert(id);
            }
        }
    }
    excluded
}

/// Layers the curve has to avoid
///
/// Starts with the anchor layers (or the layers attached to the curve).
/// Other voices are added when they cross the pitch range of the anchor
/// voices; separated voices stay out.
fn layer_range(
    snapshot: &ScoreSnapshot,
    spec: &CurveSpec,
    candidates: &[(ObjectId, &NotatedObject)],
) -> LayerRange {
    if let Some((a, b)) = spec.layer_range {
        return LayerRange::new(a, b);
    }
    let layers: Vec<u32> = [spec.start, spec.end]
        .into_iter()
        .flatten()
        .filter_map(|id| snapshot.object(id).map(|o| o.layer_n))
        .collect();
    let (Some(min), Some(max)) = (layers.iter().min(), layers.iter().max()) else {
        return LayerRange::new(1, 1);
    };
    let range = LayerRange::new(*min, *max);

    let locs_in = |pred: &dyn Fn(u32) -> bool| -> Vec<i32> {
        candidates
            .iter()
            .filter(|(_, o)| pred(o.layer_n))
            .filter_map(|(_, o)| match &o.kind {
                ObjectKind::Note(note) => Some(note.loc),
                _ => None,
            })
            .collect()
    };

    let has_outside = candidates.iter().any(|(_, o)| !range.contains(o.layer_n));
    if !has_outside {
        return range;
    }

    let mut inside = locs_in(&|n| range.contains(n));
    inside.extend([spec.start, spec.end].into_iter().flatten().filter_map(|id| snapshot.loc(id)));
    let (Some(inside_min), Some(inside_max)) = (inside.iter().min(), inside.iter().max()) else {
        return range;
    };
    let upper = locs_in(&|n| n < range.min);
    let lower = locs_in(&|n| n > range.max);
    let upper_separated = upper.iter().min().map_or(true, |m| m > inside_max);
    let lower_separated = lower.iter().max().map_or(true, |m| m < inside_min);

    if upper_separated && lower_separated {
        range
    } else {
        let all = candidates.iter().map(|(_, o)| o.layer_n);
        let widened_min = all.clone().min().unwrap_or(range.min).min(range.min);
        let widened_max = all.max().unwrap_or(range.max).max(range.max);
        log::debug!(
            "curve `{}`: voices overlap, widening layers to {}..={}",
            spec.id,
            widened_min,
            widened_max
        );
        LayerRange::new(widened_min, widened_max)
    }
}

/// Which side of the curve an obstacle is expected on
///
/// Single-direction curves keep everything on their inner side. Mixed
/// curves decide per staff, falling back to the chord line for other staves.
#[allow(clippy::too_many_arguments)]
fn is_obstacle_below(
    dir: CurveDirection,
    staff_n: u32,
    x: f64,
    y: f64,
    start_staff: Option<u32>,
    end_staff: Option<u32>,
    p1: Point,
    p2: Point,
) -> bool {
    if !dir.is_mixed() {
        return dir != CurveDirection::Below;
    }
    if Some(staff_n) == start_staff {
        dir.is_start_above()
    } else if Some(staff_n) == end_staff {
        dir.is_end_above()
    } else {
        let t = if p2.x > p1.x {
            ((x - p1.x) / (p2.x - p1.x)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        y < p1.lerp(p2, t).y
    }
}
