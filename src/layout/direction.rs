//! Curve direction selection
//!
//! The direction is decided once per curve, before any geometry is known,
//! and cached by the engine until it is reset explicitly.

use crate::diagnostics::{
    DiagnosticMark, Diagnostics, CURVEDIR_MIXED_SAME_STAFF, CURVEDIR_MIXED_WITH_BULGE,
    MISSING_ANCHOR,
};
use crate::models::{
    CurveDirAttr, CurveDirection, CurveId, CurveSpec, NotatedObject, ObjectId, ObjectKind,
    ScoreSnapshot, StemDirection,
};

/// Decide the direction of a curve
///
/// Explicit requests win. A mixed request is honored when the anchors sit
/// on different staves; otherwise it is reported and ignored. Without a
/// request the stems, layers and chord positions of the anchors decide.
pub fn select_direction(
    snapshot: &ScoreSnapshot,
    curve: CurveId,
    spec: &CurveSpec,
    diagnostics: &mut Diagnostics,
) -> CurveDirection {
    match spec.curvedir {
        Some(CurveDirAttr::Above) => return CurveDirection::Above,
        Some(CurveDirAttr::Below) => return CurveDirection::Below,
        _ => {}
    }

    let anchors = (
        spec.start.and_then(|id| snapshot.object(id).map(|o| (id, o))),
        spec.end.and_then(|id| snapshot.object(id).map(|o| (id, o))),
    );
    let (Some((start_id, start)), Some((end_id, end))) = anchors else {
        diagnostics.add(DiagnosticMark::warning(
            curve,
            &spec.id,
            MISSING_ANCHOR,
            "curve anchor could not be resolved; drawing above",
        ));
        return CurveDirection::Above;
    };

    let start_staff_n = start.resolved_staff_n();
    let end_staff_n = end.resolved_staff_n();

    if spec.curvedir == Some(CurveDirAttr::Mixed) {
        if spec.has_bulge() {
            diagnostics.add(DiagnosticMark::warning(
                curve,
                &spec.id,
                CURVEDIR_MIXED_WITH_BULGE,
                "mixed curve direction is ignored for curves with prescribed bulge",
            ));
        } else if start_staff_n < end_staff_n {
            return CurveDirection::BelowAbove;
        } else if start_staff_n > end_staff_n {
            return CurveDirection::AboveBelow;
        } else {
            diagnostics.add(DiagnosticMark::warning(
                curve,
                &spec.id,
                CURVEDIR_MIXED_SAME_STAFF,
                "mixed curve direction is ignored for curves starting and ending on the same staff",
            ));
        }
    }

    // Anchors on different staves: each side on its own
    if start_staff_n != end_staff_n {
        let start_above = side_above(snapshot, start_id, start);
        let end_above = side_above(snapshot, end_id, end);
        return CurveDirection::from_sides(start_above, end_above);
    }

    let grace_to_note = start.is_grace() && !end.is_grace();
    if !grace_to_note && has_mixed_stem_dir(snapshot, start, end) {
        return CurveDirection::Above;
    }

    preferred_direction(snapshot, start_id, start, grace_to_note)
}

/// Stem direction of a note or chord anchor, chord tones using their chord's
fn stem_dir(snapshot: &ScoreSnapshot, id: ObjectId) -> Option<StemDirection> {
    snapshot.anchor_drawing(id)?.stem.map(|s| s.dir)
}

fn is_above_staff_center(snapshot: &ScoreSnapshot, id: ObjectId, object: &NotatedObject) -> bool {
    snapshot
        .staff_of(id)
        .map_or(true, |staff| object.drawing_y > staff.center())
}

/// Curvature chosen for one end of a curve spanning two staves
fn side_above(snapshot: &ScoreSnapshot, id: ObjectId, object: &NotatedObject) -> bool {
    match stem_dir(snapshot, id) {
        Some(StemDirection::Up) => false,
        Some(StemDirection::Down) => true,
        None => is_above_staff_center(snapshot, id, object),
    }
}

/// Whether the notes between the anchors have stems in both directions
fn has_mixed_stem_dir(snapshot: &ScoreSnapshot, start: &NotatedObject, end: &NotatedObject) -> bool {
    let Some(system) = snapshot.system(start.system) else {
        return false;
    };
    if end.system != start.system {
        return false;
    }
    let (x_min, x_max) = (start.drawing_x.min(end.drawing_x), start.drawing_x.max(end.drawing_x));
    let staves = [start.resolved_staff_n(), end.resolved_staff_n()];
    let layers = [start.layer_n, end.layer_n];

    let mut up = false;
    let mut down = false;
    for id in system.measures.iter().flat_map(|m| m.objects.iter()) {
        let Some(object) = snapshot.object(*id) else {
            continue;
        };
        if let ObjectKind::Note(note) = &object.kind {
            if note.chord.is_some() {
                continue;
            }
        }
        if !object.is_note_or_chord()
            || object.drawing_x < x_min
            || object.drawing_x > x_max
            || !staves.contains(&object.resolved_staff_n())
            || !layers.contains(&object.layer_n)
        {
            continue;
        }
        match object.stemmed().and_then(|d| d.stem).map(|s| s.dir) {
            Some(StemDirection::Up) => up = true,
            Some(StemDirection::Down) => down = true,
            None => {}
        }
    }
    up && down
}

fn preferred_direction(
    snapshot: &ScoreSnapshot,
    start_id: ObjectId,
    start: &NotatedObject,
    grace_to_note: bool,
) -> CurveDirection {
    let stem = stem_dir(snapshot, start_id);
    let layer_dir = snapshot
        .system(start.system)
        .and_then(|s| s.layer_stem_dir(start.staff_n, start.layer_n));

    if grace_to_note && layer_dir.is_none() {
        // Grace slurs start on the notehead side
        return if stem == Some(StemDirection::Down) {
            CurveDirection::Above
        } else {
            CurveDirection::Below
        };
    }

    if let Some(dir) = layer_dir {
        return match dir {
            StemDirection::Up => CurveDirection::Above,
            StemDirection::Down => CurveDirection::Below,
        };
    }

    if let Some(position) = snapshot.position_in_chord(start_id) {
        return match position {
            p if p < 0 => CurveDirection::Below,
            p if p > 0 => CurveDirection::Above,
            // Center tone goes away from the stem
            _ if stem != Some(StemDirection::Up) => CurveDirection::Above,
            _ => CurveDirection::Below,
        };
    }

    match stem {
        Some(StemDirection::Up) => CurveDirection::Below,
        Some(StemDirection::Down) => CurveDirection::Above,
        None if is_above_staff_center(snapshot, start_id, start) => CurveDirection::Above,
        None => CurveDirection::Below,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotBuilder;

    #[test]
    fn test_explicit_direction_wins() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 10.0, 4, Some(StemDirection::Up));
        let b = builder.note(0, 30.0, 4, Some(StemDirection::Up));
        let curve = builder.curve(CurveSpec::new("s", a, b).with_curvedir(CurveDirAttr::Above));
        let snapshot = builder.build();

        let mut diags = Diagnostics::new();
        let dir = select_direction(&snapshot, curve, &snapshot.curves[curve.0], &mut diags);
        assert_eq!(dir, CurveDirection::Above);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_stem_up_curves_below() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 10.0, 2, Some(StemDirection::Up));
        let b = builder.note(0, 30.0, 3, Some(StemDirection::Up));
        let curve = builder.curve(CurveSpec::new("s", a, b));
        let snapshot = builder.build();

        let mut diags = Diagnostics::new();
        let dir = select_direction(&snapshot, curve, &snapshot.curves[curve.0], &mut diags);
        assert_eq!(dir, CurveDirection::Below);
    }

    #[test]
    fn test_mixed_stems_curve_above() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 10.0, 2, Some(StemDirection::Up));
        let b = builder.note(0, 30.0, 9, Some(StemDirection::Down));
        let curve = builder.curve(CurveSpec::new("s", a, b));
        let snapshot = builder.build();

        let mut diags = Diagnostics::new();
        let dir = select_direction(&snapshot, curve, &snapshot.curves[curve.0], &mut diags);
        assert_eq!(dir, CurveDirection::Above);
    }

    #[test]
    fn test_missing_anchor_defaults_above() {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 10.0, 2, Some(StemDirection::Up));
        let mut spec = CurveSpec::new("s", a, a);
        spec.end = None;
        let curve = builder.curve(spec);
        let snapshot = builder.build();

        let mut diags = Diagnostics::new();
        let dir = select_direction(&snapshot, curve, &snapshot.curves[curve.0], &mut diags);
        assert_eq!(dir, CurveDirection::Above);
        assert_eq!(diags.of_kind(MISSING_ANCHOR).count(), 1);
    }

    #[test]
    fn test_chord_position() {
        let mut builder = SnapshotBuilder::new();
        let chord = builder.chord(0, 10.0, &[0, 4, 8], Some(StemDirection::Up));
        let end = builder.note(0, 30.0, 4, Some(StemDirection::Up));
        let tones = builder.chord_notes(chord);
        let low = builder.curve(CurveSpec::new("low", tones[0], end));
        let high = builder.curve(CurveSpec::new("high", tones[2], end));
        let center = builder.curve(CurveSpec::new("center", tones[1], end));
        let snapshot = builder.build();

        let mut diags = Diagnostics::new();
        let mut dir_of = |id: CurveId| select_direction(&snapshot, id, &snapshot.curves[id.0], &mut diags);
        assert_eq!(dir_of(low), CurveDirection::Below);
        assert_eq!(dir_of(high), CurveDirection::Above);
        // Stem up: the center tone goes below
        assert_eq!(dir_of(center), CurveDirection::Below);
    }
}
