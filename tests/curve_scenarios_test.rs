//! End-to-end layout of small hand-built scores
//!
//! All scores use the `SnapshotBuilder` geometry: unit 1, staff 1 from y = 0
//! (bottom line) to y = 8 (top line), noteheads one unit around their center.

use slur_layout::diagnostics::{CURVEDIR_MIXED_SAME_STAFF, MISSING_ANCHOR};
use slur_layout::layout::endpoints::calc_initial_curve;
use slur_layout::layout::{BezierCurve, CurvePositioner, SvgPathSink};
use slur_layout::{
    BoundingBox, BulgeEntry, CurveDirAttr, CurveDirection, CurveEngine, CurveId, CurveKind,
    CurveLayoutResult, CurveOptions, CurveSpec, ObjectId, Point, ScoreSnapshot, SnapshotBuilder,
    SpanningType, StemDirection,
};

/// Helper to lay out a snapshot with default options
fn layout(snapshot: &ScoreSnapshot) -> CurveLayoutResult {
    let mut engine = CurveEngine::new(CurveOptions::default()).unwrap();
    engine.layout(snapshot).unwrap()
}

/// Helper to create a slur with an explicit direction
fn slur(id: &str, start: ObjectId, end: ObjectId, dir: CurveDirAttr) -> CurveSpec {
    CurveSpec::new(id, start, end).with_curvedir(dir)
}

fn only_points(result: &CurveLayoutResult, id: &str) -> [Point; 4] {
    let curves: Vec<_> = result.curve(id).collect();
    assert_eq!(curves.len(), 1, "expected one instance of `{}`", id);
    curves[0].points
}

fn angle_degrees(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

fn assert_ordered(points: &[Point; 4]) {
    let [p1, c1, c2, p2] = points;
    assert!(
        p1.x <= c1.x && c1.x <= c2.x && c2.x <= p2.x,
        "points out of order: {:?}",
        points
    );
}

#[test]
fn test_short_slur_without_obstacles_bows_upwards() {
    // Two notes 4 staff spaces apart on the middle line
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    let b = builder.note(0, 28.0, 4, None);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let [p1, c1, c2, p2] = only_points(&result, "s1");

    assert!(c1.y > p1.y && c1.y > p2.y);
    assert!(c2.y > p1.y && c2.y > p2.y);
    assert!(angle_degrees(p1, c1) >= 30.0 - 1e-6);
    assert!(angle_degrees(c2, p2) <= -30.0 + 1e-6);
    assert_ordered(&[p1, c1, c2, p2]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_slur_clears_intervening_note() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 0, None);
    let middle = builder.note(0, 40.0, 8, None);
    let b = builder.note(0, 60.0, 0, None);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let obstacle = builder.bbox_of(middle);
    let snapshot = builder.build();
    let options = CurveOptions::default();

    let result = layout(&snapshot);
    let curve = result.curve("s1").next().unwrap();

    // The uncorrected curve between the same endpoints runs through the note
    let staff = snapshot.systems[0].staves[0];
    let naive = calc_initial_curve(
        curve.points[0],
        curve.points[3],
        CurveDirection::Above,
        true,
        &staff,
        &options,
    );
    let mut before = CurvePositioner::new(CurveId(0), 0, 1, SpanningType::StartEnd);
    before.update_curve_params(naive, curve.thickness, CurveDirection::Above);
    assert!(before.calc_directional_adjustment(&obstacle, true, 0.0).max() > 1.0);

    let mut after = CurvePositioner::new(CurveId(0), 0, 1, SpanningType::StartEnd);
    after.update_curve_params(curve.points, curve.thickness, CurveDirection::Above);
    assert!(after.calc_directional_adjustment(&obstacle, true, 0.0).max() <= 1e-6);
    assert_ordered(&curve.points);
    assert!(result.counters.count("control_point_shifts") >= 1);
}

#[test]
fn test_other_voice_next_to_start_is_discarded() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 0, None);
    let b = builder.note(0, 100.0, 0, None);
    // Far above the curve, right next to the start, in the second voice
    builder.obstacle(0, BoundingBox::new(23.0, 25.0, 14.0, 10.0), 2);
    let mut spec = slur("s1", a, b, CurveDirAttr::Above);
    spec.layer_range = Some((1, 2));
    builder.curve(spec);
    let start_y = builder.y_of(a) + 4.0;
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let points = only_points(&result, "s1");

    assert!((points[0].y - start_y).abs() < 1e-9);
    assert_eq!(result.counters.count("discarded"), 1);
    assert_eq!(result.counters.count("endpoint_shifts"), 0);
}

#[test]
fn test_obstacle_near_start_gives_partial_endpoint_shift() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 0, None);
    let b = builder.note(0, 100.0, 0, None);
    let obstacle = BoundingBox::new(30.0, 32.0, 9.0, 0.0);
    builder.obstacle(0, obstacle, 1);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let start_y = builder.y_of(a) + 4.0;
    let snapshot = builder.build();
    let options = CurveOptions::default();

    let result = layout(&snapshot);
    let curve = result.curve("s1").next().unwrap();
    let p1 = curve.points[0];
    let p2 = curve.points[3];

    // Raw depth of the collision on the initial curve
    let staff = snapshot.systems[0].staves[0];
    let naive = calc_initial_curve(
        Point::new(p1.x, start_y),
        p2,
        CurveDirection::Above,
        true,
        &staff,
        &options,
    );
    let mut positioner = CurvePositioner::new(CurveId(0), 0, 1, SpanningType::StartEnd);
    positioner.update_curve_params(naive, curve.thickness, CurveDirection::Above);
    let raw = positioner
        .calc_directional_left_right_adjustment(&obstacle, true, options.slur_margin, true)
        .left;

    let shift = p1.y - start_y;
    assert!(raw > 0.0);
    assert!(shift > 0.0, "start should move up, got {}", shift);
    assert!(shift < raw, "shift {} should stay below the raw depth {}", shift, raw);
    assert!((p2.y - start_y).abs() < 1e-9);
}

#[test]
fn test_outer_slur_rises_above_inner_slur() {
    fn score(with_inner: bool) -> ScoreSnapshot {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 20.0, 0, None);
        let b = builder.note(0, 40.0, 0, None);
        let c = builder.note(0, 80.0, 0, None);
        let d = builder.note(0, 100.0, 0, None);
        builder.curve(slur("outer", a, d, CurveDirAttr::Above));
        if with_inner {
            builder.curve(slur("inner", b, c, CurveDirAttr::Above));
        }
        builder.build()
    }

    let alone = layout(&score(false));
    let nested = layout(&score(true));
    let [_, c1_alone, c2_alone, _] = only_points(&alone, "outer");
    let outer = only_points(&nested, "outer");
    let inner = only_points(&nested, "inner");

    assert!(outer[1].y > c1_alone.y);
    assert!(outer[2].y > c2_alone.y);
    assert_eq!(nested.counters.count("outer_curves"), 1);

    // The outer curve passes above the middle of the inner one
    let inner_mid = slur_layout::layout::bezier::point_at_bezier(&inner, 0.5);
    let outer_curve = BezierCurve::from_points(outer);
    assert!(outer_curve.y_at_x(inner_mid.x) > inner_mid.y);
    assert_ordered(&outer);
    assert_ordered(&inner);
}

#[test]
fn test_mixed_request_on_one_staff_falls_back() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 2, Some(StemDirection::Up));
    let b = builder.note(0, 40.0, 3, Some(StemDirection::Up));
    let curve = builder.curve(slur("s1", a, b, CurveDirAttr::Mixed));
    let snapshot = builder.build();

    let mut engine = CurveEngine::new(CurveOptions::default()).unwrap();
    let result = engine.layout(&snapshot).unwrap();

    assert_eq!(engine.direction(curve), Some(CurveDirection::Below));
    assert_eq!(result.curve("s1").next().unwrap().direction, CurveDirection::Below);
    let marks: Vec<_> = result.diagnostics.of_kind(CURVEDIR_MIXED_SAME_STAFF).collect();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].curve_id, "s1");

    // Cached directions re-emit their diagnostics
    let again = engine.layout(&snapshot).unwrap();
    assert_eq!(again.diagnostics.of_kind(CURVEDIR_MIXED_SAME_STAFF).count(), 1);
}

#[test]
fn test_mixed_request_across_staves() {
    let mut builder = SnapshotBuilder::with_layout(1, 2);
    let a = builder.note_on_staff(0, 1, 1, 20.0, 0, Some(StemDirection::Down));
    let b = builder.note_on_staff(0, 2, 1, 60.0, 8, Some(StemDirection::Up));
    let curve = builder.curve(slur("s1", a, b, CurveDirAttr::Mixed));
    let snapshot = builder.build();

    let mut engine = CurveEngine::new(CurveOptions::default()).unwrap();
    let result = engine.layout(&snapshot).unwrap();

    assert_eq!(engine.direction(curve), Some(CurveDirection::BelowAbove));
    assert!(result.diagnostics.is_empty());
    let drawn = result.curve("s1").next().unwrap();
    assert!(drawn.points[0].x < drawn.points[3].x);
    assert_ordered(&drawn.points);
}

#[test]
fn test_steep_mixed_curve_keeps_control_points_inside() {
    // Short span, large drop between the staves
    let mut builder = SnapshotBuilder::with_layout(1, 2);
    let a = builder.note_on_staff(0, 1, 1, 20.0, -3, Some(StemDirection::Down));
    let b = builder.note_on_staff(0, 2, 1, 30.0, 12, Some(StemDirection::Up));
    builder.curve(slur("s1", a, b, CurveDirAttr::Mixed));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let drawn = result.curve("s1").next().unwrap();
    assert!(drawn.direction.is_mixed());
    assert_ordered(&drawn.points);
}

#[test]
fn test_slur_over_system_break() {
    let mut builder = SnapshotBuilder::with_systems(2);
    let a = builder.note(0, 150.0, 2, None);
    let b = builder.note(1, 30.0, 6, None);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let instances: Vec<_> = result.curve("s1").collect();
    assert_eq!(instances.len(), 2);

    let start = instances.iter().find(|c| c.system == 0).unwrap();
    let end = instances.iter().find(|c| c.system == 1).unwrap();
    assert_eq!(start.spanning_type, SpanningType::Start);
    assert_eq!(end.spanning_type, SpanningType::End);
    assert_eq!(start.points[3].x, snapshot.systems[0].right);
    assert_eq!(end.points[0].x, snapshot.systems[1].left);

    // The broken ends stay clear of the staff
    assert!(start.points[3].y >= snapshot.systems[0].staves[0].top());
    assert!(end.points[0].y >= snapshot.systems[1].staves[0].top());
}

#[test]
fn test_bulge_sets_curve_height() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    let b = builder.note(0, 60.0, 4, None);
    let spec = slur("s1", a, b, CurveDirAttr::Above).with_bulge(vec![BulgeEntry {
        distance: 6.0,
        position: 50.0,
    }]);
    builder.curve(spec);
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let points = only_points(&result, "s1");
    let middle = (points[0].x + points[3].x) / 2.0;

    assert!(BezierCurve::from_points(points).y_at_x(middle) >= points[0].y + 6.0 - 1e-6);
    assert_ordered(&points);
}

#[test]
fn test_missing_anchor_draws_nothing() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    builder.curve(CurveSpec {
        id: "dangling".to_string(),
        start: Some(a),
        end: None,
        ..CurveSpec::default()
    });
    let snapshot = builder.build();

    let result = layout(&snapshot);
    assert!(result.curves.is_empty());
    assert_eq!(result.diagnostics.of_kind(MISSING_ANCHOR).count(), 1);
}

#[test]
fn test_render_to_svg_paths() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    let b = builder.note(0, 40.0, 4, None);
    let c = builder.note(0, 60.0, 4, None);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    builder.curve(slur("s2", b, c, CurveDirAttr::Below));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let mut sink = SvgPathSink::default();
    result.render(&mut sink);

    assert_eq!(sink.elements.len(), 2);
    assert!(sink.elements[0].contains(r#"data-curve-id="s1""#));
    assert!(sink.elements[1].contains(r#"class="below""#));
    assert!(sink.elements.iter().all(|e| e.contains(r#"d="M"#)));
}

#[test]
fn test_tremolo_anchor_clears_its_strokes() {
    fn start_point(tremolo: bool) -> Point {
        let mut builder = SnapshotBuilder::new();
        let a = builder.note(0, 20.0, 2, Some(StemDirection::Up));
        let b = builder.note(0, 40.0, 2, Some(StemDirection::Up));
        if tremolo {
            builder.set_tremolo(a);
        }
        builder.curve(slur("s1", a, b, CurveDirAttr::Above));
        only_points(&layout(&builder.build()), "s1")[0]
    }

    let plain = start_point(false);
    let tremolo = start_point(true);
    assert_eq!(plain, Point::new(22.0, 6.0));
    // Beside the stem, above its tip
    assert!((tremolo.x - 20.8).abs() < 1e-9, "got {:?}", tremolo);
    assert_eq!(tremolo.y, 10.0);
}

#[test]
fn test_flagged_start_clears_the_flag() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 2, Some(StemDirection::Up));
    let b = builder.note(0, 40.0, 2, Some(StemDirection::Up));
    let flag = builder.flag(a);
    let flag_top = builder.bbox_of(flag).top;
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let snapshot = builder.build();

    let [p1, _, _, p2] = only_points(&layout(&snapshot), "s1");
    assert!(p1.y > flag_top);
    assert!(p2.is_close(Point::new(40.0, 6.0), 1e-9), "got {:?}", p2);
}

#[test]
fn test_crowded_start_moves_to_stem_tip() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 2, Some(StemDirection::Up));
    let b = builder.note(0, 60.0, 2, Some(StemDirection::Up));
    // Tall obstacle right next to the usual attachment point
    builder.obstacle(0, BoundingBox::new(23.0, 25.0, 12.0, 2.0), 1);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    assert_eq!(result.counters.count("secondary_endpoints"), 1);
    let [p1, _, _, _] = only_points(&result, "s1");
    assert!((p1.x - 20.9).abs() < 1e-9, "got {:?}", p1);
    assert!(p1.y >= 10.0);
}

#[test]
fn test_phrase_mark_is_drawn_around_slur() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    builder.note(0, 40.0, 5, None);
    let b = builder.note(0, 60.0, 4, None);
    builder.curve(slur("slur", a, b, CurveDirAttr::Above));
    builder.curve(slur("phrase", a, b, CurveDirAttr::Above).with_kind(CurveKind::Phrase));
    let snapshot = builder.build();

    let result = layout(&snapshot);
    let slur_points = only_points(&result, "slur");
    let phrase_points = only_points(&result, "phrase");
    assert_eq!(result.counters.count("outer_curves"), 1);

    assert!(phrase_points[0].y > slur_points[0].y);
    assert!(phrase_points[3].y > slur_points[3].y);
    let slur_mid = slur_layout::layout::bezier::point_at_bezier(&slur_points, 0.5);
    assert!(BezierCurve::from_points(phrase_points).y_at_x(slur_mid.x) > slur_mid.y);
    assert_ordered(&phrase_points);

    // Two slurs on the same notes are not nested
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    let b = builder.note(0, 60.0, 4, None);
    builder.curve(slur("first", a, b, CurveDirAttr::Above));
    builder.curve(slur("second", a, b, CurveDirAttr::Above));
    assert_eq!(layout(&builder.build()).counters.count("outer_curves"), 0);
}

#[test]
fn test_endpoint_thickness_reaches_rendering() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.note(0, 20.0, 4, None);
    let b = builder.note(0, 40.0, 4, None);
    builder.curve(slur("s1", a, b, CurveDirAttr::Above));
    let snapshot = builder.build();

    let thin = layout(&snapshot);
    let options = CurveOptions {
        slur_endpoint_thickness: 0.2,
        ..CurveOptions::default()
    };
    let thick = CurveEngine::new(options).unwrap().layout(&snapshot).unwrap();

    assert_eq!(thin.curves[0].endpoint_thickness, CurveOptions::default().slur_endpoint_thickness);
    assert_eq!(thick.curves[0].endpoint_thickness, 0.2);
    assert_eq!(thin.curves[0].points, thick.curves[0].points);
    assert_ne!(thin.curves[0].to_svg_path(), thick.curves[0].to_svg_path());
}
