//! Helper for assembling score snapshots by hand
//!
//! Used by tests and by callers that lay out a few curves without a full
//! alignment pass. Every staff has five lines and a unit of 1; staff 1 has
//! its top line at y = 8 and further staves sit 20 units apart. Noteheads
//! are one unit wide on each side, stems are seven units long.

use super::curve::{CurveId, CurveSpec};
use super::geometry::{BoundingBox, Point};
use super::score::{
    ArticData, BeamPosition, ChordData, LayerStemDir, MeasureView, NotatedObject, NoteData,
    ObjectId, ObjectKind, PlacedTie, ScoreSnapshot, StaffPlace, StaffView, StemDirection,
    StemInfo, StemmedData, SystemView,
};

const UNIT: f64 = 1.0;
const STAFF_TOP: f64 = 8.0;
const STAFF_DISTANCE: f64 = 20.0;
const SYSTEM_WIDTH: f64 = 200.0;
const STEM_LENGTH: f64 = 7.0;
const STEM_WIDTH: f64 = 0.2;

#[derive(Clone, Debug)]
pub struct SnapshotBuilder {
    snapshot: ScoreSnapshot,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    /// One system with one staff
    pub fn new() -> Self {
        Self::with_layout(1, 1)
    }

    pub fn with_systems(systems: usize) -> Self {
        Self::with_layout(systems, 1)
    }

    /// `systems` systems of `staves` staves, each system one measure wide
    pub fn with_layout(systems: usize, staves: u32) -> Self {
        let systems = (0..systems)
            .map(|_| SystemView {
                left: 0.0,
                right: SYSTEM_WIDTH,
                staves: (1..=staves)
                    .map(|n| StaffView {
                        n,
                        drawing_y: STAFF_TOP - f64::from(n - 1) * STAFF_DISTANCE,
                        unit: UNIT,
                        lines: 5,
                    })
                    .collect(),
                measures: vec![MeasureView {
                    left: 0.0,
                    right: SYSTEM_WIDTH,
                    objects: Vec::new(),
                }],
                ..SystemView::default()
            })
            .collect();
        Self {
            snapshot: ScoreSnapshot {
                systems,
                ..ScoreSnapshot::default()
            },
        }
    }

    pub fn unit(&self) -> f64 {
        UNIT
    }

    /// Top line of staff 1
    pub fn staff_top(&self) -> f64 {
        STAFF_TOP
    }

    pub fn y_of(&self, id: ObjectId) -> f64 {
        self.snapshot.objects[id.0].drawing_y
    }

    pub fn bbox_of(&self, id: ObjectId) -> BoundingBox {
        self.snapshot.objects[id.0].bbox
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut NotatedObject {
        &mut self.snapshot.objects[id.0]
    }

    /// Add an object and register it with the first measure of its system
    pub fn push(&mut self, object: NotatedObject) -> ObjectId {
        let id = ObjectId(self.snapshot.objects.len());
        if let Some(measure) = self
            .snapshot
            .systems
            .get_mut(object.system)
            .and_then(|s| s.measures.get_mut(object.measure))
        {
            measure.objects.push(id);
        }
        self.snapshot.objects.push(object);
        id
    }

    fn staff_bottom(&self, system: usize, staff_n: u32) -> f64 {
        self.snapshot
            .system(system)
            .and_then(|s| s.staff(staff_n))
            .map_or(0.0, |s| s.bottom())
    }

    fn head_box(x: f64, y: f64, stem: Option<StemDirection>) -> BoundingBox {
        let mut bbox = BoundingBox::new(x - UNIT, x + UNIT, y + UNIT, y - UNIT);
        match stem {
            Some(StemDirection::Up) => bbox.top = y + STEM_LENGTH * UNIT,
            Some(StemDirection::Down) => bbox.bottom = y - STEM_LENGTH * UNIT,
            None => {}
        }
        bbox
    }

    fn stemmed(stem: Option<StemDirection>) -> StemmedData {
        StemmedData {
            stem: stem.map(|dir| StemInfo {
                dir,
                length: STEM_LENGTH * UNIT,
                width: STEM_WIDTH * UNIT,
            }),
            head_radius: UNIT,
            ..StemmedData::default()
        }
    }

    /// A note on staff 1, layer 1
    pub fn note(&mut self, system: usize, x: f64, loc: i32, stem: Option<StemDirection>) -> ObjectId {
        self.note_on_staff(system, 1, 1, x, loc, stem)
    }

    pub fn note_in_layer(
        &mut self,
        system: usize,
        x: f64,
        loc: i32,
        stem: Option<StemDirection>,
        layer_n: u32,
    ) -> ObjectId {
        self.note_on_staff(system, 1, layer_n, x, loc, stem)
    }

    /// A note at diatonic location `loc` (0 = bottom line) of the given staff
    pub fn note_on_staff(
        &mut self,
        system: usize,
        staff_n: u32,
        layer_n: u32,
        x: f64,
        loc: i32,
        stem: Option<StemDirection>,
    ) -> ObjectId {
        let y = self.staff_bottom(system, staff_n) + f64::from(loc) * UNIT;
        self.push(NotatedObject {
            kind: ObjectKind::Note(NoteData {
                loc,
                chord: None,
                drawing: Self::stemmed(stem),
            }),
            bbox: Self::head_box(x, y, stem),
            drawing_x: x,
            drawing_y: y,
            staff_n,
            layer_n,
            cross_staff_n: None,
            system,
            measure: 0,
            parent: None,
        })
    }

    /// A chord on staff 1, layer 1; its tones are added bottom to top
    pub fn chord(&mut self, system: usize, x: f64, locs: &[i32], stem: Option<StemDirection>) -> ObjectId {
        let mut locs = locs.to_vec();
        locs.sort_unstable();
        let bottom = self.staff_bottom(system, 1);
        let ys: Vec<f64> = locs.iter().map(|l| bottom + f64::from(*l) * UNIT).collect();
        let low = ys.first().copied().unwrap_or(bottom);
        let high = ys.last().copied().unwrap_or(bottom);

        let mut bbox = BoundingBox::new(x - UNIT, x + UNIT, high + UNIT, low - UNIT);
        match stem {
            Some(StemDirection::Up) => bbox.top = high + STEM_LENGTH * UNIT,
            Some(StemDirection::Down) => bbox.bottom = low - STEM_LENGTH * UNIT,
            None => {}
        }
        let chord = self.push(NotatedObject {
            kind: ObjectKind::Chord(ChordData {
                notes: Vec::new(),
                drawing: Self::stemmed(stem),
            }),
            bbox,
            drawing_x: x,
            drawing_y: if stem == Some(StemDirection::Down) { low } else { high },
            staff_n: 1,
            layer_n: 1,
            cross_staff_n: None,
            system,
            measure: 0,
            parent: None,
        });

        let mut notes = Vec::new();
        for (loc, y) in locs.iter().zip(ys) {
            notes.push(self.push(NotatedObject {
                kind: ObjectKind::Note(NoteData {
                    loc: *loc,
                    chord: Some(chord),
                    drawing: StemmedData {
                        head_radius: UNIT,
                        ..StemmedData::default()
                    },
                }),
                bbox: Self::head_box(x, y, None),
                drawing_x: x,
                drawing_y: y,
                staff_n: 1,
                layer_n: 1,
                cross_staff_n: None,
                system,
                measure: 0,
                parent: Some(chord),
            }));
        }
        if let ObjectKind::Chord(data) = &mut self.snapshot.objects[chord.0].kind {
            data.notes = notes;
        }
        chord
    }

    /// Tones of a chord, bottom to top
    pub fn chord_notes(&self, chord: ObjectId) -> Vec<ObjectId> {
        match &self.snapshot.objects[chord.0].kind {
            ObjectKind::Chord(data) => data.notes.clone(),
            _ => Vec::new(),
        }
    }

    /// An articulation next to the notehead side of a note or chord
    pub fn artic(&mut self, parent: ObjectId, place: StaffPlace, inside: bool) -> ObjectId {
        let owner = self.snapshot.objects[parent.0].clone();
        let bbox = match place {
            StaffPlace::Above => BoundingBox::new(
                owner.drawing_x - UNIT / 2.0,
                owner.drawing_x + UNIT / 2.0,
                owner.bbox.top + 1.5 * UNIT,
                owner.bbox.top + 0.5 * UNIT,
            ),
            StaffPlace::Below => BoundingBox::new(
                owner.drawing_x - UNIT / 2.0,
                owner.drawing_x + UNIT / 2.0,
                owner.bbox.bottom - 0.5 * UNIT,
                owner.bbox.bottom - 1.5 * UNIT,
            ),
        };
        let id = self.push(NotatedObject {
            kind: ObjectKind::Artic(ArticData { place, inside }),
            bbox,
            drawing_x: owner.drawing_x,
            drawing_y: bbox.center_y(),
            staff_n: owner.staff_n,
            layer_n: owner.layer_n,
            cross_staff_n: owner.cross_staff_n,
            system: owner.system,
            measure: owner.measure,
            parent: Some(parent),
        });
        if let Some(drawing) = self.stemmed_mut(parent) {
            drawing.artics.push(id);
        }
        id
    }

    /// A plain obstacle (clef, dynamic, ...) on staff 1
    pub fn obstacle(&mut self, system: usize, bbox: BoundingBox, layer_n: u32) -> ObjectId {
        self.push(NotatedObject {
            kind: ObjectKind::Other,
            bbox,
            drawing_x: bbox.center_x(),
            drawing_y: bbox.center_y(),
            staff_n: 1,
            layer_n,
            cross_staff_n: None,
            system,
            measure: 0,
            parent: None,
        })
    }

    pub fn tuplet_num(&mut self, system: usize, bbox: BoundingBox, layer_n: u32) -> ObjectId {
        let id = self.obstacle(system, bbox, layer_n);
        self.snapshot.objects[id.0].kind = ObjectKind::TupletNum;
        id
    }

    /// A tie already placed on staff 1
    pub fn tie(&mut self, system: usize, points: [Point; 4], layer_n: u32) -> usize {
        let ties = &mut self.snapshot.systems[system].ties;
        ties.push(PlacedTie {
            points,
            staff_n: 1,
            layer_n,
            thickness: 0.5 * UNIT,
        });
        ties.len() - 1
    }

    pub fn layer_stem_dir(&mut self, system: usize, staff_n: u32, layer_n: u32, dir: StemDirection) {
        self.snapshot.systems[system].layer_stem_dirs.push(LayerStemDir {
            staff_n,
            layer_n,
            dir,
        });
    }

    fn stemmed_mut(&mut self, id: ObjectId) -> Option<&mut StemmedData> {
        match &mut self.snapshot.objects.get_mut(id.0)?.kind {
            ObjectKind::Note(note) => Some(&mut note.drawing),
            ObjectKind::Chord(chord) => Some(&mut chord.drawing),
            _ => None,
        }
    }

    pub fn set_grace(&mut self, id: ObjectId) {
        if let Some(drawing) = self.stemmed_mut(id) {
            drawing.grace = true;
        }
    }

    pub fn set_beam(&mut self, id: ObjectId, position: BeamPosition) {
        if let Some(drawing) = self.stemmed_mut(id) {
            drawing.beam = Some(position);
        }
    }

    pub fn set_tremolo(&mut self, id: ObjectId) {
        if let Some(drawing) = self.stemmed_mut(id) {
            drawing.tremolo = true;
        }
    }

    /// A flag hanging from the stem tip of a note or chord
    pub fn flag(&mut self, parent: ObjectId) -> ObjectId {
        let owner = self.snapshot.objects[parent.0].clone();
        let stem_up = owner.bbox.top - owner.drawing_y > owner.drawing_y - owner.bbox.bottom;
        let bbox = if stem_up {
            let x = owner.drawing_x + UNIT - STEM_WIDTH * UNIT / 2.0;
            BoundingBox::new(x, x + 2.5 * UNIT, owner.bbox.top, owner.bbox.top - 3.5 * UNIT)
        } else {
            let x = owner.drawing_x - UNIT + STEM_WIDTH * UNIT / 2.0;
            BoundingBox::new(x, x + 2.5 * UNIT, owner.bbox.bottom + 3.5 * UNIT, owner.bbox.bottom)
        };
        self.push(NotatedObject {
            kind: ObjectKind::Flag,
            bbox,
            drawing_x: bbox.left,
            drawing_y: bbox.center_y(),
            staff_n: owner.staff_n,
            layer_n: owner.layer_n,
            cross_staff_n: owner.cross_staff_n,
            system: owner.system,
            measure: owner.measure,
            parent: Some(parent),
        })
    }

    pub fn curve(&mut self, spec: CurveSpec) -> CurveId {
        self.snapshot.curves.push(spec);
        CurveId(self.snapshot.curves.len() - 1)
    }

    pub fn build(self) -> ScoreSnapshot {
        self.snapshot
    }
}
