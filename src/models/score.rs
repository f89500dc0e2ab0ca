//! Read-only score snapshot consumed by the curve engine
//!
//! The alignment pass owns the score tree. Before curves are positioned it
//! hands over an immutable arena of notated objects with finalized bounding
//! boxes; everything here is referenced by index and looked up through
//! `Option`-returning accessors.

use serde::{Deserialize, Serialize};

use super::curve::{CurveId, CurveSpec};
use super::geometry::{BoundingBox, Point};
use crate::errors::SnapshotError;

/// Index of a notated object inside a `ScoreSnapshot`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StemDirection {
    Up,
    Down,
}

/// Drawn stem of a note or chord
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StemInfo {
    pub dir: StemDirection,
    pub length: f64,
    pub width: f64,
}

/// Position of an element inside its beam
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeamPosition {
    First,
    Middle,
    Last,
}

/// Vertical placement relative to the staff
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffPlace {
    Above,
    Below,
}

/// Articulation glyph attached to a note or chord
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArticData {
    pub place: StaffPlace,
    /// Kept inside a slur (staccato, tenuto) rather than pushed outside it
    pub inside: bool,
}

/// Shared drawing information of a note or chord
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StemmedData {
    #[serde(default)]
    pub stem: Option<StemInfo>,
    #[serde(default)]
    pub grace: bool,
    #[serde(default)]
    pub beam: Option<BeamPosition>,
    #[serde(default)]
    pub tremolo: bool,
    /// Notehead half width
    pub head_radius: f64,
    #[serde(default)]
    pub artics: Vec<ObjectId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NoteData {
    /// Diatonic staff location (0 = bottom line, increasing upwards)
    pub loc: i32,
    /// Parent chord, if this note is a chord tone
    #[serde(default)]
    pub chord: Option<ObjectId>,
    #[serde(flatten)]
    pub drawing: StemmedData,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChordData {
    /// Chord tones sorted from bottom to top
    pub notes: Vec<ObjectId>,
    #[serde(flatten)]
    pub drawing: StemmedData,
}

/// Tagged kind of a notated object, carrying only what that kind needs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Note(NoteData),
    Chord(ChordData),
    Rest,
    Artic(ArticData),
    Accid,
    Dots,
    Flag,
    Stem,
    Beam,
    TupletNum,
    Other,
}

/// A notated object with its finalized drawing geometry
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotatedObject {
    pub kind: ObjectKind,
    pub bbox: BoundingBox,
    pub drawing_x: f64,
    pub drawing_y: f64,
    pub staff_n: u32,
    pub layer_n: u32,
    /// Staff the object is drawn on when it crosses staves
    #[serde(default)]
    pub cross_staff_n: Option<u32>,
    pub system: usize,
    pub measure: usize,
    /// Owning note/chord for stems, flags, accidentals, artics and chord tones
    #[serde(default)]
    pub parent: Option<ObjectId>,
}

impl NotatedObject {
    /// Staff number after resolving cross-staff placement
    pub fn resolved_staff_n(&self) -> u32 {
        self.cross_staff_n.unwrap_or(self.staff_n)
    }

    pub fn is_cross_staff(&self) -> bool {
        self.cross_staff_n.is_some_and(|n| n != self.staff_n)
    }

    pub fn stemmed(&self) -> Option<&StemmedData> {
        match &self.kind {
            ObjectKind::Note(note) => Some(&note.drawing),
            ObjectKind::Chord(chord) => Some(&chord.drawing),
            _ => None,
        }
    }

    pub fn is_note_or_chord(&self) -> bool {
        matches!(self.kind, ObjectKind::Note(_) | ObjectKind::Chord(_))
    }

    pub fn is_grace(&self) -> bool {
        self.stemmed().is_some_and(|d| d.grace)
    }
}

/// Drawing information of one staff in a system
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StaffView {
    pub n: u32,
    /// Y of the top staff line
    pub drawing_y: f64,
    /// Half a staff space, scaled by the staff size
    pub unit: f64,
    pub lines: u32,
}

impl StaffView {
    pub fn height(&self) -> f64 {
        f64::from(self.lines.saturating_sub(1)) * 2.0 * self.unit
    }

    pub fn top(&self) -> f64 {
        self.drawing_y
    }

    pub fn bottom(&self) -> f64 {
        self.drawing_y - self.height()
    }

    pub fn center(&self) -> f64 {
        self.drawing_y - self.height() / 2.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MeasureView {
    pub left: f64,
    pub right: f64,
    pub objects: Vec<ObjectId>,
}

/// Stem direction forced on a layer (multi-voice staves)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct LayerStemDir {
    pub staff_n: u32,
    pub layer_n: u32,
    pub dir: StemDirection,
}

/// A tie already positioned by its own placement pass
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PlacedTie {
    pub points: [Point; 4],
    pub staff_n: u32,
    pub layer_n: u32,
    #[serde(default)]
    pub thickness: f64,
}

impl PlacedTie {
    /// Box around the tie's points widened by its thickness
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::from_points(&self.points).unwrap_or_default();
        bbox.top += self.thickness / 2.0;
        bbox.bottom -= self.thickness / 2.0;
        bbox
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SystemView {
    pub left: f64,
    pub right: f64,
    pub staves: Vec<StaffView>,
    pub measures: Vec<MeasureView>,
    #[serde(default)]
    pub ties: Vec<PlacedTie>,
    #[serde(default)]
    pub layer_stem_dirs: Vec<LayerStemDir>,
}

impl SystemView {
    pub fn staff(&self, n: u32) -> Option<&StaffView> {
        self.staves.iter().find(|s| s.n == n)
    }

    pub fn layer_stem_dir(&self, staff_n: u32, layer_n: u32) -> Option<StemDirection> {
        self.layer_stem_dirs
            .iter()
            .find(|d| d.staff_n == staff_n && d.layer_n == layer_n)
            .map(|d| d.dir)
    }
}

/// Immutable view of the laid-out score
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ScoreSnapshot {
    pub objects: Vec<NotatedObject>,
    pub curves: Vec<CurveSpec>,
    pub systems: Vec<SystemView>,
}

impl ScoreSnapshot {
    pub fn object(&self, id: ObjectId) -> Option<&NotatedObject> {
        self.objects.get(id.0)
    }

    pub fn curve(&self, id: CurveId) -> Option<&CurveSpec> {
        self.curves.get(id.0)
    }

    pub fn system(&self, index: usize) -> Option<&SystemView> {
        self.systems.get(index)
    }

    /// Staff an object is drawn on, with cross-staff placement resolved
    pub fn staff_of(&self, id: ObjectId) -> Option<&StaffView> {
        let object = self.object(id)?;
        self.system(object.system)?.staff(object.resolved_staff_n())
    }

    /// Diatonic location of a note, or of the top tone of a chord
    pub fn loc(&self, id: ObjectId) -> Option<i32> {
        match &self.object(id)?.kind {
            ObjectKind::Note(note) => Some(note.loc),
            ObjectKind::Chord(chord) => chord
                .notes
                .iter()
                .filter_map(|n| match &self.object(*n)?.kind {
                    ObjectKind::Note(note) => Some(note.loc),
                    _ => None,
                })
                .max(),
            _ => None,
        }
    }

    /// Chord containing the object: the object itself or its parent chord
    pub fn chord_of(&self, id: ObjectId) -> Option<(ObjectId, &ChordData)> {
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Chord(chord) => Some((id, chord)),
            ObjectKind::Note(note) => {
                let chord_id = note.chord?;
                match &self.object(chord_id)?.kind {
                    ObjectKind::Chord(chord) => Some((chord_id, chord)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Notehead y of the lowest and highest chord tones
    pub fn chord_extremes(&self, chord: &ChordData) -> Option<(f64, f64)> {
        let ys: Vec<f64> = chord
            .notes
            .iter()
            .filter_map(|n| self.object(*n).map(|o| o.drawing_y))
            .collect();
        let min = ys.iter().copied().reduce(f64::min)?;
        let max = ys.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }

    /// Stemmed drawing data of an anchor; chord tones report their chord's
    pub fn anchor_drawing(&self, id: ObjectId) -> Option<&StemmedData> {
        match self.chord_of(id) {
            Some((_, chord)) => Some(&chord.drawing),
            None => self.object(id)?.stemmed(),
        }
    }

    /// Flag at the stem of an anchor; chord tones report their chord's
    pub fn flag_of(&self, id: ObjectId) -> Option<&NotatedObject> {
        let owner = self.chord_of(id).map_or(id, |(chord, _)| chord);
        let object = self.object(owner)?;
        let measure = self.system(object.system)?.measures.get(object.measure)?;
        measure
            .objects
            .iter()
            .filter_map(|child| self.object(*child))
            .find(|child| matches!(child.kind, ObjectKind::Flag) && child.parent == Some(owner))
    }

    /// Sign of the position of a chord tone relative to the chord center
    ///
    /// Negative below the center, positive above, zero for the center tone
    /// of an odd-sized chord.
    pub fn position_in_chord(&self, note: ObjectId) -> Option<i32> {
        let (_, chord) = self.chord_of(note)?;
        if chord.notes.len() < 2 {
            return None;
        }
        let index = chord.notes.iter().position(|n| *n == note)? as i32;
        let size = chord.notes.len() as i32;
        // Doubled to keep the center exact for even-sized chords
        Some((2 * index - (size - 1)).signum())
    }

    /// Check every index reference in the snapshot
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let check = |context: &str, id: ObjectId| -> Result<(), SnapshotError> {
            if id.0 < self.objects.len() {
                Ok(())
            } else {
                Err(SnapshotError::UnknownObject {
                    context: context.to_string(),
                    id: id.0,
                })
            }
        };

        for (index, object) in self.objects.iter().enumerate() {
            let system = self
                .systems
                .get(object.system)
                .ok_or(SnapshotError::UnknownSystem {
                    object: index,
                    system: object.system,
                })?;
            if object.measure >= system.measures.len() {
                return Err(SnapshotError::UnknownMeasure {
                    object: index,
                    system: object.system,
                    measure: object.measure,
                });
            }
            if system.staff(object.resolved_staff_n()).is_none() {
                return Err(SnapshotError::UnknownStaff {
                    object: index,
                    system: object.system,
                    staff: object.resolved_staff_n(),
                });
            }
            let context = format!("object {}", index);
            if let Some(parent) = object.parent {
                check(&context, parent)?;
            }
            match &object.kind {
                ObjectKind::Note(note) => {
                    if let Some(chord) = note.chord {
                        check(&context, chord)?;
                    }
                    for artic in &note.drawing.artics {
                        check(&context, *artic)?;
                    }
                }
                ObjectKind::Chord(chord) => {
                    for id in chord.notes.iter().chain(chord.drawing.artics.iter()) {
                        check(&context, *id)?;
                    }
                }
                _ => {}
            }
        }

        for (index, system) in self.systems.iter().enumerate() {
            for measure in &system.measures {
                for id in &measure.objects {
                    check(&format!("system {}", index), *id)?;
                }
            }
        }

        for curve in &self.curves {
            for anchor in [curve.start, curve.end].into_iter().flatten() {
                check(&format!("curve `{}`", curve.id), anchor)?;
                if !self.objects[anchor.0].is_note_or_chord() {
                    return Err(SnapshotError::InvalidAnchor {
                        curve: curve.id.clone(),
                        anchor: anchor.0,
                    });
                }
            }
        }

        Ok(())
    }
}
