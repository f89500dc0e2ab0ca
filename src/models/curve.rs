//! Curve descriptions and curve direction types
//!
//! A `CurveSpec` is the logical relationship ("this slur connects A to B");
//! the engine turns it into one or more drawn instances.

use serde::{Deserialize, Serialize};

use super::score::ObjectId;

/// Index of a curve inside a `ScoreSnapshot`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CurveId(pub usize);

/// Kind of curve handled by the engine
///
/// A phrase mark spanning the same notes as a slur is drawn around it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    #[default]
    Slur,
    Phrase,
}

/// Encoded `curvedir` request on a curve
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveDirAttr {
    Above,
    Below,
    Mixed,
}

/// Explicit bow of the curve at a fraction of its span
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BulgeEntry {
    /// Distance from the chord line, in drawing units
    pub distance: f64,
    /// Position along the span, in percent (exclusive 0..100)
    pub position: f64,
}

/// A logical slur or phrase mark
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CurveSpec {
    /// Identifier passed through to the rendered output
    pub id: String,

    #[serde(default)]
    pub kind: CurveKind,

    /// Start anchor (note or chord); `None` if it could not be resolved
    pub start: Option<ObjectId>,

    /// End anchor (note or chord); `None` if it could not be resolved
    pub end: Option<ObjectId>,

    #[serde(default)]
    pub curvedir: Option<CurveDirAttr>,

    #[serde(default)]
    pub bulge: Vec<BulgeEntry>,

    /// Layers explicitly attached to the curve; disables voice widening
    #[serde(default)]
    pub layer_range: Option<(u32, u32)>,
}

impl CurveSpec {
    pub fn new(id: impl Into<String>, start: ObjectId, end: ObjectId) -> Self {
        Self {
            id: id.into(),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: CurveKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_curvedir(mut self, curvedir: CurveDirAttr) -> Self {
        self.curvedir = Some(curvedir);
        self
    }

    pub fn with_bulge(mut self, bulge: Vec<BulgeEntry>) -> Self {
        self.bulge = bulge;
        self
    }

    pub fn has_bulge(&self) -> bool {
        !self.bulge.is_empty()
    }
}

/// Drawing direction of a curve
///
/// Mixed directions start curving one way and end the other, which happens
/// when the two ends live on different staves.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    #[default]
    None,
    Above,
    Below,
    AboveBelow,
    BelowAbove,
}

impl CurveDirection {
    pub fn is_mixed(self) -> bool {
        matches!(self, CurveDirection::AboveBelow | CurveDirection::BelowAbove)
    }

    /// Whether the start of the curve bows upwards
    pub fn is_start_above(self) -> bool {
        matches!(self, CurveDirection::Above | CurveDirection::AboveBelow)
    }

    /// Whether the end of the curve bows upwards
    pub fn is_end_above(self) -> bool {
        matches!(self, CurveDirection::Above | CurveDirection::BelowAbove)
    }

    /// Build a direction from the curvature chosen for each side
    pub fn from_sides(start_above: bool, end_above: bool) -> Self {
        match (start_above, end_above) {
            (true, true) => CurveDirection::Above,
            (false, false) => CurveDirection::Below,
            (true, false) => CurveDirection::AboveBelow,
            (false, true) => CurveDirection::BelowAbove,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CurveDirection::None => "none",
            CurveDirection::Above => "above",
            CurveDirection::Below => "below",
            CurveDirection::AboveBelow => "above_below",
            CurveDirection::BelowAbove => "below_above",
        }
    }
}

/// Which part of a curve a drawn instance represents
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanningType {
    /// Start and end are both on this system
    #[default]
    StartEnd,
    /// Only the start is on this system
    Start,
    /// Neither end is on this system
    Middle,
    /// Only the end is on this system
    End,
}

impl SpanningType {
    pub fn has_start(self) -> bool {
        matches!(self, SpanningType::StartEnd | SpanningType::Start)
    }

    pub fn has_end(self) -> bool {
        matches!(self, SpanningType::StartEnd | SpanningType::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_sides() {
        assert_eq!(CurveDirection::from_sides(true, false), CurveDirection::AboveBelow);
        assert!(CurveDirection::AboveBelow.is_start_above());
        assert!(!CurveDirection::AboveBelow.is_end_above());
        assert!(CurveDirection::BelowAbove.is_mixed());
        assert!(!CurveDirection::Below.is_mixed());
    }

    #[test]
    fn test_spanning_type_sides() {
        assert!(SpanningType::StartEnd.has_start() && SpanningType::StartEnd.has_end());
        assert!(!SpanningType::Middle.has_start() && !SpanningType::Middle.has_end());
        assert!(SpanningType::End.has_end());
    }
}
