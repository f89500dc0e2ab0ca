//! Diagnostics reported while laying out curves
//!
//! Requests the engine cannot honor (mixed direction on one staff, missing
//! anchors, ...) are not errors: the curve is still laid out with a fallback
//! and a mark is recorded here for the caller to display.

use serde::{Deserialize, Serialize};

use crate::models::CurveId;

/// Mixed direction requested for a curve starting and ending on one staff
pub const CURVEDIR_MIXED_SAME_STAFF: &str = "curvedir_mixed_same_staff";
/// Mixed direction requested together with a prescribed bulge
pub const CURVEDIR_MIXED_WITH_BULGE: &str = "curvedir_mixed_with_bulge";
/// Start or end anchor could not be resolved
pub const MISSING_ANCHOR: &str = "missing_anchor";
/// Anchors live in different layers
pub const LAYER_MISMATCH: &str = "layer_mismatch";

/// A warning attached to one curve
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DiagnosticMark {
    /// Index of the curve in the snapshot
    pub curve: CurveId,
    /// Identifier of the curve as given in the snapshot
    pub curve_id: String,
    /// Kind identifier (e.g., "curvedir_mixed_same_staff")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl DiagnosticMark {
    /// Warning mark, logged as it is created
    pub fn warning(
        curve: CurveId,
        curve_id: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mark = Self {
            curve,
            curve_id: curve_id.into(),
            kind: kind.into(),
            message: message.into(),
        };
        log::warn!("curve `{}`: {}", mark.curve_id, mark.message);
        mark
    }
}

/// Collection of diagnostic marks for one layout run
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Diagnostics {
    pub marks: Vec<DiagnosticMark>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    pub fn add(&mut self, mark: DiagnosticMark) {
        self.marks.push(mark);
    }

    pub fn extend(&mut self, marks: impl IntoIterator<Item = DiagnosticMark>) {
        self.marks.extend(marks);
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Marks of the given kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DiagnosticMark> + 'a {
        self.marks.iter().filter(move |m| m.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_mark_creation() {
        let mark = DiagnosticMark::warning(
            CurveId(3),
            "slur-3",
            MISSING_ANCHOR,
            "curve anchor could not be resolved",
        );

        assert_eq!(mark.curve, CurveId(3));
        assert_eq!(mark.curve_id, "slur-3");
        assert_eq!(mark.kind, MISSING_ANCHOR);
    }

    #[test]
    fn test_diagnostics_filters() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.add(DiagnosticMark::warning(
            CurveId(0),
            "a",
            CURVEDIR_MIXED_SAME_STAFF,
            "ignored",
        ));
        diags.add(DiagnosticMark::warning(CurveId(1), "b", MISSING_ANCHOR, "missing"));
        assert_eq!(diags.of_kind(MISSING_ANCHOR).count(), 1);
        assert_eq!(diags.of_kind(LAYER_MISMATCH).count(), 0);

        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json["marks"][0]["kind"], CURVEDIR_MIXED_SAME_STAFF);
    }
}
