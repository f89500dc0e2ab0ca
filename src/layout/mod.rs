//! Slur and phrase-mark positioning
//!
//! Leaves first: the Bézier model, the per-instance positioner, collection
//! and filtering of obstacles, endpoint placement and shifting, the control
//! point solver, the shape corrector and the pass over nested curves. The
//! `engine` module runs them in order.

pub mod bezier;
pub mod collector;
pub mod direction;
pub mod display_list;
pub mod endpoint_shift;
pub mod endpoints;
pub mod engine;
pub mod filter;
pub mod nested;
pub mod options;
pub mod positioner;
pub mod shape;
pub mod solver;

// Re-export commonly used types
pub use bezier::BezierCurve;
pub use display_list::{CurveSink, RenderCurve, SvgPathSink};
pub use engine::{CurveEngine, CurveLayoutResult, StaffSpaceRequest};
pub use options::CurveOptions;
pub use positioner::{CurvePositioner, SpannedElement, SpannedKind};
