//! Slur layout WASM API
//!
//! JavaScript-facing entry points of the curve engine.
//!
//! # Module Structure
//!
//! - `helpers`: Console logging, serialization and error conversion
//! - `curves`: Layout of the curves of a score snapshot

pub mod curves;
pub mod helpers;

pub use curves::{default_curve_options, layout_curves, reset_curve_directions, validate_curve_options};
