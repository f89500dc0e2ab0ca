//! Models module for the curve layout engine
//!
//! This module contains the read-only score snapshot handed over by the
//! alignment pass, the curve descriptions and the geometric primitives
//! shared by the layout code.

pub mod builder;
pub mod curve;
pub mod geometry;
pub mod score;

// Re-export commonly used types
pub use builder::SnapshotBuilder;
pub use curve::*;
pub use geometry::*;
pub use score::*;
