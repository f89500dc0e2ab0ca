//! Error types for the configuration and snapshot boundaries
//!
//! The curve pipeline itself is infallible: degenerate geometry is handled by
//! early returns. Only loading options and accepting a snapshot can fail.

use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid curve options: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid score snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors raised while loading or validating `CurveOptions`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed options JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("option `{name}` = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Dangling references inside a `ScoreSnapshot`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("{context} references unknown object {id}")]
    UnknownObject { context: String, id: usize },

    #[error("object {object} references unknown system {system}")]
    UnknownSystem { object: usize, system: usize },

    #[error("object {object} references unknown measure {measure} in system {system}")]
    UnknownMeasure {
        object: usize,
        system: usize,
        measure: usize,
    },

    #[error("object {object} sits on staff {staff} which system {system} does not have")]
    UnknownStaff {
        object: usize,
        system: usize,
        staff: u32,
    },

    #[error("curve `{curve}` anchor {anchor} is not a note or chord")]
    InvalidAnchor { curve: String, anchor: usize },
}
