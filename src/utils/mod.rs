//! Utility modules for the curve layout engine

pub mod performance;

// Re-export commonly used types
pub use performance::*;
