//! Slur Layout WASM Module
//!
//! Positions slurs and phrase marks of an engraved score: endpoints next to
//! noteheads and stems, control points clear of every spanned object, and a
//! convex shape. The score itself is handed over as a read-only snapshot.

pub mod api;
pub mod diagnostics;
pub mod errors;
pub mod layout;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use errors::{ConfigError, LayoutError, SnapshotError};
pub use layout::{CurveEngine, CurveLayoutResult, CurveOptions, RenderCurve};
pub use models::*;

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    init_logging();
    log::info!("Slur layout WASM module initialized");
}

#[cfg(feature = "console_log")]
fn init_logging() {
    if console_log::init_with_level(log::Level::Debug).is_err() {
        log::warn!("logger was already initialized");
    }
}

#[cfg(not(feature = "console_log"))]
fn init_logging() {}
