//! Curve layout operations exposed to JavaScript
//!
//! The engine lives in a WASM-owned mutex so curve directions survive
//! between layout calls until `resetCurveDirections` is called.

use lazy_static::lazy_static;
use std::sync::{Mutex, MutexGuard};
use wasm_bindgen::prelude::*;

use crate::api::helpers::{deserialize, js_error, serialize};
use crate::layout::{CurveEngine, CurveOptions};
use crate::models::ScoreSnapshot;
use crate::{wasm_info, wasm_log};

lazy_static! {
    static ref ENGINE: Mutex<Option<CurveEngine>> = Mutex::new(None);
}

fn lock_engine() -> Result<MutexGuard<'static, Option<CurveEngine>>, JsValue> {
    ENGINE
        .lock()
        .map_err(|e| js_error(format!("Engine lock poisoned: {}", e)))
}

/// Default engraving options as a plain object
#[wasm_bindgen(js_name = defaultCurveOptions)]
pub fn default_curve_options() -> Result<JsValue, JsValue> {
    serialize(&CurveOptions::default(), "Failed to serialize options")
}

/// Lay out every curve of a score snapshot
///
/// `options` may be `undefined` to keep the options of the previous call
/// (or the defaults). Changing the options resets the cached directions.
#[wasm_bindgen(js_name = layoutCurves)]
pub fn layout_curves(snapshot: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let snapshot: ScoreSnapshot = deserialize(snapshot, "Invalid score snapshot")?;
    wasm_info!(
        "layoutCurves called with {} object(s), {} curve(s)",
        snapshot.objects.len(),
        snapshot.curves.len()
    );

    let mut guard = lock_engine()?;
    if !options.is_undefined() && !options.is_null() {
        let options: CurveOptions = deserialize(options, "Invalid curve options")?;
        let unchanged = guard.as_ref().is_some_and(|e| *e.options() == options);
        if !unchanged {
            *guard = Some(CurveEngine::new(options).map_err(js_error)?);
        }
    }
    if guard.is_none() {
        *guard = Some(CurveEngine::new(CurveOptions::default()).map_err(js_error)?);
    }
    let engine = guard
        .as_mut()
        .ok_or_else(|| JsValue::from_str("No curve engine"))?;

    let result = engine.layout(&snapshot).map_err(js_error)?;
    wasm_log!(
        "  {} curve(s) positioned, {} diagnostic(s)",
        result.curves.len(),
        result.diagnostics.marks.len()
    );
    serialize(&result, "Failed to serialize layout result")
}

/// Forget the cached curve directions
#[wasm_bindgen(js_name = resetCurveDirections)]
pub fn reset_curve_directions() -> Result<(), JsValue> {
    if let Some(engine) = lock_engine()?.as_mut() {
        engine.reset_directions();
    }
    Ok(())
}

/// Validate options given as JSON text
#[wasm_bindgen(js_name = validateCurveOptions)]
pub fn validate_curve_options(json: &str) -> Result<(), JsValue> {
    CurveOptions::from_json(json).map(|_| ()).map_err(js_error)
}
