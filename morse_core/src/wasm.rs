// JS-facing wrappers. Inputs and outputs are JSON strings; time comes in as
// the host's `performance.now()` reading on every call that needs it.
// Listeners are plain JS functions receiving a JSON payload. A listener that
// wants to stop or pause must use the handle from `control_handle()`: calling
// back into the emitting object while it is borrowed fails on the JS side.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::animation::AnimationPreset;
use crate::cache::PatternCache;
use crate::clock::ManualClock;
use crate::codec;
use crate::events::{ControlHandle, SubscriptionId};
use crate::geometry::{self, Tool};
use crate::interchange;
use crate::orchestrator::TransitionOrchestrator;
use crate::presets::{self, PresetKind};
use crate::sequencer::FrameSequencer;
use crate::types::{Iterations, OrchestratorConfig, Pattern, Point, SequencerConfig};

thread_local! {
    static PRESET_CACHE: PatternCache = PatternCache::default();
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn engine_error(err: crate::EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn pattern_arg(json: &str) -> Result<Pattern, JsValue> {
    let value: Value = parse(json, "pattern")?;
    codec::pattern_from_value(&value)
        .ok_or_else(|| JsValue::from_str("Invalid pattern: expected a square grid of booleans"))
}

/// Frame list from JSON. A malformed frame becomes an empty placeholder, which
/// the sequencer skips at emission while keeping every other frame's index.
fn frames_arg(json: &str) -> Result<Vec<Pattern>, JsValue> {
    let values: Vec<Value> = parse(json, "frames")?;
    Ok(values
        .iter()
        .map(|value| codec::pattern_from_value(value).unwrap_or_else(|| Pattern::from_rows(Vec::new())))
        .collect())
}

fn notify(callback: &js_sys::Function, payload: &impl Serialize) {
    let json = match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(e) => {
            warn!("Listener payload not serializable: {}", e);
            return;
        }
    };
    // A throwing listener must not tear down the tick loop.
    if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
        warn!("Listener threw: {:?}", err);
    }
}

/// Lets a JS listener pause, stop or destroy the component it listens to.
#[wasm_bindgen]
pub struct WasmControlHandle {
    inner: ControlHandle,
}

#[wasm_bindgen]
impl WasmControlHandle {
    pub fn pause(&self) {
        self.inner.pause();
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

/// Frame sequencer for JavaScript.
///
/// # Example
/// ```json
/// frames: [[[true, false], [false, true]], [[false, true], [true, false]]]
/// config: { "tempo_ms": 120, "iterations": "infinite" }
/// ```
/// Events arrive as `{"type":"frame_changed","index":1,"pattern":[...]}`,
/// `{"type":"cycle_completed","iteration":1}` or
/// `{"type":"sequence_completed"}`.
#[wasm_bindgen]
pub struct WasmFrameSequencer {
    inner: FrameSequencer<ManualClock>,
    clock: ManualClock,
}

#[wasm_bindgen]
impl WasmFrameSequencer {
    #[wasm_bindgen(constructor)]
    pub fn new(frames_json: &str, config_json: &str) -> Result<WasmFrameSequencer, JsValue> {
        let frames = frames_arg(frames_json)?;
        let config: SequencerConfig = parse(config_json, "sequencer config")?;
        let clock = ManualClock::new();
        let inner = FrameSequencer::new(frames, config, clock.clone()).map_err(engine_error)?;
        Ok(WasmFrameSequencer { inner, clock })
    }

    pub fn start(&mut self, now_ms: f64) {
        self.clock.set_millis(now_ms);
        self.inner.start();
    }

    pub fn pause(&mut self, now_ms: f64) {
        self.clock.set_millis(now_ms);
        self.inner.pause();
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn reset(&mut self, now_ms: f64) {
        self.clock.set_millis(now_ms);
        self.inner.reset();
    }

    /// Call from `requestAnimationFrame`. Returns the frames advanced.
    pub fn tick(&mut self, now_ms: f64) -> u32 {
        self.clock.set_millis(now_ms);
        self.inner.tick() as u32
    }

    pub fn set_tempo(&mut self, tempo_ms: f64) -> Result<(), JsValue> {
        self.inner.set_tempo(tempo_ms).map_err(engine_error)
    }

    pub fn set_frames(&mut self, frames_json: &str) -> Result<(), JsValue> {
        self.inner.set_frames(frames_arg(frames_json)?);
        Ok(())
    }

    /// Accepts `3` or `"infinite"`.
    pub fn set_iterations(&mut self, iterations_json: &str) -> Result<(), JsValue> {
        let iterations: Iterations = parse(iterations_json, "iterations")?;
        self.inner.set_iterations(iterations);
        Ok(())
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress()
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.state())
    }

    /// `undefined` when there are no frames.
    pub fn current_pattern_json(&self) -> Option<String> {
        self.inner
            .current_pattern()
            .and_then(|pattern| serde_json::to_string(pattern).ok())
    }

    pub fn subscribe(&mut self, callback: js_sys::Function) -> u32 {
        let id = self.inner.subscribe(move |event| notify(&callback, event));
        id.raw() as u32
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        self.inner.unsubscribe(SubscriptionId::from_raw(u64::from(id)))
    }

    pub fn control_handle(&self) -> WasmControlHandle {
        WasmControlHandle {
            inner: self.inner.control_handle(),
        }
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// Label orchestrator for JavaScript. Listeners receive the
/// `OrchestratorState` as JSON.
///
/// # Example JSON Config
/// ```json
/// { "labels": ["Thinking", "Searching"], "hold_duration_ms": 3000, "transition_duration_ms": 300 }
/// ```
#[wasm_bindgen]
pub struct WasmOrchestrator {
    inner: TransitionOrchestrator<ManualClock>,
    clock: ManualClock,
}

#[wasm_bindgen]
impl WasmOrchestrator {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmOrchestrator, JsValue> {
        let config: OrchestratorConfig = parse(config_json, "orchestrator config")?;
        let clock = ManualClock::new();
        let inner = TransitionOrchestrator::new(config, clock.clone()).map_err(engine_error)?;
        Ok(WasmOrchestrator { inner, clock })
    }

    pub fn start(&mut self, now_ms: f64) {
        self.clock.set_millis(now_ms);
        self.inner.start();
    }

    pub fn pause(&mut self, now_ms: f64) {
        self.clock.set_millis(now_ms);
        self.inner.pause();
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Returns the number of phase changes processed.
    pub fn tick(&mut self, now_ms: f64) -> u32 {
        self.clock.set_millis(now_ms);
        self.inner.tick() as u32
    }

    pub fn set_labels(&mut self, labels_json: &str) -> Result<(), JsValue> {
        let labels: Vec<String> = parse(labels_json, "labels")?;
        self.inner.set_labels(labels);
        Ok(())
    }

    pub fn set_durations(&mut self, hold_ms: f64, transition_ms: f64) -> Result<(), JsValue> {
        self.inner.set_durations(hold_ms, transition_ms).map_err(engine_error)
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.state())
    }

    pub fn subscribe(&mut self, callback: js_sys::Function) -> u32 {
        let id = self.inner.subscribe(move |state| notify(&callback, state));
        id.raw() as u32
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        self.inner.unsubscribe(SubscriptionId::from_raw(u64::from(id)))
    }

    pub fn control_handle(&self) -> WasmControlHandle {
        WasmControlHandle {
            inner: self.inner.control_handle(),
        }
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// `false` for malformed JSON as well as malformed grids.
#[wasm_bindgen]
pub fn is_valid_pattern_json(json: &str) -> bool {
    serde_json::from_str::<Value>(json)
        .map(|value| codec::is_valid_pattern_value(&value))
        .unwrap_or(false)
}

#[wasm_bindgen]
pub fn normalize_pattern_json(json: &str, target_size: u32) -> Option<String> {
    let value: Value = serde_json::from_str(json).ok()?;
    let pattern = codec::normalize_pattern_value(&value, target_size as usize)?;
    serde_json::to_string(&pattern).ok()
}

#[wasm_bindgen]
pub fn compress_pattern_json(json: &str) -> Result<String, JsValue> {
    Ok(codec::compress_pattern(&pattern_arg(json)?))
}

#[wasm_bindgen]
pub fn decompress_pattern_json(compressed: &str, size: u32) -> Option<String> {
    let pattern = codec::decompress_pattern(compressed, size as usize)?;
    serde_json::to_string(&pattern).ok()
}

#[wasm_bindgen]
pub fn pattern_to_text(json: &str) -> Result<String, JsValue> {
    Ok(codec::pattern_to_string(&pattern_arg(json)?))
}

#[wasm_bindgen]
pub fn text_to_pattern_json(text: &str, size: u32) -> Option<String> {
    let pattern = codec::string_to_pattern(text, size as usize)?;
    serde_json::to_string(&pattern).ok()
}

#[wasm_bindgen]
pub fn line_points_json(x0: i32, y0: i32, x1: i32, y1: i32) -> Result<String, JsValue> {
    to_json(&geometry::line_points(Point::new(x0, y0), Point::new(x1, y1)))
}

#[wasm_bindgen]
pub fn rectangle_points_json(x0: i32, y0: i32, x1: i32, y1: i32, filled: bool) -> Result<String, JsValue> {
    to_json(&geometry::rectangle_points(Point::new(x0, y0), Point::new(x1, y1), filled))
}

#[wasm_bindgen]
pub fn circle_points_json(cx: i32, cy: i32, ex: i32, ey: i32, filled: bool) -> Result<String, JsValue> {
    to_json(&geometry::circle_points(Point::new(cx, cy), Point::new(ex, ey), filled))
}

#[wasm_bindgen]
pub fn flood_fill_points_json(pattern_json: &str, x: i32, y: i32, grid_size: u32) -> Result<String, JsValue> {
    let pattern = pattern_arg(pattern_json)?;
    to_json(&geometry::flood_fill_points(&pattern, Point::new(x, y), grid_size as usize))
}

/// Applies one editor gesture and returns the new pattern.
///
/// `tool` is one of `pencil`, `eraser`, `line`, `rectangle`, `circle`, `fill`.
#[wasm_bindgen]
pub fn apply_tool_json(
    pattern_json: &str,
    tool: &str,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    filled: bool,
) -> Result<String, JsValue> {
    let pattern = pattern_arg(pattern_json)?;
    let tool: Tool = serde_json::from_value(Value::String(tool.to_string()))
        .map_err(|e| JsValue::from_str(&format!("Invalid tool: {}", e)))?;
    to_json(&tool.apply(&pattern, Point::new(x0, y0), Point::new(x1, y1), filled))
}

#[wasm_bindgen]
pub fn animation_delay_ms(preset: &str, row: u32, col: u32, grid_size: u32) -> Result<f64, JsValue> {
    let preset: AnimationPreset = serde_json::from_value(Value::String(preset.to_string()))
        .map_err(|e| JsValue::from_str(&format!("Invalid animation preset: {}", e)))?;
    Ok(preset.delay_ms(row as usize, col as usize, grid_size as usize))
}

#[wasm_bindgen]
pub fn preset_names_json() -> Result<String, JsValue> {
    let names: Vec<&str> = PresetKind::ALL.iter().map(PresetKind::name).collect();
    to_json(&names)
}

/// `undefined` for an unknown preset name.
#[wasm_bindgen]
pub fn preset_json(name: &str) -> Option<String> {
    PRESET_CACHE.with(|cache| {
        let preset = presets::preset_by_name(name, cache)?;
        serde_json::to_string(&preset).ok()
    })
}

/// Validates an editor document and returns it re-serialized.
#[wasm_bindgen]
pub fn import_animation_json(json: &str) -> Result<String, JsValue> {
    let document = interchange::import_animation(json).map_err(engine_error)?;
    to_json(&document)
}

#[wasm_bindgen]
pub fn export_animation_json(document_json: &str) -> Result<String, JsValue> {
    let document: interchange::AnimationDocument = parse(document_json, "animation document")?;
    interchange::export_animation(&document).map_err(engine_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Error paths build a JsValue, which only exists on wasm32; they are
    // covered by tests/web.rs.

    #[test]
    fn sequencer_wrapper_drives_playback() {
        let frames = "[[[true,false],[false,true]],[[false,true],[true,false]],[[true,true],[true,true]]]";
        let mut seq = WasmFrameSequencer::new(frames, r#"{"tempo_ms": 100, "iterations": 2}"#)
            .expect("valid config");
        seq.start(1000.0);
        assert_eq!(seq.tick(1050.0), 0);
        assert_eq!(seq.tick(1100.0), 1);
        assert_eq!(seq.tick(1350.0), 2);

        let state: crate::SequencerState = serde_json::from_str(&seq.state_json().unwrap()).unwrap();
        assert_eq!(state.current_frame_index, 0);
        assert_eq!(state.current_iteration, 1);
        assert!((seq.progress() - 0.5).abs() < 1e-9);
        assert_eq!(
            seq.current_pattern_json().as_deref(),
            Some("[[true,false],[false,true]]")
        );

        seq.set_iterations("\"infinite\"").unwrap();
        assert_eq!(seq.progress(), 0.0);
        seq.destroy();
        assert!(!seq.is_running());
    }

    #[test]
    fn sequencer_wrapper_pause_resume() {
        let mut seq = WasmFrameSequencer::new("[[[true]],[[false]]]", "{}").unwrap();
        seq.start(0.0);
        seq.pause(150.0);
        assert_eq!(seq.tick(10_000.0), 0);
        seq.start(10_000.0);
        assert_eq!(seq.tick(10_050.0), 1);
    }

    #[test]
    fn malformed_frames_are_skipped_not_rejected() {
        let mut seq = WasmFrameSequencer::new("[[[true]],[[1]],[[false]]]", r#"{"tempo_ms": 100}"#)
            .expect("bad cells do not reject the list");
        seq.start(0.0);
        assert_eq!(seq.tick(100.0), 1);
        assert_eq!(seq.current_pattern_json().as_deref(), Some("[]"));
        assert_eq!(seq.tick(200.0), 1);
        assert_eq!(seq.current_pattern_json().as_deref(), Some("[[false]]"));

        seq.set_frames(r#"[[[true]], "nope", [[true, false]]]"#).unwrap();
        let state: crate::SequencerState = serde_json::from_str(&seq.state_json().unwrap()).unwrap();
        assert_eq!(state.current_frame_index, 2);
        assert_eq!(seq.current_pattern_json().as_deref(), Some("[]"));
    }

    #[test]
    fn orchestrator_wrapper_alternates() {
        let mut orch = WasmOrchestrator::new(
            r#"{"labels":["Thinking","Searching"],"hold_duration_ms":500,"transition_duration_ms":100}"#,
        )
        .unwrap();
        orch.start(0.0);
        assert_eq!(orch.tick(500.0), 1);
        let state: crate::OrchestratorState = serde_json::from_str(&orch.state_json().unwrap()).unwrap();
        assert!(state.is_transitioning);
        assert_eq!(state.next_label.as_deref(), Some("Searching"));

        assert_eq!(orch.tick(600.0), 1);
        orch.set_labels(r#"["Only"]"#).unwrap();
        let state: crate::OrchestratorState = serde_json::from_str(&orch.state_json().unwrap()).unwrap();
        assert_eq!(state.current_label, "Only");
    }

    #[test]
    fn codec_functions_over_json() {
        assert!(is_valid_pattern_json("[[true,false],[false,false]]"));
        assert!(!is_valid_pattern_json("[[true,false],[false]]"));
        assert!(!is_valid_pattern_json("not json"));

        let compressed = compress_pattern_json("[[false,false],[false,false]]").unwrap();
        assert_eq!(compressed, "AA==");
        assert_eq!(
            decompress_pattern_json(&compressed, 2).as_deref(),
            Some("[[false,false],[false,false]]")
        );
        assert!(decompress_pattern_json("%%%", 2).is_none());

        assert_eq!(
            normalize_pattern_json("[[true]]", 2).as_deref(),
            Some("[[true,false],[false,false]]")
        );
        assert_eq!(pattern_to_text("[[true,false],[false,true]]").unwrap(), "█░\n░█");
        assert_eq!(text_to_pattern_json("#.\n.#", 2).as_deref(), Some("[[true,false],[false,true]]"));
    }

    #[test]
    fn geometry_functions_over_json() {
        let line: Vec<Point> = serde_json::from_str(&line_points_json(0, 0, 2, 0).unwrap()).unwrap();
        assert_eq!(line.len(), 3);

        let rect: Vec<Point> = serde_json::from_str(&rectangle_points_json(0, 0, 2, 2, false).unwrap()).unwrap();
        assert_eq!(rect.len(), 8);

        let disc: Vec<Point> = serde_json::from_str(&circle_points_json(2, 2, 3, 2, true).unwrap()).unwrap();
        assert_eq!(disc.len(), 5);

        let empty = "[[false,false,false],[false,false,false],[false,false,false]]";
        let fill: Vec<Point> = serde_json::from_str(&flood_fill_points_json(empty, 1, 1, 3).unwrap()).unwrap();
        assert_eq!(fill.len(), 9);

        let drawn = apply_tool_json(empty, "line", 0, 0, 2, 2, false).unwrap();
        assert_eq!(drawn, "[[true,false,false],[false,true,false],[false,false,true]]");
    }

    #[test]
    fn presets_and_animation_delays() {
        let names: Vec<String> = serde_json::from_str(&preset_names_json().unwrap()).unwrap();
        assert_eq!(names.len(), 10);
        assert!(preset_json("SOS").is_some());
        assert!(preset_json("Unknown").is_none());
        assert_eq!(animation_delay_ms("cascade", 1, 2, 8).unwrap(), 60.0);
    }

    #[test]
    fn animation_documents_over_json() {
        let doc = r#"{"frames":[{"pattern":[[true]],"duration":300}],"gridSize":1}"#;
        let imported = import_animation_json(doc).unwrap();
        let exported = export_animation_json(&imported).unwrap();
        assert!(exported.contains("\"duration\": 300"));
    }
}
