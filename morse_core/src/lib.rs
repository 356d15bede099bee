// morse_core: timing, geometry and codec engine for Morse pixel-grid animations.
// Everything that must be bit-exact or correctly timed lives here; the UI layer
// only renders what this crate hands it.

mod animation;
mod cache;
mod clock;
mod codec;
mod error;
mod events;
mod generators;
mod geometry;
mod interchange;
mod orchestrator;
mod presets;
mod sequencer;
mod types;
mod wasm;

use wasm_bindgen::prelude::*;

pub use animation::AnimationPreset;
pub use cache::{
    cached_checkerboard, cached_circle, cached_cross, cached_diagonal, cached_ring, cached_wave, CacheKey,
    CacheStats, PatternCache,
};
#[cfg(not(target_arch = "wasm32"))]
pub use clock::SystemClock;
pub use clock::{Clock, ManualClock};
pub use codec::{
    compress_pattern, decompress_pattern, is_valid_pattern, is_valid_pattern_value, normalize_pattern,
    normalize_pattern_value, pattern_from_value, pattern_to_string, string_to_pattern, CompressedPattern,
};
pub use error::EngineError;
pub use events::{ControlHandle, ControlRequest, Emitter, SubscriptionId};
pub use generators::{
    checkerboard, circle, cross, diagonal, flip, heart, morph, ring, rotate, scale, shift, spiral, wave,
    ShiftDirection,
};
pub use geometry::{
    apply_points, circle_points, circle_points_in_grid, circle_radius, flood_fill_points, line_points, rectangle_points, Tool,
};
pub use interchange::{export_animation, import_animation, AnimationDocument, AnimationFrame};
pub use orchestrator::{TransitionOrchestrator, MAX_CATCH_UP_PHASES};
pub use presets::{all_presets, preset_by_name, Preset, PresetKind};
pub use sequencer::{FrameSequencer, SequencerEvent, MAX_CATCH_UP_FRAMES};
pub use types::*;
pub use wasm::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
