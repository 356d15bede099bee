// Built-in 8x8 animations offered by the pattern library.
// Circle, ring and wave frames come through the generator cache.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::cache::{cached_circle, cached_cross, cached_diagonal, cached_ring, cached_wave, PatternCache};
use crate::generators::{self, round_half_up};
use crate::types::{Pattern, DEFAULT_PATTERN_SIZE};

const SIZE: usize = DEFAULT_PATTERN_SIZE;
const GEOMETRIC_CENTER: f64 = 3.5;

/// Named frame list with its tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub frames: Vec<Pattern>,
    pub tempo_ms: f64,
}

/// Every built-in preset, in library order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetKind {
    Loading,
    Processing,
    Scanning,
    Building,
    Pulse,
    Sos,
    Heart,
    Wave,
    Spiral,
    Diagonal,
}

impl PresetKind {
    pub const ALL: [PresetKind; 10] = [
        PresetKind::Loading,
        PresetKind::Processing,
        PresetKind::Scanning,
        PresetKind::Building,
        PresetKind::Pulse,
        PresetKind::Sos,
        PresetKind::Heart,
        PresetKind::Wave,
        PresetKind::Spiral,
        PresetKind::Diagonal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PresetKind::Loading => "Loading",
            PresetKind::Processing => "Processing",
            PresetKind::Scanning => "Scanning",
            PresetKind::Building => "Building",
            PresetKind::Pulse => "Pulse",
            PresetKind::Sos => "SOS",
            PresetKind::Heart => "Heart",
            PresetKind::Wave => "Wave",
            PresetKind::Spiral => "Spiral",
            PresetKind::Diagonal => "Diagonal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            PresetKind::Loading => "Expanding circles animation",
            PresetKind::Processing => "Rotating cross pattern",
            PresetKind::Scanning => "Radar sweep effect",
            PresetKind::Building => "Bottom-up fill animation",
            PresetKind::Pulse => "Center-out wave effect",
            PresetKind::Sos => "Morse code SOS signal",
            PresetKind::Heart => "Static heart shape",
            PresetKind::Wave => "Sine wave pattern",
            PresetKind::Spiral => "Spiral pattern",
            PresetKind::Diagonal => "Diagonal lines",
        }
    }

    fn tempo_ms(&self) -> f64 {
        match self {
            PresetKind::Loading | PresetKind::Sos => 100.0,
            PresetKind::Processing => 80.0,
            PresetKind::Scanning => 60.0,
            PresetKind::Building => 120.0,
            PresetKind::Pulse => 150.0,
            PresetKind::Wave => 200.0,
            PresetKind::Heart | PresetKind::Spiral | PresetKind::Diagonal => 1000.0,
        }
    }

    /// Builds the preset, drawing shared shapes from `cache`.
    pub fn build(&self, cache: &PatternCache) -> Preset {
        let frames = match self {
            PresetKind::Loading => expanding_circles(cache),
            PresetKind::Processing => rotating_cross(cache),
            PresetKind::Scanning => radar_sweep(),
            PresetKind::Building => building_blocks(),
            PresetKind::Pulse => pulse_wave(cache),
            PresetKind::Sos => morse_signal("...---..."),
            PresetKind::Heart => vec![generators::heart(SIZE)],
            PresetKind::Wave => vec![
                cached_wave(cache, SIZE, 2.0, 1.0),
                cached_wave(cache, SIZE, 2.0, 1.5),
                cached_wave(cache, SIZE, 2.0, 2.0),
            ],
            PresetKind::Spiral => vec![generators::spiral(SIZE)],
            PresetKind::Diagonal => vec![cached_diagonal(cache, SIZE)],
        };
        Preset {
            name: self.name().to_string(),
            description: self.description().to_string(),
            frames,
            tempo_ms: self.tempo_ms(),
        }
    }
}

/// All presets in library order.
pub fn all_presets(cache: &PatternCache) -> Vec<Preset> {
    PresetKind::ALL.iter().map(|kind| kind.build(cache)).collect()
}

pub fn preset_by_name(name: &str, cache: &PatternCache) -> Option<Preset> {
    PresetKind::from_name(name).map(|kind| kind.build(cache))
}

fn expanding_circles(cache: &PatternCache) -> Vec<Pattern> {
    (0..=4)
        .chain((1..=3).rev())
        .map(|radius| cached_circle(cache, SIZE, f64::from(radius)))
        .collect()
}

fn rotating_cross(cache: &PatternCache) -> Vec<Pattern> {
    let base = cached_cross(cache, SIZE);
    let mut frames = vec![base.clone()];

    for angle in (0..360).step_by(45) {
        let rad = f64::from(angle) * PI / 180.0;
        let (sin, cos) = rad.sin_cos();
        let mut frame = Pattern::empty(SIZE);
        for (r, row) in base.rows().iter().enumerate() {
            for (c, _) in row.iter().enumerate().filter(|(_, on)| **on) {
                let x = c as f64 - GEOMETRIC_CENTER;
                let y = r as f64 - GEOMETRIC_CENTER;
                let new_c = round_half_up(x * cos - y * sin + GEOMETRIC_CENTER);
                let new_r = round_half_up(x * sin + y * cos + GEOMETRIC_CENTER);
                if (0.0..SIZE as f64).contains(&new_r) && (0.0..SIZE as f64).contains(&new_c) {
                    frame.set(new_r as usize, new_c as usize, true);
                }
            }
        }
        frames.push(frame);
    }
    frames
}

fn radar_sweep() -> Vec<Pattern> {
    const STEPS: usize = 16;
    (0..STEPS)
        .map(|step| {
            let angle = step as f64 / STEPS as f64 * PI * 2.0;
            let mut frame = Pattern::empty(SIZE);
            for r in 0..SIZE {
                for c in 0..SIZE {
                    let x = c as f64 - GEOMETRIC_CENTER;
                    let y = r as f64 - GEOMETRIC_CENTER;
                    let diff = (y.atan2(x) - angle).abs();
                    let diff = diff.min(PI * 2.0 - diff);
                    if diff < PI / 8.0 && (x * x + y * y).sqrt() <= GEOMETRIC_CENTER {
                        frame.set(r, c, true);
                    }
                }
            }
            frame
        })
        .collect()
}

fn building_blocks() -> Vec<Pattern> {
    let filled_from = |first_row: usize| {
        let mut frame = Pattern::empty(SIZE);
        for r in first_row..SIZE {
            for c in 0..SIZE {
                frame.set(r, c, true);
            }
        }
        frame
    };
    (0..SIZE).rev().chain(1..SIZE).map(filled_from).collect()
}

fn pulse_wave(cache: &PatternCache) -> Vec<Pattern> {
    (0..=4)
        .map(|radius| {
            let radius = f64::from(radius);
            cached_ring(cache, SIZE, radius + 0.5, (radius - 0.5).max(0.0))
        })
        .collect()
}

/// Dots hold for two frames, dashes for six, each symbol followed by two
/// blank frames. Other characters only contribute the blank gap.
fn morse_signal(code: &str) -> Vec<Pattern> {
    const DOT_FRAMES: usize = 2;
    const DASH_FRAMES: usize = 6;
    const GAP_FRAMES: usize = 2;

    let bar = |first_col: usize, last_col: usize| {
        let mut frame = Pattern::empty(SIZE);
        for r in 3..=4 {
            for c in first_col..=last_col {
                frame.set(r, c, true);
            }
        }
        frame
    };

    let mut frames = Vec::new();
    for symbol in code.chars() {
        match symbol {
            '.' => frames.extend(std::iter::repeat(bar(3, 4)).take(DOT_FRAMES)),
            '-' => frames.extend(std::iter::repeat(bar(1, 6)).take(DASH_FRAMES)),
            _ => {}
        }
        frames.extend(std::iter::repeat(Pattern::empty(SIZE)).take(GAP_FRAMES));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_builds_valid_frames() {
        let cache = PatternCache::default();
        let presets = all_presets(&cache);
        assert_eq!(presets.len(), 10);
        for preset in &presets {
            assert!(!preset.frames.is_empty(), "{} has no frames", preset.name);
            assert!(preset.frames.iter().all(|f| f.is_valid() && f.size() == SIZE));
            assert!(preset.tempo_ms >= 16.0);
        }
    }

    #[test]
    fn lookup_by_name() {
        let cache = PatternCache::default();
        let sos = preset_by_name("SOS", &cache).unwrap();
        // 3 dots, 3 dashes, 3 dots, each with a gap
        assert_eq!(sos.frames.len(), 3 * 4 + 3 * 8 + 3 * 4);
        assert_eq!(sos.tempo_ms, 100.0);
        assert!(preset_by_name("Nope", &cache).is_none());
    }

    #[test]
    fn frame_counts_match_library() {
        let cache = PatternCache::default();
        assert_eq!(PresetKind::Loading.build(&cache).frames.len(), 8);
        assert_eq!(PresetKind::Processing.build(&cache).frames.len(), 9);
        assert_eq!(PresetKind::Scanning.build(&cache).frames.len(), 16);
        assert_eq!(PresetKind::Building.build(&cache).frames.len(), 15);
        assert_eq!(PresetKind::Pulse.build(&cache).frames.len(), 5);
    }

    #[test]
    fn building_starts_with_bottom_row_and_fills_up() {
        let cache = PatternCache::default();
        let frames = PresetKind::Building.build(&cache).frames;
        assert_eq!(frames[0].count_on(), SIZE);
        assert_eq!(frames[7], Pattern::filled(SIZE));
        assert_eq!(frames[14].count_on(), SIZE);
    }

    #[test]
    fn presets_share_cached_shapes() {
        let cache = PatternCache::default();
        PresetKind::Loading.build(&cache);
        let misses = cache.stats().misses();
        PresetKind::Loading.build(&cache);
        assert_eq!(cache.stats().misses(), misses);
    }
}
