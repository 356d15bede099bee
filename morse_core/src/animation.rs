// Per-pixel stagger delays for the grid's entry animations.
// A closed set of presets, each a pure function of (row, col, grid size).

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of the `Random` preset's delay.
const RANDOM_SPREAD_MS: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    Fade,
    Scale,
    Slide,
    Wave,
    Spiral,
    Random,
    Ripple,
    Cascade,
}

impl AnimationPreset {
    pub const ALL: [AnimationPreset; 8] = [
        AnimationPreset::Fade,
        AnimationPreset::Scale,
        AnimationPreset::Slide,
        AnimationPreset::Wave,
        AnimationPreset::Spiral,
        AnimationPreset::Random,
        AnimationPreset::Ripple,
        AnimationPreset::Cascade,
    ];

    /// Delay in milliseconds before the pixel at (`row`, `col`) animates.
    pub fn delay_ms(&self, row: usize, col: usize, grid_size: usize) -> f64 {
        let (r, c) = (row as f64, col as f64);
        let center = grid_size as f64 / 2.0;
        match self {
            AnimationPreset::Fade => 0.0,
            AnimationPreset::Scale => (r + c) * 20.0,
            AnimationPreset::Slide => c * 30.0,
            AnimationPreset::Wave => ((r + c) / 2.0).sin() * 100.0 + 100.0,
            AnimationPreset::Spiral => {
                let angle = (r - center).atan2(c - center);
                let distance = (r - center).hypot(c - center);
                (angle + PI) * 50.0 + distance * 30.0
            }
            AnimationPreset::Random => cell_noise(row, col) * RANDOM_SPREAD_MS,
            AnimationPreset::Ripple => {
                let distance = (r - center).hypot(c - center);
                let max_distance = SQRT_2 * grid_size as f64 / 2.0;
                if max_distance == 0.0 {
                    0.0
                } else {
                    distance / max_distance * 150.0
                }
            }
            AnimationPreset::Cascade => r * 40.0 + c * 10.0,
        }
    }

    /// Delays for a whole grid, row-major.
    pub fn delay_grid(&self, grid_size: usize) -> Vec<Vec<f64>> {
        (0..grid_size)
            .map(|row| (0..grid_size).map(|col| self.delay_ms(row, col, grid_size)).collect())
            .collect()
    }
}

/// Deterministic value in `[0, 1)` derived from the cell coordinates
/// (splitmix64 finalizer).
fn cell_noise(row: usize, col: usize) -> f64 {
    let mut z = ((row as u64) << 32 ^ col as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}
