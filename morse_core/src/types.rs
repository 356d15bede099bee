// Strong typing for the pixel-grid engine. Newtypes for timestamps and patterns,
// serde-friendly config structs with defaults for everything the host may omit.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Lowest tempo the sequencer accepts (~60Hz). Anything below is clamped.
pub const MIN_TEMPO_MS: f64 = 16.0;

/// Tempo used when the host does not provide one.
pub const DEFAULT_TEMPO_MS: f64 = 200.0;

/// Per-frame duration bounds enforced by the JSON interchange format.
pub const MIN_FRAME_DURATION_MS: u64 = 100;
pub const MAX_FRAME_DURATION_MS: u64 = 5000;

/// Side length used by the procedural generators and presets.
pub const DEFAULT_PATTERN_SIZE: usize = 8;

/// Grid sizes offered by the button components.
pub const GRID_SIZE_SMALL: usize = 5;
pub const GRID_SIZE_DEFAULT: usize = 7;
pub const GRID_SIZE_LARGE: usize = 9;

/// Default capacity of the generator memoization cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Converts a host reading such as `performance.now()`. Negative and
    /// non-finite readings collapse to zero.
    pub fn from_millis(ms: f64) -> Self {
        Timestamp(millis_to_micros(ms))
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Microseconds elapsed since `earlier`, zero if the clock went backwards.
    pub fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn saturating_add_micros(&self, us: u64) -> Self {
        Timestamp(self.0.saturating_add(us))
    }
}

pub(crate) fn millis_to_micros(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}

/// Validates a host-supplied interval (tempo or phase duration) and clamps it
/// to [`MIN_TEMPO_MS`]. Negative and non-finite values are caller bugs.
pub(crate) fn interval_micros(what: &str, ms: f64) -> Result<u64, EngineError> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(EngineError::InvalidConfig(format!(
            "{} must be a finite, non-negative number of milliseconds (got {})",
            what, ms
        )));
    }
    Ok(millis_to_micros(ms.max(MIN_TEMPO_MS)))
}

/// A square boolean grid, row-major: `pattern.rows()[row][col]`.
///
/// The wrapper does not enforce squareness on construction so that frames
/// coming from the host can be carried around and rejected later; use
/// [`Pattern::is_valid`] (or [`crate::codec::is_valid_pattern`]) before
/// trusting the shape. Every transform in this crate returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(Vec<Vec<bool>>);

impl Pattern {
    /// All-off `size`×`size` grid.
    pub fn empty(size: usize) -> Self {
        Pattern(vec![vec![false; size]; size])
    }

    /// All-on `size`×`size` grid.
    pub fn filled(size: usize) -> Self {
        Pattern(vec![vec![true; size]; size])
    }

    pub fn from_rows(rows: Vec<Vec<bool>>) -> Self {
        Pattern(rows)
    }

    /// Number of rows. Equal to the side length for a valid pattern.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<Vec<bool>> {
        self.0
    }

    /// Non-empty, and every row as long as the grid is tall.
    pub fn is_valid(&self) -> bool {
        let size = self.0.len();
        size > 0 && self.0.iter().all(|row| row.len() == size)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Cell lookup by signed grid point; anything off the grid reads as `None`.
    pub fn at(&self, point: Point) -> Option<bool> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        self.get(point.y as usize, point.x as usize)
    }

    /// Functional update of a single cell. Out-of-range coordinates return an
    /// unchanged copy.
    pub fn with_cell(&self, row: usize, col: usize, value: bool) -> Pattern {
        let mut next = self.clone();
        next.set(row, col, value);
        next
    }

    /// Count of lit cells.
    pub fn count_on(&self) -> usize {
        self.0.iter().flatten().filter(|&&cell| cell).count()
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: bool) {
        if let Some(cell) = self.0.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }
}

impl From<Vec<Vec<bool>>> for Pattern {
    fn from(rows: Vec<Vec<bool>>) -> Self {
        Pattern(rows)
    }
}

/// Integer grid coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// True if the point lies inside a `size`×`size` grid.
    pub fn in_grid(&self, size: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < size && (self.y as usize) < size
    }
}

/// How many times a frame sequence plays before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "IterationsRepr", into = "IterationsRepr")]
pub enum Iterations {
    /// Positive play count.
    Finite(u32),
    #[default]
    Infinite,
}

impl Iterations {
    /// `None` for zero, which is not a valid play count.
    pub fn finite(count: u32) -> Option<Self> {
        (count > 0).then_some(Iterations::Finite(count))
    }

    pub fn is_reached(&self, completed: u32) -> bool {
        match self {
            Iterations::Finite(count) => completed >= *count,
            Iterations::Infinite => false,
        }
    }
}

/// Wire form: a positive integer or the string `"infinite"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IterationsRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<IterationsRepr> for Iterations {
    type Error = String;

    fn try_from(repr: IterationsRepr) -> Result<Self, Self::Error> {
        match repr {
            IterationsRepr::Count(count) => Iterations::finite(count)
                .ok_or_else(|| "iterations must be a positive integer".to_string()),
            IterationsRepr::Keyword(word) if word == "infinite" => Ok(Iterations::Infinite),
            IterationsRepr::Keyword(word) => Err(format!("unknown iterations value '{}'", word)),
        }
    }
}

impl From<Iterations> for IterationsRepr {
    fn from(iterations: Iterations) -> Self {
        match iterations {
            Iterations::Finite(count) => IterationsRepr::Count(count),
            Iterations::Infinite => IterationsRepr::Keyword("infinite".to_string()),
        }
    }
}

/// Frame sequencer settings passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Milliseconds per frame. Clamped to [`MIN_TEMPO_MS`]; negative is a caller bug.
    #[serde(default = "default_tempo_ms")]
    pub tempo_ms: f64,
    #[serde(default)]
    pub iterations: Iterations,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            tempo_ms: default_tempo_ms(),
            iterations: Iterations::Infinite,
        }
    }
}

fn default_tempo_ms() -> f64 {
    DEFAULT_TEMPO_MS
}

/// Label orchestrator settings passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub labels: Vec<String>,
    /// Time a label is held before morphing to the next one.
    #[serde(default = "default_hold_duration_ms")]
    pub hold_duration_ms: f64,
    /// Time the morph itself takes.
    #[serde(default = "default_transition_duration_ms")]
    pub transition_duration_ms: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            labels: Vec::new(),
            hold_duration_ms: default_hold_duration_ms(),
            transition_duration_ms: default_transition_duration_ms(),
        }
    }
}

fn default_hold_duration_ms() -> f64 {
    3000.0
}

fn default_transition_duration_ms() -> f64 {
    300.0
}

/// Generator cache settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Snapshot of the frame sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    pub current_frame_index: usize,
    pub current_iteration: u32,
    pub is_running: bool,
    pub accumulated_drift_ms: f64,
}

/// Snapshot of the label orchestrator. `next_label` is only set while
/// `is_transitioning` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub current_label: String,
    pub next_label: Option<String>,
    pub is_transitioning: bool,
    pub current_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_clamp_and_reject_bad_input() {
        assert_eq!(interval_micros("tempo", 5.0).unwrap(), 16_000);
        assert_eq!(interval_micros("tempo", 0.0).unwrap(), 16_000);
        assert_eq!(interval_micros("tempo", 250.5).unwrap(), 250_500);
        assert!(interval_micros("tempo", -1.0).is_err());
        assert!(interval_micros("hold", f64::INFINITY).is_err());
        assert!(interval_micros("hold", f64::NAN).is_err());
    }

    #[test]
    fn timestamp_conversions() {
        let ts = Timestamp::from_millis(1500.25);
        assert_eq!(ts.as_micros(), 1_500_250);
        assert!((ts.as_millis() - 1500.25).abs() < 0.0001);
        assert_eq!(Timestamp::from_millis(-3.0).as_micros(), 0);
        assert_eq!(Timestamp::from_millis(f64::NAN).as_micros(), 0);
    }

    #[test]
    fn micros_since_saturates() {
        let early = Timestamp::from_micros(10);
        let late = Timestamp::from_micros(25);
        assert_eq!(late.micros_since(early), 15);
        assert_eq!(early.micros_since(late), 0);
    }

    #[test]
    fn pattern_validity() {
        assert!(Pattern::empty(3).is_valid());
        assert!(!Pattern::empty(0).is_valid());
        assert!(!Pattern::from_rows(vec![vec![true, false], vec![true]]).is_valid());
        assert!(!Pattern::from_rows(vec![vec![true, false]]).is_valid());
    }

    #[test]
    fn with_cell_leaves_original_untouched() {
        let base = Pattern::empty(2);
        let lit = base.with_cell(1, 0, true);
        assert_eq!(base.count_on(), 0);
        assert_eq!(lit.get(1, 0), Some(true));
        assert_eq!(base.with_cell(5, 5, true), base);
    }

    #[test]
    fn point_lookup_rejects_negative() {
        let pattern = Pattern::filled(2);
        assert_eq!(pattern.at(Point::new(1, 1)), Some(true));
        assert_eq!(pattern.at(Point::new(-1, 0)), None);
        assert!(!Point::new(2, 0).in_grid(2));
    }

    #[test]
    fn iterations_from_json() {
        let finite: Iterations = serde_json::from_str("3").unwrap();
        assert_eq!(finite, Iterations::Finite(3));
        let infinite: Iterations = serde_json::from_str("\"infinite\"").unwrap();
        assert_eq!(infinite, Iterations::Infinite);
        assert!(serde_json::from_str::<Iterations>("0").is_err());
        assert!(serde_json::from_str::<Iterations>("\"forever\"").is_err());
        assert_eq!(serde_json::to_string(&Iterations::Finite(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Iterations::Infinite).unwrap(), "\"infinite\"");
    }

    #[test]
    fn sequencer_config_defaults() {
        let config: SequencerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.tempo_ms, DEFAULT_TEMPO_MS);
        assert_eq!(config.iterations, Iterations::Infinite);
    }

    #[test]
    fn orchestrator_config_defaults() {
        let config: OrchestratorConfig = serde_json::from_str(r#"{"labels":["a","b"]}"#).unwrap();
        assert_eq!(config.labels.len(), 2);
        assert_eq!(config.hold_duration_ms, 3000.0);
        assert_eq!(config.transition_duration_ms, 300.0);
    }
}
