// JSON animation documents exchanged with the editor:
// {"frames":[{"pattern":bool[][],"duration":ms}],"gridSize":n,"created":iso8601}
// Any bad frame rejects the whole document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::codec::pattern_from_value;
use crate::error::EngineError;
use crate::types::{Pattern, MAX_FRAME_DURATION_MS, MIN_FRAME_DURATION_MS};

/// One frame of an edited animation with its own display time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub pattern: Pattern,
    /// Milliseconds, within [`MIN_FRAME_DURATION_MS`]..=[`MAX_FRAME_DURATION_MS`].
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub frames: Vec<AnimationFrame>,
    pub grid_size: usize,
    /// ISO 8601 creation time, supplied by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl AnimationDocument {
    pub fn new(frames: Vec<AnimationFrame>, grid_size: usize) -> Self {
        AnimationDocument {
            name: None,
            frames,
            grid_size,
            created: None,
        }
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = Some(created.into());
        self
    }

    pub fn patterns(&self) -> Vec<Pattern> {
        self.frames.iter().map(|frame| frame.pattern.clone()).collect()
    }

    /// Playback tempo for a single-tempo sequencer: the first frame's duration.
    pub fn tempo_ms(&self) -> Option<f64> {
        self.frames.first().map(|frame| frame.duration as f64)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.grid_size == 0 {
            return Err(EngineError::InvalidImport("gridSize must be a positive integer".to_string()));
        }
        if self.frames.is_empty() {
            return Err(EngineError::InvalidImport("frames must not be empty".to_string()));
        }
        for (frame_index, frame) in self.frames.iter().enumerate() {
            if !frame.pattern.is_valid() {
                return Err(frame_error(frame_index, "pattern must be a square grid of booleans"));
            }
            if frame.pattern.size() != self.grid_size {
                return Err(frame_error(
                    frame_index,
                    format!(
                        "pattern is {}x{} but gridSize is {}",
                        frame.pattern.size(),
                        frame.pattern.size(),
                        self.grid_size
                    ),
                ));
            }
            if !(MIN_FRAME_DURATION_MS..=MAX_FRAME_DURATION_MS).contains(&frame.duration) {
                return Err(duration_error(frame_index));
            }
        }
        Ok(())
    }
}

fn frame_error(frame_index: usize, message: impl Into<String>) -> EngineError {
    EngineError::InvalidFrame {
        frame_index,
        message: message.into(),
    }
}

fn duration_error(frame_index: usize) -> EngineError {
    frame_error(
        frame_index,
        format!(
            "duration must be an integer between {} and {} ms",
            MIN_FRAME_DURATION_MS, MAX_FRAME_DURATION_MS
        ),
    )
}

/// Parses and validates an animation document. A missing `gridSize` is
/// taken from the first frame.
pub fn import_animation(json: &str) -> Result<AnimationDocument, EngineError> {
    parse_document(json).map_err(|err| {
        warn!("Animation import rejected: {}", err);
        err
    })
}

/// Validates and serializes `document` as pretty-printed JSON.
pub fn export_animation(document: &AnimationDocument) -> Result<String, EngineError> {
    document.validate()?;
    Ok(serde_json::to_string_pretty(document)?)
}

fn parse_document(json: &str) -> Result<AnimationDocument, EngineError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| EngineError::InvalidImport(format!("not valid JSON: {}", e)))?;
    let root = value
        .as_object()
        .ok_or_else(|| EngineError::InvalidImport("expected a JSON object".to_string()))?;
    let raw_frames = root
        .get("frames")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::InvalidImport("missing frames array".to_string()))?;

    let mut frames = Vec::with_capacity(raw_frames.len());
    for (frame_index, raw) in raw_frames.iter().enumerate() {
        let pattern = raw
            .get("pattern")
            .and_then(pattern_from_value)
            .ok_or_else(|| frame_error(frame_index, "pattern must be a square grid of booleans"))?;
        let duration = raw
            .get("duration")
            .and_then(whole_millis)
            .ok_or_else(|| duration_error(frame_index))?;
        frames.push(AnimationFrame { pattern, duration });
    }

    let grid_size = match root.get("gridSize") {
        Some(size) => whole_millis(size)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| EngineError::InvalidImport("gridSize must be a positive integer".to_string()))?,
        None => frames.first().map_or(0, |frame| frame.pattern.size()),
    };

    let document = AnimationDocument {
        name: root.get("name").and_then(Value::as_str).map(str::to_string),
        frames,
        grid_size,
        created: root.get("created").and_then(Value::as_str).map(str::to_string),
    };
    document.validate()?;
    Ok(document)
}

/// Non-negative integer, accepting `500.0` as well as `500`.
fn whole_millis(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64)
    })
}
