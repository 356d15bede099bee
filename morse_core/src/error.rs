// Typed errors with thiserror. Bad pattern data never becomes an error here:
// the codec and geometry report it through bool/Option. These variants cover
// caller bugs (config) and whole-document rejections (import).

use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("Invalid frame {frame_index}: {message}")]
    InvalidFrame { frame_index: usize, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::InvalidConfig("tempo must be finite".to_string());
        assert!(err.to_string().contains("tempo must be finite"));
    }

    #[test]
    fn frame_error_names_the_frame() {
        let err = EngineError::InvalidFrame {
            frame_index: 4,
            message: "duration out of range".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid frame 4: duration out of range");
    }

    #[test]
    fn json_errors_convert() {
        let err: EngineError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
