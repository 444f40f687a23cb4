//! Error taxonomy for the tone engine.

use thiserror::Error;

use crate::params::BackgroundTrack;

/// Result type for engine operations.
pub type NadaResult<T> = Result<T, NadaError>;

#[derive(Debug, Error)]
pub enum NadaError {
    /// No usable audio processing context on this platform.
    #[error("audio unavailable: {reason}")]
    AudioUnavailable { reason: String },

    #[error("invalid sample rate: {rate}")]
    InvalidSampleRate { rate: f64 },

    /// Operation on a context that has already been closed.
    #[error("audio context is closed")]
    ContextClosed,

    /// A node was driven through an illegal lifecycle transition
    /// (e.g. starting an oscillator twice).
    #[error("invalid {node} state: {message}")]
    InvalidNodeState {
        node: &'static str,
        message: String,
    },

    #[error("background track '{}' is not loaded", track.name())]
    TrackNotLoaded { track: BackgroundTrack },

    #[error("failed to decode background track: {message}")]
    TrackDecode { message: String },

    #[error("failed to fetch background track from {url}: {message}")]
    TrackFetch { url: String, message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NadaError {
    pub fn invalid_node(node: &'static str, message: impl Into<String>) -> Self {
        NadaError::InvalidNodeState {
            node,
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        NadaError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        NadaError::TrackDecode {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = NadaError::TrackNotLoaded {
            track: BackgroundTrack::Nature,
        };
        assert_eq!(e.to_string(), "background track 'nature' is not loaded");

        let e = NadaError::invalid_node("oscillator", "already started");
        assert_eq!(e.to_string(), "invalid oscillator state: already started");
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: NadaError = err.into();
        assert!(e.to_string().starts_with("JSON error"), "got {e}");
    }
}
