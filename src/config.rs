//! Engine configuration.
//!
//! Every tuning constant of the tone engine lives here so hosts can
//! override it from JSON (`EngineConfig::from_json`). Unspecified keys keep
//! their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{NadaError, NadaResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Output sample rate of the audio context.
    pub sample_rate: f64,
    /// Gain fade from silence on `start()`, in seconds.
    pub fade_in_seconds: f64,
    /// Gain ramp used for every change while playing, in seconds.
    pub ramp_seconds: f64,
    /// Session length before the tones stop themselves. `None` disables it.
    pub session_seconds: Option<f64>,
    /// Fade to silence that ends exactly at the session horizon.
    pub fade_out_seconds: f64,
    /// Background-track gain as a fraction of master volume.
    pub background_ratio: f64,
    /// Per-channel attenuation in binaural mode.
    pub binaural_gain: f64,
    /// Per-channel attenuation in binaural mode when the beat is low.
    pub low_beat_gain: f64,
    /// Beats at or below this (Hz) count as "low" (delta/theta range).
    pub low_beat_threshold: f64,
    /// Monaural carriers above this (Hz) are forced to a pure tone.
    pub monaural_pure_above: f64,
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Base URL background-track assets are served from.
    pub track_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            fade_in_seconds: 0.5,
            ramp_seconds: 0.05,
            session_seconds: Some(60.0),
            fade_out_seconds: 0.5,
            background_ratio: 0.3,
            binaural_gain: 0.5,
            low_beat_gain: 0.4,
            low_beat_threshold: 4.0,
            monaural_pure_above: 300.0,
            min_frequency: 1.0,
            max_frequency: 20000.0,
            track_base_url: "/audio".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> NadaResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NadaResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(NadaError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }

        let durations = [
            ("fadeInSeconds", self.fade_in_seconds),
            ("rampSeconds", self.ramp_seconds),
            ("fadeOutSeconds", self.fade_out_seconds),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value >= 0.0) {
                return Err(NadaError::invalid_config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if let Some(session) = self.session_seconds {
            if !(session.is_finite() && session > 0.0) {
                return Err(NadaError::invalid_config(format!(
                    "sessionSeconds must be positive, got {session}"
                )));
            }
        }

        let ratios = [
            ("backgroundRatio", self.background_ratio),
            ("binauralGain", self.binaural_gain),
            ("lowBeatGain", self.low_beat_gain),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(NadaError::invalid_config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if !(self.min_frequency.is_finite() && self.min_frequency > 0.0) {
            return Err(NadaError::invalid_config(format!(
                "minFrequency must be positive, got {}",
                self.min_frequency
            )));
        }
        if !(self.max_frequency >= self.min_frequency) {
            return Err(NadaError::invalid_config(format!(
                "maxFrequency ({}) is below minFrequency ({})",
                self.max_frequency, self.min_frequency
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_seconds, Some(60.0));
        assert_eq!(config.background_ratio, 0.3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json(r#"{"sampleRate": 48000, "sessionSeconds": null}"#).unwrap();
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.session_seconds, None);
        assert_eq!(config.fade_in_seconds, 0.5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineConfig::from_json(r#"{"sampleRate": 0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"rampSeconds": -1}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"backgroundRatio": 1.5}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"sessionSeconds": 0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"minFrequency": 0}"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
