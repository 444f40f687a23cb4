pub mod config;
pub mod dsp;
pub mod error;
pub mod params;
pub mod presets;
pub mod session;
pub mod visual;

use crate::config::EngineConfig;
use crate::dsp::track::SampleBuffer;
use crate::dsp::wavetable::WaveformPolicy;
use crate::params::{BackgroundTrack, Timbre, ToneParameters};
use crate::presets::PRESETS;
use crate::session::ToneSession;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the nadajaal-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: the Nāda preset table.
#[wasm_bindgen]
pub fn nada_presets() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&PRESETS[..]).map_err(js_err)
}

/// WASM-exposed: the harmonic table the engine would load for these
/// carriers and timbre.
#[wasm_bindgen]
pub fn waveform_harmonics(left: f64, right: f64, timbre: &str) -> Result<JsValue, JsValue> {
    let params = ToneParameters {
        left_frequency: left,
        right_frequency: right,
        timbre: Timbre::parse(timbre),
        ..Default::default()
    };
    let harmonics = WaveformPolicy::default().harmonics(
        params.timbre,
        params.is_monaural(),
        params.beat_frequency(),
        params.left_frequency,
    );
    serde_wasm_bindgen::to_value(&harmonics).map_err(js_err)
}

/// WASM-exposed tone engine: one per page session.
///
/// The AudioWorklet calls [`render`](NadaEngine::render) for every block;
/// UI controls call the setters, which update the live graph in place.
#[wasm_bindgen]
pub struct NadaEngine {
    session: ToneSession,
}

impl Default for NadaEngine {
    fn default() -> Self {
        NadaEngine::new()
    }
}

#[wasm_bindgen]
impl NadaEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> NadaEngine {
        NadaEngine {
            session: ToneSession::new(EngineConfig::default()),
        }
    }

    /// Build an engine from a JSON [`EngineConfig`]; unspecified keys keep
    /// their defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<NadaEngine, JsValue> {
        let config = EngineConfig::from_json(config_json).map_err(js_err)?;
        Ok(NadaEngine {
            session: ToneSession::new(config),
        })
    }

    pub fn play(&mut self) {
        self.session.play();
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Returns true when the engine is playing afterwards.
    pub fn toggle(&mut self) -> bool {
        self.session.toggle();
        self.session.is_playing()
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    #[wasm_bindgen(js_name = cancelAutoStop)]
    pub fn cancel_auto_stop(&mut self) -> bool {
        self.session.cancel_auto_stop()
    }

    #[wasm_bindgen(js_name = setLeftFrequency)]
    pub fn set_left_frequency(&mut self, hz: f64) {
        self.session.set_left_frequency(hz);
    }

    #[wasm_bindgen(js_name = setRightFrequency)]
    pub fn set_right_frequency(&mut self, hz: f64) {
        self.session.set_right_frequency(hz);
    }

    #[wasm_bindgen(js_name = setBaseFrequency)]
    pub fn set_base_frequency(&mut self, hz: f64) {
        self.session.set_base_frequency(hz);
    }

    #[wasm_bindgen(js_name = setTimbre)]
    pub fn set_timbre(&mut self, name: &str) {
        self.session.set_timbre(Timbre::parse(name));
    }

    /// Volume from the 0–100 slider.
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&mut self, percent: f64) {
        self.session.set_volume_percent(percent);
    }

    #[wasm_bindgen(js_name = setBackground)]
    pub fn set_background(&mut self, name: &str) {
        self.session.set_background(BackgroundTrack::parse(name));
    }

    /// Returns false when no preset has that name.
    #[wasm_bindgen(js_name = applyPreset)]
    pub fn apply_preset(&mut self, name: &str) -> bool {
        self.session.apply_preset(name).is_some()
    }

    /// Register decoded mono PCM for a background track.
    #[wasm_bindgen(js_name = registerTrackPcm)]
    pub fn register_track_pcm(
        &mut self,
        track: &str,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> Result<(), JsValue> {
        let buffer = SampleBuffer::from_f32(&samples, sample_rate);
        self.session
            .register_track(BackgroundTrack::parse(track), buffer)
            .map_err(js_err)
    }

    /// Render `frames` of interleaved stereo audio.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        self.session.render(&mut out);
        out
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.session.state()).to_lowercase()
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.status()).map_err(js_err)
    }

    pub fn parameters(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.session.params()).map_err(js_err)
    }

    /// Geometry for the next animation frame of a `width`-pixel canvas.
    #[wasm_bindgen(js_name = visualFrame)]
    pub fn visual_frame(&mut self, width: usize) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.visual_frame(width)).map_err(js_err)
    }

    /// Stop everything and release the audio context.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }
}

#[cfg(feature = "decode")]
#[wasm_bindgen]
impl NadaEngine {
    /// Decode a WAV/MP3 file and register it for a background track.
    #[wasm_bindgen(js_name = registerTrackFile)]
    pub fn register_track_file(&mut self, track: &str, bytes: &[u8]) -> Result<(), JsValue> {
        let buffer = dsp::decode::decode_track(bytes).map_err(js_err)?;
        self.session
            .register_track(BackgroundTrack::parse(track), buffer)
            .map_err(js_err)
    }
}
