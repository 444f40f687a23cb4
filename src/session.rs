//! ToneSession — parameter store and audio graph wired together.
//!
//! Every setter mutates the [`ParameterStore`] and, when the value actually
//! changed, hands the new snapshot to [`AudioGraphManager::update`]. The
//! graph never writes parameters back.

use tracing::debug;

use crate::config::EngineConfig;
use crate::dsp::graph::{AudioGraphManager, EngineStatus, PlaybackState};
use crate::dsp::track::SampleBuffer;
use crate::error::NadaResult;
use crate::params::{BackgroundTrack, ParameterStore, Timbre, ToneParameters};
use crate::presets::{NadaPreset, find_preset};
use crate::visual::VisualSnapshot;

pub struct ToneSession {
    store: ParameterStore,
    engine: AudioGraphManager,
    /// Animation frames drawn so far.
    visual_frame: u64,
}

impl ToneSession {
    pub fn new(config: EngineConfig) -> Self {
        ToneSession::with_params(config, ToneParameters::default())
    }

    pub fn with_params(config: EngineConfig, params: ToneParameters) -> Self {
        ToneSession {
            store: ParameterStore::new(params),
            engine: AudioGraphManager::new(config),
            visual_frame: 0,
        }
    }

    pub fn params(&self) -> &ToneParameters {
        self.store.params()
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn engine(&self) -> &AudioGraphManager {
        &self.engine
    }

    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.state() == PlaybackState::Playing
    }

    // ── Transport ───────────────────────────────────────────

    pub fn play(&mut self) {
        self.engine.start(self.store.params());
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Pause when playing, otherwise start or resume.
    pub fn toggle(&mut self) -> PlaybackState {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.engine.state()
    }

    pub fn cancel_auto_stop(&mut self) -> bool {
        self.engine.cancel_auto_stop()
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    /// Pull interleaved stereo frames from the graph.
    pub fn render(&mut self, out: &mut [f32]) {
        self.engine.render(out);
    }

    pub fn register_track(&mut self, track: BackgroundTrack, buffer: SampleBuffer) -> NadaResult<()> {
        self.engine.register_track(track, buffer)
    }

    // ── Parameters ──────────────────────────────────────────

    pub fn set_parameters(&mut self, params: ToneParameters) -> bool {
        let changed = self.store.replace(params);
        self.sync(changed)
    }

    pub fn set_left_frequency(&mut self, hz: f64) -> bool {
        let changed = self.store.set_left_frequency(hz);
        self.sync(changed)
    }

    pub fn set_right_frequency(&mut self, hz: f64) -> bool {
        let changed = self.store.set_right_frequency(hz);
        self.sync(changed)
    }

    pub fn set_frequencies(&mut self, left: f64, right: f64) -> bool {
        let changed = self.store.set_frequencies(left, right);
        self.sync(changed)
    }

    pub fn set_base_frequency(&mut self, base: f64) -> bool {
        let changed = self.store.set_base_frequency(base);
        self.sync(changed)
    }

    pub fn set_timbre(&mut self, timbre: Timbre) -> bool {
        let changed = self.store.set_timbre(timbre);
        self.sync(changed)
    }

    pub fn set_volume(&mut self, volume: f64) -> bool {
        let changed = self.store.set_volume(volume);
        self.sync(changed)
    }

    pub fn set_volume_percent(&mut self, percent: f64) -> bool {
        let changed = self.store.set_volume_percent(percent);
        self.sync(changed)
    }

    pub fn set_background(&mut self, track: BackgroundTrack) -> bool {
        let changed = self.store.set_background(track);
        self.sync(changed)
    }

    /// Apply a preset by name. Returns the preset when one matched.
    pub fn apply_preset(&mut self, name: &str) -> Option<&'static NadaPreset> {
        let preset = find_preset(name)?;
        let changed = self.store.apply_preset(preset);
        self.sync(changed);
        debug!(preset = preset.name, "preset applied");
        Some(preset)
    }

    /// Geometry for the next animation frame.
    pub fn visual_frame(&mut self, width: usize) -> VisualSnapshot {
        let snapshot =
            VisualSnapshot::capture(self.store.params(), self.visual_frame, width, self.is_playing());
        self.visual_frame += 1;
        snapshot
    }

    fn sync(&mut self, changed: bool) -> bool {
        if changed {
            self.engine.update(self.store.params());
        }
        changed
    }
}
