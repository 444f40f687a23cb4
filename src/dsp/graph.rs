//! Audio Graph Manager — the only owner and mutator of live audio nodes.
//!
//! The manager turns a [`ToneParameters`] snapshot into a running node graph:
//! one oscillator and gain when both ears share a frequency, or two
//! oscillator/gain/panner chains hard-panned left and right when they do not.
//! Later snapshots are reconciled into that graph in place: frequencies set
//! directly, gains moved with short linear ramps, periodic waves swapped
//! without resetting phase. Only a monaural/binaural switch rebuilds the tone
//! chains.
//!
//! Every failure is caught here, logged, and surfaced through
//! [`AudioGraphManager::status`]; none reach the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{NadaError, NadaResult};
use crate::params::{BackgroundTrack, ToneParameters};

use super::context::{AudioContext, ContextState};
use super::mixer::Mixer;
use super::oscillator::{OscillatorNode, OscillatorState};
use super::panner::StereoPanner;
use super::param::AudioParam;
use super::track::{SampleBuffer, TrackLibrary, TrackPlayer};
use super::wavetable::{Harmonic, PeriodicWave, WaveformPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Snapshot for hosts that want to show why nothing is playing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: PlaybackState,
    pub audio_available: bool,
    pub context_state: Option<ContextState>,
    /// Seconds left before the session stops itself.
    pub session_remaining: Option<f64>,
    pub last_error: Option<String>,
}

/// Per-channel gain for the tone oscillators.
///
/// Monaural plays at full volume. Binaural splits it across two channels,
/// and low beats are attenuated further.
pub fn tone_gain(config: &EngineConfig, params: &ToneParameters) -> f64 {
    if params.is_monaural() {
        params.volume
    } else if params.beat_frequency() <= config.low_beat_threshold {
        params.volume * config.low_beat_gain
    } else {
        params.volume * config.binaural_gain
    }
}

/// Gain for the background bed: always a fixed fraction of master volume.
pub fn background_gain(config: &EngineConfig, params: &ToneParameters) -> f64 {
    params.volume * config.background_ratio
}

// ── Graph state ─────────────────────────────────────────────

/// oscillator → gain → (panner)
#[derive(Debug)]
struct ToneChain {
    oscillator: OscillatorNode,
    gain: AudioParam,
    gain_target: f64,
    panner: Option<StereoPanner>,
}

impl ToneChain {
    fn process(&mut self, frame: u64) -> (f64, f64) {
        let s = self.oscillator.next_sample(frame) * self.gain.value_at(frame);
        match &self.panner {
            Some(panner) => panner.process(s),
            None => (s, s),
        }
    }
}

#[derive(Debug)]
enum ToneGraph {
    Monaural(ToneChain),
    Binaural { left: ToneChain, right: ToneChain },
}

impl ToneGraph {
    fn chains(&self) -> impl Iterator<Item = &ToneChain> {
        let (first, second) = match self {
            ToneGraph::Monaural(chain) => (chain, None),
            ToneGraph::Binaural { left, right } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }

    fn chains_mut(&mut self) -> impl Iterator<Item = &mut ToneChain> {
        let (first, second) = match self {
            ToneGraph::Monaural(chain) => (chain, None),
            ToneGraph::Binaural { left, right } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }

    fn into_chains(self) -> Vec<ToneChain> {
        match self {
            ToneGraph::Monaural(chain) => vec![chain],
            ToneGraph::Binaural { left, right } => vec![left, right],
        }
    }
}

/// media element → gain
#[derive(Debug)]
struct BackgroundNode {
    track: BackgroundTrack,
    player: TrackPlayer,
    gain: AudioParam,
    gain_target: f64,
}

/// Every live node handle. Empty means nothing is allocated.
#[derive(Debug, Default)]
pub struct AudioGraphState {
    tones: Option<ToneGraph>,
    /// Chains from a replaced graph, fading out until their stop frame.
    retiring: Vec<ToneChain>,
    background: Option<BackgroundNode>,
    /// Frame at which the session stops itself.
    horizon: Option<u64>,
    /// Parameters the live nodes currently reflect.
    applied: Option<ToneParameters>,
}

impl AudioGraphState {
    pub fn is_empty(&self) -> bool {
        self.tones.is_none()
            && self.retiring.is_empty()
            && self.background.is_none()
            && self.horizon.is_none()
            && self.applied.is_none()
    }
}

/// When and how long the end-of-session fade runs.
#[derive(Debug, Clone, Copy)]
struct FadeOut {
    horizon: u64,
    frames: u64,
}

/// Ramp `param` to `target`, then re-arm the end-of-session fade that the
/// ramp just cancelled. A ramp that would not finish before the horizon
/// heads for silence at the horizon instead.
fn schedule_gain(param: &mut AudioParam, target: f64, now: u64, ramp: u64, fade: Option<FadeOut>) {
    let ramp_end = now.saturating_add(ramp);
    let Some(fade) = fade else {
        param.ramp_to(target, now, ramp);
        return;
    };
    if ramp_end >= fade.horizon {
        param.ramp_to(0.0, now, fade.horizon.saturating_sub(now));
        return;
    }

    param.ramp_to(target, now, ramp);
    let fade_start = fade.horizon.saturating_sub(fade.frames).max(ramp_end);
    if fade_start < fade.horizon {
        param.set_value_at(target, fade_start);
        param.linear_ramp_to_value_at(0.0, fade.horizon);
    }
}

// ── Manager ─────────────────────────────────────────────────

pub struct AudioGraphManager {
    config: EngineConfig,
    policy: WaveformPolicy,
    context: Option<AudioContext>,
    graph: AudioGraphState,
    state: PlaybackState,
    tracks: TrackLibrary,
    /// Set once context creation fails; audio stays disabled afterwards.
    unavailable: Option<String>,
    last_error: Option<String>,
    mixer: Mixer,
}

impl AudioGraphManager {
    pub fn new(config: EngineConfig) -> Self {
        AudioGraphManager {
            policy: WaveformPolicy::from(&config),
            config,
            context: None,
            graph: AudioGraphState::default(),
            state: PlaybackState::Idle,
            tracks: TrackLibrary::new(),
            unavailable: None,
            last_error: None,
            mixer: Mixer::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Make decoded audio available for a background track.
    pub fn register_track(&mut self, track: BackgroundTrack, buffer: SampleBuffer) -> NadaResult<()> {
        self.tracks.register(track, buffer)?;
        debug!(track = track.name(), "background track registered");
        Ok(())
    }

    pub fn tracks(&self) -> &TrackLibrary {
        &self.tracks
    }

    // ── Operations ──────────────────────────────────────────

    /// Build and start the graph from `params`. Resumes when paused, does
    /// nothing when already playing.
    pub fn start(&mut self, params: &ToneParameters) {
        self.expire_if_due();
        match self.state {
            PlaybackState::Playing => {
                debug!("start ignored: already playing");
                return;
            }
            PlaybackState::Paused => {
                self.resume(params);
                return;
            }
            PlaybackState::Idle => {}
        }

        if let Err(e) = self.ensure_running() {
            self.record("start", e);
            return;
        }

        let params = self.sanitize(params);
        let now = self.now();
        let session = self.config.session_seconds.map(|s| self.frames(s));
        self.graph.horizon = session.map(|frames| now.saturating_add(frames));

        // A session shorter than its fade-in peaks halfway through.
        let fade_in = match session {
            Some(frames) => self.frames(self.config.fade_in_seconds).min(frames / 2),
            None => self.frames(self.config.fade_in_seconds),
        };
        match self.build_tones(&params, now, fade_in) {
            Ok(tones) => self.graph.tones = Some(tones),
            Err(e) => {
                self.record("start", e);
                self.clear_graph();
                return;
            }
        }
        self.graph.applied = Some(params);
        self.state = PlaybackState::Playing;
        self.sync_background(&params, now, fade_in);

        info!(
            left = params.left_frequency,
            right = params.right_frequency,
            timbre = params.timbre.name(),
            monaural = params.is_monaural(),
            "tones started"
        );
    }

    /// Suspend the context. Tones and background freeze together and
    /// context time stops, so the session horizon does not run down.
    pub fn pause(&mut self) {
        self.expire_if_due();
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "pause ignored");
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            if let Err(e) = ctx.suspend() {
                self.record("pause", e);
                return;
            }
        }
        self.state = PlaybackState::Paused;
        info!("paused");
    }

    /// Resume a paused graph and bring it up to date with `params`.
    /// From idle this is a plain [`start`](Self::start).
    pub fn resume(&mut self, params: &ToneParameters) {
        self.expire_if_due();
        if self.state != PlaybackState::Paused {
            self.start(params);
            return;
        }
        if let Err(e) = self.ensure_running() {
            self.record("resume", e);
            return;
        }
        self.state = PlaybackState::Playing;
        self.update(params);
        info!("resumed");
    }

    /// Stop and discard every node. Safe to call at any time.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle && self.graph.is_empty() {
            debug!("stop ignored: nothing playing");
            return;
        }
        self.clear_graph();
        info!("stopped");
    }

    /// Reconcile the live graph with `params`. No-op unless playing.
    pub fn update(&mut self, params: &ToneParameters) {
        self.expire_if_due();
        if self.state != PlaybackState::Playing || self.graph.tones.is_none() {
            return;
        }
        let Some(previous) = self.graph.applied else {
            return;
        };

        let params = self.sanitize(params);
        let now = self.now();
        let ramp = self.frames(self.config.ramp_seconds);

        if previous.is_monaural() != params.is_monaural() {
            info!(monaural = params.is_monaural(), "mode switch: rebuilding tone chains");
            self.retire_tones(now, ramp);
            match self.build_tones(&params, now, ramp) {
                Ok(tones) => self.graph.tones = Some(tones),
                Err(e) => {
                    self.record("update", e);
                    self.clear_graph();
                    return;
                }
            }
        } else {
            self.retune(&params, now, ramp);
        }

        self.sync_background(&params, now, ramp);
        self.graph.applied = Some(params);
    }

    /// Withdraw the scheduled end of session. Returns whether one was pending.
    pub fn cancel_auto_stop(&mut self) -> bool {
        self.expire_if_due();
        if self.state == PlaybackState::Idle || self.graph.horizon.take().is_none() {
            return false;
        }

        let now = self.now();
        let ramp = self.frames(self.config.ramp_seconds);
        if let Some(tones) = self.graph.tones.as_mut() {
            for chain in tones.chains_mut() {
                chain.oscillator.cancel_stop();
                schedule_gain(&mut chain.gain, chain.gain_target, now, ramp, None);
            }
        }
        if let Some(bg) = self.graph.background.as_mut() {
            schedule_gain(&mut bg.gain, bg.gain_target, now, ramp, None);
        }
        info!("auto-stop cancelled");
        true
    }

    /// Stop everything and close the context.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(mut ctx) = self.context.take() {
            ctx.close();
            info!("audio context closed");
        }
    }

    /// Render interleaved stereo into `out` (`out.len() / 2` frames).
    /// Silence when no context is running.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let frames = out.len() / 2;
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if !ctx.is_running() {
            return;
        }

        let start = ctx.current_frame();
        self.mixer.clear(frames);
        for i in 0..frames {
            let frame = start + i as u64;
            let (mut left, mut right) = (0.0, 0.0);
            if let Some(tones) = self.graph.tones.as_mut() {
                for chain in tones.chains_mut() {
                    let (l, r) = chain.process(frame);
                    left += l;
                    right += r;
                }
            }
            for chain in self.graph.retiring.iter_mut() {
                let (l, r) = chain.process(frame);
                left += l;
                right += r;
            }
            if let Some(bg) = self.graph.background.as_mut() {
                let s = bg.player.next_sample() * bg.gain.value_at(frame);
                left += s;
                right += s;
            }
            self.mixer.add(i, left, right);
        }
        self.mixer.write_interleaved(out);
        ctx.advance(frames as u64);

        let end = start + frames as u64;
        self.graph
            .retiring
            .retain_mut(|chain| chain.oscillator.poll(end) != OscillatorState::Stopped);
        if let Some(tones) = self.graph.tones.as_mut() {
            for chain in tones.chains_mut() {
                chain.gain.prune(end);
            }
        }
        if let Some(bg) = self.graph.background.as_mut() {
            bg.gain.prune(end);
        }
        self.expire_if_due();
    }

    // ── Observation ─────────────────────────────────────────

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            audio_available: self.unavailable.is_none(),
            context_state: self.context_state(),
            session_remaining: self.session_remaining(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|c| c.state())
    }

    /// Context time in seconds (0 before the first start).
    pub fn current_time(&self) -> f64 {
        self.context.as_ref().map_or(0.0, |c| c.current_time())
    }

    pub fn session_remaining(&self) -> Option<f64> {
        let ctx = self.context.as_ref()?;
        let horizon = self.graph.horizon?;
        Some(horizon.saturating_sub(ctx.current_frame()) as f64 / ctx.sample_rate())
    }

    pub fn graph(&self) -> &AudioGraphState {
        &self.graph
    }

    /// Live tone oscillators (retiring chains excluded).
    pub fn oscillator_count(&self) -> usize {
        self.graph.tones.as_ref().map_or(0, |t| t.chains().count())
    }

    pub fn panner_count(&self) -> usize {
        self.panner_pans().len()
    }

    pub fn panner_pans(&self) -> Vec<f64> {
        self.graph
            .tones
            .as_ref()
            .map(|t| t.chains().filter_map(|c| c.panner.map(|p| p.pan())).collect())
            .unwrap_or_default()
    }

    /// Gain each tone chain is heading for, ignoring ramps in progress.
    pub fn gain_targets(&self) -> Vec<f64> {
        self.graph
            .tones
            .as_ref()
            .map(|t| t.chains().map(|c| c.gain_target).collect())
            .unwrap_or_default()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.graph
            .tones
            .as_ref()
            .map(|t| t.chains().map(|c| c.oscillator.frequency()).collect())
            .unwrap_or_default()
    }

    /// Harmonic table currently loaded into the tone oscillators.
    pub fn current_harmonics(&self) -> Option<Vec<Harmonic>> {
        let tones = self.graph.tones.as_ref()?;
        tones
            .chains()
            .next()
            .map(|c| c.oscillator.wave().harmonics().to_vec())
    }

    pub fn background_track(&self) -> Option<BackgroundTrack> {
        self.graph.background.as_ref().map(|b| b.track)
    }

    pub fn background_gain_target(&self) -> Option<f64> {
        self.graph.background.as_ref().map(|b| b.gain_target)
    }

    // ── Internals ───────────────────────────────────────────

    fn now(&self) -> u64 {
        self.context.as_ref().map_or(0, |c| c.current_frame())
    }

    fn frames(&self, seconds: f64) -> u64 {
        self.context.as_ref().map_or(0, |c| c.frames(seconds))
    }

    fn sample_rate(&self) -> f64 {
        self.context
            .as_ref()
            .map_or(self.config.sample_rate, |c| c.sample_rate())
    }

    fn sanitize(&self, params: &ToneParameters) -> ToneParameters {
        params.sanitized(self.config.min_frequency, self.config.max_frequency)
    }

    fn fade_out(&self) -> Option<FadeOut> {
        self.graph.horizon.map(|horizon| FadeOut {
            horizon,
            frames: self.frames(self.config.fade_out_seconds),
        })
    }

    fn record(&mut self, op: &str, e: NadaError) {
        warn!(error = %e, "{op} failed");
        self.last_error = Some(e.to_string());
    }

    /// Create the context on first use and make sure it is running.
    fn ensure_running(&mut self) -> NadaResult<()> {
        if let Some(reason) = &self.unavailable {
            return Err(NadaError::AudioUnavailable {
                reason: reason.clone(),
            });
        }
        if self.context.is_none() {
            match AudioContext::new(self.config.sample_rate) {
                Ok(ctx) => {
                    info!(sample_rate = ctx.sample_rate(), "audio context created");
                    self.context = Some(ctx);
                }
                Err(e) => {
                    error!(error = %e, "audio context unavailable; playback disabled");
                    let reason = e.to_string();
                    self.unavailable = Some(reason.clone());
                    return Err(NadaError::AudioUnavailable { reason });
                }
            }
        }
        match self.context.as_mut() {
            Some(ctx) => ctx.resume(),
            None => Err(NadaError::ContextClosed),
        }
    }

    fn wave_for(&self, params: &ToneParameters) -> Arc<PeriodicWave> {
        Arc::new(PeriodicWave::new(self.harmonics_for(params)))
    }

    fn harmonics_for(&self, params: &ToneParameters) -> Vec<Harmonic> {
        // Binaural tables never depend on the carrier, so one table serves
        // both channels.
        self.policy.harmonics(
            params.timbre,
            params.is_monaural(),
            params.beat_frequency(),
            params.left_frequency,
        )
    }

    fn build_tones(&self, params: &ToneParameters, now: u64, ramp: u64) -> NadaResult<ToneGraph> {
        let wave = self.wave_for(params);
        let target = tone_gain(&self.config, params);

        if params.is_monaural() {
            let chain = self.build_chain(wave, params.left_frequency, None, target, now, ramp)?;
            return Ok(ToneGraph::Monaural(chain));
        }

        let left = self.build_chain(
            wave.clone(),
            params.left_frequency,
            Some(StereoPanner::hard_left()),
            target,
            now,
            ramp,
        )?;
        let right = self.build_chain(
            wave,
            params.right_frequency,
            Some(StereoPanner::hard_right()),
            target,
            now,
            ramp,
        )?;
        Ok(ToneGraph::Binaural { left, right })
    }

    fn build_chain(
        &self,
        wave: Arc<PeriodicWave>,
        frequency: f64,
        panner: Option<StereoPanner>,
        target: f64,
        now: u64,
        ramp: u64,
    ) -> NadaResult<ToneChain> {
        let mut oscillator = OscillatorNode::new(wave, frequency, self.sample_rate());
        oscillator.start(now)?;
        if let Some(horizon) = self.graph.horizon {
            oscillator.stop(horizon)?;
        }

        let mut gain = AudioParam::new(0.0);
        schedule_gain(&mut gain, target, now, ramp, self.fade_out());

        Ok(ToneChain {
            oscillator,
            gain,
            gain_target: target,
            panner,
        })
    }

    /// Apply frequency, gain and waveform changes to the existing chains.
    fn retune(&mut self, params: &ToneParameters, now: u64, ramp: u64) {
        let target = tone_gain(&self.config, params);
        let harmonics = self.harmonics_for(params);
        let fade = self.fade_out();
        let Some(tones) = self.graph.tones.as_mut() else {
            return;
        };

        match tones {
            ToneGraph::Monaural(chain) => chain.oscillator.set_frequency(params.left_frequency),
            ToneGraph::Binaural { left, right } => {
                left.oscillator.set_frequency(params.left_frequency);
                right.oscillator.set_frequency(params.right_frequency);
            }
        }

        let mut wave: Option<Arc<PeriodicWave>> = None;
        for chain in tones.chains_mut() {
            if chain.oscillator.wave().harmonics() != harmonics.as_slice() {
                let wave = wave
                    .get_or_insert_with(|| Arc::new(PeriodicWave::new(harmonics.clone())))
                    .clone();
                chain.oscillator.set_periodic_wave(wave);
            }
            if chain.gain_target != target {
                schedule_gain(&mut chain.gain, target, now, ramp, fade);
                chain.gain_target = target;
            }
        }
        if wave.is_some() {
            debug!(partials = harmonics.len(), "periodic wave replaced");
        }
    }

    /// Fade the current tone chains out and park them until they stop.
    /// The fade never outlasts the session horizon.
    fn retire_tones(&mut self, now: u64, ramp: u64) {
        let Some(tones) = self.graph.tones.take() else {
            return;
        };
        let mut stop_at = now.saturating_add(ramp);
        if let Some(horizon) = self.graph.horizon {
            stop_at = stop_at.min(horizon);
        }
        for mut chain in tones.into_chains() {
            chain.gain.ramp_to(0.0, now, stop_at.saturating_sub(now));
            match chain.oscillator.stop(stop_at) {
                Ok(()) => self.graph.retiring.push(chain),
                Err(e) => debug!(error = %e, "dropping chain that never started"),
            }
        }
    }

    /// Start, stop, switch or re-level the background track.
    fn sync_background(&mut self, params: &ToneParameters, now: u64, ramp: u64) {
        let wanted = params.background;
        let target = background_gain(&self.config, params);
        let fade = self.fade_out();

        if let Some(bg) = self.graph.background.as_mut() {
            if bg.track == wanted {
                if bg.gain_target != target {
                    schedule_gain(&mut bg.gain, target, now, ramp, fade);
                    bg.gain_target = target;
                }
                return;
            }
        }

        if let Some(mut old) = self.graph.background.take() {
            old.player.pause();
            old.player.rewind();
            info!(track = old.track.name(), "background track stopped");
        }
        if wanted.is_none() {
            return;
        }

        match self.tracks.get(wanted) {
            Ok(buffer) => {
                let mut player = TrackPlayer::new(buffer, self.sample_rate());
                player.looping = true;
                player.play();
                let mut gain = AudioParam::new(0.0);
                schedule_gain(&mut gain, target, now, ramp, fade);
                self.graph.background = Some(BackgroundNode {
                    track: wanted,
                    player,
                    gain,
                    gain_target: target,
                });
                info!(track = wanted.name(), gain = target, "background track started");
            }
            Err(e) => {
                warn!(error = %e, "continuing without background track");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Return to idle once the session horizon has passed or the tones have
    /// stopped on their own.
    fn expire_if_due(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        let now = self.now();
        let past_horizon = self.graph.horizon.is_some_and(|h| now >= h);
        let tones_stopped = self
            .graph
            .tones
            .as_mut()
            .is_some_and(|t| t.chains_mut().any(|c| c.oscillator.poll(now) == OscillatorState::Stopped));
        if past_horizon || tones_stopped {
            info!("session ended; returning to idle");
            self.clear_graph();
        }
    }

    fn clear_graph(&mut self) {
        let now = self.now();
        if let Some(tones) = self.graph.tones.take() {
            for mut chain in tones.into_chains() {
                if let Err(e) = chain.oscillator.stop(now) {
                    debug!(error = %e, "oscillator was never started");
                }
            }
        }
        self.graph.retiring.clear();
        if let Some(mut bg) = self.graph.background.take() {
            bg.player.pause();
            bg.player.rewind();
        }
        self.graph.horizon = None;
        self.graph.applied = None;
        self.state = PlaybackState::Idle;
    }
}

impl Drop for AudioGraphManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
