//! Parameter Store — the user-adjustable tone values and what derives from them.
//!
//! The store is owned by the UI layer. The audio graph only ever reads a
//! snapshot of [`ToneParameters`]; it never writes back.

use serde::{Deserialize, Serialize};

use crate::presets::NadaPreset;

// ── Timbre ──────────────────────────────────────────────────

/// Harmonic-content preset applied to the tone oscillators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Flute,
    Violin,
    Cello,
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Anything the UI sent that we do not recognise. Rendered as a pure tone.
    #[serde(other)]
    Unknown,
}

impl Timbre {
    /// Every selectable timbre, in menu order.
    pub const ALL: [Timbre; 7] = [
        Timbre::Sine,
        Timbre::Square,
        Timbre::Sawtooth,
        Timbre::Triangle,
        Timbre::Flute,
        Timbre::Violin,
        Timbre::Cello,
    ];

    /// Lenient name lookup; unrecognised names map to [`Timbre::Unknown`].
    pub fn parse(s: &str) -> Timbre {
        match s.trim().to_ascii_lowercase().as_str() {
            "flute" => Timbre::Flute,
            "violin" => Timbre::Violin,
            "cello" => Timbre::Cello,
            "sine" => Timbre::Sine,
            "square" => Timbre::Square,
            "sawtooth" | "saw" => Timbre::Sawtooth,
            "triangle" => Timbre::Triangle,
            _ => Timbre::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Flute => "flute",
            Timbre::Violin => "violin",
            Timbre::Cello => "cello",
            Timbre::Sine => "sine",
            Timbre::Square => "square",
            Timbre::Sawtooth => "sawtooth",
            Timbre::Triangle => "triangle",
            Timbre::Unknown => "unknown",
        }
    }

    /// Position among the four basic oscillator shapes, if this is one.
    pub fn basic_shape_index(self) -> Option<usize> {
        match self {
            Timbre::Sine => Some(0),
            Timbre::Square => Some(1),
            Timbre::Sawtooth => Some(2),
            Timbre::Triangle => Some(3),
            _ => None,
        }
    }
}

// ── Background track ────────────────────────────────────────

/// Optional ambient bed mixed under the tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundTrack {
    #[default]
    None,
    Nature,
    Piano,
    Lofi,
}

impl BackgroundTrack {
    pub const ALL: [BackgroundTrack; 4] = [
        BackgroundTrack::None,
        BackgroundTrack::Nature,
        BackgroundTrack::Piano,
        BackgroundTrack::Lofi,
    ];

    /// Lenient name lookup; anything unrecognised means no track.
    pub fn parse(s: &str) -> BackgroundTrack {
        match s.trim().to_ascii_lowercase().as_str() {
            "nature" => BackgroundTrack::Nature,
            "piano" => BackgroundTrack::Piano,
            "lofi" | "lo-fi" => BackgroundTrack::Lofi,
            _ => BackgroundTrack::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackgroundTrack::None => "none",
            BackgroundTrack::Nature => "nature",
            BackgroundTrack::Piano => "piano",
            BackgroundTrack::Lofi => "lofi",
        }
    }

    pub fn is_none(self) -> bool {
        self == BackgroundTrack::None
    }

    /// Asset URL under `base_url`, or `None` for [`BackgroundTrack::None`].
    pub fn url(self, base_url: &str) -> Option<String> {
        if self.is_none() {
            return None;
        }
        Some(format!("{}/{}.mp3", base_url.trim_end_matches('/'), self.name()))
    }
}

// ── Tone parameters ─────────────────────────────────────────

/// Snapshot of everything the user controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneParameters {
    /// Left carrier in Hz.
    pub left_frequency: f64,
    /// Right carrier in Hz.
    pub right_frequency: f64,
    pub timbre: Timbre,
    /// Master volume [0, 1].
    pub volume: f64,
    pub background: BackgroundTrack,
}

impl Default for ToneParameters {
    fn default() -> Self {
        ToneParameters {
            left_frequency: 174.0,
            right_frequency: 174.0,
            timbre: Timbre::Sine,
            volume: 0.5,
            background: BackgroundTrack::None,
        }
    }
}

impl ToneParameters {
    /// Both ears hear the same frequency.
    pub fn is_monaural(&self) -> bool {
        self.left_frequency == self.right_frequency
    }

    /// Perceived beat between the two carriers.
    pub fn beat_frequency(&self) -> f64 {
        (self.left_frequency - self.right_frequency).abs()
    }

    /// Copy with frequencies clamped to `[min_frequency, max_frequency]` and
    /// volume clamped to [0, 1]. Non-finite values collapse to the floor.
    pub fn sanitized(&self, min_frequency: f64, max_frequency: f64) -> ToneParameters {
        let clamp_freq = |f: f64| {
            if f.is_finite() {
                f.clamp(min_frequency, max_frequency)
            } else {
                min_frequency
            }
        };
        let volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        ToneParameters {
            left_frequency: clamp_freq(self.left_frequency),
            right_frequency: clamp_freq(self.right_frequency),
            volume,
            ..*self
        }
    }
}

// ── Store ───────────────────────────────────────────────────

/// Owner of the live [`ToneParameters`].
///
/// Every setter reports whether the value actually changed, so callers only
/// trigger a graph update when something moved. `revision` bumps on each change.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: ToneParameters,
    revision: u64,
}

impl ParameterStore {
    pub fn new(params: ToneParameters) -> Self {
        ParameterStore { params, revision: 0 }
    }

    pub fn params(&self) -> &ToneParameters {
        &self.params
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_monaural(&self) -> bool {
        self.params.is_monaural()
    }

    pub fn beat_frequency(&self) -> f64 {
        self.params.beat_frequency()
    }

    /// Replace the whole snapshot.
    pub fn replace(&mut self, params: ToneParameters) -> bool {
        self.mutate(|p| *p = params)
    }

    pub fn set_left_frequency(&mut self, hz: f64) -> bool {
        self.mutate(|p| p.left_frequency = hz)
    }

    pub fn set_right_frequency(&mut self, hz: f64) -> bool {
        self.mutate(|p| p.right_frequency = hz)
    }

    pub fn set_frequencies(&mut self, left: f64, right: f64) -> bool {
        self.mutate(|p| {
            p.left_frequency = left;
            p.right_frequency = right;
        })
    }

    /// Move the left carrier to `base` and drag the right one along so the
    /// beat frequency is preserved.
    pub fn set_base_frequency(&mut self, base: f64) -> bool {
        self.mutate(|p| {
            let diff = p.right_frequency - p.left_frequency;
            p.left_frequency = base;
            p.right_frequency = base + diff;
        })
    }

    pub fn set_timbre(&mut self, timbre: Timbre) -> bool {
        self.mutate(|p| p.timbre = timbre)
    }

    pub fn set_volume(&mut self, volume: f64) -> bool {
        self.mutate(|p| p.volume = volume)
    }

    /// Volume from a 0–100 slider.
    pub fn set_volume_percent(&mut self, percent: f64) -> bool {
        self.set_volume(percent / 100.0)
    }

    pub fn set_background(&mut self, track: BackgroundTrack) -> bool {
        self.mutate(|p| p.background = track)
    }

    /// Load a preset's carriers and timbre; volume and background are kept.
    pub fn apply_preset(&mut self, preset: &NadaPreset) -> bool {
        self.mutate(|p| {
            p.left_frequency = preset.left_frequency;
            p.right_frequency = preset.right_frequency;
            p.timbre = preset.timbre;
        })
    }

    fn mutate(&mut self, f: impl FnOnce(&mut ToneParameters)) -> bool {
        let before = self.params;
        f(&mut self.params);
        let changed = self.params != before;
        if changed {
            self.revision += 1;
        }
        changed
    }
}
