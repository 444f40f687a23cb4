//! Visualization adapter — frame geometry derived from the live parameters.
//!
//! Everything here is a pure function of a [`ToneParameters`] snapshot and a
//! frame counter. Nothing reads or writes the audio graph.

use std::f64::consts::{PI, TAU};

use serde::Serialize;

use crate::params::{Timbre, ToneParameters};

/// Carrier that draws one cycle per ~63 px.
const REFERENCE_FREQUENCY: f64 = 174.0;
/// Trace amplitude in pixels at full volume.
const TRACE_HEIGHT: f64 = 50.0;
const PHASE_PER_FRAME: f64 = 0.05;
const PULSE_RINGS: usize = 5;

/// Height of a timbre-shaped trace at horizontal position `x`.
///
/// Only the four basic shapes have their own outline; instrument timbres
/// draw as a sine.
pub fn waveform_value(x: f64, frequency: f64, timbre: Timbre, phase: f64, amplitude: f64) -> f64 {
    let t = x * 0.1 + phase;
    let theta = t * (frequency / REFERENCE_FREQUENCY);
    match timbre {
        Timbre::Square => {
            if theta.sin() > 0.0 {
                amplitude
            } else {
                -amplitude
            }
        }
        Timbre::Sawtooth => (theta % TAU) / PI * amplitude - amplitude,
        Timbre::Triangle => (2.0 / PI) * theta.sin().asin() * amplitude,
        _ => theta.sin() * amplitude,
    }
}

/// One channel's trace across `width` pixels at animation frame `frame`.
pub fn waveform_trace(width: usize, frequency: f64, timbre: Timbre, frame: u64, volume: f64) -> Vec<f64> {
    let phase = frame as f64 * PHASE_PER_FRAME;
    let amplitude = volume * TRACE_HEIGHT;
    (0..width)
        .map(|x| waveform_value(x as f64, frequency, timbre, phase, amplitude))
        .collect()
}

/// Interference of the two traces; its envelope pulses at the beat rate.
pub fn beat_trace(left: &[f64], right: &[f64]) -> Vec<f64> {
    left.iter().zip(right).map(|(l, r)| (l + r) / 2.0).collect()
}

/// Geometry of the sacred-geometry mandala for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MandalaLayout {
    pub base_radius: f64,
    /// Radians; grows with the frame count and the left carrier.
    pub rotation: f64,
    pub circle_count: usize,
    /// Size of the six satellite circles relative to `base_radius`.
    pub inner_scale: f64,
}

impl MandalaLayout {
    pub fn new(params: &ToneParameters, frame: u64) -> Self {
        let beat = params.beat_frequency();
        // Non-basic timbres sit one step below sine.
        let index = params
            .timbre
            .basic_shape_index()
            .map_or(-1.0, |i| i as f64);
        MandalaLayout {
            base_radius: 50.0 + beat / 10.0,
            rotation: frame as f64 * (params.left_frequency / 1000.0),
            circle_count: (beat / 10.0).floor() as usize + 3,
            inner_scale: index / 3.0 * 0.2 + 0.4,
        }
    }

    /// Centres of the outer ring of circles, before rotation.
    pub fn centers(&self) -> Vec<(f64, f64)> {
        (0..self.circle_count)
            .map(|i| {
                let angle = TAU / self.circle_count as f64 * i as f64;
                (angle.cos() * self.base_radius, angle.sin() * self.base_radius)
            })
            .collect()
    }
}

/// Concentric "third eye" rings breathing around the centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseRings {
    pub rotation: f64,
    /// Ring diameters relative to the canvas' smaller side.
    pub radii: Vec<f64>,
}

impl PulseRings {
    pub fn new(params: &ToneParameters, frame: u64) -> Self {
        let frame = frame as f64;
        let speed = params.left_frequency / 100.0 * 0.01;
        let scale = (frame * PHASE_PER_FRAME).sin() * 0.2 + 1.0;
        PulseRings {
            rotation: frame * speed,
            radii: (1..=PULSE_RINGS).map(|i| 0.3 * i as f64 * scale).collect(),
        }
    }
}

/// Everything a host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSnapshot {
    pub frame: u64,
    pub playing: bool,
    pub beat_frequency: f64,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub beat: Vec<f64>,
    pub mandala: MandalaLayout,
    pub pulse: PulseRings,
}

impl VisualSnapshot {
    /// Canvases stay blank while stopped, so the traces are empty then.
    pub fn capture(params: &ToneParameters, frame: u64, width: usize, playing: bool) -> Self {
        let (left, right) = if playing {
            (
                waveform_trace(width, params.left_frequency, params.timbre, frame, params.volume),
                waveform_trace(width, params.right_frequency, params.timbre, frame, params.volume),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        VisualSnapshot {
            frame,
            playing,
            beat_frequency: params.beat_frequency(),
            beat: beat_trace(&left, &right),
            left,
            right,
            mandala: MandalaLayout::new(params, frame),
            pulse: PulseRings::new(params, frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(left: f64, right: f64, timbre: Timbre) -> ToneParameters {
        ToneParameters {
            left_frequency: left,
            right_frequency: right,
            timbre,
            ..Default::default()
        }
    }

    #[test]
    fn shapes_at_quarter_cycle() {
        // x = 5π at 174 Hz puts theta at π/2
        let x = 5.0 * PI;
        assert!((waveform_value(x, 174.0, Timbre::Sine, 0.0, 2.0) - 2.0).abs() < 1e-9);
        assert_eq!(waveform_value(x, 174.0, Timbre::Square, 0.0, 2.0), 2.0);
        assert!((waveform_value(x, 174.0, Timbre::Triangle, 0.0, 2.0) - 2.0).abs() < 1e-9);
        assert!((waveform_value(x, 174.0, Timbre::Sawtooth, 0.0, 2.0) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn instrument_timbres_draw_as_sine() {
        for timbre in [Timbre::Violin, Timbre::Cello, Timbre::Flute, Timbre::Unknown] {
            let v = waveform_value(3.0, 300.0, timbre, 0.4, 1.0);
            assert_eq!(v, waveform_value(3.0, 300.0, Timbre::Sine, 0.4, 1.0));
        }
    }

    #[test]
    fn trace_scales_with_volume() {
        let loud = waveform_trace(200, 174.0, Timbre::Square, 0, 1.0);
        let quiet = waveform_trace(200, 174.0, Timbre::Square, 0, 0.2);
        assert_eq!(loud.len(), 200);
        assert!(loud.iter().all(|v| v.abs() == 50.0));
        assert!(quiet.iter().all(|v| (v.abs() - 10.0).abs() < 1e-12));
    }

    #[test]
    fn mandala_follows_beat() {
        let m = MandalaLayout::new(&params(200.0, 230.0, Timbre::Sine), 10);
        assert_eq!(m.base_radius, 53.0);
        assert_eq!(m.circle_count, 6);
        assert!((m.rotation - 2.0).abs() < 1e-12);
        assert!((m.inner_scale - 0.4).abs() < 1e-12);
        assert_eq!(m.centers().len(), 6);

        let m = MandalaLayout::new(&params(200.0, 200.0, Timbre::Triangle), 0);
        assert_eq!(m.circle_count, 3);
        assert!((m.inner_scale - 0.6).abs() < 1e-12);

        let m = MandalaLayout::new(&params(200.0, 200.0, Timbre::Cello), 0);
        assert!((m.inner_scale - 0.4 + 0.2 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn stopped_snapshot_has_no_traces() {
        let p = params(200.0, 210.0, Timbre::Sine);
        let s = VisualSnapshot::capture(&p, 42, 300, false);
        assert!(s.left.is_empty() && s.beat.is_empty());
        assert_eq!(s.beat_frequency, 10.0);

        let s = VisualSnapshot::capture(&p, 42, 300, true);
        assert_eq!(s.left.len(), 300);
        assert_eq!(s.beat.len(), 300);
        assert_eq!(s.pulse.radii.len(), 5);
    }
}
