//! Waveform Table Builder — harmonic tables for the tone oscillators.
//!
//! A table is a list of [`Harmonic`]s indexed by harmonic number. Index 0 is
//! the DC term and is always silent; index 1 is the fundamental at amplitude
//! 1.0. [`PeriodicWave`] turns a table into a single-cycle lookup table the
//! oscillator reads from, peak-normalized the same way WebAudio's
//! `createPeriodicWave` does.

use std::f64::consts::PI;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::params::Timbre;

/// One partial: `amplitude * sin(2π·n·t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Harmonic {
    pub amplitude: f64,
    /// Phase offset in radians.
    pub phase: f64,
}

impl Harmonic {
    pub const SILENT: Harmonic = Harmonic {
        amplitude: 0.0,
        phase: 0.0,
    };

    pub const fn new(amplitude: f64) -> Self {
        Harmonic { amplitude, phase: 0.0 }
    }
}

/// Harmonics above the fundamental for the Fourier-series shapes.
const SERIES_HARMONICS: usize = 15;

const PURE: [f64; 2] = [0.0, 1.0];
const FLUTE: [f64; 2] = [0.0, 1.0];
const VIOLIN: [f64; 5] = [0.0, 1.0, 0.5, 0.3, 0.1];
const CELLO: [f64; 4] = [0.0, 1.0, 0.4, 0.2];

/// The thresholds that override the requested timbre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformPolicy {
    /// Binaural beats at or below this force a pure tone.
    pub low_beat_threshold: f64,
    /// Monaural carriers above this force a pure tone.
    pub monaural_pure_above: f64,
    /// Floor applied to the carrier before comparing.
    pub min_frequency: f64,
}

impl Default for WaveformPolicy {
    fn default() -> Self {
        WaveformPolicy {
            low_beat_threshold: 4.0,
            monaural_pure_above: 300.0,
            min_frequency: 1.0,
        }
    }
}

impl From<&EngineConfig> for WaveformPolicy {
    fn from(config: &EngineConfig) -> Self {
        WaveformPolicy {
            low_beat_threshold: config.low_beat_threshold,
            monaural_pure_above: config.monaural_pure_above,
            min_frequency: config.min_frequency,
        }
    }
}

impl WaveformPolicy {
    /// Pick the harmonic table for one carrier. First match wins:
    ///
    /// 1. binaural with a beat at or below `low_beat_threshold` → pure
    /// 2. monaural above `monaural_pure_above` → pure
    /// 3. the timbre's own table (unknown timbres → pure)
    pub fn harmonics(
        &self,
        timbre: Timbre,
        is_monaural: bool,
        beat_frequency: f64,
        frequency: f64,
    ) -> Vec<Harmonic> {
        let frequency = if frequency.is_finite() {
            frequency.max(self.min_frequency)
        } else {
            self.min_frequency
        };

        if !is_monaural && beat_frequency <= self.low_beat_threshold {
            return pure();
        }
        if is_monaural && frequency > self.monaural_pure_above {
            return pure();
        }
        timbre_table(timbre)
    }
}

/// [`WaveformPolicy::harmonics`] with the default thresholds.
pub fn build_harmonics(
    timbre: Timbre,
    is_monaural: bool,
    beat_frequency: f64,
    frequency: f64,
) -> Vec<Harmonic> {
    WaveformPolicy::default().harmonics(timbre, is_monaural, beat_frequency, frequency)
}

/// A lone fundamental.
pub fn pure() -> Vec<Harmonic> {
    from_amplitudes(&PURE)
}

/// The fixed table for a timbre, ignoring every override.
pub fn timbre_table(timbre: Timbre) -> Vec<Harmonic> {
    match timbre {
        Timbre::Flute => from_amplitudes(&FLUTE),
        Timbre::Violin => from_amplitudes(&VIOLIN),
        Timbre::Cello => from_amplitudes(&CELLO),
        Timbre::Sine | Timbre::Unknown => pure(),
        Timbre::Square => series(|n| (n % 2 == 1).then(|| Harmonic::new(1.0 / n as f64))),
        Timbre::Sawtooth => series(|n| Some(Harmonic::new(1.0 / n as f64))),
        Timbre::Triangle => series(|n| {
            // odd partials at 1/n², alternating sign
            (n % 2 == 1).then(|| {
                let phase = if (n / 2) % 2 == 1 { PI } else { 0.0 };
                Harmonic {
                    amplitude: 1.0 / (n * n) as f64,
                    phase,
                }
            })
        }),
    }
}

/// Number of harmonics carrying any energy.
pub fn audible_partials(harmonics: &[Harmonic]) -> usize {
    harmonics.iter().filter(|h| h.amplitude != 0.0).count()
}

fn from_amplitudes(amplitudes: &[f64]) -> Vec<Harmonic> {
    amplitudes.iter().map(|&a| Harmonic::new(a)).collect()
}

fn series(partial: impl Fn(usize) -> Option<Harmonic>) -> Vec<Harmonic> {
    let mut table = vec![Harmonic::SILENT];
    table.extend((1..=SERIES_HARMONICS).map(|n| partial(n).unwrap_or(Harmonic::SILENT)));
    table
}

// ── Lookup table ────────────────────────────────────────────

/// Power of two so the index can be masked.
const TABLE_SIZE: usize = 2048;
const TABLE_MASK: usize = TABLE_SIZE - 1;

/// A single cycle rendered from a harmonic table.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicWave {
    harmonics: Vec<Harmonic>,
    table: Vec<f32>,
}

impl PeriodicWave {
    pub fn new(harmonics: Vec<Harmonic>) -> Self {
        let mut table: Vec<f32> = (0..TABLE_SIZE)
            .map(|i| {
                let t = i as f64 / TABLE_SIZE as f64;
                harmonics
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(n, h)| h.amplitude * (2.0 * PI * n as f64 * t + h.phase).sin())
                    .sum::<f64>() as f32
            })
            .collect();

        let peak = table.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        if peak > 0.0 {
            for s in table.iter_mut() {
                *s /= peak;
            }
        }

        PeriodicWave { harmonics, table }
    }

    pub fn sine() -> Self {
        PeriodicWave::new(pure())
    }

    pub fn harmonics(&self) -> &[Harmonic] {
        &self.harmonics
    }

    /// Interpolated read at `phase` in [0, 1).
    #[inline]
    pub fn sample(&self, phase: f64) -> f64 {
        let scaled = phase * TABLE_SIZE as f64;
        let index = scaled as usize;
        let frac = scaled - index as f64;
        let a = self.table[index & TABLE_MASK] as f64;
        let b = self.table[(index + 1) & TABLE_MASK] as f64;
        a + frac * (b - a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amplitudes(h: &[Harmonic]) -> Vec<f64> {
        h.iter().map(|h| h.amplitude).collect()
    }

    #[test]
    fn low_beat_forces_pure_tone() {
        for timbre in Timbre::ALL {
            for beat in [0.5, 1.0, 2.0, 3.9, 4.0] {
                let h = build_harmonics(timbre, false, beat, 200.0);
                assert_eq!(
                    audible_partials(&h),
                    1,
                    "{timbre:?} at beat {beat} should be pure, got {:?}",
                    amplitudes(&h)
                );
            }
        }
    }

    #[test]
    fn high_monaural_forces_pure_tone() {
        for timbre in Timbre::ALL {
            for freq in [300.5, 400.0, 1999.0] {
                let h = build_harmonics(timbre, true, 0.0, freq);
                assert_eq!(audible_partials(&h), 1, "{timbre:?} at {freq} Hz");
                assert_eq!(h[1].amplitude, 1.0);
            }
        }
    }

    #[test]
    fn timbre_tables_apply_otherwise() {
        assert_eq!(
            amplitudes(&build_harmonics(Timbre::Violin, false, 10.0, 200.0)),
            vec![0.0, 1.0, 0.5, 0.3, 0.1]
        );
        assert_eq!(
            amplitudes(&build_harmonics(Timbre::Cello, true, 0.0, 120.0)),
            vec![0.0, 1.0, 0.4, 0.2]
        );
        assert_eq!(
            amplitudes(&build_harmonics(Timbre::Flute, false, 6.0, 440.0)),
            vec![0.0, 1.0]
        );
        // binaural mode ignores the monaural carrier threshold
        assert_eq!(build_harmonics(Timbre::Violin, false, 10.0, 900.0).len(), 5);
        // exactly 300 Hz is not above the threshold
        assert_eq!(build_harmonics(Timbre::Cello, true, 0.0, 300.0).len(), 4);
    }

    #[test]
    fn unknown_timbre_falls_back_to_pure() {
        let h = build_harmonics(Timbre::Unknown, false, 10.0, 200.0);
        assert_eq!(amplitudes(&h), vec![0.0, 1.0]);
    }

    #[test]
    fn tables_have_silent_dc_and_unit_fundamental() {
        for timbre in Timbre::ALL {
            let h = timbre_table(timbre);
            assert_eq!(h[0].amplitude, 0.0, "{timbre:?} DC");
            assert_eq!(h[1].amplitude, 1.0, "{timbre:?} fundamental");
        }
    }

    #[test]
    fn series_shapes() {
        let square = timbre_table(Timbre::Square);
        assert_eq!(square.len(), SERIES_HARMONICS + 1);
        assert_eq!(square[2].amplitude, 0.0);
        assert!((square[3].amplitude - 1.0 / 3.0).abs() < 1e-12);

        let tri = timbre_table(Timbre::Triangle);
        assert!((tri[3].amplitude - 1.0 / 9.0).abs() < 1e-12);
        assert_eq!(tri[3].phase, PI);
        assert_eq!(tri[5].phase, 0.0);
    }

    #[test]
    fn zero_or_negative_frequency_is_floored() {
        let h = build_harmonics(Timbre::Cello, true, 0.0, 0.0);
        assert_eq!(h.len(), 4, "0 Hz is treated as 1 Hz, below the pure threshold");
        let h = build_harmonics(Timbre::Cello, true, 0.0, f64::NAN);
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn policy_from_config() {
        let config = EngineConfig {
            low_beat_threshold: 8.0,
            ..Default::default()
        };
        let policy = WaveformPolicy::from(&config);
        assert_eq!(policy.harmonics(Timbre::Violin, false, 6.0, 200.0).len(), 2);
    }

    #[test]
    fn lookup_is_normalized() {
        for timbre in Timbre::ALL {
            let wave = PeriodicWave::new(timbre_table(timbre));
            let peak = wave.table.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
            assert!((peak - 1.0).abs() < 1e-6, "{timbre:?} peak {peak}");
        }
    }

    #[test]
    fn sine_lookup_matches_sin() {
        let wave = PeriodicWave::sine();
        for i in 0..64 {
            let phase = i as f64 / 64.0;
            let expected = (2.0 * PI * phase).sin();
            assert!((wave.sample(phase) - expected).abs() < 1e-4);
        }
    }
}
