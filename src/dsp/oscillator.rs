//! Periodic-wave oscillator with a one-shot start/stop lifecycle.

use std::sync::Arc;

use crate::error::{NadaError, NadaResult};

use super::wavetable::PeriodicWave;

/// Lifecycle of a tone oscillator. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorState {
    Unstarted,
    Started,
    Stopped,
}

/// A wavetable oscillator reading from a shared [`PeriodicWave`].
#[derive(Debug, Clone)]
pub struct OscillatorNode {
    frequency: f64,
    wave: Arc<PeriodicWave>,
    phase: f64,
    sample_rate: f64,
    state: OscillatorState,
    start_frame: u64,
    stop_frame: Option<u64>,
}

impl OscillatorNode {
    pub fn new(wave: Arc<PeriodicWave>, frequency: f64, sample_rate: f64) -> Self {
        OscillatorNode {
            frequency,
            wave,
            phase: 0.0,
            sample_rate,
            state: OscillatorState::Unstarted,
            start_frame: 0,
            stop_frame: None,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Immediate frequency change; phase is continuous across it.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    pub fn wave(&self) -> &Arc<PeriodicWave> {
        &self.wave
    }

    /// Swap the waveform in place. The phase accumulator is untouched, so a
    /// running tone changes colour without restarting its cycle.
    pub fn set_periodic_wave(&mut self, wave: Arc<PeriodicWave>) {
        self.wave = wave;
    }

    pub fn state(&self) -> OscillatorState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == OscillatorState::Stopped
    }

    pub fn stop_frame(&self) -> Option<u64> {
        self.stop_frame
    }

    /// Begin producing sound at `frame`. An oscillator starts at most once.
    pub fn start(&mut self, frame: u64) -> NadaResult<()> {
        if self.state != OscillatorState::Unstarted {
            return Err(NadaError::invalid_node("oscillator", "start() called more than once"));
        }
        self.state = OscillatorState::Started;
        self.start_frame = frame;
        Ok(())
    }

    /// Schedule the end of this oscillator. Rescheduling before it fires
    /// replaces the earlier stop time.
    pub fn stop(&mut self, frame: u64) -> NadaResult<()> {
        match self.state {
            OscillatorState::Unstarted => {
                Err(NadaError::invalid_node("oscillator", "stop() before start()"))
            }
            OscillatorState::Stopped => Ok(()),
            OscillatorState::Started => {
                self.stop_frame = Some(frame);
                Ok(())
            }
        }
    }

    /// Withdraw a pending scheduled stop. Has no effect once stopped.
    pub fn cancel_stop(&mut self) {
        if self.state == OscillatorState::Started {
            self.stop_frame = None;
        }
    }

    /// Mark stopped if the scheduled stop has been reached.
    pub fn poll(&mut self, frame: u64) -> OscillatorState {
        if self.state == OscillatorState::Started && self.stop_frame.is_some_and(|s| frame >= s) {
            self.state = OscillatorState::Stopped;
        }
        self.state
    }

    /// Generate the sample for context frame `frame`.
    pub fn next_sample(&mut self, frame: u64) -> f64 {
        if self.poll(frame) != OscillatorState::Started || frame < self.start_frame {
            return 0.0;
        }

        let sample = self.wave.sample(self.phase);

        self.phase += self.frequency / self.sample_rate;
        self.phase -= self.phase.floor();

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::wavetable::timbre_table;
    use crate::params::Timbre;

    const SR: f64 = 44100.0;

    fn sine_osc(freq: f64) -> OscillatorNode {
        OscillatorNode::new(Arc::new(PeriodicWave::sine()), freq, SR)
    }

    #[test]
    fn silent_until_started() {
        let mut osc = sine_osc(440.0);
        for f in 0..100 {
            assert_eq!(osc.next_sample(f), 0.0);
        }
        osc.start(200).unwrap();
        assert_eq!(osc.next_sample(150), 0.0, "before the start frame");
    }

    #[test]
    fn sine_starts_at_zero_and_stays_in_range() {
        let mut osc = sine_osc(440.0);
        osc.start(0).unwrap();
        let first = osc.next_sample(0);
        assert!(first.abs() < 1e-6, "sine should start near 0, got {first}");
        for f in 1..44100 {
            let s = osc.next_sample(f);
            assert!((-1.0..=1.0).contains(&s), "out of range: {s}");
        }
    }

    #[test]
    fn cannot_start_twice() {
        let mut osc = sine_osc(220.0);
        osc.start(0).unwrap();
        assert!(osc.start(10).is_err());
    }

    #[test]
    fn stopped_oscillator_never_restarts() {
        let mut osc = sine_osc(220.0);
        osc.start(0).unwrap();
        osc.stop(100).unwrap();
        for f in 0..100 {
            osc.next_sample(f);
        }
        assert_eq!(osc.next_sample(100), 0.0);
        assert!(osc.is_stopped());
        assert!(osc.start(200).is_err());
        osc.cancel_stop();
        assert!(osc.is_stopped(), "cancel after the fact changes nothing");
    }

    #[test]
    fn cancel_stop_keeps_it_running() {
        let mut osc = sine_osc(220.0);
        osc.start(0).unwrap();
        osc.stop(50).unwrap();
        osc.cancel_stop();
        assert_eq!(osc.poll(1000), OscillatorState::Started);
    }

    #[test]
    fn stop_before_start_is_rejected() {
        let mut osc = sine_osc(220.0);
        assert!(osc.stop(0).is_err());
    }

    #[test]
    fn wave_swap_keeps_phase() {
        let violin = Arc::new(PeriodicWave::new(timbre_table(Timbre::Violin)));
        let mut swapped = sine_osc(1000.0);
        let mut native = OscillatorNode::new(violin.clone(), 1000.0, SR);
        swapped.start(0).unwrap();
        native.start(0).unwrap();
        for f in 0..37 {
            swapped.next_sample(f);
            native.next_sample(f);
        }

        swapped.set_periodic_wave(violin);
        let s = swapped.next_sample(37);
        assert_eq!(s, native.next_sample(37), "swap must continue mid-cycle");
        assert!(s.abs() > 0.01, "a restarted cycle would read ~0, got {s}");
    }

    #[test]
    fn frequency_sets_phase_increment() {
        let mut osc = sine_osc(SR / 4.0);
        osc.start(0).unwrap();
        let s: Vec<f64> = (0..4).map(|f| osc.next_sample(f)).collect();
        assert!(s[0].abs() < 1e-6);
        assert!((s[1] - 1.0).abs() < 1e-6);
        assert!(s[2].abs() < 1e-6);
        assert!((s[3] + 1.0).abs() < 1e-6);
    }
}
