//! Audio context — the sample clock every scheduled change is expressed in.

use serde::Serialize;

use crate::error::{NadaError, NadaResult};

/// Sample rates a context will accept, matching what browsers allow.
const MIN_SAMPLE_RATE: f64 = 3000.0;
const MAX_SAMPLE_RATE: f64 = 768000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Created but not producing sound until resumed.
    Suspended,
    Running,
    Closed,
}

/// A software audio processing context.
///
/// Time only advances while the context is running; a suspended context
/// renders silence and holds every scheduled event in place.
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: f64,
    frame: u64,
    state: ContextState,
}

impl AudioContext {
    /// Contexts start suspended, like a browser context created before a
    /// user gesture.
    pub fn new(sample_rate: f64) -> NadaResult<Self> {
        if !(sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate))
        {
            return Err(NadaError::InvalidSampleRate { rate: sample_rate });
        }
        Ok(AudioContext {
            sample_rate,
            frame: 0,
            state: ContextState::Suspended,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Frames rendered so far.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    /// Convert a duration to a whole number of frames (rounded).
    pub fn frames(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 || !seconds.is_finite() {
            return 0;
        }
        (seconds * self.sample_rate).round() as u64
    }

    pub fn resume(&mut self) -> NadaResult<()> {
        match self.state {
            ContextState::Closed => Err(NadaError::ContextClosed),
            _ => {
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&mut self) -> NadaResult<()> {
        match self.state {
            ContextState::Closed => Err(NadaError::ContextClosed),
            _ => {
                self.state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    /// Closing is final.
    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    pub(crate) fn advance(&mut self, frames: u64) {
        if self.is_running() {
            self.frame = self.frame.saturating_add(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_suspended() {
        let ctx = AudioContext::new(44100.0).unwrap();
        assert_eq!(ctx.state(), ContextState::Suspended);
        assert_eq!(ctx.current_time(), 0.0);
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(AudioContext::new(0.0).is_err());
        assert!(AudioContext::new(f64::NAN).is_err());
        assert!(AudioContext::new(1_000_000.0).is_err());
        assert!(AudioContext::new(48000.0).is_ok());
    }

    #[test]
    fn time_only_moves_while_running() {
        let mut ctx = AudioContext::new(4000.0).unwrap();
        ctx.advance(2000);
        assert_eq!(ctx.current_frame(), 0);

        ctx.resume().unwrap();
        ctx.advance(2000);
        assert_eq!(ctx.current_time(), 0.5);

        ctx.suspend().unwrap();
        ctx.advance(2000);
        assert_eq!(ctx.current_time(), 0.5);
    }

    #[test]
    fn closed_is_final() {
        let mut ctx = AudioContext::new(44100.0).unwrap();
        ctx.close();
        assert!(matches!(ctx.resume(), Err(NadaError::ContextClosed)));
        assert_eq!(ctx.state(), ContextState::Closed);
    }

    #[test]
    fn frame_conversion() {
        let ctx = AudioContext::new(44100.0).unwrap();
        assert_eq!(ctx.frames(0.5), 22050);
        assert_eq!(ctx.frames(-1.0), 0);
        assert_eq!(ctx.frames(0.0), 0);
    }
}
