//! Background tracks: decoded PCM buffers and a looping media player.
//!
//! Fetching and decoding happen outside the audio graph (the host, or the
//! `decode`/`fetch` features). The graph only sees a [`TrackLibrary`] of
//! ready buffers and plays them through [`TrackPlayer`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{NadaError, NadaResult};
use crate::params::BackgroundTrack;

/// A mono sample buffer loaded into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let data = samples.iter().map(|&s| s as f64).collect();
        SampleBuffer { data, sample_rate }
    }

    /// Average interleaved frames of `channels` down to mono.
    pub fn from_interleaved_f32(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let data = samples
            .chunks(channels)
            .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / frame.len() as f64)
            .collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length in seconds at the native rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Linear interpolation at a fractional position, wrapping past the end
    /// back to the start.
    pub fn read_looped(&self, position: f64) -> f64 {
        let len = self.data.len();
        if len == 0 || position < 0.0 {
            return 0.0;
        }
        let idx = position as usize % len;
        let frac = position - position.floor();
        let next = (idx + 1) % len;
        self.data[idx] * (1.0 - frac) + self.data[next] * frac
    }
}

/// Decoded tracks available to the graph, keyed by track id.
#[derive(Debug, Clone, Default)]
pub struct TrackLibrary {
    tracks: HashMap<BackgroundTrack, Arc<SampleBuffer>>,
}

impl TrackLibrary {
    pub fn new() -> Self {
        TrackLibrary::default()
    }

    /// Register (or replace) the audio for a track. Empty buffers and the
    /// `None` track are refused.
    pub fn register(&mut self, track: BackgroundTrack, buffer: SampleBuffer) -> NadaResult<()> {
        if track.is_none() {
            return Err(NadaError::decode("cannot register audio for the 'none' track"));
        }
        if buffer.is_empty() || buffer.sample_rate == 0 {
            return Err(NadaError::decode(format!(
                "track '{}' has no playable audio",
                track.name()
            )));
        }
        self.tracks.insert(track, Arc::new(buffer));
        Ok(())
    }

    pub fn get(&self, track: BackgroundTrack) -> NadaResult<Arc<SampleBuffer>> {
        self.tracks
            .get(&track)
            .cloned()
            .ok_or(NadaError::TrackNotLoaded { track })
    }

    pub fn contains(&self, track: BackgroundTrack) -> bool {
        self.tracks.contains_key(&track)
    }
}

/// A looping media element reading a [`SampleBuffer`] at the context rate.
#[derive(Debug, Clone)]
pub struct TrackPlayer {
    buffer: Arc<SampleBuffer>,
    position: f64,
    /// Buffer frames consumed per context frame.
    step: f64,
    paused: bool,
    pub looping: bool,
}

impl TrackPlayer {
    /// Created paused at the start of the buffer.
    pub fn new(buffer: Arc<SampleBuffer>, context_sample_rate: f64) -> Self {
        let step = buffer.sample_rate as f64 / context_sample_rate;
        TrackPlayer {
            buffer,
            position: 0.0,
            step,
            paused: true,
            looping: true,
        }
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Back to the beginning.
    pub fn rewind(&mut self) {
        self.position = 0.0;
    }

    /// Playback position in seconds.
    pub fn current_time(&self) -> f64 {
        self.position / self.buffer.sample_rate as f64
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.paused {
            return 0.0;
        }
        let len = self.buffer.len() as f64;
        if self.position >= len {
            if !self.looping {
                self.paused = true;
                return 0.0;
            }
            self.position %= len;
        }
        let sample = self.buffer.read_looped(self.position);
        self.position += self.step;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(len: usize, rate: u32) -> SampleBuffer {
        SampleBuffer::new((0..len).map(|i| i as f64 / len as f64).collect(), rate)
    }

    #[test]
    fn pcm_conversions() {
        let b = SampleBuffer::from_f32(&[0.0, 0.5, -1.0], 8000);
        assert_eq!(b.data, vec![0.0, 0.5, -1.0]);

        let b = SampleBuffer::from_interleaved_f32(&[1.0, 0.0, 0.5, 0.5], 2, 8000);
        assert_eq!(b.data, vec![0.5, 0.5]);
        assert_eq!(b.duration(), 2.0 / 8000.0);
    }

    #[test]
    fn looped_read_wraps() {
        let b = SampleBuffer::new(vec![0.0, 1.0], 8000);
        assert!((b.read_looped(0.5) - 0.5).abs() < 1e-12);
        assert!((b.read_looped(1.5) - 0.5).abs() < 1e-12, "interpolates back to start");
        assert_eq!(b.read_looped(2.0), 0.0);
    }

    #[test]
    fn library_refuses_unusable_audio() {
        let mut lib = TrackLibrary::new();
        assert!(lib.register(BackgroundTrack::None, ramp_buffer(4, 8000)).is_err());
        assert!(lib.register(BackgroundTrack::Piano, SampleBuffer::new(vec![], 8000)).is_err());
        assert!(matches!(
            lib.get(BackgroundTrack::Piano),
            Err(NadaError::TrackNotLoaded { .. })
        ));

        lib.register(BackgroundTrack::Piano, ramp_buffer(4, 8000)).unwrap();
        assert!(lib.contains(BackgroundTrack::Piano));
        assert_eq!(lib.get(BackgroundTrack::Piano).unwrap().len(), 4);
    }

    #[test]
    fn player_is_silent_while_paused() {
        let mut p = TrackPlayer::new(Arc::new(ramp_buffer(100, 8000)), 8000.0);
        assert!(p.is_paused());
        assert_eq!(p.next_sample(), 0.0);
        assert_eq!(p.current_time(), 0.0);
    }

    #[test]
    fn player_loops() {
        let mut p = TrackPlayer::new(Arc::new(ramp_buffer(10, 8000)), 8000.0);
        p.play();
        let first: Vec<f64> = (0..10).map(|_| p.next_sample()).collect();
        let second: Vec<f64> = (0..10).map(|_| p.next_sample()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn player_stops_at_end_without_loop() {
        let mut p = TrackPlayer::new(Arc::new(ramp_buffer(10, 8000)), 8000.0);
        p.looping = false;
        p.play();
        for _ in 0..10 {
            p.next_sample();
        }
        assert_eq!(p.next_sample(), 0.0);
        assert!(p.is_paused());
    }

    #[test]
    fn player_resamples_to_context_rate() {
        let mut p = TrackPlayer::new(Arc::new(ramp_buffer(100, 8000)), 16000.0);
        p.play();
        for _ in 0..4 {
            p.next_sample();
        }
        assert_eq!(p.position, 2.0, "half a buffer frame per context frame");
    }

    #[test]
    fn rewind_returns_to_start() {
        let mut p = TrackPlayer::new(Arc::new(ramp_buffer(100, 8000)), 8000.0);
        p.play();
        for _ in 0..30 {
            p.next_sample();
        }
        p.rewind();
        assert_eq!(p.current_time(), 0.0);
    }
}
