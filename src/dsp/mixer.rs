//! Mixer — sums the tone chains and background bed into a stereo block.

/// A stereo summing bus that accumulates one render block at a time.
#[derive(Debug, Clone)]
pub struct Mixer {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Prepare `num_frames` of silence.
    pub fn clear(&mut self, num_frames: usize) {
        self.left.clear();
        self.left.resize(num_frames, 0.0);
        self.right.clear();
        self.right.resize(num_frames, 0.0);
    }

    /// Add a stereo sample at the given frame index.
    pub fn add(&mut self, index: usize, left: f64, right: f64) {
        if index < self.left.len() {
            self.left[index] += left;
            self.right[index] += right;
        }
    }

    /// Write the block as interleaved stereo with soft clipping.
    /// Writes at most `out.len() / 2` frames.
    pub fn write_interleaved(&self, out: &mut [f32]) {
        for (i, frame) in out.chunks_exact_mut(2).take(self.left.len()).enumerate() {
            frame[0] = soft_clip(self.left[i]) as f32;
            frame[1] = soft_clip(self.right[i]) as f32;
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Transparent below the knee, tanh-shaped above it so the output never
/// exceeds ±1.
fn soft_clip(x: f64) -> f64 {
    const KNEE: f64 = 0.9;
    let mag = x.abs();
    if mag <= KNEE {
        x
    } else {
        let over = (mag - KNEE) / (1.0 - KNEE);
        x.signum() * (KNEE + (1.0 - KNEE) * over.tanh())
    }
}
