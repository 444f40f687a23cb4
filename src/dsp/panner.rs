//! Stereo panner — equal-power placement of a mono signal.

use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoPanner {
    pan: f64,
    left_gain: f64,
    right_gain: f64,
}

impl StereoPanner {
    /// `pan` in [-1, 1]; -1 is hard left, +1 hard right.
    pub fn new(pan: f64) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        let x = (pan + 1.0) / 2.0;
        StereoPanner {
            pan,
            left_gain: (x * FRAC_PI_2).cos(),
            right_gain: (x * FRAC_PI_2).sin(),
        }
    }

    pub fn hard_left() -> Self {
        StereoPanner::new(-1.0)
    }

    pub fn hard_right() -> Self {
        StereoPanner::new(1.0)
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    /// Split a mono sample into (left, right).
    #[inline]
    pub fn process(&self, input: f64) -> (f64, f64) {
        (input * self.left_gain, input * self.right_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_pans_isolate_channels() {
        let (l, r) = StereoPanner::hard_left().process(0.8);
        assert!((l - 0.8).abs() < 1e-12);
        assert!(r.abs() < 1e-12);

        let (l, r) = StereoPanner::hard_right().process(0.8);
        assert!(l.abs() < 1e-12);
        assert!((r - 0.8).abs() < 1e-12);
    }

    #[test]
    fn center_is_equal_power() {
        let (l, r) = StereoPanner::new(0.0).process(1.0);
        assert!((l - r).abs() < 1e-12);
        assert!((l * l + r * r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pan_is_clamped() {
        assert_eq!(StereoPanner::new(-3.0).pan(), -1.0);
        assert_eq!(StereoPanner::new(2.0).pan(), 1.0);
    }
}
