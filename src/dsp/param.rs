//! Automatable parameter with set-value and linear-ramp events.
//!
//! Events are expressed in context frames. A ramp runs from the previous
//! event's (frame, value) to its own; a ramp whose end frame is already
//! reached simply lands on its value, so a zero-length ramp is a jump.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    Set,
    LinearRamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Event {
    frame: u64,
    value: f64,
    kind: Automation,
}

/// A gain-style parameter driven by scheduled automation.
#[derive(Debug, Clone)]
pub struct AudioParam {
    /// Value before the first event.
    initial: f64,
    events: Vec<Event>,
}

impl AudioParam {
    pub fn new(value: f64) -> Self {
        AudioParam {
            initial: value,
            events: Vec::new(),
        }
    }

    /// Value at `frame`, following every scheduled event.
    pub fn value_at(&self, frame: u64) -> f64 {
        let mut prev_frame = 0;
        let mut prev_value = self.initial;
        for ev in &self.events {
            if ev.frame <= frame {
                prev_frame = ev.frame;
                prev_value = ev.value;
                continue;
            }
            return match ev.kind {
                Automation::Set => prev_value,
                Automation::LinearRamp => {
                    let span = (ev.frame - prev_frame) as f64;
                    let t = (frame - prev_frame) as f64 / span;
                    prev_value + (ev.value - prev_value) * t
                }
            };
        }
        prev_value
    }

    pub fn set_value_at(&mut self, value: f64, frame: u64) {
        self.insert(Event {
            frame,
            value,
            kind: Automation::Set,
        });
    }

    pub fn linear_ramp_to_value_at(&mut self, value: f64, end_frame: u64) {
        self.insert(Event {
            frame: end_frame,
            value,
            kind: Automation::LinearRamp,
        });
    }

    /// Drop every event at or after `frame`.
    pub fn cancel_scheduled_values(&mut self, frame: u64) {
        self.events.retain(|ev| ev.frame < frame);
    }

    /// Freeze the parameter at whatever it is doing at `frame`.
    pub fn cancel_and_hold_at(&mut self, frame: u64) {
        let held = self.value_at(frame);
        self.cancel_scheduled_values(frame);
        self.set_value_at(held, frame);
    }

    /// Glide from the current value at `now` to `value` over `frames`.
    pub fn ramp_to(&mut self, value: f64, now: u64, frames: u64) {
        self.cancel_and_hold_at(now);
        self.linear_ramp_to_value_at(value, now.saturating_add(frames));
    }

    /// Forget events that can no longer affect anything at or after `frame`.
    pub fn prune(&mut self, frame: u64) {
        if let Some(last_past) = self.events.iter().rposition(|ev| ev.frame <= frame) {
            if last_past > 0 {
                self.events.drain(..last_past);
            }
        }
    }

    /// Number of pending automation events.
    pub fn scheduled_events(&self) -> usize {
        self.events.len()
    }

    fn insert(&mut self, event: Event) {
        let at = self.events.partition_point(|ev| ev.frame <= event.frame);
        self.events.insert(at, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_initial_value() {
        let p = AudioParam::new(0.25);
        assert_eq!(p.value_at(0), 0.25);
        assert_eq!(p.value_at(u64::MAX), 0.25);
    }

    #[test]
    fn linear_ramp_interpolates() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at(0.0, 100);
        p.linear_ramp_to_value_at(1.0, 200);

        assert_eq!(p.value_at(50), 0.0);
        assert_eq!(p.value_at(100), 0.0);
        assert!((p.value_at(150) - 0.5).abs() < 1e-12);
        assert_eq!(p.value_at(200), 1.0);
        assert_eq!(p.value_at(5000), 1.0);
    }

    #[test]
    fn ramp_never_jumps() {
        let mut p = AudioParam::new(0.0);
        p.ramp_to(0.8, 0, 441);
        let mut prev = p.value_at(0);
        for f in 1..=441 {
            let v = p.value_at(f);
            assert!(
                (v - prev).abs() <= 0.8 / 441.0 + 1e-12,
                "step too large at frame {f}: {prev} -> {v}"
            );
            prev = v;
        }
        assert_eq!(prev, 0.8);
    }

    #[test]
    fn zero_length_ramp_is_immediate() {
        let mut p = AudioParam::new(0.2);
        p.ramp_to(0.9, 300, 0);
        assert_eq!(p.value_at(299), 0.2);
        assert_eq!(p.value_at(300), 0.9);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current_value() {
        let mut p = AudioParam::new(0.0);
        p.ramp_to(1.0, 0, 100);
        // halfway up, head back down
        p.ramp_to(0.0, 50, 100);
        assert!((p.value_at(50) - 0.5).abs() < 1e-12);
        assert!((p.value_at(100) - 0.25).abs() < 1e-12);
        assert_eq!(p.value_at(150), 0.0);
        assert_eq!(p.value_at(u64::MAX), 0.0);
    }

    #[test]
    fn cancel_drops_future_events() {
        let mut p = AudioParam::new(1.0);
        p.set_value_at(1.0, 900);
        p.linear_ramp_to_value_at(0.0, 1000);
        p.cancel_scheduled_values(500);
        assert_eq!(p.value_at(1000), 1.0);
        assert_eq!(p.scheduled_events(), 0);
    }

    #[test]
    fn prune_keeps_current_value() {
        let mut p = AudioParam::new(0.0);
        p.ramp_to(0.5, 0, 10);
        p.ramp_to(0.7, 20, 10);
        let before = p.value_at(25);
        p.prune(25);
        assert_eq!(p.value_at(25), before);
        assert_eq!(p.value_at(30), 0.7);
        assert!(p.scheduled_events() <= 2);
    }
}
