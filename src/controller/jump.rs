/// Remembers an early jump press for a short window so it fires on landing.
#[derive(Debug, Clone, Default)]
pub struct JumpBuffer {
    pressed_at: Option<f64>,
}

impl JumpBuffer {
    pub fn press(&mut self, now: f64) {
        self.pressed_at = Some(now);
    }

    /// The press still within `window` seconds, if any. Expired presses are dropped.
    pub fn pending(&mut self, now: f64, window: f32) -> Option<f64> {
        let pressed = self.pressed_at?;
        if now - pressed > window as f64 {
            self.pressed_at = None;
            return None;
        }
        Some(pressed)
    }

    pub fn clear(&mut self) {
        self.pressed_at = None;
    }
}

/// Tracks how long the jump button is held after take-off.
#[derive(Debug, Clone, Default)]
pub struct JumpHold {
    started_at: Option<f64>,
}

impl JumpHold {
    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    /// Close the hold when the button is released or the cap is reached.
    /// Returns the hold duration, capped at `max_hold`.
    pub fn finish(&mut self, now: f64, still_held: bool, max_hold: f32) -> Option<f32> {
        let started = self.started_at?;
        let held = (now - started) as f32;
        if still_held && held < max_hold {
            return None;
        }
        self.started_at = None;
        Some(held.min(max_hold))
    }

    pub fn cancel(&mut self) {
        self.started_at = None;
    }
}

/// Force earned by holding for `held` seconds on top of the minimum take-off force.
pub fn continuation_force(full_force: f32, min_fraction: f32, held: f32, max_hold: f32) -> f32 {
    if max_hold <= 0.0 {
        return 0.0;
    }
    let remainder = full_force * (1.0 - min_fraction).max(0.0);
    remainder * (held / max_hold).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_expires_after_window() {
        let mut b = JumpBuffer::default();
        b.press(1.0);
        assert_eq!(b.pending(1.1, 0.15), Some(1.0));
        assert_eq!(b.pending(1.2, 0.15), None);
        assert_eq!(b.pending(1.1, 0.15), None, "expired presses do not come back");
    }

    #[test]
    fn hold_finishes_on_release_or_cap() {
        let mut h = JumpHold::default();
        h.start(0.0);
        assert_eq!(h.finish(0.1, true, 0.2), None);
        assert_eq!(h.finish(0.1, false, 0.2), Some(0.1));
        assert!(!h.is_active());

        h.start(1.0);
        assert_eq!(h.finish(1.25, true, 0.2), Some(0.2));
    }

    #[test]
    fn full_hold_restores_full_force() {
        let min = 560.0 * 0.6;
        let extra = continuation_force(560.0, 0.6, 0.2, 0.2);
        assert!((min + extra - 560.0).abs() < 1e-3);
        assert!((continuation_force(560.0, 0.6, 0.1, 0.2) - 112.0).abs() < 1e-3);
        assert_eq!(continuation_force(560.0, 0.6, 0.1, 0.0), 0.0);
    }
}
