/// Fixed-step clock. Real frame time is accumulated and drained in whole
/// `step` increments so the simulation stays frame-rate independent.
#[derive(Debug, Clone)]
pub struct SimClock {
    step: f32,
    accumulator: f32,
    elapsed: f64,
    ticks: u64,
}

/// Cap on how much frame time a single `advance` may bank, so a long stall does
/// not turn into a burst of catch-up steps.
const MAX_FRAME_TIME: f32 = 0.25;

impl SimClock {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            elapsed: 0.0,
            ticks: 0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Bank `frame_dt` and return how many fixed steps are now due.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_TIME);
        let mut due = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            due += 1;
        }
        due
    }

    /// Record one fixed step and return the simulation time after it.
    pub fn tick(&mut self) -> f64 {
        self.ticks += 1;
        self.elapsed = self.ticks as f64 * self.step as f64;
        self.elapsed
    }

    /// Simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Fraction of a step left in the accumulator, for interpolating presentation.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_whole_steps_only() {
        let mut clock = SimClock::new(0.01);
        assert_eq!(clock.advance(0.025), 2);
        assert!((clock.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(clock.advance(0.006), 1);
    }

    #[test]
    fn long_stalls_are_capped() {
        let mut clock = SimClock::new(0.1);
        assert_eq!(clock.advance(10.0), 2);
    }

    #[test]
    fn time_is_ticks_times_step() {
        let mut clock = SimClock::new(0.5);
        clock.tick();
        assert_eq!(clock.tick(), 1.0);
        assert_eq!(clock.ticks(), 2);
    }
}
