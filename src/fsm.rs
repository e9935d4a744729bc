use std::mem::discriminant;

/// Finite-state-machine container polled once per tick.
///
/// `S` is usually an enum whose variants may carry timers. The machine only
/// records where it is, where it came from, and for how long; the rules that
/// pick the next state live with the state type (see `MotionState::next`).
#[derive(Debug, Clone)]
pub struct StateMachine<S: Clone> {
    current: S,
    previous: S,
    time_in_state: f32,
    entered: bool,
}

impl<S: Clone> StateMachine<S> {
    /// `entered()` reports `true` until the first `tick`.
    pub fn new(initial: S) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
            time_in_state: 0.0,
            entered: true,
        }
    }

    pub fn state(&self) -> &S {
        &self.current
    }

    pub fn previous(&self) -> &S {
        &self.previous
    }

    /// Seconds since the last transition.
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    /// Move to `next` when it is a different variant. Returns whether a
    /// transition happened; same-variant requests are ignored.
    pub fn transition(&mut self, next: S) -> bool {
        if discriminant(&self.current) == discriminant(&next) {
            return false;
        }
        self.force(next);
        true
    }

    /// Always transition, even into the same variant (restarting its timers).
    pub fn force(&mut self, next: S) {
        self.previous = std::mem::replace(&mut self.current, next);
        self.time_in_state = 0.0;
        self.entered = true;
    }

    /// Advance the in-state timer and clear the entry flag.
    pub fn tick(&mut self, dt: f32) {
        self.time_in_state += dt;
        self.entered = false;
    }

    /// `true` between a transition and the next `tick`.
    pub fn entered(&self) -> bool {
        self.entered
    }
}
