use glam::Vec2;

use crate::components::{RespawnReason, RespawnState, TriggerKind};

/// Last position held with continuous ground contact for at least `dwell` seconds.
#[derive(Debug, Clone)]
pub struct SafeGround {
    dwell: f32,
    contact_since: Option<f64>,
    safe: Option<Vec2>,
}

impl SafeGround {
    pub fn new(dwell: f32) -> Self {
        Self { dwell, contact_since: None, safe: None }
    }

    pub fn update(&mut self, now: f64, position: Vec2, contact: bool) {
        if !contact {
            self.contact_since = None;
            return;
        }
        let since = *self.contact_since.get_or_insert(now);
        if now - since >= self.dwell as f64 - 1e-9 {
            self.safe = Some(position);
        }
    }

    /// Restart the dwell timer without forgetting the recorded point.
    pub fn interrupt(&mut self) {
        self.contact_since = None;
    }

    pub fn position(&self) -> Option<Vec2> {
        self.safe
    }
}

/// Where a respawn lands when no safe ground has been recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fallback {
    pub position: Vec2,
    /// Came from a checkpoint zone rather than the initial spawn.
    pub checkpoint: bool,
}

/// Why the body has to be reset this tick, judged from its latest snapshot.
pub fn respawn_trigger(position: Vec2, triggers: &[TriggerKind], fall_threshold: f32) -> Option<RespawnReason> {
    if triggers.iter().any(|t| matches!(t, TriggerKind::Hazard)) {
        return Some(RespawnReason::Death);
    }
    if position.y < fall_threshold {
        return Some(RespawnReason::OutOfBounds);
    }
    None
}

/// Build the reset descriptor: safe ground first, then the fallback point.
pub fn plan_respawn(reason: RespawnReason, safe: Option<Vec2>, fallback: Fallback) -> RespawnState {
    match safe {
        Some(position) => RespawnState::new(position, reason, true),
        None if fallback.checkpoint => {
            RespawnState::new(fallback.position, RespawnReason::Checkpoint, false)
        }
        None => RespawnState::new(fallback.position, reason, false),
    }
}

/// Counts consecutive failed consistency checks.
#[derive(Debug, Clone)]
pub struct ConsistencyMonitor {
    interval: u32,
    escalation: u32,
    ticks: u32,
    failures: u32,
}

impl ConsistencyMonitor {
    pub fn new(interval: u32, escalation: u32) -> Self {
        Self { interval: interval.max(1), escalation: escalation.max(1), ticks: 0, failures: 0 }
    }

    /// Advance one tick; `true` when a check is due.
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.interval {
            self.ticks = 0;
            return true;
        }
        false
    }

    /// Record a check result. Returns `true` when failures warrant a forced respawn.
    pub fn record(&mut self, consistent: bool) -> bool {
        if consistent {
            self.failures = 0;
            return false;
        }
        self.failures += 1;
        if self.failures >= self.escalation {
            self.failures = 0;
            return true;
        }
        false
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
        self.failures = 0;
    }
}
