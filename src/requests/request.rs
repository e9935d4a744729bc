use std::collections::BTreeMap;

use glam::Vec2;

use crate::EntityId;

/// Constraint key: the jump is a variable-height continuation whose magnitude is
/// the extra force earned by holding the button.
pub const VARIABLE_HEIGHT: &str = "variable_height";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MovementKind {
    Walk,
    Jump,
    Dash,
    Stop,
}

impl MovementKind {
    /// Whether a request of this kind, followed by `next`, undoes itself: walk
    /// then stop (or back), or walks in opposite directions.
    pub fn cancels(self, direction: Vec2, next: MovementKind, next_direction: Vec2) -> bool {
        use MovementKind::*;
        match (self, next) {
            (Walk, Stop) | (Stop, Walk) => true,
            (Walk, Walk) => direction.dot(next_direction) < -0.5,
            _ => false,
        }
    }
}

/// Advisory urgency. Jumps and retries are marked `High` for logs and
/// diagnostics; the physics queue itself resolves strictly in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Who produced the request. Player requests get action-combination checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSource {
    #[default]
    Player,
    Scripted,
}

/// Why a request is a retry, and what the first attempt asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryContext {
    pub reason: String,
    pub original_magnitude: f32,
}

/// Typed description of intended motion. Never mutated once built:
/// a retry is a new request derived with [`MovementRequest::retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRequest {
    pub entity: EntityId,
    pub kind: MovementKind,
    /// Unit vector, or zero for `Stop`.
    pub direction: Vec2,
    /// Speed for walk, force for jump/dash.
    pub magnitude: f32,
    pub priority: Priority,
    pub source: RequestSource,
    /// Simulation time in seconds.
    pub timestamp: f64,
    pub previous_request_time: Option<f64>,
    pub previous_action: Option<MovementKind>,
    pub retry_count: u32,
    pub error_context: Option<RetryContext>,
    pub constraints: BTreeMap<String, f32>,
    pub is_combo_move: bool,
    /// Same direction held across consecutive requests.
    pub is_input_sequence: bool,
    pub input_sequence_count: u32,
    /// Respawn generation of the issuing controller.
    pub epoch: u32,
}

impl MovementRequest {
    fn new(entity: EntityId, kind: MovementKind, direction: Vec2, magnitude: f32, timestamp: f64) -> Self {
        Self {
            entity,
            kind,
            direction,
            magnitude,
            priority: Priority::Normal,
            source: RequestSource::Player,
            timestamp,
            previous_request_time: None,
            previous_action: None,
            retry_count: 0,
            error_context: None,
            constraints: BTreeMap::new(),
            is_combo_move: false,
            is_input_sequence: false,
            input_sequence_count: 0,
            epoch: 0,
        }
    }

    pub fn walk(entity: EntityId, direction: Vec2, speed: f32, timestamp: f64) -> Self {
        Self::new(entity, MovementKind::Walk, direction, speed, timestamp)
    }

    pub fn jump(entity: EntityId, force: f32, timestamp: f64) -> Self {
        Self::new(entity, MovementKind::Jump, Vec2::Y, force, timestamp).with_priority(Priority::High)
    }

    pub fn dash(entity: EntityId, direction: Vec2, force: f32, timestamp: f64) -> Self {
        Self::new(entity, MovementKind::Dash, direction, force, timestamp)
    }

    pub fn stop(entity: EntityId, timestamp: f64) -> Self {
        Self::new(entity, MovementKind::Stop, Vec2::ZERO, 0.0, timestamp)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: RequestSource) -> Self {
        self.source = source;
        self
    }

    /// Attach what the controller sent last.
    pub fn after(mut self, previous: Option<(MovementKind, f64)>) -> Self {
        if let Some((kind, time)) = previous {
            self.previous_action = Some(kind);
            self.previous_request_time = Some(time);
        }
        self
    }

    pub fn with_constraint(mut self, key: &str, value: f32) -> Self {
        self.constraints.insert(key.to_string(), value);
        self
    }

    pub fn as_combo(mut self) -> Self {
        self.is_combo_move = true;
        self
    }

    pub fn with_input_sequence(mut self, count: u32) -> Self {
        self.is_input_sequence = count > 1;
        self.input_sequence_count = count;
        self
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn constraint(&self, key: &str) -> Option<f32> {
        self.constraints.get(key).copied()
    }

    pub fn is_variable_height(&self) -> bool {
        self.kind == MovementKind::Jump && self.constraints.contains_key(VARIABLE_HEIGHT)
    }

    /// Seconds since the previous request, if there was one.
    pub fn interval(&self) -> Option<f64> {
        self.previous_request_time.map(|prev| self.timestamp - prev)
    }

    /// Issued within `threshold` seconds of the previous request.
    pub fn is_rapid_input(&self, threshold: f64) -> bool {
        self.interval().is_some_and(|dt| dt < threshold)
    }

    /// Build the next attempt after a failure: reduced magnitude, bumped retry
    /// count, and the first attempt's magnitude kept as context.
    pub fn retry(&self, magnitude: f32, reason: impl Into<String>, timestamp: f64) -> Self {
        let original_magnitude = self
            .error_context
            .as_ref()
            .map_or(self.magnitude, |c| c.original_magnitude);
        Self {
            magnitude,
            timestamp,
            previous_request_time: Some(self.timestamp),
            previous_action: Some(self.kind),
            retry_count: self.retry_count + 1,
            error_context: Some(RetryContext {
                reason: reason.into(),
                original_magnitude,
            }),
            priority: Priority::High,
            ..self.clone()
        }
    }
}
