//! Outbound signals for collaborators that never touch physics: animation
//! selection (a watch value) and discrete gameplay events (a broadcast stream).

use glam::Vec2;
use tokio::sync::{broadcast, watch};

use crate::components::{RespawnReason, Surface};
use crate::config::EVENT_BROADCAST_CAPACITY;
use crate::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Run,
    Jump,
    Fall,
    Landing,
    Attack,
    Damaged,
    Death,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovementEvent {
    Landed {
        entity: EntityId,
        /// Velocity at impact, before the contact cancelled it.
        velocity: Vec2,
        position: Vec2,
        normal: Vec2,
        surface: Option<Surface>,
    },
    Jumped {
        entity: EntityId,
        force: f32,
        position: Vec2,
        /// Taken during coyote grace rather than from solid ground.
        coyote: bool,
        buffered: bool,
    },
    Respawned {
        entity: EntityId,
        position: Vec2,
        reason: RespawnReason,
    },
}

/// Fan-out of [`MovementEvent`]s. Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MovementEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MovementEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: MovementEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest animation state of one entity.
#[derive(Debug)]
pub struct AnimationSignal {
    tx: watch::Sender<AnimationState>,
}

impl AnimationSignal {
    pub fn new() -> Self {
        Self { tx: watch::Sender::new(AnimationState::Idle) }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnimationState> {
        self.tx.subscribe()
    }

    /// Receivers are only woken when the state actually changes.
    pub fn set(&self, state: AnimationState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        })
    }
}

impl Default for AnimationSignal {
    fn default() -> Self {
        Self::new()
    }
}
