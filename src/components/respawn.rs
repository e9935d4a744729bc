use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnReason {
    Death,
    Checkpoint,
    OutOfBounds,
    /// Physics stayed inconsistent after repeated self-healing.
    Recovery,
}

/// Transient reset descriptor: built when a respawn triggers, consumed by
/// `PhysicsCoordinator::reset_physics_state`, then dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RespawnState {
    pub spawn_position: Vec2,
    pub spawn_velocity: Vec2,
    pub reset_physics_accumulation: bool,
    /// The position came from verified safe ground rather than a fallback point.
    pub is_safe_respawn: bool,
    pub reason: RespawnReason,
}

impl RespawnState {
    pub fn new(spawn_position: Vec2, reason: RespawnReason, is_safe_respawn: bool) -> Self {
        Self {
            spawn_position,
            spawn_velocity: Vec2::ZERO,
            reset_physics_accumulation: true,
            is_safe_respawn,
            reason,
        }
    }
}
