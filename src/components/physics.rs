use glam::Vec2;
use tracing::warn;

use super::level::{Surface, TriggerKind};
use crate::config::PhysicsTuning;
use crate::error::PhysicsError;
use crate::EntityId;

/// Below this approach speed a contact just cancels the normal component (no bounce).
const REST_VELOCITY_THRESHOLD: f32 = 50.0;

/// Contact recorded against one platform during the last step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContact {
    pub other: EntityId,
    /// Surface normal pointing out of the platform, toward the body.
    pub normal: Vec2,
    /// Correction applied to the body's position.
    pub separation: Vec2,
    pub surface: Surface,
}

/// Landing payload for animation/audio consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingInfo {
    pub platform: EntityId,
    pub normal: Vec2,
    pub separation: Vec2,
    /// Velocity just before the impact was resolved.
    pub velocity: Vec2,
    pub position: Vec2,
    pub surface: Surface,
}

/// Contact produced by the detection phase, resolved by [`PhysicsComponent::resolve_contact`].
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub body: EntityId,
    pub platform: EntityId,
    pub normal: Vec2,
    pub depth: f32,
    pub surface: Surface,
}

/// Immutable snapshot of one body. Obtained through `PhysicsComponent::physics_state`
/// or a coordinator query; writing it back requires `update_physics_state`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsState {
    pub entity: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub affected_by_gravity: bool,
    pub is_grounded: bool,
    pub was_grounded: bool,
    pub active_collisions: Vec<CollisionContact>,
    pub active_triggers: Vec<TriggerKind>,
    pub accumulated_forces: Vec2,
    pub contact_point_count: u32,
    pub update_count: u64,
    /// Simulation time (seconds) of the last integration.
    pub last_update_time: f64,
    pub last_landing: Option<LandingInfo>,
}

impl PhysicsState {
    /// Whether any active contact pushes the body sideways against `direction`.
    pub fn is_blocked_toward(&self, direction: Vec2) -> bool {
        self.active_collisions
            .iter()
            .any(|c| c.normal.y.abs() < 0.5 && c.normal.dot(direction) < -0.7)
    }
}

/// Spawn parameters for a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub position: Vec2,
    pub half_extents: Vec2,
    pub mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub affected_by_gravity: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            half_extents: Vec2::new(12.0, 24.0),
            mass: 1.0,
            gravity_scale: 1.0,
            friction: 1.0,
            restitution: 0.0,
            is_static: false,
            affected_by_gravity: true,
        }
    }
}

impl BodyDesc {
    pub fn at(position: Vec2) -> Self {
        Self { position, ..Self::default() }
    }
}

/// Outcome of an accumulation sweep.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Repair {
    /// Residual forces were present and zeroed.
    pub forces_cleared: bool,
    /// Anomalies found in position/velocity; the body was restored to its last valid values.
    pub anomalies: Vec<PhysicsError>,
}

impl Repair {
    pub fn is_clean(&self) -> bool {
        !self.forces_cleared && self.anomalies.is_empty()
    }
}

/// Per-entity physics store. The only writer of its [`PhysicsState`].
#[derive(Debug, Clone)]
pub struct PhysicsComponent {
    state: PhysicsState,
    tuning: PhysicsTuning,
    /// Walk target velocity installed by a movement request.
    drive: Option<Vec2>,
    /// Forces were added through `apply_force` and await the next integration.
    forces_pending: bool,
    last_valid_position: Vec2,
    last_valid_velocity: Vec2,
    ground_contact: bool,
    had_ground_contact: bool,
    ground_surface_friction: f32,
}

impl PhysicsComponent {
    pub fn new(entity: EntityId, desc: &BodyDesc, tuning: PhysicsTuning) -> Self {
        Self {
            state: PhysicsState {
                entity,
                position: desc.position,
                velocity: Vec2::ZERO,
                acceleration: Vec2::ZERO,
                mass: desc.mass,
                gravity_scale: desc.gravity_scale,
                friction: desc.friction,
                restitution: desc.restitution,
                is_static: desc.is_static,
                affected_by_gravity: desc.affected_by_gravity,
                is_grounded: false,
                was_grounded: false,
                active_collisions: Vec::new(),
                active_triggers: Vec::new(),
                accumulated_forces: Vec2::ZERO,
                contact_point_count: 0,
                update_count: 0,
                last_update_time: 0.0,
                last_landing: None,
            },
            tuning,
            drive: None,
            forces_pending: false,
            last_valid_position: desc.position,
            last_valid_velocity: Vec2::ZERO,
            ground_contact: false,
            had_ground_contact: false,
            ground_surface_friction: 1.0,
        }
    }

    pub fn state(&self) -> &PhysicsState {
        &self.state
    }

    /// Snapshot copy for publishing.
    pub fn physics_state(&self) -> PhysicsState {
        self.state.clone()
    }

    /// Authoritative overwrite. Forces carried in `state` are treated as residue,
    /// not as pending input.
    pub fn update_physics_state(&mut self, state: PhysicsState) {
        let entity = self.state.entity;
        self.state = state;
        self.state.entity = entity;
        self.forces_pending = false;
        if self.motion_anomalies().is_empty() {
            self.remember_valid();
        }
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    pub fn apply_force(&mut self, force: Vec2) {
        self.state.accumulated_forces += force;
        self.forces_pending = true;
    }

    /// Instant velocity change, followed by an accumulation sweep.
    pub fn apply_impulse(&mut self, impulse: Vec2) -> Repair {
        if !self.state.is_static && self.state.mass > 0.0 {
            self.state.velocity += impulse / self.state.mass;
        }
        self.prevent_accumulation()
    }

    /// Install a walk target. `direction` is a unit vector; only its x part drives
    /// gravity-bound bodies.
    pub fn set_drive(&mut self, direction: Vec2, speed: f32) {
        self.drive = Some(direction * speed);
    }

    /// Clear the walk target; a grounded body stops dead, an airborne one keeps its momentum.
    pub fn stop(&mut self) {
        self.drive = None;
        if self.state.is_grounded {
            self.state.velocity.x = 0.0;
        }
        if !self.state.affected_by_gravity {
            self.state.velocity.y = 0.0;
        }
    }

    /// Replace vertical velocity with the take-off speed for `force`.
    pub fn launch(&mut self, force: f32) {
        if self.state.mass > 0.0 {
            self.state.velocity.y = force / self.state.mass;
        }
    }

    pub fn set_position_override(&mut self, position: Vec2) {
        self.state.position = position;
        self.state.active_collisions.clear();
        if position.is_finite() {
            self.last_valid_position = position;
        }
    }

    /// Respawn-style reset: new position and velocity, drive cleared, optionally
    /// all accumulated forces dropped.
    pub fn reset(&mut self, position: Vec2, velocity: Vec2, clear_forces: bool) {
        self.state.position = position;
        self.state.velocity = velocity;
        self.state.acceleration = Vec2::ZERO;
        if clear_forces {
            self.state.accumulated_forces = Vec2::ZERO;
            self.forces_pending = false;
        }
        self.state.active_collisions.clear();
        self.state.active_triggers.clear();
        self.state.contact_point_count = 0;
        self.state.is_grounded = false;
        self.state.was_grounded = false;
        self.state.last_landing = None;
        self.drive = None;
        self.ground_contact = false;
        self.had_ground_contact = false;
        self.remember_valid();
    }

    /// Direct velocity write for legacy (coordinator-less) control.
    pub fn legacy_set_velocity(&mut self, velocity: Vec2) {
        self.state.velocity = velocity;
        self.drive = None;
    }

    /// Written by the ground tracker only.
    pub fn set_grounded(&mut self, grounded: bool) {
        self.state.was_grounded = self.state.is_grounded;
        self.state.is_grounded = grounded;
    }

    // -----------------------------------------------------------------------
    // Integration
    // -----------------------------------------------------------------------

    /// Semi-implicit Euler step: velocity first, then position with the new velocity.
    pub fn integrate(&mut self, dt: f32, now: f64) {
        if self.state.is_static {
            self.state.accumulated_forces = Vec2::ZERO;
            self.state.acceleration = Vec2::ZERO;
            self.forces_pending = false;
            return;
        }

        let mut accel = Vec2::ZERO;
        if self.state.affected_by_gravity {
            accel += self.tuning.gravity_vector() * self.state.gravity_scale;
        }
        if self.state.mass > 0.0 {
            accel += self.state.accumulated_forces / self.state.mass;
        }
        self.state.acceleration = accel;
        self.state.velocity += accel * dt;

        self.apply_drive_and_damping(dt);
        self.clamp_velocity();

        self.state.position += self.state.velocity * dt;

        self.state.accumulated_forces = Vec2::ZERO;
        self.forces_pending = false;
        self.state.update_count += 1;
        self.state.last_update_time = now;

        let anomalies = self.motion_anomalies();
        if anomalies.is_empty() {
            self.remember_valid();
        } else {
            warn!(entity = ?self.state.entity, ?anomalies, "integration produced invalid motion, restoring");
            self.restore_valid();
        }
    }

    fn apply_drive_and_damping(&mut self, dt: f32) {
        let grounded = self.state.is_grounded;
        let vx = self.state.velocity.x;
        match self.drive {
            Some(target) => {
                if grounded {
                    if vx * target.x > 0.0 && vx.abs() > target.x.abs() {
                        // Carried momentum (dash, knockback) bleeds off toward the target.
                        let decayed = vx * self.ground_retention();
                        self.state.velocity.x = if decayed.abs() < target.x.abs() { target.x } else { decayed };
                    } else {
                        self.state.velocity.x = target.x;
                    }
                } else {
                    let diff = target.x - vx;
                    let step = (self.tuning.air_acceleration * dt).min(diff.abs());
                    self.state.velocity.x += diff.signum() * step;
                }
                if !self.state.affected_by_gravity {
                    self.state.velocity.y = target.y;
                }
            }
            None => {
                let keep = if grounded { self.ground_retention() } else { self.tuning.air_resistance };
                self.state.velocity.x *= keep;
            }
        }
    }

    /// Per-tick horizontal speed retention on the ground, scaled by averaged friction.
    fn ground_retention(&self) -> f32 {
        let combined = (self.state.friction + self.ground_surface_friction) * 0.5;
        (1.0 - (1.0 - self.tuning.ground_friction) * combined).clamp(0.0, 1.0)
    }

    fn clamp_velocity(&mut self) {
        let v = &mut self.state.velocity;
        let tv = self.tuning.terminal_velocity;
        v.y = v.y.clamp(-tv, tv);
        let max_x = self.tuning.max_horizontal_speed;
        if v.x.abs() > max_x {
            v.x = max_x.copysign(v.x);
        }
    }

    // -----------------------------------------------------------------------
    // Collision
    // -----------------------------------------------------------------------

    /// Start a new contact pass; previous contacts are dropped.
    pub fn begin_contacts(&mut self) {
        self.had_ground_contact = self.ground_contact;
        self.ground_contact = false;
        self.state.active_collisions.clear();
        self.state.active_triggers.clear();
        self.state.contact_point_count = 0;
    }

    /// Push the body out along the contact normal and cancel the approaching velocity.
    /// Returns the landing payload when this is the first ground contact after being airborne.
    pub fn resolve_contact(&mut self, contact: &Contact, ground_threshold: f32) -> Option<LandingInfo> {
        let n = contact.normal;
        let separation = n * contact.depth;
        let impact_velocity = self.state.velocity;

        self.state.position += separation;
        let vn = impact_velocity.dot(n);
        if vn < 0.0 {
            let bounce = if -vn < REST_VELOCITY_THRESHOLD { 0.0 } else { self.state.restitution };
            self.state.velocity -= n * vn * (1.0 + bounce);
        }

        self.state.active_collisions.push(CollisionContact {
            other: contact.platform,
            normal: n,
            separation,
            surface: contact.surface,
        });
        self.state.contact_point_count += 1;

        if n.y < ground_threshold {
            return None;
        }
        self.ground_surface_friction = contact.surface.friction();
        let first_this_step = !self.ground_contact;
        self.ground_contact = true;
        if !(first_this_step && !self.had_ground_contact) {
            return None;
        }
        let landing = LandingInfo {
            platform: contact.platform,
            normal: n,
            separation,
            velocity: impact_velocity,
            position: self.state.position,
            surface: contact.surface,
        };
        self.state.last_landing = Some(landing);
        Some(landing)
    }

    pub fn record_trigger(&mut self, kind: TriggerKind) {
        self.state.active_triggers.push(kind);
    }

    /// Ground contact made during the current (or last finished) contact pass.
    pub fn has_ground_contact(&self) -> bool {
        self.ground_contact
    }

    // -----------------------------------------------------------------------
    // Anomaly handling
    // -----------------------------------------------------------------------

    /// Clear residual forces and restore last-valid motion if anything non-finite
    /// or extreme crept in.
    pub fn prevent_accumulation(&mut self) -> Repair {
        let mut repair = Repair::default();
        if self.state.accumulated_forces != Vec2::ZERO {
            self.state.accumulated_forces = Vec2::ZERO;
            self.forces_pending = false;
            repair.forces_cleared = true;
        }
        repair.anomalies = self.motion_anomalies();
        if !repair.anomalies.is_empty() {
            warn!(entity = ?self.state.entity, anomalies = ?repair.anomalies, "restoring last valid motion");
            self.restore_valid();
        }
        repair
    }

    /// Everything currently wrong with the body, without touching it.
    pub fn check_consistency(&self) -> Vec<PhysicsError> {
        let mut errors = self.motion_anomalies();
        if !self.forces_pending && self.state.accumulated_forces != Vec2::ZERO {
            errors.push(PhysicsError::Accumulation {
                residue: self.state.accumulated_forces.length(),
            });
        }
        if !self.state.is_static && !(self.state.mass > 0.0 && self.state.mass.is_finite()) {
            errors.push(PhysicsError::InvalidMass(self.state.mass));
        }
        errors
    }

    /// Repair what `check_consistency` reports. Mass falls back to 1.0.
    pub fn heal(&mut self) -> Repair {
        if !self.state.is_static && !(self.state.mass > 0.0 && self.state.mass.is_finite()) {
            self.state.mass = 1.0;
        }
        self.prevent_accumulation()
    }

    fn motion_anomalies(&self) -> Vec<PhysicsError> {
        let mut errors = Vec::new();
        let limit = self.tuning.extreme_magnitude;
        for (field, v) in [("position", self.state.position), ("velocity", self.state.velocity)] {
            if !v.is_finite() {
                errors.push(PhysicsError::NonFinite { field });
            } else if v.length() > limit {
                errors.push(PhysicsError::ExtremeMagnitude { field, magnitude: v.length() });
            }
        }
        errors
    }

    fn remember_valid(&mut self) {
        self.last_valid_position = self.state.position;
        self.last_valid_velocity = self.state.velocity;
    }

    fn restore_valid(&mut self) {
        self.state.position = self.last_valid_position;
        self.state.velocity = self.last_valid_velocity;
        self.state.acceleration = Vec2::ZERO;
        self.state.accumulated_forces = Vec2::ZERO;
        self.forces_pending = false;
    }
}
