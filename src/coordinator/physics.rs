use std::collections::VecDeque;

use glam::Vec2;
use hecs::{Entity, World};
use tracing::{debug, info, warn};

use super::{LegacyBody, MovementResponse, PendingResponse, PhysicsCoordinator, Responder};
use crate::components::{
    BodyDesc, BodyShape, GroundInfo, GroundTracker, LandingInfo, PhysicsComponent, PhysicsState,
    Platform, RespawnState, TriggerZone,
};
use crate::config::{GroundTuning, PhysicsTuning, Tuning};
use crate::error::{MovementFailure, PhysicsError};
use crate::systems::{accumulation_sweep, collision_system, ground_system, integration_system};
use crate::EntityId;

#[derive(Debug, Clone, Copy)]
enum Command {
    Move { direction: Vec2, speed: f32 },
    Jump { force: f32 },
    Stop,
    Impulse { impulse: Vec2 },
}

#[derive(Debug)]
struct Queued {
    entity: EntityId,
    command: Command,
    responder: Responder,
}

/// What one fixed step produced.
#[derive(Debug, Default)]
pub struct StepReport {
    pub resolved_requests: usize,
    pub contacts: usize,
    pub landings: Vec<(Entity, LandingInfo)>,
    pub repaired_bodies: usize,
}

/// Authoritative simulation: an entity registry of bodies and level geometry
/// plus the queue of movement commands waiting for the next step.
pub struct PhysicsWorld {
    world: World,
    physics: PhysicsTuning,
    ground: GroundTuning,
    queue: VecDeque<Queued>,
    enabled: bool,
    time: f64,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            world: World::new(),
            physics: tuning.physics,
            ground: tuning.ground,
            queue: VecDeque::new(),
            enabled: true,
            time: 0.0,
            steps: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn spawn_body(&mut self, desc: BodyDesc) -> EntityId {
        let entity = self.world.spawn((BodyShape { half_extents: desc.half_extents },));
        let body = PhysicsComponent::new(entity, &desc, self.physics);
        let tracker = GroundTracker::new(&self.ground);
        // The entity was spawned just above; insertion cannot fail.
        let _ = self.world.insert(entity, (body, tracker));
        debug!(?entity, position = %desc.position, "body spawned");
        entity
    }

    /// Remove a body. Its queued commands fail with `UnknownEntity` on the next step.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        self.world.despawn(entity).is_ok()
    }

    pub fn add_platform(&mut self, platform: Platform) -> Entity {
        self.world.spawn((platform,))
    }

    pub fn add_trigger(&mut self, zone: TriggerZone) -> Entity {
        self.world.spawn((zone,))
    }

    /// Simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn queued_requests(&self) -> usize {
        self.queue.len()
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Resolve queued commands, then integrate, collide, and refresh ground state.
    pub fn step(&mut self, dt: f32) -> StepReport {
        self.time += dt as f64;
        let mut report = StepReport::default();

        let queued: Vec<Queued> = self.queue.drain(..).collect();
        report.resolved_requests = queued.len();
        for q in queued {
            let response = self.apply(q.entity, q.command);
            q.responder.send(response);
        }

        integration_system(&mut self.world, dt, self.time);
        let collisions = collision_system(&mut self.world, self.ground.ground_normal_threshold, dt);
        ground_system(&mut self.world, self.ground.ground_normal_threshold, dt);

        self.steps += 1;
        let interval = self.physics.accumulation_check_interval.max(1) as u64;
        if self.steps % interval == 0 {
            report.repaired_bodies = accumulation_sweep(&mut self.world);
        }

        report.contacts = collisions.contacts.len();
        report.landings = collisions.landings;
        report
    }

    fn apply(&mut self, entity: EntityId, command: Command) -> MovementResponse {
        if !self.enabled {
            return MovementResponse::failure(entity, MovementFailure::CoordinatorDisabled, None);
        }
        let Ok((body, tracker)) = self
            .world
            .query_one_mut::<(&mut PhysicsComponent, &mut GroundTracker)>(entity)
        else {
            return MovementResponse::failure(entity, MovementFailure::UnknownEntity, None);
        };
        if body.state().is_static {
            return MovementResponse::failure(entity, MovementFailure::StaticEntity, Some(body.state()));
        }

        match command {
            Command::Move { direction, speed } => {
                if body.state().is_blocked_toward(direction) {
                    return MovementResponse::failure(entity, MovementFailure::Obstructed, Some(body.state()));
                }
                body.set_drive(direction, speed);
            }
            Command::Jump { force } => {
                if !tracker.is_grounded() {
                    return MovementResponse::failure(entity, MovementFailure::NotGrounded, Some(body.state()));
                }
                body.launch(force);
                tracker.consume_coyote();
                body.set_grounded(false);
            }
            Command::Stop => body.stop(),
            Command::Impulse { impulse } => {
                let repair = body.apply_impulse(impulse);
                if !repair.is_clean() {
                    debug!(?entity, ?repair, "impulse followed by accumulation repair");
                }
            }
        }
        MovementResponse::success(entity, Some(body.state()))
    }

    fn enqueue(&mut self, entity: EntityId, command: Command) -> PendingResponse {
        if !self.enabled {
            let state = self.physics_state(entity);
            return PendingResponse::ready(MovementResponse::failure(
                entity,
                MovementFailure::CoordinatorDisabled,
                state.as_ref(),
            ));
        }
        let (responder, pending) = PendingResponse::channel(entity);
        self.queue.push_back(Queued { entity, command, responder });
        pending
    }

    /// Run `op` on the body immediately and answer with its resulting state.
    fn immediate(
        &mut self,
        entity: EntityId,
        op: impl FnOnce(&mut PhysicsComponent, &mut GroundTracker) -> Result<(), MovementFailure>,
    ) -> PendingResponse {
        if !self.enabled {
            return PendingResponse::ready(MovementResponse::failure(
                entity,
                MovementFailure::CoordinatorDisabled,
                None,
            ));
        }
        let response = match self
            .world
            .query_one_mut::<(&mut PhysicsComponent, &mut GroundTracker)>(entity)
        {
            Ok((body, tracker)) => match op(body, tracker) {
                Ok(()) => MovementResponse::success(entity, Some(body.state())),
                Err(failure) => MovementResponse::failure(entity, failure, Some(body.state())),
            },
            Err(_) => MovementResponse::failure(entity, MovementFailure::UnknownEntity, None),
        };
        PendingResponse::ready(response)
    }

    /// Drop queued commands for `entity`; their callers see `Dropped`.
    fn purge_queue(&mut self, entity: EntityId) {
        let (purged, kept): (Vec<Queued>, Vec<Queued>) =
            self.queue.drain(..).partition(|q| q.entity == entity);
        self.queue = kept.into();
        for q in purged {
            q.responder
                .send(MovementResponse::failure(entity, MovementFailure::Dropped, None));
        }
    }
}

impl PhysicsCoordinator for PhysicsWorld {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "physics coordinator toggled");
        }
        self.enabled = enabled;
    }

    fn request_movement(&mut self, entity: EntityId, direction: Vec2, speed: f32) -> PendingResponse {
        self.enqueue(entity, Command::Move { direction, speed })
    }

    fn request_jump(&mut self, entity: EntityId, force: f32) -> PendingResponse {
        self.enqueue(entity, Command::Jump { force })
    }

    fn request_stop(&mut self, entity: EntityId) -> PendingResponse {
        self.enqueue(entity, Command::Stop)
    }

    fn request_impulse(&mut self, entity: EntityId, impulse: Vec2) -> PendingResponse {
        self.enqueue(entity, Command::Impulse { impulse })
    }

    fn is_grounded(&self, entity: EntityId) -> bool {
        self.world
            .get::<&GroundTracker>(entity)
            .map(|t| t.is_grounded())
            .unwrap_or(false)
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec2> {
        self.world
            .get::<&PhysicsComponent>(entity)
            .ok()
            .map(|b| b.state().velocity)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.world
            .get::<&PhysicsComponent>(entity)
            .ok()
            .map(|b| b.state().position)
    }

    fn physics_state(&self, entity: EntityId) -> Option<PhysicsState> {
        self.world
            .get::<&PhysicsComponent>(entity)
            .ok()
            .map(|b| b.physics_state())
    }

    fn ground_info(&self, entity: EntityId) -> Option<GroundInfo> {
        self.world.get::<&GroundTracker>(entity).ok().map(|t| t.info())
    }

    fn has_collision_below(&self, entity: EntityId) -> bool {
        self.world
            .get::<&GroundTracker>(entity)
            .map(|t| t.has_contact())
            .unwrap_or(false)
    }

    fn reset_physics_state(&mut self, entity: EntityId, respawn: &RespawnState) -> PendingResponse {
        if self.enabled {
            self.purge_queue(entity);
        }
        let respawn = *respawn;
        self.immediate(entity, move |body, ground| {
            LegacyBody { body, ground }.reset(&respawn);
            info!(?entity, reason = ?respawn.reason, position = %respawn.spawn_position, "physics state reset");
            Ok(())
        })
    }

    fn clear_accumulated_forces(&mut self, entity: EntityId) -> PendingResponse {
        self.immediate(entity, |body, _| {
            body.prevent_accumulation();
            Ok(())
        })
    }

    fn set_position_override(&mut self, entity: EntityId, position: Vec2) -> PendingResponse {
        self.immediate(entity, move |body, _| {
            if !position.is_finite() {
                return Err(PhysicsError::NonFinite { field: "position" }.into());
            }
            body.set_position_override(position);
            Ok(())
        })
    }

    fn validate_state_consistency(&mut self, entity: EntityId) -> PendingResponse {
        self.immediate(entity, move |body, _| {
            let errors = body.check_consistency();
            let Some(first) = errors.first().cloned() else {
                return Ok(());
            };
            body.heal();
            let remaining = body.check_consistency();
            if remaining.is_empty() {
                warn!(?entity, ?errors, "inconsistent physics state repaired");
            } else {
                warn!(?entity, ?remaining, "physics state still inconsistent after repair");
            }
            Err(MovementFailure::Physics(first))
        })
    }

    fn legacy_body(&mut self, entity: EntityId) -> Option<LegacyBody<'_>> {
        if self.enabled {
            return None;
        }
        self.world
            .query_one_mut::<(&mut PhysicsComponent, &mut GroundTracker)>(entity)
            .ok()
            .map(|(body, ground)| LegacyBody { body, ground })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Aabb, RespawnReason, Surface};
    use crate::config::FIXED_DT;
    use crate::coordinator::ResponseStatus;

    fn world_with_floor() -> PhysicsWorld {
        let mut w = PhysicsWorld::new(&Tuning::default());
        w.add_platform(Platform {
            bounds: Aabb::new(Vec2::new(0.0, -10.0), Vec2::new(1000.0, 10.0)),
            one_way: false,
            surface: Surface::Stone,
        });
        w
    }

    fn settle(w: &mut PhysicsWorld, ticks: usize) {
        for _ in 0..ticks {
            w.step(FIXED_DT);
        }
    }

    #[test]
    fn movement_resolves_on_next_step_only() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        settle(&mut w, 5);
        assert!(w.is_grounded(e));

        let mut pending = w.request_movement(e, Vec2::X, 300.0);
        assert!(pending.try_take().is_none());
        assert_eq!(w.queued_requests(), 1);

        w.step(FIXED_DT);
        let response = pending.try_take().unwrap();
        assert!(response.is_success());
        assert!(response.is_grounded);
        assert_eq!(w.velocity(e).unwrap().x, 300.0);
    }

    #[test]
    fn jump_is_blocked_in_the_air_and_consumes_coyote() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        settle(&mut w, 3);

        let mut jump = w.request_jump(e, 500.0);
        w.step(FIXED_DT);
        assert!(jump.try_take().unwrap().is_success());
        assert!(!w.is_grounded(e), "jump spends the coyote window");
        assert!(w.velocity(e).unwrap().y > 400.0);

        let mut again = w.request_jump(e, 500.0);
        w.step(FIXED_DT);
        let response = again.try_take().unwrap();
        assert_eq!(response.status, ResponseStatus::Blocked);
        assert_eq!(response.failure, Some(MovementFailure::NotGrounded));
    }

    #[test]
    fn walking_into_a_wall_is_blocked() {
        let mut w = world_with_floor();
        w.add_platform(Platform {
            bounds: Aabb::new(Vec2::new(40.0, 100.0), Vec2::new(10.0, 100.0)),
            one_way: false,
            surface: Surface::Stone,
        });
        let e = w.spawn_body(BodyDesc::at(Vec2::new(17.0, 24.0)));
        let _ = w.request_movement(e, Vec2::X, 300.0);
        settle(&mut w, 3);

        let mut pending = w.request_movement(e, Vec2::X, 300.0);
        w.step(FIXED_DT);
        assert_eq!(pending.try_take().unwrap().failure, Some(MovementFailure::Obstructed));

        let mut away = w.request_movement(e, Vec2::NEG_X, 300.0);
        w.step(FIXED_DT);
        assert!(away.try_take().unwrap().is_success());
    }

    #[test]
    fn reset_is_immediate_and_drops_queued_commands() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 500.0)));
        settle(&mut w, 10);
        let mut stale = w.request_movement(e, Vec2::X, 300.0);

        let respawn = RespawnState::new(Vec2::new(50.0, 24.0), RespawnReason::OutOfBounds, true);
        let mut reset = w.reset_physics_state(e, &respawn);
        let response = reset.try_take().unwrap();
        assert!(response.is_success());
        assert_eq!(response.actual_position, Vec2::new(50.0, 24.0));
        assert_eq!(response.actual_velocity, Vec2::ZERO);
        assert_eq!(stale.try_take().unwrap().failure, Some(MovementFailure::Dropped));
        assert_eq!(w.queued_requests(), 0);
    }

    #[test]
    fn despawned_entity_fails() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        let mut pending = w.request_stop(e);
        assert!(w.despawn(e));
        w.step(FIXED_DT);
        assert_eq!(pending.try_take().unwrap().failure, Some(MovementFailure::UnknownEntity));
        assert!(w.physics_state(e).is_none());
    }

    #[test]
    fn disabled_coordinator_grants_legacy_access_only() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        assert!(w.legacy_body(e).is_none());

        w.set_enabled(false);
        let mut pending = w.request_movement(e, Vec2::X, 100.0);
        assert_eq!(
            pending.try_take().unwrap().failure,
            Some(MovementFailure::CoordinatorDisabled)
        );
        w.legacy_body(e).unwrap().body.legacy_set_velocity(Vec2::new(-120.0, 0.0));
        w.step(FIXED_DT);
        assert!(w.velocity(e).unwrap().x < 0.0);
    }

    #[test]
    fn consistency_check_repairs_and_reports() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        settle(&mut w, 2);
        assert!(w.validate_state_consistency(e).try_take().unwrap().is_success());

        let mut s = w.physics_state(e).unwrap();
        s.velocity = Vec2::new(f32::NAN, 0.0);
        w.set_enabled(false);
        w.legacy_body(e).unwrap().body.update_physics_state(s);
        w.set_enabled(true);

        let response = w.validate_state_consistency(e).try_take().unwrap();
        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.reason.unwrap().contains("non-finite"));
        assert!(w.velocity(e).unwrap().is_finite());
        assert!(w.validate_state_consistency(e).try_take().unwrap().is_success());
    }

    #[test]
    fn legacy_jump_spends_coyote_grace() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 24.0)));
        settle(&mut w, 3);
        w.set_enabled(false);
        w.legacy_body(e).unwrap().jump(560.0);
        assert!(!w.is_grounded(e));
        w.step(FIXED_DT);
        assert!(!w.is_grounded(e));
        assert!(w.ground_info(e).unwrap().just_left_ground);
    }

    #[test]
    fn landing_edge_is_published_for_one_step() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 40.0)));
        let mut edges = 0;
        for _ in 0..30 {
            w.step(FIXED_DT);
            if w.ground_info(e).unwrap().just_landed {
                edges += 1;
                assert!(w.has_collision_below(e));
            }
        }
        assert_eq!(edges, 1);
    }

    #[test]
    fn resting_body_reports_collision_below() {
        let mut w = world_with_floor();
        let e = w.spawn_body(BodyDesc::at(Vec2::new(0.0, 60.0)));
        assert!(!w.has_collision_below(e));
        let mut landed = false;
        for _ in 0..60 {
            landed |= !w.step(FIXED_DT).landings.is_empty();
        }
        assert!(landed);
        assert!(w.has_collision_below(e));
        assert!(w.is_grounded(e));
        assert!((w.position(e).unwrap().y - 24.0).abs() < 1.0);
    }
}
