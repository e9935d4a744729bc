//! Per-entity platformer controller.
//!
//! Each tick the controller reads the physics snapshot published by the last
//! step, reconciles responses to earlier requests, and issues new requests for
//! the next step. It never writes physics state itself except through the
//! legacy handle while the coordinator is disabled.

mod jump;
mod respawn;
mod retry;
mod state;

use glam::Vec2;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::components::{PhysicsState, RespawnReason, RespawnState, TriggerKind};
use crate::config::{ControllerTuning, Tuning};
use crate::coordinator::{MovementCoordinator, PendingResponse, PhysicsCoordinator};
use crate::engine::{Action, InputState};
use crate::error::{MovementFailure, ValidationError};
use crate::events::{AnimationSignal, AnimationState, EventBus, MovementEvent};
use crate::fsm::StateMachine;
use crate::requests::{MovementKind, MovementRequest, VARIABLE_HEIGHT};
use crate::EntityId;

pub use jump::{continuation_force, JumpBuffer, JumpHold};
pub use respawn::{plan_respawn, respawn_trigger, ConsistencyMonitor, Fallback, SafeGround};
pub use retry::{RetryDecision, RetryPolicy};
pub use state::{MotionCtx, MotionState};

#[derive(Debug, Clone, Copy)]
struct JumpMeta {
    coyote: bool,
    buffered: bool,
    force: f32,
}

/// A response the controller is still waiting on.
#[derive(Debug)]
struct Outstanding {
    pending: PendingResponse,
    epoch: u32,
    /// Emergency fallbacks are never retried.
    emergency: bool,
    jump: Option<JumpMeta>,
}

pub struct Controller {
    entity: EntityId,
    tuning: ControllerTuning,
    input: InputState,
    fsm: StateMachine<MotionState>,
    outstanding: Vec<Outstanding>,
    /// Respawn generation; responses issued under an older epoch are stale.
    epoch: u32,
    last_sent: Option<(MovementKind, f64)>,
    /// Horizontal direction last sent to physics: -1, 0 or 1.
    sent_direction: f32,
    sequence_count: u32,
    facing: f32,
    jump_buffer: JumpBuffer,
    jump_hold: JumpHold,
    dash_cooldown: f32,
    safe_ground: SafeGround,
    fallback: Fallback,
    retry: RetryPolicy,
    consistency: ConsistencyMonitor,
    animation: AnimationSignal,
    events: EventBus,
}

impl Controller {
    pub fn new(entity: EntityId, tuning: &Tuning, spawn: Vec2, events: EventBus) -> Self {
        let t = tuning.controller;
        Self {
            entity,
            tuning: t,
            input: InputState::new(),
            fsm: StateMachine::new(MotionState::Idle),
            outstanding: Vec::new(),
            epoch: 0,
            last_sent: None,
            sent_direction: 0.0,
            sequence_count: 0,
            facing: 1.0,
            jump_buffer: JumpBuffer::default(),
            jump_hold: JumpHold::default(),
            dash_cooldown: 0.0,
            safe_ground: SafeGround::new(t.safe_ground_dwell),
            fallback: Fallback { position: spawn, checkpoint: false },
            retry: RetryPolicy::from_tuning(&t),
            consistency: ConsistencyMonitor::new(t.consistency_check_interval, t.consistency_escalation),
            animation: AnimationSignal::new(),
            events,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> MotionState {
        *self.fsm.state()
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Input for the next `update`. Press/release edges are consumed by it.
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn animation(&self) -> watch::Receiver<AnimationState> {
        self.animation.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn safe_position(&self) -> Option<Vec2> {
        self.safe_ground.position()
    }

    pub fn outstanding_responses(&self) -> usize {
        self.outstanding.len()
    }

    /// Run one controller tick at simulation time `now`.
    pub fn update(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
        now: f64,
        dt: f32,
    ) {
        self.fsm.tick(dt);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);

        self.poll_responses(physics, movement, now);

        let Some(snapshot) = physics.physics_state(self.entity) else {
            debug!(entity = ?self.entity, "controller has no body");
            self.input.begin_tick();
            return;
        };
        let ground = physics.ground_info(self.entity).unwrap_or_default();
        let grounded = ground.is_grounded;
        let contact = physics.has_collision_below(self.entity);

        self.track_checkpoints(&snapshot.active_triggers);
        if let Some(reason) =
            respawn_trigger(snapshot.position, &snapshot.active_triggers, self.tuning.fall_threshold)
        {
            self.respawn(physics, movement, reason);
            self.input.begin_tick();
            return;
        }

        let hazard_free = !snapshot.active_triggers.iter().any(|t| matches!(t, TriggerKind::Hazard));
        self.safe_ground.update(now, snapshot.position, contact && hazard_free);

        if ground.just_landed {
            self.publish_landing(&snapshot);
        }

        if physics.is_enabled() {
            self.drive(physics, movement, &snapshot, grounded, contact, now);
        } else {
            self.drive_legacy(physics, grounded);
        }

        let ctx = MotionCtx {
            grounded,
            contact,
            velocity: snapshot.velocity,
            moving: self.input.horizontal() != 0.0,
            time_in_state: self.fsm.time_in_state(),
            landing_duration: self.tuning.landing_duration,
            dash_duration: self.tuning.dash_duration,
        };
        // A jump or dash issued this tick has not been simulated yet.
        if !self.fsm.entered() {
            if let Some(next) = self.fsm.state().next(&ctx) {
                self.fsm.transition(next);
            }
        }
        if self.fsm.entered() {
            debug!(entity = ?self.entity, from = ?self.fsm.previous(), to = ?self.fsm.state(), "motion state");
        }
        self.animation.set(self.fsm.state().animation());

        if self.consistency.tick() {
            self.check_consistency(physics, movement);
        }

        self.input.begin_tick();
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    fn drive(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
        snapshot: &PhysicsState,
        grounded: bool,
        contact: bool,
        now: f64,
    ) {
        if self.input.just_pressed(Action::Jump) {
            self.jump_buffer.press(now);
        }
        if let Some(pressed_at) = self.jump_buffer.pending(now, self.tuning.jump_buffer_time) {
            if grounded && self.fsm.state().can_jump() {
                let meta = JumpMeta {
                    coyote: !contact,
                    buffered: pressed_at < now,
                    force: self.tuning.jump_force * self.tuning.min_jump_fraction,
                };
                let request = MovementRequest::jump(self.entity, meta.force, now);
                if self.send(physics, movement, request, Some(meta)) {
                    self.jump_buffer.clear();
                    if self.input.is_held(Action::Jump) {
                        self.jump_hold.start(now);
                    }
                    self.fsm.transition(MotionState::Jumping);
                }
            }
        }

        if self.jump_hold.is_active() && !self.input.just_pressed(Action::Jump) {
            let held = self.input.is_held(Action::Jump);
            if let Some(hold) = self.jump_hold.finish(now, held, self.tuning.max_jump_hold) {
                let extra = continuation_force(
                    self.tuning.jump_force,
                    self.tuning.min_jump_fraction,
                    hold,
                    self.tuning.max_jump_hold,
                );
                if extra > 0.0 && snapshot.velocity.y > 0.0 {
                    let request = MovementRequest::jump(self.entity, extra, now)
                        .with_constraint(VARIABLE_HEIGHT, hold)
                        .as_combo();
                    self.send(physics, movement, request, None);
                }
            }
        }

        let x = self.input.horizontal();
        if x != 0.0 {
            self.facing = x;
        }

        if self.input.just_pressed(Action::Dash)
            && self.dash_cooldown <= 0.0
            && *self.fsm.state() != MotionState::Dashing
        {
            let direction = Vec2::new(self.facing, 0.0);
            let request = MovementRequest::dash(self.entity, direction, self.tuning.dash_impulse, now);
            if self.send(physics, movement, request, None) {
                self.dash_cooldown = self.tuning.dash_cooldown;
                self.jump_hold.cancel();
                self.fsm.force(MotionState::Dashing);
            }
        }

        if x != self.sent_direction {
            let request = if x == 0.0 {
                self.sequence_count = 0;
                MovementRequest::stop(self.entity, now)
            } else {
                self.sequence_count = if x == self.sent_direction { self.sequence_count + 1 } else { 1 };
                MovementRequest::walk(self.entity, Vec2::new(x, 0.0), self.tuning.walk_speed, now)
                    .with_input_sequence(self.sequence_count)
            };
            // On rejection `sent_direction` is left alone so the change is retried next tick.
            if self.send(physics, movement, request, None) {
                self.sent_direction = x;
            }
        }
    }

    /// Validate and submit; returns whether the request was accepted.
    fn send(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
        request: MovementRequest,
        jump: Option<JumpMeta>,
    ) -> bool {
        let request = request.after(self.last_sent).with_epoch(self.epoch);
        let kind = request.kind;
        let timestamp = request.timestamp;
        match movement.submit(physics, request) {
            Ok(pending) => {
                self.last_sent = Some((kind, timestamp));
                self.outstanding.push(Outstanding {
                    pending,
                    epoch: self.epoch,
                    emergency: false,
                    jump,
                });
                true
            }
            Err(error) => {
                self.log_rejection(kind, &error);
                false
            }
        }
    }

    fn log_rejection(&self, kind: MovementKind, error: &ValidationError) {
        debug!(entity = ?self.entity, ?kind, %error, "request rejected by validation");
    }

    /// Direct velocity writes while the coordinator is disabled.
    fn drive_legacy(&mut self, physics: &mut dyn PhysicsCoordinator, grounded: bool) {
        let x = self.input.horizontal();
        let jump = self.input.just_pressed(Action::Jump) && grounded && self.fsm.state().can_jump();
        let Some(mut legacy) = physics.legacy_body(self.entity) else {
            return;
        };
        let mut velocity = legacy.body.state().velocity;
        if grounded || x != 0.0 {
            velocity.x = x * self.tuning.walk_speed;
        }
        legacy.body.legacy_set_velocity(velocity);
        if jump {
            legacy.jump(self.tuning.jump_force);
            self.fsm.transition(MotionState::Jumping);
        }
        // Request state describes the other mode; a later switch starts clean.
        self.sent_direction = 0.0;
        self.jump_buffer.clear();
        self.jump_hold.cancel();
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    fn poll_responses(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
        now: f64,
    ) {
        let mut ready = Vec::new();
        self.outstanding.retain_mut(|o| match o.pending.try_take() {
            Some(response) => {
                ready.push((response, o.epoch, o.emergency, o.jump));
                false
            }
            None => true,
        });

        for (response, epoch, emergency, jump) in ready {
            if epoch != self.epoch || response.entity != self.entity {
                debug!(entity = ?self.entity, epoch, current = self.epoch, "stale response discarded");
                continue;
            }
            if response.is_success() {
                if let Some(meta) = jump {
                    self.events.publish(MovementEvent::Jumped {
                        entity: self.entity,
                        force: meta.force,
                        position: response.actual_position,
                        coyote: meta.coyote,
                        buffered: meta.buffered,
                    });
                }
                continue;
            }

            warn!(
                entity = ?self.entity,
                status = ?response.status,
                reason = response.reason.as_deref().unwrap_or("unknown"),
                retry = response.request.as_ref().map_or(0, |r| r.retry_count),
                emergency,
                "movement request failed"
            );
            if emergency {
                continue;
            }
            if let Some(request) = &response.request {
                if !self.still_wanted(request) {
                    debug!(entity = ?self.entity, kind = ?request.kind, "failed request superseded, not retrying");
                    continue;
                }
            }
            match self.retry.decide(&response, now) {
                RetryDecision::Retry(request) => {
                    let kind = request.kind;
                    match movement.submit(physics, request) {
                        Ok(pending) => {
                            self.last_sent = Some((kind, now));
                            self.outstanding.push(Outstanding {
                                pending,
                                epoch: self.epoch,
                                emergency: false,
                                jump: None,
                            });
                        }
                        Err(error) => self.log_rejection(kind, &error),
                    }
                }
                RetryDecision::Emergency { direction, speed } => {
                    warn!(entity = ?self.entity, %direction, speed, "retries exhausted, emergency movement");
                    let pending = physics.request_movement(self.entity, direction, speed);
                    self.outstanding.push(Outstanding {
                        pending,
                        epoch: self.epoch,
                        emergency: true,
                        jump: None,
                    });
                }
                RetryDecision::GiveUp => {}
            }
        }
    }

    /// A failed walk or stop only matters while the input still asks for it.
    fn still_wanted(&self, request: &MovementRequest) -> bool {
        match request.kind {
            MovementKind::Walk => request.direction.x.signum() == self.sent_direction,
            MovementKind::Stop => self.sent_direction == 0.0,
            MovementKind::Jump | MovementKind::Dash => true,
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn publish_landing(&self, snapshot: &PhysicsState) {
        let event = match snapshot.last_landing {
            Some(landing) => MovementEvent::Landed {
                entity: self.entity,
                velocity: landing.velocity,
                position: landing.position,
                normal: landing.normal,
                surface: Some(landing.surface),
            },
            None => MovementEvent::Landed {
                entity: self.entity,
                velocity: snapshot.velocity,
                position: snapshot.position,
                normal: Vec2::Y,
                surface: None,
            },
        };
        debug!(entity = ?self.entity, position = %snapshot.position, "landed");
        self.events.publish(event);
    }

    // -----------------------------------------------------------------------
    // Respawn and recovery
    // -----------------------------------------------------------------------

    fn track_checkpoints(&mut self, triggers: &[TriggerKind]) {
        for trigger in triggers {
            if let TriggerKind::Checkpoint { spawn } = trigger {
                if self.fallback.position != *spawn || !self.fallback.checkpoint {
                    info!(entity = ?self.entity, %spawn, "checkpoint reached");
                    self.fallback = Fallback { position: *spawn, checkpoint: true };
                }
            }
        }
    }

    fn check_consistency(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
    ) {
        let Some(response) = physics.validate_state_consistency(self.entity).try_take() else {
            return;
        };
        let consistent = !matches!(response.failure, Some(MovementFailure::Physics(_)));
        if self.consistency.record(consistent) {
            warn!(entity = ?self.entity, "physics state persistently inconsistent, forcing respawn");
            self.respawn(physics, movement, RespawnReason::Recovery);
        }
    }

    /// Reset the body to the last safe ground (or the fallback point) and drop
    /// everything tied to the previous life.
    pub fn respawn(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        movement: &mut dyn MovementCoordinator,
        reason: RespawnReason,
    ) {
        let respawn = plan_respawn(reason, self.safe_ground.position(), self.fallback);
        self.epoch += 1;

        if physics.is_enabled() {
            let mut reset = physics.reset_physics_state(self.entity, &respawn);
            if let Some(response) = reset.try_take() {
                if !response.is_success() {
                    warn!(entity = ?self.entity, reason = ?response.reason, "physics reset failed");
                }
            }
            let _ = physics.clear_accumulated_forces(self.entity);
        } else {
            self.reset_legacy(physics, &respawn);
        }
        movement.clear_entity_history(self.entity);

        self.outstanding.clear();
        self.input.clear();
        self.jump_buffer.clear();
        self.jump_hold.cancel();
        self.last_sent = None;
        self.sent_direction = 0.0;
        self.sequence_count = 0;
        self.dash_cooldown = 0.0;
        self.safe_ground.interrupt();
        self.consistency.reset();
        self.fsm.force(MotionState::Idle);
        self.animation.set(if reason == RespawnReason::Death {
            AnimationState::Death
        } else {
            AnimationState::Idle
        });

        info!(
            entity = ?self.entity,
            reason = ?respawn.reason,
            position = %respawn.spawn_position,
            safe = respawn.is_safe_respawn,
            epoch = self.epoch,
            "respawned"
        );
        self.events.publish(MovementEvent::Respawned {
            entity: self.entity,
            position: respawn.spawn_position,
            reason: respawn.reason,
        });
    }

    fn reset_legacy(&mut self, physics: &mut dyn PhysicsCoordinator, respawn: &RespawnState) {
        match physics.legacy_body(self.entity) {
            Some(mut legacy) => legacy.reset(respawn),
            None => warn!(entity = ?self.entity, "no body to reset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Aabb, BodyDesc, Platform, Surface};
    use crate::config::FIXED_DT;
    use crate::coordinator::{PhysicsWorld, RequestCoordinator};
    use tokio::sync::broadcast;

    struct Rig {
        world: PhysicsWorld,
        movement: RequestCoordinator,
        controller: Controller,
        now: f64,
    }

    impl Rig {
        fn new() -> Self {
            let tuning = Tuning::default();
            let mut world = PhysicsWorld::new(&tuning);
            world.add_platform(Platform {
                bounds: Aabb::new(Vec2::new(0.0, -10.0), Vec2::new(2000.0, 10.0)),
                one_way: false,
                surface: Surface::Grass,
            });
            let spawn = Vec2::new(0.0, 24.0);
            let e = world.spawn_body(BodyDesc::at(spawn));
            Self {
                world,
                movement: RequestCoordinator::new(tuning.validation),
                controller: Controller::new(e, &tuning, spawn, EventBus::new()),
                now: 0.0,
            }
        }

        fn tick(&mut self) {
            self.now += FIXED_DT as f64;
            self.controller
                .update(&mut self.world, &mut self.movement, self.now, FIXED_DT);
            self.world.step(FIXED_DT);
        }

        fn run(&mut self, ticks: usize) {
            for _ in 0..ticks {
                self.tick();
            }
        }

        fn velocity(&self) -> Vec2 {
            self.world.velocity(self.controller.entity()).unwrap()
        }

        /// Write a NaN velocity through the legacy handle, leaving the coordinator enabled.
        fn corrupt_velocity(&mut self) {
            let e = self.controller.entity();
            self.world.set_enabled(false);
            self.world
                .legacy_body(e)
                .unwrap()
                .body
                .legacy_set_velocity(Vec2::new(f32::NAN, 0.0));
            self.world.set_enabled(true);
        }
    }

    fn drain(rx: &mut broadcast::Receiver<MovementEvent>) -> Vec<MovementEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn landings(rx: &mut broadcast::Receiver<MovementEvent>) -> usize {
        drain(rx)
            .iter()
            .filter(|e| matches!(e, MovementEvent::Landed { .. }))
            .count()
    }

    #[test]
    fn walking_reaches_walk_speed_and_state() {
        let mut rig = Rig::new();
        rig.run(5);
        rig.controller.input_mut().press(Action::MoveRight);
        rig.run(3);
        assert_eq!(rig.velocity().x, 300.0);
        assert_eq!(rig.controller.state(), MotionState::Walking);
        assert_eq!(*rig.controller.animation().borrow(), AnimationState::Run);

        rig.controller.input_mut().release(Action::MoveRight);
        rig.run(2);
        assert_eq!(rig.velocity().x, 0.0);
        assert_eq!(rig.controller.state(), MotionState::Idle);
    }

    #[test]
    fn short_hop_is_lower_than_held_jump() {
        let apex = |hold_ticks: usize| {
            let mut rig = Rig::new();
            rig.run(5);
            rig.controller.input_mut().press(Action::Jump);
            rig.run(hold_ticks);
            rig.controller.input_mut().release(Action::Jump);
            let mut best = f32::MIN;
            for _ in 0..60 {
                rig.tick();
                best = best.max(rig.world.position(rig.controller.entity()).unwrap().y);
            }
            best
        };
        let short = apex(1);
        let long = apex(20);
        assert!(long > short + 10.0, "short {short}, long {long}");
    }

    #[test]
    fn stale_responses_after_respawn_are_ignored() {
        let mut rig = Rig::new();
        rig.run(5);
        rig.controller.input_mut().press(Action::MoveRight);
        rig.now += FIXED_DT as f64;
        rig.controller
            .update(&mut rig.world, &mut rig.movement, rig.now, FIXED_DT);
        assert_eq!(rig.controller.outstanding_responses(), 1);

        rig.controller
            .respawn(&mut rig.world, &mut rig.movement, RespawnReason::Death);
        assert_eq!(rig.controller.epoch(), 1);
        assert_eq!(rig.controller.outstanding_responses(), 0);
        assert!(!rig.controller.input().is_held(Action::MoveRight));
        rig.run(3);
        assert_eq!(rig.velocity().x, 0.0);
    }

    #[test]
    fn dash_bursts_then_settles_to_walk_speed() {
        let mut rig = Rig::new();
        rig.run(5);
        rig.controller.input_mut().press(Action::MoveRight);
        rig.run(2);
        rig.controller.input_mut().press(Action::Dash);
        rig.run(2);
        assert_eq!(rig.controller.state(), MotionState::Dashing);
        assert!(rig.velocity().x > 300.0);
        rig.run(60);
        assert_eq!(rig.velocity().x, 300.0);
        assert_eq!(rig.controller.state(), MotionState::Walking);
    }

    #[test]
    fn legacy_mode_writes_velocity_directly() {
        let mut rig = Rig::new();
        rig.run(5);
        rig.world.set_enabled(false);
        rig.controller.input_mut().press(Action::MoveLeft);
        rig.run(2);
        assert!(rig.velocity().x < 0.0);
        assert_eq!(rig.movement.stats(rig.controller.entity()).total, 0);
    }

    #[test]
    fn unhurried_direction_changes_walk_at_full_speed() {
        let mut rig = Rig::new();
        rig.run(5);
        for _ in 0..2 {
            rig.controller.input_mut().press(Action::MoveRight);
            rig.run(60);
            assert_eq!(rig.velocity().x, 300.0);
            rig.controller.input_mut().release(Action::MoveRight);
            rig.run(60);
        }
        rig.controller.input_mut().press(Action::MoveRight);
        rig.run(3);
        assert_eq!(rig.velocity().x, 300.0);
        assert_eq!(rig.movement.stats(rig.controller.entity()).warnings, 0);
    }

    #[test]
    fn legacy_jump_cannot_relaunch_during_coyote_grace() {
        let mut rig = Rig::new();
        rig.run(5);
        rig.world.set_enabled(false);
        rig.controller.input_mut().press(Action::Jump);
        rig.tick();
        rig.controller.input_mut().release(Action::Jump);
        assert!(!rig.world.is_grounded(rig.controller.entity()));

        rig.run(3);
        let before = rig.velocity().y;
        assert!(before > 0.0);
        rig.controller.input_mut().press(Action::Jump);
        rig.tick();
        assert!(rig.velocity().y < before, "relaunched: {} >= {before}", rig.velocity().y);
    }

    #[test]
    fn persistent_inconsistency_forces_a_recovery_respawn() {
        let mut rig = Rig::new();
        let mut events = rig.controller.events().subscribe();
        let e = rig.controller.entity();

        // A check runs every 30th update; corrupt the body right before each one.
        for _ in 0..2 {
            rig.run(29);
            rig.corrupt_velocity();
            rig.tick();
        }
        assert_eq!(rig.controller.epoch(), 0);
        rig.run(29);
        rig.corrupt_velocity();
        rig.now += FIXED_DT as f64;
        rig.controller
            .update(&mut rig.world, &mut rig.movement, rig.now, FIXED_DT);

        let (reason, position) = drain(&mut events)
            .into_iter()
            .find_map(|event| match event {
                MovementEvent::Respawned { reason, position, .. } => Some((reason, position)),
                _ => None,
            })
            .expect("recovery respawn");
        assert_eq!(reason, RespawnReason::Recovery);
        assert_eq!(Some(position), rig.controller.safe_position());
        assert_eq!(rig.controller.epoch(), 1);

        let state = rig.world.physics_state(e).unwrap();
        assert_eq!(state.velocity, Vec2::ZERO);
        assert_eq!(state.accumulated_forces, Vec2::ZERO);
        assert_eq!(state.position, position);
    }

    #[test]
    fn touchdown_inside_coyote_grace_is_not_a_landing() {
        let mut rig = Rig::new();
        let mut events = rig.controller.events().subscribe();
        let e = rig.controller.entity();
        rig.run(5);
        assert_eq!(landings(&mut events), 1, "settling onto the floor");

        // Three pixels of drop come back within the grace window.
        let _ = rig.world.set_position_override(e, Vec2::new(0.0, 27.0));
        rig.run(15);
        assert!(rig.world.has_collision_below(e));
        assert_eq!(landings(&mut events), 0);

        let _ = rig.world.set_position_override(e, Vec2::new(0.0, 120.0));
        rig.run(60);
        assert_eq!(landings(&mut events), 1);
    }
}
