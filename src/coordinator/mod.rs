//! Request/response boundary between controllers and the physics simulation.
//!
//! Mutating calls return a [`PendingResponse`]: a one-shot receiver the caller
//! polls on a later tick (or awaits). Queries are synchronous reads of the
//! last published state.

mod movement;
mod physics;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use glam::Vec2;
use tokio::sync::oneshot;

use crate::components::{GroundInfo, GroundTracker, PhysicsComponent, PhysicsState, RespawnState};
use crate::error::{MovementFailure, ValidationError};
use crate::requests::{MovementRequest, ValidationStats};
use crate::EntityId;

pub use movement::RequestCoordinator;
pub use physics::{PhysicsWorld, StepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failed,
    Blocked,
}

/// Result of one mutating coordinator call.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementResponse {
    pub status: ResponseStatus,
    pub entity: EntityId,
    pub actual_velocity: Vec2,
    pub actual_position: Vec2,
    pub is_grounded: bool,
    pub failure: Option<MovementFailure>,
    pub reason: Option<String>,
    /// The request this answers, when it came through a movement coordinator.
    pub request: Option<MovementRequest>,
}

impl MovementResponse {
    pub fn success(entity: EntityId, state: Option<&PhysicsState>) -> Self {
        let mut response = Self {
            status: ResponseStatus::Success,
            entity,
            actual_velocity: Vec2::ZERO,
            actual_position: Vec2::ZERO,
            is_grounded: false,
            failure: None,
            reason: None,
            request: None,
        };
        if let Some(state) = state {
            response.actual_velocity = state.velocity;
            response.actual_position = state.position;
            response.is_grounded = state.is_grounded;
        }
        response
    }

    /// Blocked for world refusals, failed for everything else.
    pub fn failure(entity: EntityId, failure: MovementFailure, state: Option<&PhysicsState>) -> Self {
        let mut response = Self::success(entity, state);
        response.status = if failure.is_block() {
            ResponseStatus::Blocked
        } else {
            ResponseStatus::Failed
        };
        response.reason = Some(failure.to_string());
        response.failure = Some(failure);
        response
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Sending half handed to whoever resolves the request.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<MovementResponse>,
}

impl Responder {
    /// The receiver may already be gone (caller respawned or dropped it); that is fine.
    pub fn send(self, response: MovementResponse) {
        let _ = self.tx.send(response);
    }
}

/// Future-like handle for a coordinator response.
#[derive(Debug)]
pub struct PendingResponse {
    entity: EntityId,
    rx: oneshot::Receiver<MovementResponse>,
    request: Option<MovementRequest>,
}

impl PendingResponse {
    pub fn channel(entity: EntityId) -> (Responder, PendingResponse) {
        let (tx, rx) = oneshot::channel();
        (Responder { tx }, PendingResponse { entity, rx, request: None })
    }

    /// A handle whose response is already available.
    pub fn ready(response: MovementResponse) -> Self {
        let (responder, pending) = Self::channel(response.entity);
        responder.send(response);
        pending
    }

    /// Remember the originating request; it is attached to the response if the
    /// resolver did not set one.
    pub fn with_request(mut self, request: MovementRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn request(&self) -> Option<&MovementRequest> {
        self.request.as_ref()
    }

    /// Non-blocking poll. `None` while unresolved. A resolver that went away
    /// without answering yields a failed `Dropped` response.
    pub fn try_take(&mut self) -> Option<MovementResponse> {
        match self.rx.try_recv() {
            Ok(response) => Some(self.attach(response)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(self.dropped()),
        }
    }

    fn attach(&mut self, mut response: MovementResponse) -> MovementResponse {
        if response.request.is_none() {
            response.request = self.request.take();
        }
        response
    }

    fn dropped(&mut self) -> MovementResponse {
        let mut response = MovementResponse::failure(self.entity, MovementFailure::Dropped, None);
        response.request = self.request.take();
        response
    }
}

impl Future for PendingResponse {
    type Output = MovementResponse;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(response)) => Poll::Ready(this.attach(response)),
            Poll::Ready(Err(_)) => Poll::Ready(this.dropped()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Write access to one body while the coordinator is disabled.
pub struct LegacyBody<'a> {
    pub body: &'a mut PhysicsComponent,
    pub ground: &'a mut GroundTracker,
}

impl LegacyBody<'_> {
    /// Direct take-off: set the vertical velocity and spend the coyote grace so a
    /// second press before it runs out cannot launch again.
    pub fn jump(&mut self, velocity_y: f32) {
        let mut velocity = self.body.state().velocity;
        velocity.y = velocity_y;
        self.body.legacy_set_velocity(velocity);
        self.ground.consume_coyote();
        self.body.set_grounded(false);
    }

    pub fn reset(&mut self, respawn: &RespawnState) {
        self.body.reset(
            respawn.spawn_position,
            respawn.spawn_velocity,
            respawn.reset_physics_accumulation,
        );
        self.ground.reset();
    }
}

/// Sole authority over physics state. Movement calls resolve on the next step;
/// utility calls resolve immediately.
pub trait PhysicsCoordinator {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);

    fn request_movement(&mut self, entity: EntityId, direction: Vec2, speed: f32) -> PendingResponse;
    fn request_jump(&mut self, entity: EntityId, force: f32) -> PendingResponse;
    fn request_stop(&mut self, entity: EntityId) -> PendingResponse;
    fn request_impulse(&mut self, entity: EntityId, impulse: Vec2) -> PendingResponse;

    /// Grounded including coyote grace.
    fn is_grounded(&self, entity: EntityId) -> bool;
    fn velocity(&self, entity: EntityId) -> Option<Vec2>;
    fn position(&self, entity: EntityId) -> Option<Vec2>;
    fn physics_state(&self, entity: EntityId) -> Option<PhysicsState>;
    /// Ground state after the last step, including its one-tick landing edges.
    fn ground_info(&self, entity: EntityId) -> Option<GroundInfo>;
    /// Raw ground contact this step, ignoring coyote grace.
    fn has_collision_below(&self, entity: EntityId) -> bool;

    fn reset_physics_state(&mut self, entity: EntityId, respawn: &RespawnState) -> PendingResponse;
    fn clear_accumulated_forces(&mut self, entity: EntityId) -> PendingResponse;
    fn set_position_override(&mut self, entity: EntityId, position: Vec2) -> PendingResponse;
    fn validate_state_consistency(&mut self, entity: EntityId) -> PendingResponse;

    /// Direct write access for legacy control. Only granted while the coordinator
    /// is disabled, so the two modes never overlap.
    fn legacy_body(&mut self, entity: EntityId) -> Option<LegacyBody<'_>>;
}

/// Validates movement requests and turns them into physics operations.
pub trait MovementCoordinator {
    /// Rejections come back synchronously and never touch physics.
    fn submit(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        request: MovementRequest,
    ) -> Result<PendingResponse, ValidationError>;

    fn clear_entity_history(&mut self, entity: EntityId);

    fn stats(&self, entity: EntityId) -> ValidationStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn ready_response_is_taken_once_and_carries_request() {
        let e = World::new().spawn(());
        let request = MovementRequest::stop(e, 0.0);
        let mut pending =
            PendingResponse::ready(MovementResponse::success(e, None)).with_request(request.clone());
        let response = pending.try_take().unwrap();
        assert!(response.is_success());
        assert_eq!(response.request, Some(request));
    }

    #[test]
    fn unanswered_channel_is_pending_then_dropped() {
        let e = World::new().spawn(());
        let (responder, mut pending) = PendingResponse::channel(e);
        assert!(pending.try_take().is_none());
        drop(responder);
        let response = pending.try_take().unwrap();
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.failure, Some(MovementFailure::Dropped));
    }

    #[test]
    fn block_reasons_map_to_blocked_status() {
        let e = World::new().spawn(());
        let blocked = MovementResponse::failure(e, MovementFailure::Obstructed, None);
        assert_eq!(blocked.status, ResponseStatus::Blocked);
        assert_eq!(blocked.reason.as_deref(), Some("Obstructed by terrain"));
        let failed = MovementResponse::failure(e, MovementFailure::UnknownEntity, None);
        assert_eq!(failed.status, ResponseStatus::Failed);
    }
}
