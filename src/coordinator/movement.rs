use std::collections::HashMap;

use glam::Vec2;
use tracing::{debug, info};

use super::{MovementCoordinator, MovementResponse, PendingResponse, PhysicsCoordinator};
use crate::config::ValidationTuning;
use crate::error::{MovementFailure, ValidationError};
use crate::requests::{MovementKind, MovementRequest, RequestValidator, ValidationStats};
use crate::EntityId;

/// Default movement coordinator: validate, then translate each request kind
/// into one physics operation.
#[derive(Debug)]
pub struct RequestCoordinator {
    validator: RequestValidator,
    damping: f32,
    /// Remaining simulated failures per entity, for exercising retry paths.
    injected: HashMap<EntityId, u32>,
}

impl RequestCoordinator {
    pub fn new(tuning: ValidationTuning) -> Self {
        Self {
            damping: tuning.oscillation_damping,
            validator: RequestValidator::new(tuning),
            injected: HashMap::new(),
        }
    }

    /// Make the next `count` accepted requests for `entity` fail without reaching physics.
    pub fn inject_failures(&mut self, entity: EntityId, count: u32) {
        if count == 0 {
            self.injected.remove(&entity);
        } else {
            info!(?entity, count, "injecting simulated movement failures");
            self.injected.insert(entity, count);
        }
    }

    pub fn validator(&self) -> &RequestValidator {
        &self.validator
    }

    fn take_injected(&mut self, entity: EntityId) -> bool {
        let Some(left) = self.injected.get_mut(&entity) else {
            return false;
        };
        *left -= 1;
        if *left == 0 {
            self.injected.remove(&entity);
        }
        true
    }
}

impl MovementCoordinator for RequestCoordinator {
    fn submit(
        &mut self,
        physics: &mut dyn PhysicsCoordinator,
        request: MovementRequest,
    ) -> Result<PendingResponse, ValidationError> {
        let validation = self.validator.validate(&request);
        validation.outcome.clone()?;

        let entity = request.entity;
        if self.take_injected(entity) {
            let state = physics.physics_state(entity);
            let response = MovementResponse::failure(entity, MovementFailure::Simulated, state.as_ref());
            return Ok(PendingResponse::ready(response).with_request(request));
        }

        if validation.requires_accumulation_prevention {
            // Answered immediately; only the side effect matters here.
            let _ = physics.clear_accumulated_forces(entity);
        }

        let pending = match request.kind {
            MovementKind::Walk => {
                let speed = if validation.oscillation_detected {
                    request.magnitude * self.damping
                } else {
                    request.magnitude
                };
                physics.request_movement(entity, request.direction, speed)
            }
            MovementKind::Jump if request.is_variable_height() => {
                physics.request_impulse(entity, Vec2::Y * request.magnitude)
            }
            MovementKind::Jump => physics.request_jump(entity, request.magnitude),
            MovementKind::Dash => physics.request_impulse(entity, request.direction * request.magnitude),
            MovementKind::Stop => physics.request_stop(entity),
        };
        debug!(
            ?entity,
            kind = ?request.kind,
            priority = ?request.priority,
            magnitude = request.magnitude,
            retry = request.retry_count,
            "request forwarded"
        );
        Ok(pending.with_request(request))
    }

    fn clear_entity_history(&mut self, entity: EntityId) {
        self.validator.clear_entity_history(entity);
    }

    fn stats(&self, entity: EntityId) -> ValidationStats {
        self.validator.entity_stats(entity)
    }
}
