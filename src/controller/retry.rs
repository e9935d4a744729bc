use glam::Vec2;

use crate::config::ControllerTuning;
use crate::coordinator::MovementResponse;
use crate::requests::{MovementKind, MovementRequest};

/// What to do about a failed movement response.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Submit this derived request through the movement coordinator.
    Retry(MovementRequest),
    /// Retries are spent: push a minimal movement straight to physics.
    Emergency { direction: Vec2, speed: f32 },
    GiveUp,
}

/// Reduced-magnitude retry, then an emergency fallback.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub factor: f32,
    pub max_retries: u32,
    pub emergency_speed: f32,
}

impl RetryPolicy {
    pub fn from_tuning(tuning: &ControllerTuning) -> Self {
        Self {
            factor: tuning.retry_fallback_factor,
            max_retries: tuning.max_retries,
            emergency_speed: tuning.emergency_speed,
        }
    }

    pub fn decide(&self, response: &MovementResponse, now: f64) -> RetryDecision {
        let Some(request) = response.request.as_ref() else {
            return RetryDecision::GiveUp;
        };
        let reason = response.reason.clone().unwrap_or_else(|| "unknown".to_string());
        match request.kind {
            // A late jump is worse than none.
            MovementKind::Jump => RetryDecision::GiveUp,
            _ if request.retry_count < self.max_retries => {
                RetryDecision::Retry(request.retry(request.magnitude * self.factor, reason, now))
            }
            MovementKind::Walk | MovementKind::Dash => {
                let x = request.direction.x;
                if x == 0.0 {
                    return RetryDecision::GiveUp;
                }
                RetryDecision::Emergency {
                    direction: Vec2::new(x.signum(), 0.0),
                    speed: self.emergency_speed,
                }
            }
            MovementKind::Stop => RetryDecision::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MovementFailure;
    use hecs::World;

    fn policy() -> RetryPolicy {
        RetryPolicy::from_tuning(&ControllerTuning::default())
    }

    fn failed(request: MovementRequest) -> MovementResponse {
        let mut r = MovementResponse::failure(request.entity, MovementFailure::Simulated, None);
        r.request = Some(request);
        r
    }

    #[test]
    fn walk_retries_shrink_then_fall_back() {
        let e = World::new().spawn(());
        let walk = MovementRequest::walk(e, Vec2::NEG_X, 200.0, 0.0);

        let RetryDecision::Retry(first) = policy().decide(&failed(walk), 0.1) else {
            panic!("expected a retry");
        };
        assert_eq!(first.magnitude, 150.0);
        assert_eq!(first.error_context.as_ref().unwrap().reason, "Simulated failure");

        let RetryDecision::Retry(second) = policy().decide(&failed(first), 0.2) else {
            panic!("expected a retry");
        };
        assert_eq!(second.magnitude, 112.5);
        assert_eq!(second.retry_count, 2);

        assert_eq!(
            policy().decide(&failed(second), 0.3),
            RetryDecision::Emergency { direction: Vec2::NEG_X, speed: 60.0 }
        );
    }

    #[test]
    fn jumps_and_unattributed_responses_are_not_retried() {
        let e = World::new().spawn(());
        let jump = MovementRequest::jump(e, 560.0, 0.0);
        assert_eq!(policy().decide(&failed(jump), 0.1), RetryDecision::GiveUp);
        let bare = MovementResponse::failure(e, MovementFailure::Dropped, None);
        assert_eq!(policy().decide(&bare, 0.1), RetryDecision::GiveUp);
    }
}
