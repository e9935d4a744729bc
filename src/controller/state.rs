use glam::Vec2;

use crate::events::AnimationState;

/// Motion states of a platformer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Idle,
    Walking,
    Jumping,
    Falling,
    Landing,
    Dashing,
}

/// Context passed to [`MotionState::next`] each tick.
#[derive(Debug, Clone, Copy)]
pub struct MotionCtx {
    /// Grounded including coyote grace.
    pub grounded: bool,
    /// Raw contact below this tick.
    pub contact: bool,
    pub velocity: Vec2,
    pub moving: bool,
    pub time_in_state: f32,
    pub landing_duration: f32,
    pub dash_duration: f32,
}

impl MotionState {
    /// Return the next state if a transition should fire, or `None` to stay.
    ///
    /// Jump and dash are entered by the controller when their requests are
    /// issued; every other edge is read from the physics snapshot here.
    pub fn next(&self, ctx: &MotionCtx) -> Option<MotionState> {
        let settled = || if ctx.moving { Self::Walking } else { Self::Idle };
        match self {
            Self::Idle => {
                if !ctx.grounded { Some(Self::Falling) }
                else if ctx.moving { Some(Self::Walking) }
                else { None }
            }

            Self::Walking => {
                if !ctx.grounded { Some(Self::Falling) }
                else if !ctx.moving { Some(Self::Idle) }
                else { None }
            }

            // Apex reached, or the jump never left the ground.
            Self::Jumping => {
                if ctx.velocity.y <= 0.0 {
                    if ctx.contact { Some(Self::Landing) } else { Some(Self::Falling) }
                } else {
                    None
                }
            }

            Self::Falling => {
                if ctx.grounded && ctx.contact { Some(Self::Landing) }
                else { None }
            }

            Self::Landing => {
                if !ctx.grounded { Some(Self::Falling) }
                else if ctx.time_in_state >= ctx.landing_duration { Some(settled()) }
                else { None }
            }

            Self::Dashing => {
                if ctx.time_in_state < ctx.dash_duration { None }
                else if ctx.grounded { Some(settled()) }
                else { Some(Self::Falling) }
            }
        }
    }

    /// Whether a jump may be issued from this state (grounded-ness is checked separately).
    pub fn can_jump(&self) -> bool {
        !matches!(self, Self::Jumping | Self::Dashing)
    }

    pub fn animation(&self) -> AnimationState {
        match self {
            Self::Idle => AnimationState::Idle,
            Self::Walking | Self::Dashing => AnimationState::Run,
            Self::Jumping => AnimationState::Jump,
            Self::Falling => AnimationState::Fall,
            Self::Landing => AnimationState::Landing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MotionCtx {
        MotionCtx {
            grounded: true,
            contact: true,
            velocity: Vec2::ZERO,
            moving: false,
            time_in_state: 0.0,
            landing_duration: 0.05,
            dash_duration: 0.2,
        }
    }

    #[test]
    fn walking_off_an_edge_waits_for_coyote_to_expire() {
        let in_grace = MotionCtx { contact: false, moving: true, ..ctx() };
        assert_eq!(MotionState::Walking.next(&in_grace), None);
        let expired = MotionCtx { grounded: false, ..in_grace };
        assert_eq!(MotionState::Walking.next(&expired), Some(MotionState::Falling));
    }

    #[test]
    fn jump_arc_lands_then_settles() {
        let rising = MotionCtx { grounded: false, contact: false, velocity: Vec2::new(0.0, 200.0), ..ctx() };
        assert_eq!(MotionState::Jumping.next(&rising), None);
        let apex = MotionCtx { velocity: Vec2::new(0.0, -1.0), ..rising };
        assert_eq!(MotionState::Jumping.next(&apex), Some(MotionState::Falling));
        assert_eq!(MotionState::Falling.next(&ctx()), Some(MotionState::Landing));
        assert_eq!(MotionState::Landing.next(&ctx()), None);
        let later = MotionCtx { time_in_state: 0.05, moving: true, ..ctx() };
        assert_eq!(MotionState::Landing.next(&later), Some(MotionState::Walking));
    }

    #[test]
    fn dash_ends_by_timer() {
        let mid = MotionCtx { time_in_state: 0.1, grounded: false, ..ctx() };
        assert_eq!(MotionState::Dashing.next(&mid), None);
        let done = MotionCtx { time_in_state: 0.2, ..mid };
        assert_eq!(MotionState::Dashing.next(&done), Some(MotionState::Falling));
    }

    #[test]
    fn animation_mapping() {
        assert_eq!(MotionState::Dashing.animation(), AnimationState::Run);
        assert_eq!(MotionState::Landing.animation(), AnimationState::Landing);
        assert!(!MotionState::Jumping.can_jump());
        assert!(MotionState::Landing.can_jump());
    }
}
