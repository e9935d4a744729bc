use glam::Vec2;

use super::level::Surface;
use crate::config::GroundTuning;

/// Slack when comparing the remaining coyote time against zero, so repeated
/// subtraction of small `dt`s does not leave a phantom extra tick.
const COYOTE_EPSILON: f32 = 1.0e-4;

/// Derived ground state of one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundInfo {
    /// True while in contact or inside the coyote window.
    pub is_grounded: bool,
    pub coyote_time_remaining: f32,
    pub ground_normal: Vec2,
    pub ground_surface: Option<Surface>,
    /// `is_grounded` went false→true on the last update.
    pub just_landed: bool,
    /// `is_grounded` went true→false on the last update.
    pub just_left_ground: bool,
}

impl Default for GroundInfo {
    fn default() -> Self {
        Self {
            is_grounded: false,
            coyote_time_remaining: 0.0,
            ground_normal: Vec2::Y,
            ground_surface: None,
            just_landed: false,
            just_left_ground: false,
        }
    }
}

/// Ground contact seen this tick.
#[derive(Debug, Clone, Copy)]
pub struct GroundContact {
    pub normal: Vec2,
    pub surface: Surface,
}

/// Grounded / coyote-grace / airborne tracker with one-tick edge flags.
#[derive(Debug, Clone)]
pub struct GroundTracker {
    info: GroundInfo,
    coyote_duration: f32,
    in_contact: bool,
    /// Grounded value reported by the previous `update`, for edge detection.
    reported: bool,
}

impl GroundTracker {
    pub fn new(tuning: &GroundTuning) -> Self {
        Self {
            info: GroundInfo::default(),
            coyote_duration: tuning.coyote_time,
            in_contact: false,
            reported: false,
        }
    }

    /// Back to airborne with no history, keeping the configured grace.
    pub fn reset(&mut self) {
        self.info = GroundInfo::default();
        self.in_contact = false;
        self.reported = false;
    }

    /// Refresh from this tick's contact. Call exactly once per physics tick.
    pub fn update(&mut self, contact: Option<GroundContact>, dt: f32) {
        match contact {
            Some(c) => {
                self.in_contact = true;
                self.info.is_grounded = true;
                self.info.coyote_time_remaining = self.coyote_duration;
                self.info.ground_normal = c.normal;
                self.info.ground_surface = Some(c.surface);
            }
            None => {
                self.in_contact = false;
                if self.info.is_grounded {
                    self.info.coyote_time_remaining -= dt;
                    if self.info.coyote_time_remaining <= COYOTE_EPSILON {
                        self.info.coyote_time_remaining = 0.0;
                        self.info.is_grounded = false;
                    }
                }
            }
        }

        let now = self.info.is_grounded;
        self.info.just_landed = !self.reported && now;
        self.info.just_left_ground = self.reported && !now;
        self.reported = now;
    }

    /// Spend the remaining grace at take-off so it cannot fund a second jump.
    pub fn consume_coyote(&mut self) {
        self.info.coyote_time_remaining = 0.0;
        self.info.is_grounded = false;
    }

    pub fn info(&self) -> GroundInfo {
        self.info
    }

    pub fn is_grounded(&self) -> bool {
        self.info.is_grounded
    }

    /// Raw contact, ignoring coyote grace.
    pub fn has_contact(&self) -> bool {
        self.in_contact
    }

    /// Grounded, but only through coyote grace.
    pub fn in_coyote_grace(&self) -> bool {
        self.info.is_grounded && !self.in_contact
    }

    pub fn just_landed(&self) -> bool {
        self.info.just_landed
    }

    pub fn just_left_ground(&self) -> bool {
        self.info.just_left_ground
    }
}
