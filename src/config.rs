use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use crate::error::ConfigError;

// Gameplay tuning. Every threshold the simulation uses lives here so a TOML
// file can override it; runtime knobs (tick rate, channel sizes) stay as consts.

pub const FIXED_DT: f32 = 1.0 / 60.0;
pub const EVENT_BROADCAST_CAPACITY: usize = 128;
pub const TUNING_ENV_VAR: &str = "LEDGE_TUNING";

/// All tuning groups. Missing tables/fields in a TOML file fall back to defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub ground: GroundTuning,
    pub validation: ValidationTuning,
    pub controller: ControllerTuning,
}

impl Tuning {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = toml::from_str(text)?;
        tuning.check()?;
        Ok(tuning)
    }

    /// Read and parse a TOML tuning file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Reject values the simulation cannot run with.
    pub fn check(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if !(p.terminal_velocity > 0.0) || !(p.max_horizontal_speed > 0.0) {
            return Err(ConfigError::Invalid("speed limits must be positive".into()));
        }
        if !(0.0..=1.0).contains(&p.ground_friction) || !(0.0..=1.0).contains(&p.air_resistance) {
            return Err(ConfigError::Invalid(
                "friction multipliers must be within [0, 1]".into(),
            ));
        }
        if self.ground.coyote_time < 0.0 || self.controller.jump_buffer_time < 0.0 {
            return Err(ConfigError::Invalid("grace windows cannot be negative".into()));
        }
        if self.validation.oscillation_window < 4 {
            return Err(ConfigError::Invalid(
                "oscillation window needs at least 4 entries".into(),
            ));
        }
        if !(self.validation.oscillation_span > 0.0) {
            return Err(ConfigError::Invalid("oscillation span must be positive".into()));
        }
        if self.validation.max_requests_per_second == 0 {
            return Err(ConfigError::Invalid("request cap must be non-zero".into()));
        }
        if !(0.0..1.0).contains(&self.controller.retry_fallback_factor) {
            return Err(ConfigError::Invalid(
                "retry fallback factor must be within [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Integration limits and damping.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Gravity magnitude in units/s², applied along -Y.
    pub gravity: f32,
    /// Max |vy| after any step.
    pub terminal_velocity: f32,
    /// Max |vx| after any step.
    pub max_horizontal_speed: f32,
    /// Fraction of horizontal speed kept per tick while grounded and undriven.
    pub ground_friction: f32,
    /// Fraction of horizontal speed kept per tick while airborne and undriven.
    pub air_resistance: f32,
    /// Steering acceleration toward the walk target while airborne (units/s²).
    pub air_acceleration: f32,
    /// Velocity or position magnitude treated as a numeric blow-up.
    pub extreme_magnitude: f32,
    /// Steps between periodic accumulation sweeps.
    pub accumulation_check_interval: u32,
}

impl PhysicsTuning {
    pub fn gravity_vector(&self) -> Vec2 {
        Vec2::new(0.0, -self.gravity)
    }
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 1400.0,
            terminal_velocity: 1000.0,
            max_horizontal_speed: 600.0,
            ground_friction: 0.85,
            air_resistance: 0.98,
            air_acceleration: 2400.0,
            extreme_magnitude: 1.0e6,
            accumulation_check_interval: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GroundTuning {
    /// Seconds a body stays jump-eligible after losing contact.
    pub coyote_time: f32,
    /// Minimum vertical component of a contact normal for it to count as ground.
    pub ground_normal_threshold: f32,
}

impl Default for GroundTuning {
    fn default() -> Self {
        Self {
            coyote_time: 0.15,
            ground_normal_threshold: 0.7,
        }
    }
}

impl GroundTuning {
    pub fn with_coyote_time(mut self, seconds: f32) -> Self {
        self.coyote_time = seconds;
        self
    }
}

/// Request gate thresholds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ValidationTuning {
    pub max_requests_per_second: u32,
    /// Length of the rate-limit window in seconds.
    pub rate_window: f64,
    /// More than this many requests inside `spam_window` is spam.
    pub spam_threshold: u32,
    pub spam_window: f64,
    /// Requests closer together than this are flagged for accumulation prevention.
    pub rapid_input_interval: f64,
    /// Entries inspected for back-and-forth thrash.
    pub oscillation_window: usize,
    /// A full window only counts as thrash when it spans at most this many seconds.
    pub oscillation_span: f64,
    /// Multiplier applied to walk speed while oscillation is detected.
    pub oscillation_damping: f32,
    /// A player jump within this many seconds of a previous jump or dash is a
    /// disallowed combination unless marked as a combo move.
    pub min_action_interval: f64,
    /// Allowed deviation of |direction| from 1.0.
    pub direction_tolerance: f32,
}

impl Default for ValidationTuning {
    fn default() -> Self {
        Self {
            max_requests_per_second: 60,
            rate_window: 1.0,
            spam_threshold: 8,
            spam_window: 0.1,
            rapid_input_interval: 0.016,
            oscillation_window: 4,
            oscillation_span: 0.5,
            oscillation_damping: 0.5,
            min_action_interval: 0.1,
            direction_tolerance: 1.0e-3,
        }
    }
}

/// Per-entity controller feel: speeds, grace windows, retry and respawn policy.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ControllerTuning {
    pub walk_speed: f32,
    /// Full jump force (velocity change for a unit mass).
    pub jump_force: f32,
    /// Share of `jump_force` applied at take-off; the rest scales with hold time.
    pub min_jump_fraction: f32,
    pub max_jump_hold: f32,
    pub jump_buffer_time: f32,
    pub dash_impulse: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    pub landing_duration: f32,
    /// Each retry uses this fraction of the previous attempt's magnitude.
    pub retry_fallback_factor: f32,
    pub max_retries: u32,
    /// Speed of the last-resort movement sent straight to physics.
    pub emergency_speed: f32,
    /// Falling below this Y triggers an out-of-bounds respawn.
    pub fall_threshold: f32,
    /// Seconds of continuous ground contact before a position counts as safe.
    pub safe_ground_dwell: f32,
    /// Ticks between consistency checks.
    pub consistency_check_interval: u32,
    /// Consecutive failed checks before a recovery respawn.
    pub consistency_escalation: u32,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            walk_speed: 300.0,
            jump_force: 560.0,
            min_jump_fraction: 0.6,
            max_jump_hold: 0.2,
            jump_buffer_time: 0.15,
            dash_impulse: 900.0,
            dash_duration: 0.2,
            dash_cooldown: 0.5,
            landing_duration: 0.05,
            retry_fallback_factor: 0.75,
            max_retries: 2,
            emergency_speed: 60.0,
            fall_threshold: -1000.0,
            safe_ground_dwell: 0.5,
            consistency_check_interval: 30,
            consistency_escalation: 3,
        }
    }
}
