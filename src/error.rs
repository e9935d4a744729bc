use thiserror::Error;

use crate::requests::{MovementKind, ValidationRule};

/// A request rejected by the validator before it reached physics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),
    #[error("Invalid magnitude: {0}")]
    InvalidMagnitude(f32),
    #[error("Disallowed action combination: {previous:?} followed by {next:?}")]
    DisallowedCombination {
        previous: MovementKind,
        next: MovementKind,
    },
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Input spam detected")]
    InputSpam,
}

impl ValidationError {
    /// Pipeline stage that produced this error, used for statistics.
    pub fn rule(&self) -> ValidationRule {
        match self {
            Self::InvalidDirection(_) | Self::InvalidMagnitude(_) => ValidationRule::Structure,
            Self::DisallowedCombination { .. } => ValidationRule::ActionCombination,
            Self::RateLimitExceeded => ValidationRule::RateLimit,
            Self::InputSpam => ValidationRule::InputSpam,
        }
    }
}

/// An input action name with no mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown input action {0:?}")]
pub struct UnknownAction(pub String);

/// A coordinator refused or could not carry out an accepted request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MovementFailure {
    #[error("Unknown entity")]
    UnknownEntity,
    #[error("Coordinator disabled")]
    CoordinatorDisabled,
    #[error("Entity is static")]
    StaticEntity,
    #[error("Obstructed by terrain")]
    Obstructed,
    #[error("Not grounded")]
    NotGrounded,
    #[error("Request dropped before a response was produced")]
    Dropped,
    #[error("Simulated failure")]
    Simulated,
    #[error("{0}")]
    Physics(#[from] PhysicsError),
}

impl MovementFailure {
    /// Blocked failures mean the world refused the move; everything else failed outright.
    pub fn is_block(&self) -> bool {
        matches!(self, Self::StaticEntity | Self::Obstructed | Self::NotGrounded)
    }
}

/// Numeric or bookkeeping anomaly found in a physics body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("non-finite {field}")]
    NonFinite { field: &'static str },
    #[error("extreme {field} magnitude {magnitude}")]
    ExtremeMagnitude { field: &'static str, magnitude: f32 },
    #[error("accumulated force residue {residue} after integration")]
    Accumulation { residue: f32 },
    #[error("invalid mass {0} on a dynamic body")]
    InvalidMass(f32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tuning: {0}")]
    Invalid(String),
}
