mod request;
mod validator;

pub use request::{
    MovementKind, MovementRequest, Priority, RequestSource, RetryContext, VARIABLE_HEIGHT,
};
pub use validator::{
    RequestValidator, ValidationResult, ValidationRule, ValidationStats, ValidationWarning,
};
