mod collision;
mod ground;
mod physics;

pub use collision::{collision_system, CollisionReport};
pub use ground::ground_system;
pub use physics::{accumulation_sweep, integration_system};
