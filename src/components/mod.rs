mod ground;
mod level;
mod physics;
mod respawn;

pub use ground::{GroundContact, GroundInfo, GroundTracker};
pub use level::{Aabb, BodyShape, Platform, Surface, TriggerKind, TriggerZone};
pub use physics::{
    BodyDesc, CollisionContact, Contact, LandingInfo, PhysicsComponent, PhysicsState, Repair,
};
pub use respawn::{RespawnReason, RespawnState};
