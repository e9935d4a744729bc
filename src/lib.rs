//! Movement and physics coordination core for a 2D platformer.
//!
//! Controllers express intent as [`MovementRequest`]s. Requests pass the
//! [`RequestValidator`], are resolved by a [`MovementCoordinator`] into
//! operations on a [`PhysicsCoordinator`], and the resulting [`PhysicsState`]
//! snapshots drive the controller's state machine on the next tick.

pub mod components;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod fsm;
pub mod requests;
pub mod scene;
pub mod systems;

pub use components::{
    GroundInfo, GroundTracker, PhysicsComponent, PhysicsState, RespawnReason, RespawnState,
};
pub use config::Tuning;
pub use controller::{Controller, MotionState};
pub use coordinator::{
    LegacyBody, MovementCoordinator, MovementResponse, PendingResponse, PhysicsCoordinator,
    PhysicsWorld, RequestCoordinator, ResponseStatus,
};
pub use error::{ConfigError, MovementFailure, PhysicsError, UnknownAction, ValidationError};
pub use events::{AnimationState, EventBus, MovementEvent};
pub use requests::{MovementKind, MovementRequest, Priority, RequestValidator};

/// Stable identifier of a simulated body: a generational index into the physics registry.
pub type EntityId = hecs::Entity;
