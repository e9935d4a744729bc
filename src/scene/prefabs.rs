use glam::Vec2;
use hecs::Entity;

use crate::components::{Aabb, BodyDesc, Platform, Surface, TriggerKind, TriggerZone};
use crate::coordinator::PhysicsWorld;
use crate::EntityId;

/// Player collider: 24 x 48, feet at `position.y - 24`.
pub const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(12.0, 24.0);

/// Spawn the player body standing with its feet at `feet`.
pub fn spawn_player(world: &mut PhysicsWorld, feet: Vec2) -> EntityId {
    world.spawn_body(BodyDesc {
        half_extents: PLAYER_HALF_EXTENTS,
        ..BodyDesc::at(feet + Vec2::new(0.0, PLAYER_HALF_EXTENTS.y))
    })
}

/// Center position of a player whose feet rest at `feet`.
pub fn player_center(feet: Vec2) -> Vec2 {
    feet + Vec2::new(0.0, PLAYER_HALF_EXTENTS.y)
}

/// Solid block given by its top-left corner (y-up).
pub fn spawn_block(world: &mut PhysicsWorld, top_left: Vec2, size: Vec2, surface: Surface) -> Entity {
    world.add_platform(Platform {
        bounds: Aabb::from_top_left(top_left, size),
        one_way: false,
        surface,
    })
}

/// Thin platform that can be jumped through from below.
pub fn spawn_ledge(world: &mut PhysicsWorld, top_left: Vec2, width: f32) -> Entity {
    world.add_platform(Platform {
        bounds: Aabb::from_top_left(top_left, Vec2::new(width, 10.0)),
        one_way: true,
        surface: Surface::Wood,
    })
}

pub fn spawn_hazard(world: &mut PhysicsWorld, top_left: Vec2, size: Vec2) -> Entity {
    world.add_trigger(TriggerZone {
        bounds: Aabb::from_top_left(top_left, size),
        kind: TriggerKind::Hazard,
    })
}

/// Checkpoint column; respawns without safe ground land at `spawn` (a body center).
pub fn spawn_checkpoint(world: &mut PhysicsWorld, top_left: Vec2, size: Vec2, spawn: Vec2) -> Entity {
    world.add_trigger(TriggerZone {
        bounds: Aabb::from_top_left(top_left, size),
        kind: TriggerKind::Checkpoint { spawn },
    })
}
