use glam::Vec2;

use crate::components::Surface;
use crate::coordinator::PhysicsWorld;
use crate::scene::prefabs::{
    player_center, spawn_block, spawn_checkpoint, spawn_hazard, spawn_ledge, spawn_player,
};
use crate::EntityId;

/// Handles into the built-in level.
#[derive(Debug, Clone, Copy)]
pub struct TestScene {
    pub player: EntityId,
    /// Player body center at spawn.
    pub spawn: Vec2,
}

/// Ground at y = 0 from x = -300 to 400, a bottomless gap to x = 560, a far
/// ground with a checkpoint, a spike pit, then an ice shelf. A one-way ledge
/// hangs above the start.
pub fn load_test_scene(world: &mut PhysicsWorld) -> TestScene {
    // Left wall and start ground.
    spawn_block(world, Vec2::new(-340.0, 400.0), Vec2::new(40.0, 440.0), Surface::Stone);
    spawn_block(world, Vec2::new(-300.0, 0.0), Vec2::new(700.0, 40.0), Surface::Grass);

    spawn_ledge(world, Vec2::new(100.0, 90.0), 120.0);

    // Far side of the gap.
    spawn_block(world, Vec2::new(560.0, 0.0), Vec2::new(600.0, 40.0), Surface::Wood);
    spawn_checkpoint(
        world,
        Vec2::new(700.0, 100.0),
        Vec2::new(40.0, 100.0),
        player_center(Vec2::new(720.0, 0.0)),
    );

    // Spike pit with a floor, so bodies stop inside the hazard.
    spawn_block(world, Vec2::new(1160.0, -80.0), Vec2::new(140.0, 40.0), Surface::Metal);
    spawn_hazard(world, Vec2::new(1160.0, -50.0), Vec2::new(140.0, 30.0));
    spawn_block(world, Vec2::new(1300.0, 0.0), Vec2::new(400.0, 40.0), Surface::Ice);

    let feet = Vec2::ZERO;
    TestScene {
        player: spawn_player(world, feet),
        spawn: player_center(feet),
    }
}
