use hecs::World;

use crate::components::{GroundContact, GroundTracker, PhysicsComponent};

/// Feed this step's contacts into each tracker and mirror the result into the body.
/// Must run once per physics tick, after `collision_system`.
pub fn ground_system(world: &mut World, ground_threshold: f32, dt: f32) {
    for (_entity, (body, tracker)) in
        world.query_mut::<(&mut PhysicsComponent, &mut GroundTracker)>()
    {
        let contact = body
            .state()
            .active_collisions
            .iter()
            .find(|c| c.normal.y >= ground_threshold)
            .map(|c| GroundContact { normal: c.normal, surface: c.surface });
        tracker.update(contact, dt);
        body.set_grounded(tracker.is_grounded());
    }
}
