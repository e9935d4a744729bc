use hecs::World;
use tracing::debug;

use crate::components::PhysicsComponent;

/// Integrate every body one fixed step. Forces are consumed by the step.
pub fn integration_system(world: &mut World, dt: f32, now: f64) {
    for (_entity, body) in world.query_mut::<&mut PhysicsComponent>() {
        body.integrate(dt, now);
    }
}

/// Periodic accumulation sweep over all bodies. Returns how many needed repair.
pub fn accumulation_sweep(world: &mut World) -> usize {
    let mut repaired = 0;
    for (entity, body) in world.query_mut::<&mut PhysicsComponent>() {
        let repair = body.prevent_accumulation();
        if !repair.is_clean() {
            debug!(?entity, ?repair, "accumulation sweep repaired body");
            repaired += 1;
        }
    }
    repaired
}
