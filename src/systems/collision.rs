use glam::Vec2;
use hecs::{Entity, World};

use crate::components::{
    Aabb, BodyShape, Contact, LandingInfo, PhysicsComponent, Platform, TriggerZone,
};

/// Slack allowed when deciding whether a body came from above a one-way platform.
const ONE_WAY_SLOP: f32 = 1.0;

/// Everything the detection/response pass produced this step.
#[derive(Debug, Default)]
pub struct CollisionReport {
    pub contacts: Vec<Contact>,
    pub landings: Vec<(Entity, LandingInfo)>,
}

/// Minimum-penetration separation of `body` out of `platform`.
/// The returned normal points out of the platform, toward the body.
fn test_pair(body: &Aabb, platform: &Aabb) -> Option<(Vec2, f32)> {
    let d = body.center - platform.center;
    let overlap = (body.half_extents + platform.half_extents) - d.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return None;
    }
    if overlap.x < overlap.y {
        let sx = if d.x < 0.0 { -1.0 } else { 1.0 };
        Some((Vec2::new(sx, 0.0), overlap.x))
    } else {
        let sy = if d.y < 0.0 { -1.0 } else { 1.0 };
        Some((Vec2::new(0.0, sy), overlap.y))
    }
}

/// A one-way platform only holds a descending body whose feet were above its top.
fn one_way_accepts(body: &Aabb, velocity: Vec2, platform: &Aabb, normal: Vec2, dt: f32) -> bool {
    if normal != Vec2::Y || velocity.y > 0.0 {
        return false;
    }
    let previous_bottom = body.bottom() - velocity.y * dt;
    previous_bottom >= platform.top() - ONE_WAY_SLOP
}

/// Detect body-vs-platform overlaps and resolve them against static geometry,
/// then record trigger-zone overlaps. Bodies never collide with each other.
pub fn collision_system(world: &mut World, ground_threshold: f32, dt: f32) -> CollisionReport {
    let platforms: Vec<(Entity, Platform)> = world
        .query::<&Platform>()
        .iter()
        .map(|(e, p)| (e, *p))
        .collect();
    let triggers: Vec<TriggerZone> = world.query::<&TriggerZone>().iter().map(|(_, t)| *t).collect();

    let mut report = CollisionReport::default();
    for (entity, (body, shape)) in world.query_mut::<(&mut PhysicsComponent, &BodyShape)>() {
        body.begin_contacts();
        if body.state().is_static {
            continue;
        }

        for (platform_entity, platform) in &platforms {
            // Re-read each time: earlier resolutions may already have moved the body.
            let aabb = shape.aabb_at(body.state().position);
            let Some((normal, depth)) = test_pair(&aabb, &platform.bounds) else {
                continue;
            };
            if platform.one_way
                && !one_way_accepts(&aabb, body.state().velocity, &platform.bounds, normal, dt)
            {
                continue;
            }
            let contact = Contact {
                body: entity,
                platform: *platform_entity,
                normal,
                depth,
                surface: platform.surface,
            };
            if let Some(landing) = body.resolve_contact(&contact, ground_threshold) {
                report.landings.push((entity, landing));
            }
            report.contacts.push(contact);
        }

        let aabb = shape.aabb_at(body.state().position);
        for zone in &triggers {
            if zone.bounds.overlaps(&aabb) {
                body.record_trigger(zone.kind);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BodyDesc, Surface};
    use crate::config::PhysicsTuning;

    fn spawn_body(world: &mut World, position: Vec2, velocity: Vec2) -> Entity {
        let e = world.spawn(());
        let desc = BodyDesc::at(position);
        let mut body = PhysicsComponent::new(e, &desc, PhysicsTuning::default());
        let mut s = body.physics_state();
        s.velocity = velocity;
        body.update_physics_state(s);
        world
            .insert(e, (body, BodyShape { half_extents: desc.half_extents }))
            .unwrap();
        e
    }

    fn floor(one_way: bool) -> Platform {
        Platform {
            bounds: Aabb::new(Vec2::new(0.0, -10.0), Vec2::new(200.0, 10.0)),
            one_way,
            surface: Surface::Wood,
        }
    }

    #[test]
    fn sinking_body_is_pushed_up_and_lands() {
        let mut world = World::new();
        world.spawn((floor(false),));
        let e = spawn_body(&mut world, Vec2::new(0.0, 23.0), Vec2::new(0.0, -300.0));

        let report = collision_system(&mut world, 0.7, 1.0 / 60.0);
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(report.landings.len(), 1);
        let landing = report.landings[0].1;
        assert_eq!(landing.surface, Surface::Wood);
        assert_eq!(landing.velocity.y, -300.0);

        let body = world.get::<&PhysicsComponent>(e).unwrap();
        assert!((body.state().position.y - 24.0).abs() < 1e-4);
        assert_eq!(body.state().velocity.y, 0.0);
        assert!(body.has_ground_contact());
    }

    #[test]
    fn resting_contact_is_not_a_new_landing() {
        let mut world = World::new();
        world.spawn((floor(false),));
        let e = spawn_body(&mut world, Vec2::new(0.0, 23.5), Vec2::new(0.0, -20.0));
        assert_eq!(collision_system(&mut world, 0.7, 1.0 / 60.0).landings.len(), 1);
        world
            .get::<&mut PhysicsComponent>(e)
            .unwrap()
            .set_position_override(Vec2::new(0.0, 23.6));
        let report = collision_system(&mut world, 0.7, 1.0 / 60.0);
        assert_eq!(report.contacts.len(), 1);
        assert!(report.landings.is_empty());
    }

    #[test]
    fn one_way_platform_ignores_rising_bodies() {
        let mut world = World::new();
        world.spawn((floor(true),));
        let e = spawn_body(&mut world, Vec2::new(0.0, 10.0), Vec2::new(0.0, 400.0));
        let report = collision_system(&mut world, 0.7, 1.0 / 60.0);
        assert!(report.contacts.is_empty());
        let body = world.get::<&PhysicsComponent>(e).unwrap();
        assert_eq!(body.state().position.y, 10.0);
    }

    #[test]
    fn wall_contact_is_horizontal() {
        let mut world = World::new();
        world.spawn((Platform {
            bounds: Aabb::new(Vec2::new(40.0, 0.0), Vec2::new(10.0, 100.0)),
            one_way: false,
            surface: Surface::Stone,
        },));
        let e = spawn_body(&mut world, Vec2::new(20.0, 0.0), Vec2::new(300.0, 0.0));
        collision_system(&mut world, 0.7, 1.0 / 60.0);
        let body = world.get::<&PhysicsComponent>(e).unwrap();
        assert_eq!(body.state().active_collisions[0].normal, Vec2::NEG_X);
        assert_eq!(body.state().velocity.x, 0.0);
        assert!(body.state().is_blocked_toward(Vec2::X));
        assert!(!body.state().is_blocked_toward(Vec2::NEG_X));
        assert!(!body.has_ground_contact());
    }
}
