use glam::Vec2;

/// Axis-aligned box given by its center and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self { center, half_extents }
    }

    /// Build from the top-left corner in y-up space (x grows right, y grows up).
    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(Vec2::new(top_left.x + half.x, top_left.y - half.y), half)
    }

    pub fn top(&self) -> f32 {
        self.center.y + self.half_extents.y
    }

    pub fn bottom(&self) -> f32 {
        self.center.y - self.half_extents.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d = (other.center - self.center).abs();
        let reach = self.half_extents + other.half_extents;
        d.x < reach.x && d.y < reach.y
    }
}

/// Material tag carried in landing payloads for audio/FX selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Surface {
    #[default]
    Stone,
    Grass,
    Wood,
    Metal,
    Ice,
}

impl Surface {
    /// Friction coefficient combined (averaged) with the body's own friction.
    pub fn friction(self) -> f32 {
        match self {
            Surface::Stone | Surface::Grass => 1.0,
            Surface::Wood => 0.9,
            Surface::Metal => 0.7,
            Surface::Ice => 0.1,
        }
    }
}

/// Static level geometry a body can stand on or collide with.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    pub bounds: Aabb,
    /// One-way platforms only block bodies descending onto their top face.
    pub one_way: bool,
    pub surface: Surface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerKind {
    /// Touching it kills the body.
    Hazard,
    /// Passing through it records `spawn` as the fallback respawn point.
    Checkpoint { spawn: Vec2 },
}

/// Non-solid region reported through `PhysicsState::active_triggers`.
#[derive(Debug, Clone, Copy)]
pub struct TriggerZone {
    pub bounds: Aabb,
    pub kind: TriggerKind,
}

/// Collision box of a dynamic body, centered on its position.
#[derive(Debug, Clone, Copy)]
pub struct BodyShape {
    pub half_extents: Vec2,
}

impl BodyShape {
    pub fn aabb_at(&self, position: Vec2) -> Aabb {
        Aabb::new(position, self.half_extents)
    }
}
