use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// World-space visibility rectangle derived from camera state.
///
/// Owned by the camera and updated in place whenever position, zoom, or
/// viewport change; consumers only read it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    bounds: Rect,
}

impl Frustum {
    pub fn new(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self {
            bounds: Rect::from_center(center, Vec2::new(half_width, half_height)),
        }
    }

    /// Overwrite the bounds without allocating a new frustum.
    pub fn set(&mut self, center: Vec2, half_width: f32, half_height: f32) {
        self.bounds.min = Vec2::new(center.x - half_width, center.y - half_height);
        self.bounds.max = Vec2::new(center.x + half_width, center.y + half_height);
    }

    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        self.bounds.intersects(rect)
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.bounds.contains_point(p)
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0, 0.0)
    }
}

/// Collision shape attached to a physics body, relative to the body origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Box { half_extents: Vec2, offset: Vec2 },
    Circle { radius: f32, offset: Vec2 },
}

impl CollisionShape {
    pub fn rect(half_extents: Vec2) -> Self {
        Self::Box {
            half_extents,
            offset: Vec2::ZERO,
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::Circle {
            radius,
            offset: Vec2::ZERO,
        }
    }

    /// Axis-aligned bounds of the shape placed at `position` rotated by
    /// `rotation` radians.
    pub fn world_bounds(&self, position: Vec2, rotation: f32) -> Rect {
        let rot = Vec2::from_angle(rotation);
        match *self {
            Self::Box {
                half_extents,
                offset,
            } => {
                let center = position + rot.rotate(offset);
                let (s, c) = rotation.sin_cos();
                let extent = Vec2::new(
                    half_extents.x * c.abs() + half_extents.y * s.abs(),
                    half_extents.x * s.abs() + half_extents.y * c.abs(),
                );
                Rect::from_center(center, extent)
            }
            Self::Circle { radius, offset } => {
                let center = position + rot.rotate(offset);
                Rect::from_center(center, Vec2::splat(radius))
            }
        }
    }
}
