//! Ray intersection against the two shape kinds. `dir` is unit length; the
//! returned value is the distance along the ray, 0 when the origin is
//! already inside.

use glam::Vec2;
use stagecraft_common::Rect;

/// Slab test.
pub(crate) fn ray_rect(origin: Vec2, dir: Vec2, rect: &Rect, max: f32) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = max;
    for axis in 0..2 {
        let (o, d, lo, hi) = if axis == 0 {
            (origin.x, dir.x, rect.min.x, rect.max.x)
        } else {
            (origin.y, dir.y, rect.min.y, rect.max.y)
        };
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (lo - o) * inv;
        let mut t1 = (hi - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

pub(crate) fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32, max: f32) -> Option<f32> {
    let m = origin - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = m.dot(dir);
    if b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t <= max).then_some(t)
}
