//! Ray vs axis-aligned box, slab method.
//!
//! The ray's parameter interval starts as `[0, +inf)` and is clipped against
//! the pair of planes bounding the box on each axis in turn. An empty interval
//! on any axis means a miss. `t` is measured in units of `dir`, so callers that
//! want world distances pass a normalized direction.

use glam::Vec3;

/// Below this a direction component is treated as parallel to the slab planes.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Nearest entry parameter of the ray `origin + t * dir` into the box
/// `[min, max]`, or `None` when the ray misses. A ray starting inside the box
/// reports `Some(0.0)`.
pub fn intersect_ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let lo = min[axis];
        let hi = max[axis];

        if d.abs() < PARALLEL_EPSILON {
            // Parallel ray that starts outside the slab never enters it.
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let mut t1 = (lo - o) / d;
        let mut t2 = (hi - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }
    Some(t_min)
}
