//! Level geometry: the axis-aligned boxes the player stands on and the camera
//! collides with.
//!
//! Boxes are stored as center + half-extents because that is what both the
//! renderer (instance offset/scale) and the slab test (min/max derived on the
//! fly) want. The registry is filled once from the level file and only read
//! during play; a level hot-reload swaps the whole registry between ticks.

use glam::Vec3;
use peto_render::BoxInstance;

use crate::level::LevelFile;
use crate::raycast::intersect_ray_aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBox {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub color: Vec3,
}

impl LevelBox {
    pub fn from_min_max(min: Vec3, max: Vec3, color: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
            color,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    pub fn instance(&self) -> BoxInstance {
        BoxInstance {
            offset: self.center.to_array(),
            scale: (self.half_extents * 2.0).to_array(),
            color: self.color.to_array(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryRegistry {
    boxes: Vec<LevelBox>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self { boxes: Vec::new() }
    }

    pub fn from_level(level: &LevelFile) -> Self {
        let mut registry = Self::new();
        for level_box in &level.boxes {
            registry.add_box(
                Vec3::from_array(level_box.min),
                Vec3::from_array(level_box.max),
                Vec3::from_array(level_box.color),
            );
        }
        registry
    }

    /// Append a box spanning `min..max`. Callers guarantee `min <= max` on
    /// every axis; the level loader enforces it for file-authored boxes.
    pub fn add_box(&mut self, min: Vec3, max: Vec3, color: Vec3) {
        self.boxes.push(LevelBox::from_min_max(min, max, color));
    }

    pub fn all_boxes(&self) -> std::slice::Iter<'_, LevelBox> {
        self.boxes.iter()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Nearest hit parameter strictly inside `(0, max_t)` across every box.
    /// Hits at `t == 0` (origin inside a box) and at or past `max_t` are ignored.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        let mut closest: Option<f32> = None;
        for level_box in self.all_boxes() {
            let Some(t) = intersect_ray_aabb(origin, dir, level_box.min(), level_box.max()) else {
                continue;
            };
            if t > 0.0 && t < max_t && closest.is_none_or(|c| t < c) {
                closest = Some(t);
            }
        }
        closest
    }

    /// Height of the first surface below `point`, probing straight down from
    /// `lift` units above it so a floor flush with `point.y` is still found.
    /// Surfaces higher than `point.y + lift` are never reported.
    pub fn ground_height_below(&self, point: Vec3, lift: f32) -> Option<f32> {
        let origin = point + Vec3::Y * lift;
        self.raycast(origin, Vec3::NEG_Y, f32::INFINITY)
            .map(|t| origin.y - t)
    }

    pub fn instances(&self) -> Vec<BoxInstance> {
        self.boxes.iter().map(LevelBox::instance).collect()
    }
}
