//! Third-person camera: mouse-look orbit plus collision against level boxes.

use glam::{Vec2, Vec3};

use crate::geometry::GeometryRegistry;

/// Ray origin above the player's feet, so the floor under them is not a hit.
pub const EYE_OFFSET: Vec3 = Vec3::new(0.0, 1.0, 0.0);
/// Closest the camera may be pulled toward the eye point after a hit.
pub const MIN_CAMERA_DISTANCE: f32 = 0.1;

const DEGENERATE_RAY_LENGTH: f32 = 1e-6;
const MIN_HORIZONTAL_REACH: f32 = 0.001;

/// Pull `desired` toward the player's eye point when a box sits between them.
///
/// Returns `desired` untouched when nothing blocks the line of sight or when
/// the eye point and `desired` coincide. Otherwise the camera stops
/// `min_distance` short of the nearest hit, but never closer than
/// [`MIN_CAMERA_DISTANCE`] to the eye point.
pub fn resolve(
    registry: &GeometryRegistry,
    player_pos: Vec3,
    desired: Vec3,
    min_distance: f32,
) -> Vec3 {
    let origin = player_pos + EYE_OFFSET;
    let ray = desired - origin;
    let max_t = ray.length();
    if max_t < DEGENERATE_RAY_LENGTH {
        return desired;
    }

    let dir = ray / max_t;
    match registry.raycast(origin, dir, max_t) {
        Some(closest) => origin + dir * (closest - min_distance).max(MIN_CAMERA_DISTANCE),
        None => desired,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    /// Radians of yaw per unit of horizontal mouse motion.
    pub sensitivity_x: f32,
    /// Radians of pitch per unit of vertical mouse motion.
    pub sensitivity_y: f32,
    pub offset: Vec3,
    pub min_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity_x: 0.005,
            sensitivity_y: 0.0025,
            offset: Vec3::new(0.0, 2.0, 5.0),
            min_distance: 0.0,
        }
    }
}

/// Desired camera offset from the player, rotated by mouse look.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub offset: Vec3,
    pub min_distance: f32,
    sensitivity: Vec2,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            offset: config.offset,
            min_distance: config.min_distance,
            sensitivity: Vec2::new(config.sensitivity_x, config.sensitivity_y),
        }
    }

    /// Rotate the offset by a mouse delta (+x right, +y up).
    pub fn apply_mouse_delta(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        let mut offset = self.offset;

        if delta.x != 0.0 {
            let (sin_a, cos_a) = (delta.x * self.sensitivity.x).sin_cos();
            offset = Vec3::new(
                offset.x * cos_a - offset.z * sin_a,
                offset.y,
                offset.x * sin_a + offset.z * cos_a,
            );
        }

        if delta.y != 0.0 {
            let (sin_b, cos_b) = (delta.y * self.sensitivity.y).sin_cos();
            let reach = Vec2::new(offset.x, offset.z).length();
            let new_y = offset.y * cos_b - reach * sin_b;
            let new_reach = offset.y * sin_b + reach * cos_b;

            if reach > MIN_HORIZONTAL_REACH {
                let ratio = new_reach / reach;
                let new_x = offset.x * ratio;
                let new_z = offset.z * ratio;
                // Flipping sign would swing the camera over the top.
                if offset.x * new_x >= 0.0 && offset.z * new_z >= 0.0 {
                    offset = Vec3::new(new_x, new_y, new_z);
                }
            }
        }

        self.offset = offset;
    }

    pub fn desired_position(&self, player_pos: Vec3) -> Vec3 {
        player_pos + self.offset
    }

    /// Heading of the camera around the player, radians about +Y.
    pub fn yaw(&self) -> f32 {
        self.offset.x.atan2(self.offset.z)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> GeometryRegistry {
        let mut registry = GeometryRegistry::new();
        registry.add_box(
            Vec3::new(-10.0, -2.0, -10.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::splat(0.5),
        );
        registry
    }

    fn assert_vec_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn empty_registry_leaves_desired_untouched() {
        let registry = GeometryRegistry::new();
        let cases = [
            (Vec3::ZERO, Vec3::new(0.0, 2.0, 5.0), 0.0),
            (Vec3::new(3.0, -4.0, 1.0), Vec3::new(-8.0, 0.5, 2.0), 2.5),
            (Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 1.0), -3.0),
        ];
        for (player, desired, min_distance) in cases {
            assert_eq!(resolve(&registry, player, desired, min_distance), desired);
        }
    }

    #[test]
    fn camera_above_ground_is_not_clipped() {
        let desired = Vec3::new(0.0, 2.0, 5.0);
        assert_eq!(resolve(&ground(), Vec3::ZERO, desired, 0.0), desired);
    }

    #[test]
    fn underground_camera_stops_at_ground_top() {
        let resolved = resolve(&ground(), Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), 0.0);
        assert_vec_close(resolved, Vec3::ZERO);
    }

    #[test]
    fn wall_between_player_and_camera_pulls_camera_in() {
        let mut registry = ground();
        registry.add_box(
            Vec3::new(-5.0, -5.0, 2.0),
            Vec3::new(5.0, 5.0, 3.0),
            Vec3::ONE,
        );
        let resolved = resolve(&registry, Vec3::ZERO, Vec3::new(0.0, 1.0, 5.0), 0.5);
        assert_vec_close(resolved, Vec3::new(0.0, 1.0, 1.5));
    }

    #[test]
    fn resolved_distance_never_drops_below_floor() {
        let registry = ground();
        let origin = Vec3::ZERO + EYE_OFFSET;
        for min_distance in [-3.0, 0.0, 0.95, 1.0, 5.0, 100.0] {
            let resolved = resolve(&registry, Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), min_distance);
            let distance = resolved.distance(origin);
            assert!(
                distance >= MIN_CAMERA_DISTANCE - 1e-6,
                "min_distance {min_distance} gave {distance}"
            );
        }
        let resolved = resolve(&registry, Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), 5.0);
        assert_vec_close(resolved, Vec3::new(0.0, 0.9, 0.0));
    }

    #[test]
    fn desired_at_eye_point_is_returned_unchanged() {
        let desired = Vec3::ZERO + EYE_OFFSET;
        assert_eq!(resolve(&ground(), Vec3::ZERO, desired, 0.0), desired);
    }

    #[test]
    fn resolve_is_repeatable() {
        let registry = ground();
        let player = Vec3::new(1.0, 0.0, -2.0);
        let desired = Vec3::new(4.0, -3.0, 2.0);
        let first = resolve(&registry, player, desired, 0.2);
        let second = resolve(&registry, player, desired, 0.2);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_delta_keeps_offset() {
        let mut orbit = OrbitCamera::default();
        orbit.apply_mouse_delta(Vec2::ZERO);
        assert_eq!(orbit.offset, Vec3::new(0.0, 2.0, 5.0));
        assert_eq!(orbit.yaw(), 0.0);
    }

    #[test]
    fn yaw_rotates_in_ground_plane() {
        let mut orbit = OrbitCamera::default();
        let before = orbit.offset;
        orbit.apply_mouse_delta(Vec2::new(120.0, 0.0));

        assert!((orbit.offset.length() - before.length()).abs() < 1e-5);
        assert_eq!(orbit.offset.y, before.y);
        assert!(orbit.offset.x < 0.0, "positive x delta swings toward -x");
        assert!((orbit.yaw() + 120.0 * 0.005).abs() < 1e-5);
    }

    #[test]
    fn pitch_preserves_distance() {
        let mut orbit = OrbitCamera::default();
        orbit.offset = Vec3::new(3.0, 2.0, 4.0);
        let before = orbit.offset.length();
        orbit.apply_mouse_delta(Vec2::new(0.0, -80.0));

        assert!((orbit.offset.length() - before).abs() < 1e-4);
        assert!(orbit.offset.y > 2.0, "negative y delta raises the camera");
        assert!((orbit.offset.x / orbit.offset.z - 0.75).abs() < 1e-5);
    }

    #[test]
    fn pitch_refuses_to_swing_over_the_top() {
        let mut orbit = OrbitCamera::default();
        orbit.apply_mouse_delta(Vec2::new(0.0, 1000.0));
        assert_eq!(orbit.offset, Vec3::new(0.0, 2.0, 5.0));
    }

    #[test]
    fn pitch_is_skipped_when_looking_straight_down() {
        let mut orbit = OrbitCamera::new(CameraConfig {
            offset: Vec3::new(0.0, 5.0, 0.0),
            ..CameraConfig::default()
        });
        orbit.apply_mouse_delta(Vec2::new(0.0, 50.0));
        assert_eq!(orbit.offset, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn desired_position_follows_player() {
        let orbit = OrbitCamera::default();
        assert_eq!(
            orbit.desired_position(Vec3::new(1.0, 0.5, -1.0)),
            Vec3::new(1.0, 2.5, 4.0)
        );
    }
}
