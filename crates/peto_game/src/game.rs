//! Session state and the per-tick update order.

use glam::{Quat, Vec3};
use peto_core::animation::{AnimationSample, ClipTable};
use peto_core::input::InputSnapshot;
use peto_render::BoxInstance;

use crate::camera_rig::{self, CameraConfig, OrbitCamera, EYE_OFFSET};
use crate::geometry::GeometryRegistry;
use crate::level::LevelFile;
use crate::player_fsm::{PlayerConfig, PlayerState, PlayerStateMachine, TickInput, Transition};

/// Feet within this distance of the probed floor count as touching it.
const GROUND_CONTACT_TOLERANCE: f32 = 1e-3;

const PLAYER_SIZE: Vec3 = Vec3::new(0.6, 1.8, 0.6);
const NOSE_SIZE: Vec3 = Vec3::new(0.2, 0.2, 0.3);

pub struct GameContext {
    pub registry: GeometryRegistry,
    pub player: PlayerStateMachine,
    pub orbit: OrbitCamera,
    pub player_pos: Vec3,
    /// World-space heading of the player model, radians about +Y.
    pub player_yaw: f32,
    pub camera_pos: Vec3,
    pub level_id: String,
    ground_height: Option<f32>,
    clips: ClipTable,
}

impl GameContext {
    pub fn new(level: &LevelFile, clips: ClipTable, player_config: PlayerConfig) -> Self {
        let orbit = OrbitCamera::new(camera_config_from_level(level));
        let registry = GeometryRegistry::from_level(level);
        let player_pos = Vec3::from_array(level.player_spawn);
        let camera_pos = camera_rig::resolve(
            &registry,
            player_pos,
            orbit.desired_position(player_pos),
            orbit.min_distance,
        );
        let ground_height = registry.ground_height_below(player_pos, GROUND_CONTACT_TOLERANCE);

        Self {
            registry,
            player: PlayerStateMachine::new(player_config),
            orbit,
            player_pos,
            player_yaw: 0.0,
            camera_pos,
            level_id: level.level_id.clone(),
            ground_height,
            clips,
        }
    }

    /// Advance the session by one fixed step.
    pub fn tick(&mut self, snapshot: &InputSnapshot, dt: f32) -> Option<Transition> {
        self.orbit.apply_mouse_delta(snapshot.mouse_delta);

        self.ground_height = self.probe_ground();
        let ground_contact = self
            .ground_height
            .is_some_and(|ground| self.player_pos.y <= ground + GROUND_CONTACT_TOLERANCE);

        let transition = self.player.update(
            TickInput {
                input: snapshot,
                dt,
                ground_contact,
            },
            &self.clips,
        );

        let state = self.player.state();
        let camera_yaw = self.orbit.yaw();
        let axes = snapshot.move_axes();
        if state.allows_movement() && snapshot.is_moving() {
            let local = Vec3::new(axes.x, 0.0, axes.y).normalize();
            let world = Quat::from_rotation_y(camera_yaw) * local;
            self.player_pos += world * self.player.config.move_speed * dt;
        }
        self.player_yaw = camera_yaw + self.player.facing_yaw();

        if state.is_airborne() {
            let feet_before = self.player_pos.y;
            self.player_pos.y += self.player.physics.vertical_velocity * dt;
            // Only surfaces the feet started above can stop the fall.
            self.ground_height = self.probe_ground_from(feet_before);
            if let Some(ground) = self.ground_height {
                self.player_pos.y = self.player_pos.y.max(ground);
            }
        }

        self.camera_pos = camera_rig::resolve(
            &self.registry,
            self.player_pos,
            self.orbit.desired_position(self.player_pos),
            self.orbit.min_distance,
        );

        transition
    }

    /// Swap in new level geometry and camera settings between ticks.
    /// Player position and state machine carry over.
    pub fn replace_level(&mut self, level: &LevelFile) {
        self.registry = GeometryRegistry::from_level(level);
        self.orbit = OrbitCamera::new(camera_config_from_level(level));
        self.level_id = level.level_id.clone();
        self.ground_height = self.probe_ground();
        self.camera_pos = camera_rig::resolve(
            &self.registry,
            self.player_pos,
            self.orbit.desired_position(self.player_pos),
            self.orbit.min_distance,
        );
        log::info!(
            "Level '{}' applied: {} boxes",
            self.level_id,
            self.registry.len()
        );
    }

    pub fn animation_sample(&self) -> AnimationSample {
        self.player.sample()
    }

    pub fn ground_height(&self) -> Option<f32> {
        self.ground_height
    }

    /// Point the view camera looks at.
    pub fn view_target(&self) -> Vec3 {
        self.player_pos + EYE_OFFSET
    }

    pub fn camera_distance(&self) -> f32 {
        self.camera_pos.distance(self.view_target())
    }

    /// Body and facing marker for the player, tinted by state.
    pub fn player_instances(&self) -> [BoxInstance; 2] {
        let facing = Quat::from_rotation_y(self.player_yaw) * Vec3::Z;
        let body_center = self.player_pos + Vec3::Y * (PLAYER_SIZE.y * 0.5);
        let nose_center = self.player_pos
            + Vec3::Y * (PLAYER_SIZE.y * 0.8)
            + facing * (PLAYER_SIZE.z * 0.5 + NOSE_SIZE.z * 0.5);
        [
            BoxInstance {
                offset: body_center.to_array(),
                scale: PLAYER_SIZE.to_array(),
                color: state_color(self.player.state()),
            },
            BoxInstance {
                offset: nose_center.to_array(),
                scale: NOSE_SIZE.to_array(),
                color: [0.95, 0.95, 0.95],
            },
        ]
    }

    fn probe_ground(&self) -> Option<f32> {
        self.probe_ground_from(self.player_pos.y)
    }

    /// Highest surface at or below `feet_y` under the player's current column.
    fn probe_ground_from(&self, feet_y: f32) -> Option<f32> {
        let feet = Vec3::new(self.player_pos.x, feet_y, self.player_pos.z);
        self.registry
            .ground_height_below(feet, GROUND_CONTACT_TOLERANCE)
    }
}

fn camera_config_from_level(level: &LevelFile) -> CameraConfig {
    CameraConfig {
        offset: Vec3::from_array(level.camera.offset),
        min_distance: level.camera.min_distance,
        ..CameraConfig::default()
    }
}

fn state_color(state: PlayerState) -> [f32; 3] {
    match state {
        PlayerState::Idle => [0.85, 0.75, 0.35],
        PlayerState::Running => [0.35, 0.75, 0.35],
        PlayerState::Jumping => [0.35, 0.55, 0.95],
        PlayerState::Falling => [0.55, 0.35, 0.95],
        PlayerState::Shooting => [0.95, 0.35, 0.25],
        PlayerState::Swift => [0.95, 0.55, 0.15],
        PlayerState::Dangling => [0.75, 0.25, 0.55],
    }
}
