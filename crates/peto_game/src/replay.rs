use glam::Vec2;
use peto_core::input::InputSnapshot;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReplayFrame {
    pub move_left: bool,
    pub move_right: bool,
    pub move_forward: bool,
    pub move_backward: bool,
    pub jump_pressed: bool,
    pub mouse_left_down: bool,
    /// Mouse-look delta delivered on the first tick of the frame only.
    pub mouse_delta: [f32; 2],
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<InputSnapshot> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for i in 0..frame.repeat.max(1) {
                let mouse_delta = if i == 0 {
                    Vec2::from_array(frame.mouse_delta)
                } else {
                    Vec2::ZERO
                };
                out.push(InputSnapshot {
                    move_left: frame.move_left,
                    move_right: frame.move_right,
                    move_forward: frame.move_forward,
                    move_backward: frame.move_backward,
                    jump_pressed: frame.jump_pressed,
                    mouse_left_down: frame.mouse_left_down,
                    mouse_delta,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameContext;
    use crate::level::{LevelBoxDef, LevelCamera, LevelFile};
    use crate::player_fsm::{PlayerConfig, PlayerState};
    use peto_core::animation::{AnimationClip, ClipTable};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "peto_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_level() -> LevelFile {
        let boxes = [
            ("ground", [-30.0, -2.0, -30.0], [30.0, 0.0, 30.0]),
            ("step", [-3.0, 0.0, -8.0], [3.0, 1.5, -5.0]),
            ("pillar", [4.0, 0.0, 1.0], [5.0, 4.0, 2.0]),
        ];
        LevelFile {
            version: "0.1".to_string(),
            level_id: "replay".to_string(),
            player_spawn: [0.0, 0.0, 0.0],
            camera: LevelCamera::default(),
            boxes: boxes
                .iter()
                .map(|(id, min, max)| LevelBoxDef {
                    id: id.to_string(),
                    min: *min,
                    max: *max,
                    color: [0.5, 0.5, 0.5],
                })
                .collect(),
        }
    }

    fn sample_clips() -> ClipTable {
        ClipTable::from_clips(
            "replay",
            [
                ("Dangling", 24.0),
                ("Falling", 18.0),
                ("Idle", 48.0),
                ("Jumping", 36.0),
                ("Running", 24.0),
                ("Shooting", 12.0),
                ("Swift", 9.0),
            ]
            .iter()
            .map(|(name, duration)| AnimationClip {
                name: name.to_string(),
                duration_ticks: *duration,
                ticks_per_second: 24.0,
            })
            .collect(),
        )
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "move_forward": true, "mouse_delta": [12.0, -4.0], "repeat": 3 },
                { "jump_pressed": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].move_forward);
        assert_eq!(expanded[0].mouse_delta, Vec2::new(12.0, -4.0));
        assert_eq!(expanded[1].mouse_delta, Vec2::ZERO);
        assert!(expanded[3].jump_pressed);
        assert!(!expanded[3].move_forward);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "move_forward": true, "repeat": 40 },
                { "move_forward": true, "jump_pressed": true },
                { "move_forward": true, "mouse_delta": [-90.0, 20.0], "repeat": 70 },
                { "repeat": 90 },
                { "mouse_left_down": true, "repeat": 80 },
                { "move_right": true, "mouse_delta": [200.0, 0.0], "repeat": 45 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_inputs();

        let mut run_a = GameContext::new(&sample_level(), sample_clips(), PlayerConfig::default());
        let mut run_b = GameContext::new(&sample_level(), sample_clips(), PlayerConfig::default());
        let mut states_a = Vec::new();
        let mut states_b = Vec::new();
        for input in &inputs {
            run_a.tick(input, replay.fixed_dt);
            states_a.push(run_a.player.state());
        }
        for input in &inputs {
            run_b.tick(input, replay.fixed_dt);
            states_b.push(run_b.player.state());
        }

        assert_eq!(states_a, states_b);
        assert!(states_a.contains(&PlayerState::Jumping));
        assert!(states_a.contains(&PlayerState::Shooting));
        assert_eq!(run_a.player_pos, run_b.player_pos);
        assert_eq!(run_a.camera_pos, run_b.camera_pos);
        assert_eq!(run_a.orbit.offset, run_b.orbit.offset);
        assert_eq!(run_a.animation_sample(), run_b.animation_sample());
        assert_eq!(
            run_a.player.physics.vertical_velocity,
            run_b.player.physics.vertical_velocity
        );
        assert_eq!(run_a.player.transition_count(), run_b.player.transition_count());

        let _ = fs::remove_file(path);
    }
}
