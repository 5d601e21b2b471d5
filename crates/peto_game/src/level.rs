use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Shortest camera offset the orbit math can still rotate meaningfully.
const MIN_CAMERA_OFFSET: f32 = 1e-3;

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    #[serde(default)]
    pub player_spawn: [f32; 3],
    #[serde(default)]
    pub camera: LevelCamera,
    pub boxes: Vec<LevelBoxDef>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelCamera {
    #[serde(default = "default_camera_offset")]
    pub offset: [f32; 3],
    #[serde(default)]
    pub min_distance: f32,
}

impl Default for LevelCamera {
    fn default() -> Self {
        Self {
            offset: default_camera_offset(),
            min_distance: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelBoxDef {
    pub id: String,
    pub min: [f32; 3],
    pub max: [f32; 3],
    #[serde(default = "default_box_color")]
    pub color: [f32; 3],
}

pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

pub fn load_level_from_path(level_path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(level_path)
        .map_err(|e| format!("Failed to read level file {}: {e}", level_path.display()))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", level_path.display()))?;
    validate_level(&level)?;
    Ok(level)
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    // The geometry registry trusts its input, so box shape is checked here.
    if level.version != "0.1" {
        return Err(format!(
            "Level validation failed: unsupported version '{}'",
            level.version
        ));
    }
    if level.boxes.is_empty() {
        return Err("Level validation failed: boxes array is empty".to_string());
    }

    let mut box_ids = HashSet::new();
    for level_box in &level.boxes {
        if !box_ids.insert(level_box.id.clone()) {
            return Err(format!(
                "Level validation failed: duplicate box id '{}'",
                level_box.id
            ));
        }
        for axis in 0..3 {
            if level_box.min[axis] > level_box.max[axis] {
                return Err(format!(
                    "Level validation failed: box '{}' has min > max on axis {}",
                    level_box.id,
                    ["x", "y", "z"][axis]
                ));
            }
        }
    }

    let [x, y, z] = level.camera.offset;
    if (x * x + y * y + z * z).sqrt() < MIN_CAMERA_OFFSET {
        return Err("Level validation failed: camera offset is zero-length".to_string());
    }

    Ok(())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

const fn default_camera_offset() -> [f32; 3] {
    [0.0, 2.0, 5.0]
}

const fn default_box_color() -> [f32; 3] {
    [0.6, 0.6, 0.6]
}
