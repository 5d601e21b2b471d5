//! Skeletal animation clip metadata and the driver boundary.
//!
//! The character model carries seven clips. Gameplay code never samples
//! keyframes itself: it decides *which* clip plays and *at what time* (in the
//! model's native ticks), and hands that pair to whatever evaluates the joint
//! palette. The only clip facts gameplay needs are duration and tick rate,
//! which live in a small JSON table next to the model.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Clip slots in the order the model stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationIndex {
    Dangling = 0,
    Falling = 1,
    Idle = 2,
    Jumping = 3,
    Running = 4,
    Shooting = 5,
    Swift = 6,
}

impl AnimationIndex {
    pub const COUNT: usize = 7;

    /// All slots in index order.
    pub const ALL: [AnimationIndex; Self::COUNT] = [
        Self::Dangling,
        Self::Falling,
        Self::Idle,
        Self::Jumping,
        Self::Running,
        Self::Shooting,
        Self::Swift,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dangling => "Dangling",
            Self::Falling => "Falling",
            Self::Idle => "Idle",
            Self::Jumping => "Jumping",
            Self::Running => "Running",
            Self::Shooting => "Shooting",
            Self::Swift => "Swift",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|index| index.name() == name)
    }
}

impl std::fmt::Display for AnimationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the gameplay side needs to know about a clip.
pub trait AnimationDriver {
    fn duration_in_ticks(&self, index: AnimationIndex) -> f32;
    fn ticks_per_second(&self, index: AnimationIndex) -> f32;
}

/// Clip selection and playback position produced once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSample {
    pub index: AnimationIndex,
    pub time_in_ticks: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration_ticks: f32,
    pub ticks_per_second: f32,
}

/// One clip per `AnimationIndex`, stored in index order.
#[derive(Debug, Clone)]
pub struct ClipTable {
    pub model: String,
    clips: Vec<AnimationClip>,
}

impl ClipTable {
    /// Build a table from clips given in `AnimationIndex` order.
    ///
    /// Panics unless slot `i` holds the clip named after `AnimationIndex::ALL[i]`:
    /// a short or shuffled table means the model and the gameplay code disagree
    /// about what clips exist.
    pub fn from_clips(model: &str, clips: Vec<AnimationClip>) -> Self {
        assert_eq!(
            clips.len(),
            AnimationIndex::COUNT,
            "clip table for '{}' must hold exactly {} clips",
            model,
            AnimationIndex::COUNT
        );
        for (index, clip) in AnimationIndex::ALL.into_iter().zip(&clips) {
            assert_eq!(
                clip.name,
                index.name(),
                "clip table for '{}' has '{}' in slot {} reserved for '{}'",
                model,
                clip.name,
                index.as_index(),
                index.name()
            );
        }
        Self {
            model: model.to_string(),
            clips,
        }
    }

    pub fn clip(&self, index: AnimationIndex) -> &AnimationClip {
        &self.clips[index.as_index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnimationIndex, &AnimationClip)> {
        AnimationIndex::ALL.into_iter().zip(self.clips.iter())
    }
}

impl AnimationDriver for ClipTable {
    fn duration_in_ticks(&self, index: AnimationIndex) -> f32 {
        self.clip(index).duration_ticks
    }

    fn ticks_per_second(&self, index: AnimationIndex) -> f32 {
        self.clip(index).ticks_per_second
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct ClipTableJson {
    version: String,
    model: String,
    clips: Vec<AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    name: String,
    duration_ticks: f32,
    #[serde(default = "default_ticks_per_second")]
    ticks_per_second: f32,
}

/// Load a clip table from disk.
pub fn load_clip_table(path: &Path) -> Result<ClipTable, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read clip table {}: {e}", path.display()))?;
    let json: ClipTableJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse clip table {}: {e}", path.display()))?;
    validate_clip_table_json(&json)?;

    let mut clips = json.clips;
    clips.sort_by_key(|clip| AnimationIndex::from_name(&clip.name).map(AnimationIndex::as_index));
    let clips = clips
        .into_iter()
        .map(|c| AnimationClip {
            name: c.name,
            duration_ticks: c.duration_ticks,
            ticks_per_second: c.ticks_per_second,
        })
        .collect();

    Ok(ClipTable::from_clips(&json.model, clips))
}

fn validate_clip_table_json(json: &ClipTableJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Clip table validation failed: unsupported version '{}'",
            json.version
        ));
    }
    let mut seen = HashSet::new();
    for clip in &json.clips {
        let Some(index) = AnimationIndex::from_name(&clip.name) else {
            return Err(format!(
                "Clip table validation failed: unknown clip '{}'",
                clip.name
            ));
        };
        if !seen.insert(index) {
            return Err(format!(
                "Clip table validation failed: duplicate clip '{}'",
                clip.name
            ));
        }
        if clip.duration_ticks <= 0.0 {
            return Err(format!(
                "Clip table validation failed: clip '{}' has non-positive duration",
                clip.name
            ));
        }
        if clip.ticks_per_second <= 0.0 {
            return Err(format!(
                "Clip table validation failed: clip '{}' has non-positive tick rate",
                clip.name
            ));
        }
    }
    for index in AnimationIndex::ALL {
        if !seen.contains(&index) {
            return Err(format!(
                "Clip table validation failed: missing clip '{}'",
                index
            ));
        }
    }
    Ok(())
}

const fn default_ticks_per_second() -> f32 {
    30.0
}
