//! Input state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every frame the key
//!   is physically down. Movement, jump and the fire button are all level-triggered
//!   from the player's point of view.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only during the frame
//!   the transition happened, cleared by `end_frame()`. The main loop calls it only
//!   after at least one fixed simulation step ran, so a press on a zero-step frame is
//!   not lost. Used for toggles (overlay, pause, reload).
//!
//! Mouse-look motion is accumulated between ticks and drained by `snapshot()`, so
//! each delta is applied to the camera exactly once.

use std::collections::HashSet;

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Space,
    F3,
    W,
    A,
    S,
    D,
    N,
    P,
    R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
    Middle,
}

/// Per-tick view of the player-facing controls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub move_left: bool,
    pub move_right: bool,
    pub move_forward: bool,
    pub move_backward: bool,
    pub jump_pressed: bool,
    pub mouse_left_down: bool,
    /// Mouse-look delta since the previous snapshot. +x is right, +y is up.
    pub mouse_delta: Vec2,
}

impl InputSnapshot {
    /// Combined movement vector in player-local axes: x = right, y = backward.
    /// Opposing keys cancel out.
    pub fn move_axes(&self) -> Vec2 {
        let x = self.move_right as i32 - self.move_left as i32;
        let y = self.move_backward as i32 - self.move_forward as i32;
        Vec2::new(x as f32, y as f32)
    }

    pub fn is_moving(&self) -> bool {
        self.move_axes() != Vec2::ZERO
    }
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,

    mouse_held: HashSet<MouseBtn>,
    mouse_just_pressed: HashSet<MouseBtn>,
    mouse_just_released: HashSet<MouseBtn>,

    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_just_pressed: HashSet::new(),
            mouse_just_released: HashSet::new(),
            mouse_delta: Vec2::ZERO,
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        if self.mouse_held.insert(btn) {
            self.mouse_just_pressed.insert(btn);
        }
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        if self.mouse_held.remove(&btn) {
            self.mouse_just_released.insert(btn);
        }
    }

    /// Accumulate raw device motion. Screen-space y grows downward, so it is
    /// flipped here to keep "mouse up" positive for the orbit pitch.
    pub fn add_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta += Vec2::new(dx as f32, -dy as f32);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    pub fn is_mouse_just_pressed(&self, btn: MouseBtn) -> bool {
        self.mouse_just_pressed.contains(&btn)
    }

    pub fn is_mouse_just_released(&self, btn: MouseBtn) -> bool {
        self.mouse_just_released.contains(&btn)
    }

    /// Sample the player bindings and drain the accumulated mouse delta.
    pub fn snapshot(&mut self) -> InputSnapshot {
        let mouse_delta = std::mem::take(&mut self.mouse_delta);
        InputSnapshot {
            move_left: self.is_held(Key::A) || self.is_held(Key::Left),
            move_right: self.is_held(Key::D) || self.is_held(Key::Right),
            move_forward: self.is_held(Key::W) || self.is_held(Key::Up),
            move_backward: self.is_held(Key::S) || self.is_held(Key::Down),
            jump_pressed: self.is_held(Key::Space),
            mouse_left_down: self.is_mouse_held(MouseBtn::Left),
            mouse_delta,
        }
    }

    /// Drop everything held. Used when the window loses focus so keys released
    /// elsewhere do not stay stuck down.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
        for btn in self.mouse_held.drain() {
            self.mouse_just_released.insert(btn);
        }
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
