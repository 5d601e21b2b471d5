//! Peto Controller -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. Simulation runs inside
//! `RedrawRequested` on a fixed timestep (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- snapshot input, run one `GameContext::tick`
//!   3. Upload box instances (level + player proxy) and the camera uniform
//!   4. Draw the boxes, then composite the egui overlay
//!
//! The level file is watched via mtime polling and swapped in at frame
//! boundaries, never in the middle of a tick.

mod camera_rig;
mod game;
mod geometry;
mod level;
mod player_fsm;
mod raycast;
#[cfg(test)]
mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use game::GameContext;
use level::{load_level_from_path, LevelWatcher};
use peto_core::animation::load_clip_table;
use peto_core::input::{InputState, Key, MouseBtn};
use peto_core::time::TimeState;
use peto_devtools::{DebugOverlay, OverlayStats};
use peto_platform::window::{capture_cursor, release_cursor, PlatformConfig};
use peto_render::{BoxPipeline, Camera3D, GpuContext};
use player_fsm::{LandingRule, PlayerConfig};

const LEVEL_PATH: &str = "assets/levels/default_level.json";
const CLIP_TABLE_PATH: &str = "assets/animations/peto_clips.json";
const LANDING_RULE: LandingRule = LandingRule::AnimationLoop;

/// All mutable engine state. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera3D,
    box_pipeline: BoxPipeline,
    debug_overlay: DebugOverlay,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    level_path: PathBuf,
    level_watcher: LevelWatcher,
    game: GameContext,

    paused: bool,
    single_step_requested: bool,
    cursor_captured: bool,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let box_pipeline = BoxPipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let level_path = PathBuf::from(LEVEL_PATH);
        let level_watcher = LevelWatcher::new(level_path.clone());
        let level = load_level_from_path(&level_path).unwrap_or_else(|err| {
            panic!(
                "Failed to load initial level '{}': {}",
                level_path.display(),
                err
            );
        });
        let clip_path = PathBuf::from(CLIP_TABLE_PATH);
        let clips = load_clip_table(&clip_path).unwrap_or_else(|err| {
            panic!(
                "Failed to load clip table '{}': {}",
                clip_path.display(),
                err
            );
        });
        log::info!(
            "Loaded level '{}' ({} boxes) and clip table for '{}'",
            level.level_id,
            level.boxes.len(),
            clips.model
        );

        let game = GameContext::new(
            &level,
            clips,
            PlayerConfig {
                landing_rule: LANDING_RULE,
                ..PlayerConfig::default()
            },
        );

        let mut camera = Camera3D::new(gpu.size.0, gpu.size.1);
        camera.eye = game.camera_pos;
        camera.target = game.view_target();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = box_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        let mut state = Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            box_pipeline,
            debug_overlay,
            camera_buffer,
            camera_bind_group,
            level_path,
            level_watcher,
            game,
            paused: false,
            single_step_requested: false,
            cursor_captured: false,
        };
        state.upload_instances();
        state
    }

    fn reload_level(&mut self, reason: &str) {
        match load_level_from_path(&self.level_path) {
            Ok(level) => {
                log::info!(
                    "Reloading level '{}' ({})",
                    self.level_path.display(),
                    reason
                );
                self.game.replace_level(&level);
                self.upload_instances();
            }
            Err(err) => {
                log::error!("Level reload failed ({}), keeping previous level: {}", reason, err);
            }
        }
    }

    fn upload_instances(&mut self) {
        let mut instances = self.game.registry.instances();
        instances.extend(self.game.player_instances());
        self.box_pipeline
            .upload_instances(&self.gpu.device, &self.gpu.queue, &instances);
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        if captured {
            self.cursor_captured = capture_cursor(&self.window);
        } else {
            release_cursor(&self.window);
            self.cursor_captured = false;
        }
    }

    /// Edge-triggered shortcuts, handled once per physical press.
    fn handle_hotkey(&mut self, key: Key, event_loop: &ActiveEventLoop) {
        match key {
            Key::Escape => {
                if self.cursor_captured {
                    self.set_cursor_captured(false);
                } else {
                    log::info!("Escape pressed, exiting.");
                    event_loop.exit();
                }
            }
            Key::F3 => self.debug_overlay.toggle(),
            Key::P => self.toggle_pause(),
            Key::N if self.paused => self.single_step_requested = true,
            Key::R => self.reload_level("manual trigger (R)"),
            _ => {}
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!(
            "Simulation {}",
            if self.paused { "PAUSED" } else { "RESUMED" }
        );
    }

    fn overlay_stats(&self) -> OverlayStats {
        let sample = self.game.animation_sample();
        OverlayStats {
            level_id: self.game.level_id.clone(),
            player_state: self.game.player.state().to_string(),
            animation: sample.index.to_string(),
            animation_ticks: sample.time_in_ticks,
            clip_clock_ticks: self.game.player.time_in_ticks(),
            vertical_velocity: self.game.player.physics.vertical_velocity,
            player_pos: self.game.player_pos.to_array(),
            ground_height: self.game.ground_height(),
            camera_distance: self.game.camera_distance(),
            box_count: self.game.registry.len() as u32,
            transitions: self.game.player.transition_count(),
            landing_rule: format!("{:?}", self.game.player.config.landing_rule),
            cursor_captured: self.cursor_captured,
            paused: self.paused,
        }
    }

    fn redraw(&mut self) {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return;
        }

        // Fixed-step simulation phase.
        self.time.begin_frame();
        if self.level_watcher.should_reload() {
            self.reload_level("file watcher");
        }

        let dt = self.time.step_dt();
        while self.time.should_step() {
            if self.paused && !self.single_step_requested {
                break;
            }
            self.single_step_requested = false;

            let snapshot = self.input.snapshot();
            if let Some(transition) = self.game.tick(&snapshot, dt) {
                log::debug!(
                    "Step {}: {} -> {}",
                    self.time.fixed_step_count,
                    transition.from,
                    transition.to
                );
            }
        }
        self.time.end_frame();

        if self.time.steps_this_frame > 0 {
            self.upload_instances();
        }

        // Render phase reads finalized simulation state from this frame.
        self.camera.eye = self.game.camera_pos;
        self.camera.target = self.game.view_target();
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.debug_overlay.prepare(&self.window, &self.time, &stats);

        if overlay_actions.toggle_pause {
            self.toggle_pause();
        }
        if overlay_actions.single_step {
            self.single_step_requested = true;
        }
        if overlay_actions.reload_level {
            self.reload_level("overlay button");
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.45,
                            g: 0.62,
                            b: 0.85,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            self.box_pipeline
                .draw(&mut render_pass, &self.camera_bind_group);
        }

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // Only clear edge-triggered input after at least one fixed step
        // consumed it, so a press on a zero-step frame is not lost.
        if self.time.steps_this_frame > 0 {
            self.input.end_frame();
        }
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = peto_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.cursor_captured {
                state.input.add_mouse_motion(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                state.input.release_all();
                if state.cursor_captured {
                    state.set_cursor_captured(false);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                let PhysicalKey::Code(key_code) = event.physical_key else {
                    return;
                };
                let Some(key) = map_key(key_code) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        if !event.repeat {
                            state.handle_hotkey(key, event_loop);
                        }
                        state.input.key_down(key);
                    }
                    ElementState::Released => state.input.key_up(key),
                }
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } if !egui_consumed => {
                let Some(btn) = map_mouse_button(button) else {
                    return;
                };
                match button_state {
                    ElementState::Pressed => {
                        // The click that grabs the cursor does not also fire.
                        if btn == MouseBtn::Left && !state.cursor_captured {
                            state.set_cursor_captured(true);
                            return;
                        }
                        state.input.mouse_down(btn);
                    }
                    ElementState::Released => state.input.mouse_up(btn),
                }
            }

            WindowEvent::RedrawRequested => state.redraw(),

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyN => Some(Key::N),
        KeyCode::KeyP => Some(Key::P),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn map_mouse_button(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        MouseButton::Right => Some(MouseBtn::Right),
        MouseButton::Middle => Some(MouseBtn::Middle),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Peto Controller starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
