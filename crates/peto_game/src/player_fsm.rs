//! Player behaviour as a closed state machine.
//!
//! Each state owns one animation clip and a short list of exit predicates.
//! `update` advances the clip, integrates vertical velocity for airborne
//! states, publishes the resolved animation sample, then asks the current
//! state where to go next. The answer is applied only after the state's own
//! update has finished, so `enter`/`exit` never run in the middle of another
//! state's logic.

use glam::Vec2;
use peto_core::animation::{AnimationDriver, AnimationIndex, AnimationSample};
use peto_core::input::InputSnapshot;

/// Fraction of a clip's length used as the held pose for play-once clips.
pub const HOLD_FRACTION: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Idle,
    Running,
    Jumping,
    Falling,
    Dangling,
    Shooting,
    Swift,
}

impl PlayerState {
    pub fn animation(self) -> AnimationIndex {
        match self {
            Self::Idle => AnimationIndex::Idle,
            Self::Running => AnimationIndex::Running,
            Self::Jumping => AnimationIndex::Jumping,
            Self::Falling => AnimationIndex::Falling,
            Self::Dangling => AnimationIndex::Dangling,
            Self::Shooting => AnimationIndex::Shooting,
            Self::Swift => AnimationIndex::Swift,
        }
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, Self::Jumping | Self::Falling)
    }

    /// States in which horizontal input moves the player.
    pub fn allows_movement(self) -> bool {
        matches!(self, Self::Running | Self::Jumping | Self::Falling)
    }

    fn playback(self) -> Playback {
        match self {
            Self::Idle | Self::Running | Self::Falling | Self::Dangling => Playback::Loop,
            Self::Shooting | Self::Swift => Playback::Once,
            Self::Jumping => Playback::RiseThenHold,
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.animation().name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Loop,
    Once,
    /// Double speed through the first half of the clip, then hold near its end.
    RiseThenHold,
}

/// How Falling decides that the player has landed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LandingRule {
    /// Velocity is non-positive and the falling clip just completed a loop.
    #[default]
    AnimationLoop,
    /// Velocity is non-positive and the ground probe reports contact.
    GroundContact,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    pub gravity: f32,
    pub jump_speed: f32,
    pub move_speed: f32,
    pub landing_rule: LandingRule,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            jump_speed: 10.0,
            move_speed: 4.0,
            landing_rule: LandingRule::AnimationLoop,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPhysicsState {
    pub vertical_velocity: f32,
}

/// Everything one update reads besides the machine itself.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    pub input: &'a InputSnapshot,
    pub dt: f32,
    pub ground_contact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlayerState,
    pub to: PlayerState,
}

/// Per-tick clip facts handed to the exit predicates.
#[derive(Debug, Clone, Copy)]
struct ClipProgress {
    timer_end: bool,
    holding_apex: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerStateMachine {
    state: PlayerState,
    time_in_ticks: f32,
    sample: AnimationSample,
    pub physics: PlayerPhysicsState,
    facing_yaw: f32,
    transition_count: u64,
    pub config: PlayerConfig,
}

impl PlayerStateMachine {
    pub fn new(config: PlayerConfig) -> Self {
        let mut machine = Self {
            state: PlayerState::Idle,
            time_in_ticks: 0.0,
            sample: AnimationSample {
                index: AnimationIndex::Idle,
                time_in_ticks: 0.0,
            },
            physics: PlayerPhysicsState::default(),
            facing_yaw: 0.0,
            transition_count: 0,
            config,
        };
        machine.enter(PlayerState::Idle);
        machine
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn sample(&self) -> AnimationSample {
        self.sample
    }

    /// Raw clip clock of the current state, before looping/holding is applied.
    pub fn time_in_ticks(&self) -> f32 {
        self.time_in_ticks
    }

    /// Facing relative to the camera, radians about +Y. Zero faces +Z.
    pub fn facing_yaw(&self) -> f32 {
        self.facing_yaw
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn update(
        &mut self,
        tick: TickInput<'_>,
        clips: &impl AnimationDriver,
    ) -> Option<Transition> {
        let progress = self.advance_clip(tick.dt, clips);

        if self.state.is_airborne() {
            self.physics.vertical_velocity -= self.config.gravity * tick.dt;
        }

        if self.state == PlayerState::Running {
            let axes = tick.input.move_axes();
            if axes != Vec2::ZERO {
                self.facing_yaw = axes.x.atan2(axes.y);
            }
        }

        let next = self.next_state(&tick, progress)?;
        let transition = Transition {
            from: self.state,
            to: next,
        };
        self.change_state(next);
        Some(transition)
    }

    fn advance_clip(&mut self, dt: f32, clips: &impl AnimationDriver) -> ClipProgress {
        let index = self.state.animation();
        let duration = clips.duration_in_ticks(index);
        self.time_in_ticks += dt * clips.ticks_per_second(index);

        let mut progress = ClipProgress {
            timer_end: false,
            holding_apex: false,
        };
        let sample_time = match self.state.playback() {
            Playback::Loop => {
                if self.time_in_ticks >= duration {
                    self.time_in_ticks = self.time_in_ticks.rem_euclid(duration);
                    progress.timer_end = true;
                }
                self.time_in_ticks
            }
            Playback::Once => {
                if self.time_in_ticks >= duration {
                    self.time_in_ticks = duration;
                    progress.timer_end = true;
                    duration * HOLD_FRACTION
                } else {
                    self.time_in_ticks
                }
            }
            Playback::RiseThenHold => {
                if self.time_in_ticks < duration * 0.5 {
                    self.time_in_ticks * 2.0
                } else {
                    progress.holding_apex = true;
                    duration * HOLD_FRACTION
                }
            }
        };

        self.sample = AnimationSample {
            index,
            time_in_ticks: sample_time,
        };
        progress
    }

    fn next_state(&self, tick: &TickInput<'_>, progress: ClipProgress) -> Option<PlayerState> {
        let input = tick.input;
        let v = self.physics.vertical_velocity;
        match self.state {
            PlayerState::Idle => {
                if input.is_moving() {
                    Some(PlayerState::Running)
                } else if input.jump_pressed {
                    Some(PlayerState::Jumping)
                } else if input.mouse_left_down {
                    Some(PlayerState::Shooting)
                } else {
                    None
                }
            }
            PlayerState::Running => {
                if !input.is_moving() {
                    Some(PlayerState::Idle)
                } else if input.jump_pressed {
                    Some(PlayerState::Jumping)
                } else if input.mouse_left_down {
                    Some(PlayerState::Shooting)
                } else {
                    None
                }
            }
            PlayerState::Jumping => {
                if v <= -self.config.jump_speed {
                    Some(PlayerState::Falling)
                } else if progress.holding_apex && input.mouse_left_down {
                    Some(PlayerState::Shooting)
                } else {
                    None
                }
            }
            PlayerState::Falling => {
                let landed = v <= 0.0
                    && match self.config.landing_rule {
                        LandingRule::AnimationLoop => progress.timer_end,
                        LandingRule::GroundContact => tick.ground_contact,
                    };
                if input.mouse_left_down {
                    Some(PlayerState::Shooting)
                } else if landed {
                    Some(PlayerState::Idle)
                } else {
                    None
                }
            }
            PlayerState::Shooting => {
                if progress.timer_end {
                    Some(PlayerState::Swift)
                } else if !input.mouse_left_down {
                    Some(PlayerState::Idle)
                } else {
                    None
                }
            }
            PlayerState::Swift => {
                if progress.timer_end {
                    Some(PlayerState::Dangling)
                } else if !input.mouse_left_down {
                    Some(PlayerState::Idle)
                } else {
                    None
                }
            }
            PlayerState::Dangling => (!input.mouse_left_down).then_some(PlayerState::Idle),
        }
    }

    /// The only place the current state changes.
    fn change_state(&mut self, next: PlayerState) {
        self.exit(self.state);
        self.state = next;
        self.transition_count += 1;
        self.enter(next);
    }

    fn enter(&mut self, state: PlayerState) {
        self.time_in_ticks = 0.0;
        self.sample = AnimationSample {
            index: state.animation(),
            time_in_ticks: 0.0,
        };
        if state == PlayerState::Jumping {
            self.physics.vertical_velocity = self.config.jump_speed;
        }
        log::debug!("Player enter {state}");
    }

    fn exit(&mut self, state: PlayerState) {
        log::debug!(
            "Player exit {state} after {:.1} ticks (v = {:.2})",
            self.time_in_ticks,
            self.physics.vertical_velocity
        );
    }
}

impl Default for PlayerStateMachine {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peto_core::animation::{AnimationClip, ClipTable};

    const DT: f32 = 1.0 / 60.0;

    /// 30 ticks per second everywhere; durations chosen so loops and
    /// once-clips finish after a known number of 1/60 s updates.
    fn clips() -> ClipTable {
        let durations = [
            ("Dangling", 20.0),
            ("Falling", 15.0),
            ("Idle", 40.0),
            ("Jumping", 30.0),
            ("Running", 20.0),
            ("Shooting", 10.0),
            ("Swift", 5.0),
        ];
        ClipTable::from_clips(
            "test",
            durations
                .iter()
                .map(|(name, duration)| AnimationClip {
                    name: name.to_string(),
                    duration_ticks: *duration,
                    ticks_per_second: 30.0,
                })
                .collect(),
        )
    }

    fn step(
        machine: &mut PlayerStateMachine,
        input: &InputSnapshot,
        table: &ClipTable,
    ) -> Option<Transition> {
        step_with_ground(machine, input, table, false)
    }

    fn step_with_ground(
        machine: &mut PlayerStateMachine,
        input: &InputSnapshot,
        table: &ClipTable,
        ground_contact: bool,
    ) -> Option<Transition> {
        machine.update(
            TickInput {
                input,
                dt: DT,
                ground_contact,
            },
            table,
        )
    }

    fn holding_mouse() -> InputSnapshot {
        InputSnapshot {
            mouse_left_down: true,
            ..InputSnapshot::default()
        }
    }

    #[test]
    fn starts_idle_with_idle_clip() {
        let machine = PlayerStateMachine::default();
        assert_eq!(machine.state(), PlayerState::Idle);
        assert_eq!(machine.sample().index, AnimationIndex::Idle);
        assert_eq!(machine.transition_count(), 0);
    }

    #[test]
    fn idle_without_input_stays_idle_for_a_thousand_ticks() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let idle = InputSnapshot::default();
        let duration = table.duration_in_ticks(AnimationIndex::Idle);

        for _ in 0..1000 {
            assert_eq!(step(&mut machine, &idle, &table), None);
            assert_eq!(machine.state(), PlayerState::Idle);
            let t = machine.sample().time_in_ticks;
            assert!((0.0..duration).contains(&t), "idle sample {t} out of range");
        }
        assert_eq!(machine.transition_count(), 0);
    }

    #[test]
    fn forward_input_switches_idle_to_running_once() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let forward = InputSnapshot {
            move_forward: true,
            ..InputSnapshot::default()
        };

        let transition = step(&mut machine, &forward, &table);
        assert_eq!(
            transition,
            Some(Transition {
                from: PlayerState::Idle,
                to: PlayerState::Running
            })
        );
        assert_eq!(machine.sample().index, AnimationIndex::Running);
        assert_eq!(machine.transition_count(), 1);

        assert_eq!(step(&mut machine, &forward, &table), None);
        assert_eq!(machine.transition_count(), 1);
    }

    #[test]
    fn idle_predicates_follow_priority_order() {
        let table = clips();
        let everything = InputSnapshot {
            move_right: true,
            jump_pressed: true,
            mouse_left_down: true,
            ..InputSnapshot::default()
        };
        let mut machine = PlayerStateMachine::default();
        step(&mut machine, &everything, &table);
        assert_eq!(machine.state(), PlayerState::Running);

        let jump_and_shoot = InputSnapshot {
            jump_pressed: true,
            mouse_left_down: true,
            ..InputSnapshot::default()
        };
        let mut machine = PlayerStateMachine::default();
        step(&mut machine, &jump_and_shoot, &table);
        assert_eq!(machine.state(), PlayerState::Jumping);

        let mut machine = PlayerStateMachine::default();
        step(&mut machine, &holding_mouse(), &table);
        assert_eq!(machine.state(), PlayerState::Shooting);
    }

    #[test]
    fn opposing_keys_cancel_and_do_not_start_running() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let both = InputSnapshot {
            move_left: true,
            move_right: true,
            ..InputSnapshot::default()
        };
        assert_eq!(step(&mut machine, &both, &table), None);
        assert_eq!(machine.state(), PlayerState::Idle);
    }

    #[test]
    fn running_tracks_facing_and_returns_to_idle() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let right = InputSnapshot {
            move_right: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &right, &table);
        step(&mut machine, &right, &table);
        assert!((machine.facing_yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        let back = InputSnapshot {
            move_backward: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &back, &table);
        assert!(machine.facing_yaw().abs() < 1e-6);

        step(&mut machine, &InputSnapshot::default(), &table);
        assert_eq!(machine.state(), PlayerState::Idle);
    }

    #[test]
    fn running_prefers_jump_over_shooting() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let run = InputSnapshot {
            move_forward: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &run, &table);
        let run_jump_shoot = InputSnapshot {
            jump_pressed: true,
            mouse_left_down: true,
            ..run
        };
        step(&mut machine, &run_jump_shoot, &table);
        assert_eq!(machine.state(), PlayerState::Jumping);
    }

    #[test]
    fn jump_sets_launch_speed_and_falls_once_velocity_reverses() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let jump = InputSnapshot {
            jump_pressed: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &jump, &table);
        assert_eq!(machine.state(), PlayerState::Jumping);
        assert_eq!(machine.physics.vertical_velocity, 10.0);

        // 2 * 10 / (9.8 / 60) = 122.4, so the 123rd update lands below -10.
        let idle = InputSnapshot::default();
        for tick in 0..122 {
            assert_eq!(step(&mut machine, &idle, &table), None, "tick {tick}");
        }
        assert_eq!(machine.state(), PlayerState::Jumping);
        assert!(machine.physics.vertical_velocity > -10.0);

        let transition = step(&mut machine, &idle, &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Falling));
        assert!(machine.physics.vertical_velocity <= -10.0);
    }

    #[test]
    fn jump_clip_rises_at_double_speed_then_holds() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let jump = InputSnapshot {
            jump_pressed: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &jump, &table);

        let idle = InputSnapshot::default();
        // Half of 30 ticks at 0.5 ticks per update takes 30 updates.
        for _ in 0..10 {
            step(&mut machine, &idle, &table);
        }
        let sample = machine.sample();
        assert_eq!(sample.index, AnimationIndex::Jumping);
        assert!((sample.time_in_ticks - 10.0).abs() < 1e-4);

        for _ in 0..25 {
            step(&mut machine, &idle, &table);
        }
        assert!((machine.sample().time_in_ticks - 30.0 * HOLD_FRACTION).abs() < 1e-4);
    }

    #[test]
    fn jump_apex_can_be_interrupted_by_shooting() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let jump = InputSnapshot {
            jump_pressed: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &jump, &table);

        // Still rising: the click is ignored.
        for _ in 0..5 {
            step(&mut machine, &holding_mouse(), &table);
        }
        assert_eq!(machine.state(), PlayerState::Jumping);

        let idle = InputSnapshot::default();
        for _ in 0..30 {
            step(&mut machine, &idle, &table);
        }
        let transition = step(&mut machine, &holding_mouse(), &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Shooting));
    }

    fn falling_machine(rule: LandingRule, table: &ClipTable) -> PlayerStateMachine {
        let mut machine = PlayerStateMachine::new(PlayerConfig {
            landing_rule: rule,
            ..PlayerConfig::default()
        });
        let jump = InputSnapshot {
            jump_pressed: true,
            ..InputSnapshot::default()
        };
        step(&mut machine, &jump, table);
        while machine.state() == PlayerState::Jumping {
            step(&mut machine, &InputSnapshot::default(), table);
        }
        assert_eq!(machine.state(), PlayerState::Falling);
        machine
    }

    #[test]
    fn falling_lands_when_clip_loops_by_default() {
        let table = clips();
        let mut machine = falling_machine(LandingRule::AnimationLoop, &table);
        let idle = InputSnapshot::default();

        // 15 ticks at 0.5 per update loops on the 30th update.
        for _ in 0..29 {
            assert_eq!(step(&mut machine, &idle, &table), None);
        }
        let transition = step(&mut machine, &idle, &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Idle));
    }

    #[test]
    fn falling_waits_for_ground_contact_under_ground_rule() {
        let table = clips();
        let mut machine = falling_machine(LandingRule::GroundContact, &table);
        let idle = InputSnapshot::default();

        for _ in 0..100 {
            assert_eq!(step_with_ground(&mut machine, &idle, &table, false), None);
        }
        assert_eq!(machine.state(), PlayerState::Falling);

        let transition = step_with_ground(&mut machine, &idle, &table, true);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Idle));
    }

    #[test]
    fn shooting_while_falling_preempts_landing() {
        let table = clips();
        let mut machine = falling_machine(LandingRule::GroundContact, &table);
        let transition = step_with_ground(&mut machine, &holding_mouse(), &table, true);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Shooting));
    }

    #[test]
    fn held_fire_chains_shooting_swift_dangling_then_release_idles() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        let fire = holding_mouse();

        step(&mut machine, &fire, &table);
        assert_eq!(machine.state(), PlayerState::Shooting);

        // Shooting is 10 ticks: 20 updates.
        for _ in 0..19 {
            assert_eq!(step(&mut machine, &fire, &table), None);
        }
        let transition = step(&mut machine, &fire, &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Swift));
        assert!((machine.sample().time_in_ticks).abs() < 1e-6);

        // Swift is 5 ticks: 10 updates.
        for _ in 0..9 {
            assert_eq!(step(&mut machine, &fire, &table), None);
        }
        let transition = step(&mut machine, &fire, &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Dangling));

        for _ in 0..200 {
            assert_eq!(step(&mut machine, &fire, &table), None);
        }
        assert_eq!(machine.state(), PlayerState::Dangling);

        let transition = step(&mut machine, &InputSnapshot::default(), &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Idle));
        assert_eq!(machine.transition_count(), 4);
    }

    #[test]
    fn releasing_fire_early_returns_to_idle() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        step(&mut machine, &holding_mouse(), &table);
        for _ in 0..5 {
            step(&mut machine, &holding_mouse(), &table);
        }
        let transition = step(&mut machine, &InputSnapshot::default(), &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Idle));

        step(&mut machine, &holding_mouse(), &table);
        for _ in 0..20 {
            step(&mut machine, &holding_mouse(), &table);
        }
        assert_eq!(machine.state(), PlayerState::Swift);
        let transition = step(&mut machine, &InputSnapshot::default(), &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Idle));
    }

    #[test]
    fn once_clip_timer_end_beats_release_on_same_tick() {
        let table = clips();
        let mut machine = PlayerStateMachine::default();
        step(&mut machine, &holding_mouse(), &table);
        for _ in 0..19 {
            step(&mut machine, &holding_mouse(), &table);
        }
        let transition = step(&mut machine, &InputSnapshot::default(), &table);
        assert_eq!(transition.map(|t| t.to), Some(PlayerState::Swift));
    }
}
