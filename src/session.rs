//! Per-frame driver composing the training controller, the shake recognizer
//! and the focus transitions of both trackable objects.
//!
//! Within one [`TrainerSession::tick`] discrete input is applied first, then
//! gesture processing, and only then do the focus controllers read the focus
//! flags, so a mutation made this frame is reflected in this frame's
//! smoothing targets.

use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::config::Config;
use crate::debounce::InputDebouncer;
use crate::focus::FocusTransition;
use crate::gesture::ShakeRecognizer;
use crate::spatial::{Bounds, CameraPose, HitTest, Pose, Vec3};
use crate::steps::{Step, StepAction};
use crate::training::{Diagnostics, TrainingController, TrainingState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
pub enum Trackable {
    #[strum(serialize = "inhaler")]
    Inhaler,
    #[strum(serialize = "clipboard")]
    Clipboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Plain click: focus, or advance a click step while focused
    Primary,
    /// Context action: return the object to rest
    Secondary,
    /// Toggles the inhaler cap when the active step allows it
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pointer {
        target: Trackable,
        kind: PointerKind,
    },
    ResetTraining,
}

impl InputEvent {
    pub fn primary(target: Trackable) -> Self {
        Self::Pointer {
            target,
            kind: PointerKind::Primary,
        }
    }

    pub fn secondary(target: Trackable) -> Self {
        Self::Pointer {
            target,
            kind: PointerKind::Secondary,
        }
    }

    pub fn double(target: Trackable) -> Self {
        Self::Pointer {
            target,
            kind: PointerKind::Double,
        }
    }
}

/// Everything the rendering/input layer hands over for one frame
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub dt: f32,
    pub camera: CameraPose,
    /// Hand displacement of the held inhaler relative to its inspection
    /// anchor. Independent of the camera pose: a pan alone is no motion.
    pub hand_offset: Vec3,
    pub events: Vec<InputEvent>,
}

/// Resting poses and hit volumes of the trackable objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLayout {
    pub inhaler: Pose,
    pub clipboard: Pose,
    /// Object-local bounds, scaled by the live pose
    pub inhaler_bounds: Bounds,
    pub clipboard_bounds: Bounds,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            inhaler: Pose::from_position(Vec3::new(0.0, 1.0, 0.0)).with_scale(Vec3::splat(0.003)),
            clipboard: Pose::from_position(Vec3::new(0.4, 1.0, 0.0))
                .with_scale(Vec3::splat(0.005)),
            inhaler_bounds: Bounds::sphere(Vec3::ZERO, 20.0),
            clipboard_bounds: Bounds::aabb_centered(Vec3::ZERO, Vec3::new(24.0, 32.0, 4.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSnapshot {
    pub pose: Pose,
    pub is_focused: bool,
    pub is_hovering: bool,
}

/// Read-only view handed to the presentation layer each frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub training: TrainingState,
    pub step: Option<Step>,
    pub total_steps: usize,
    pub shake_speed: f32,
    pub shake_threshold: f32,
    pub inhaler: ObjectSnapshot,
    pub clipboard: ObjectSnapshot,
    pub diagnostics: Diagnostics,
}

struct TrackedObject {
    focus: FocusTransition,
    bounds: Bounds,
}

impl TrackedObject {
    fn new(mut focus: FocusTransition, resting: Pose, bounds: Bounds) -> Self {
        focus.initialize(resting);
        Self { focus, bounds }
    }

    fn world_bounds(&self) -> Bounds {
        self.bounds.placed_at(&self.focus.pose())
    }
}

pub struct TrainerSession<C: Clock> {
    trainer: TrainingController<C>,
    shaker: ShakeRecognizer,
    inhaler: TrackedObject,
    clipboard: TrackedObject,
    exclusive_focus: bool,
    holding_inhaler: bool,
    hand_offset: Vec3,
    last_camera: CameraPose,
}

impl<C: Clock> TrainerSession<C> {
    pub fn new(config: &Config, layout: SceneLayout, clock: C) -> Self {
        let trainer = TrainingController::new(clock)
            .with_debouncer(InputDebouncer::new(config.advance_debounce_ms))
            .with_shake_duration(config.shake_duration_secs);

        Self {
            trainer,
            shaker: ShakeRecognizer::new(config.shake_speed_threshold),
            inhaler: TrackedObject::new(
                FocusTransition::new(config.inhaler.focus_tuning()),
                layout.inhaler,
                layout.inhaler_bounds,
            ),
            clipboard: TrackedObject::new(
                FocusTransition::new(config.clipboard.focus_tuning()),
                layout.clipboard,
                layout.clipboard_bounds,
            ),
            exclusive_focus: config.exclusive_focus,
            holding_inhaler: false,
            hand_offset: Vec3::ZERO,
            last_camera: CameraPose::default(),
        }
    }

    pub fn trainer(&self) -> &TrainingController<C> {
        &self.trainer
    }

    pub fn state(&self) -> &TrainingState {
        self.trainer.state()
    }

    fn is_focused(&self, target: Trackable) -> bool {
        let state = self.trainer.state();
        match target {
            Trackable::Inhaler => state.is_inhaler_focused,
            Trackable::Clipboard => state.is_clipboard_focused,
        }
    }

    fn set_focused(&mut self, target: Trackable, value: bool) {
        if value && self.exclusive_focus {
            let other = match target {
                Trackable::Inhaler => Trackable::Clipboard,
                Trackable::Clipboard => Trackable::Inhaler,
            };
            if self.is_focused(other) {
                self.set_focused(other, false);
            }
        }
        if self.is_focused(target) != value {
            info!(object = %target, focused = value, "focus changed");
        }
        match target {
            Trackable::Inhaler => self.trainer.set_inhaler_focused(value),
            Trackable::Clipboard => self.trainer.set_clipboard_focused(value),
        }
    }

    /// Applies one discrete input event
    pub fn handle(&mut self, event: InputEvent) {
        let (target, kind) = match event {
            InputEvent::ResetTraining => {
                self.trainer.reset_training();
                return;
            }
            InputEvent::Pointer { target, kind } => (target, kind),
        };

        match (target, kind) {
            (_, PointerKind::Primary) if !self.is_focused(target) => self.set_focused(target, true),
            (Trackable::Inhaler, PointerKind::Primary) => {
                if self.trainer.current().map(|s| s.action) == Some(StepAction::Click) {
                    self.trainer.advance_step();
                }
            }
            (Trackable::Clipboard, PointerKind::Primary) => {}
            (_, PointerKind::Secondary) => {
                if self.is_focused(target) {
                    self.set_focused(target, false);
                }
            }
            (Trackable::Inhaler, PointerKind::Double) => {
                let cap_off = self.trainer.state().is_cap_off;
                match self.trainer.current().map(|s| s.action) {
                    Some(StepAction::RemoveCap) if !cap_off => self.trainer.set_cap_off(true),
                    Some(StepAction::ReplaceCap) if cap_off => self.trainer.set_cap_off(false),
                    _ => {}
                }
            }
            (Trackable::Clipboard, PointerKind::Double) => {}
        }
    }

    /// Advances the whole session by one frame
    pub fn tick(&mut self, input: &FrameInput) -> Snapshot {
        for event in &input.events {
            self.handle(*event);
        }

        let camera = &input.camera;
        let inhaler_focused = self.trainer.state().is_inhaler_focused;
        if inhaler_focused {
            // Measured against the inspection anchor, so looking around while
            // holding the inhaler is not motion
            let sample = input.hand_offset;
            if !self.holding_inhaler {
                self.shaker.begin(sample);
            } else if let Some(done) = self.shaker.tick(&mut self.trainer, sample, input.dt) {
                info!(step = done.step, "shake recognized");
            }
            self.hand_offset = input.hand_offset;
        } else {
            if self.holding_inhaler && self.trainer.state().is_shaking {
                self.trainer.set_shaking(false);
            }
            self.hand_offset = Vec3::ZERO;
        }
        self.holding_inhaler = inhaler_focused;

        let state = self.trainer.state();
        let (inhaler_focused, clipboard_focused) =
            (state.is_inhaler_focused, state.is_clipboard_focused);
        self.inhaler.focus.tick(inhaler_focused, camera, input.dt);
        self.clipboard.focus.tick(clipboard_focused, camera, input.dt);
        self.last_camera = *camera;

        self.snapshot()
    }

    /// Nearest resting object under the camera's view ray, if any
    pub fn hovered(&self) -> Option<Trackable> {
        let camera = &self.last_camera;
        let direction = camera.view_direction();
        [
            (Trackable::Inhaler, &self.inhaler),
            (Trackable::Clipboard, &self.clipboard),
        ]
        .into_iter()
        .filter(|(target, _)| !self.is_focused(*target))
        .filter_map(|(target, object)| {
            object
                .world_bounds()
                .ray_distance(camera.position, direction)
                .map(|distance| (target, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(target, _)| target)
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.trainer.state();
        let camera = &self.last_camera;

        let mut inhaler_pose = self.inhaler.focus.pose();
        inhaler_pose.position = inhaler_pose.position + self.hand_offset;

        Snapshot {
            training: state.clone(),
            step: self.trainer.current().copied(),
            total_steps: self.trainer.total_steps(),
            shake_speed: self.shaker.last_speed(),
            shake_threshold: self.shaker.speed_threshold(),
            inhaler: ObjectSnapshot {
                pose: inhaler_pose,
                is_focused: state.is_inhaler_focused,
                is_hovering: self.inhaler.focus.hover(
                    state.is_inhaler_focused,
                    camera,
                    &self.inhaler.world_bounds(),
                ),
            },
            clipboard: ObjectSnapshot {
                pose: self.clipboard.focus.pose(),
                is_focused: state.is_clipboard_focused,
                is_hovering: self.clipboard.focus.hover(
                    state.is_clipboard_focused,
                    camera,
                    &self.clipboard.world_bounds(),
                ),
            },
            diagnostics: self.trainer.diagnostics(),
        }
    }
}
