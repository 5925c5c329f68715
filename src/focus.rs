//! Focus/return transitions for a trackable object.
//!
//! Each tick the live pose decays exponentially towards either a
//! camera-relative inspection pose (focused) or the cached resting pose
//! (unfocused). The blend factor `1 - exp(-rate * dt)` keeps transitions
//! frame-rate independent; the target is approached but never reached
//! exactly.

use crate::spatial::{self, CameraPose, HitTest, Pose, Quat, Vec3, UP};

/// How a focused object is oriented relative to the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusOrientation {
    /// Copy the camera orientation
    MatchCamera,
    /// Turn the object's face (+Z) towards the camera, upright, then tilt
    /// it about its local X axis. Keeps a page readable instead of
    /// inheriting the camera's roll.
    FaceViewer { tilt_radians: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusTuning {
    /// Position decay constant, per second
    pub move_rate: f32,
    /// Orientation decay constant, per second
    pub rotate_rate: f32,
    /// Distance in front of the camera when focused
    pub focus_distance: f32,
    pub orientation: FocusOrientation,
}

impl Default for FocusTuning {
    fn default() -> Self {
        Self {
            move_rate: 12.0,
            rotate_rate: 12.0,
            focus_distance: 0.45,
            orientation: FocusOrientation::MatchCamera,
        }
    }
}

/// Exponential smoothing factor for one tick
pub fn smoothing_alpha(rate: f32, dt: f32) -> f32 {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    1.0 - (-rate * dt).exp()
}

#[derive(Debug, Clone)]
pub struct FocusTransition {
    tuning: FocusTuning,
    original: Pose,
    live: Pose,
}

impl FocusTransition {
    pub fn new(tuning: FocusTuning) -> Self {
        Self {
            tuning,
            original: Pose::default(),
            live: Pose::default(),
        }
    }

    /// Caches the resting pose and starts the live pose there
    pub fn initialize(&mut self, original: Pose) {
        self.original = original;
        self.live = original;
    }

    pub fn original(&self) -> Pose {
        self.original
    }

    /// Current smoothed pose, for the renderer to apply
    pub fn pose(&self) -> Pose {
        self.live
    }

    /// Pose the object is converging towards this tick
    pub fn target(&self, focused: bool, camera: &CameraPose) -> Pose {
        if !focused {
            return self.original;
        }

        let forward = camera.view_direction();
        let position = camera.position + forward * self.tuning.focus_distance;
        let camera_orientation = spatial::normalize_or_identity(camera.orientation);
        let orientation = match self.tuning.orientation {
            FocusOrientation::MatchCamera => camera_orientation,
            FocusOrientation::FaceViewer { tilt_radians } => {
                let tilt = Quat::from_axis_angle(Vec3::X, tilt_radians);
                let up = camera_orientation * UP;
                spatial::look_rotation(position, camera.position, UP)
                    .or_else(|| spatial::look_rotation(position, camera.position, up))
                    .map(|facing| spatial::normalize_or_identity(facing * tilt))
                    .unwrap_or(camera_orientation)
            }
        };

        Pose {
            position,
            orientation,
            // Focus never forces scale
            scale: self.live.scale,
        }
    }

    /// Advances the live pose one tick towards the current target
    pub fn tick(&mut self, focused: bool, camera: &CameraPose, dt: f32) -> Pose {
        let target = self.target(focused, camera);
        let move_alpha = smoothing_alpha(self.tuning.move_rate, dt);
        let rotate_alpha = smoothing_alpha(self.tuning.rotate_rate, dt);

        self.live.position = self.live.position.lerp(target.position, move_alpha);
        self.live.orientation = spatial::normalize_or_identity(
            self.live.orientation.slerp(target.orientation, rotate_alpha),
        );
        if !focused {
            self.live.scale = self.live.scale.lerp(target.scale, move_alpha);
        }
        self.live
    }

    /// Whether the camera's view ray hits the object. Always false while
    /// focused: hover highlighting only applies to objects at rest.
    pub fn hover<H: HitTest + ?Sized>(&self, focused: bool, camera: &CameraPose, hit: &H) -> bool {
        !focused && hit.ray_hits(camera.position, camera.view_direction())
    }
}
