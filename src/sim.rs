//! Synthetic inputs for driving a session without an XR runtime: a
//! yaw/pitch camera rig and a hand that shakes the held object on demand.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::spatial::{self, CameraPose, Quat, Vec3, UP};

/// Keeps the pitch away from straight up/down
const MAX_PITCH: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraRig {
    /// Rig at `position` aimed at `target`
    pub fn aimed_at(position: Vec3, target: Vec3) -> Self {
        let d = target - position;
        let horizontal = (d.x * d.x + d.z * d.z).sqrt();
        Self {
            position,
            yaw: (-d.x).atan2(-d.z),
            pitch: d.y.atan2(horizontal).clamp(-MAX_PITCH, MAX_PITCH),
        }
    }

    pub fn pan(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn camera(&self) -> CameraPose {
        let orientation =
            Quat::from_axis_angle(UP, self.yaw) * Quat::from_axis_angle(Vec3::X, self.pitch);
        CameraPose::new(self.position, spatial::normalize_or_identity(orientation))
    }
}

/// Back-and-forth hand motion with a little noise
#[derive(Debug, Clone)]
pub struct HandShaker {
    amplitude: f32,
    remaining_secs: f32,
    phase: bool,
    rng: StdRng,
}

impl HandShaker {
    pub fn new(amplitude: f32) -> Self {
        Self::with_rng(amplitude, StdRng::from_entropy())
    }

    pub fn seeded(amplitude: f32, seed: u64) -> Self {
        Self::with_rng(amplitude, StdRng::seed_from_u64(seed))
    }

    fn with_rng(amplitude: f32, rng: StdRng) -> Self {
        Self {
            amplitude,
            remaining_secs: 0.0,
            phase: false,
            rng,
        }
    }

    /// Shakes for (at least) another `secs` seconds
    pub fn burst(&mut self, secs: f32) {
        self.remaining_secs = self.remaining_secs.max(secs);
    }

    pub fn is_active(&self) -> bool {
        self.remaining_secs > 0.0
    }

    pub fn stop(&mut self) {
        self.remaining_secs = 0.0;
    }

    /// Hand offset for the next frame; zero once the burst is over
    pub fn offset(&mut self, dt: f32) -> Vec3 {
        if !self.is_active() {
            return Vec3::ZERO;
        }
        self.remaining_secs -= dt.max(0.0);
        self.phase = !self.phase;

        let sign = if self.phase { 1.0 } else { -1.0 };
        let noise = self.amplitude * 0.2;
        Vec3::new(
            self.rng.gen_range(-noise..=noise),
            sign * self.amplitude + self.rng.gen_range(-noise..=noise),
            self.rng.gen_range(-noise..=noise),
        )
    }
}

impl Default for HandShaker {
    fn default() -> Self {
        Self::new(0.05)
    }
}
