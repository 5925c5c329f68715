//! Shake detection from per-frame position samples.
//!
//! The recognizer integrates time spent above a speed threshold rather than
//! reacting to single fast samples, so brief jitter never completes a shake
//! and a short dip in speed does not throw away accumulated time.

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::spatial::Vec3;
use crate::training::TrainingController;

/// Speed (units per second) above which motion counts as shaking
pub const DEFAULT_SHAKE_SPEED_THRESHOLD: f32 = 1.2;

/// Floor for the speed denominator on stalled frames
const MIN_DELTA_SECS: f32 = 1e-4;

/// Emitted on the tick a sustained shake completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureCompleted {
    /// Step that was active when the shake finished
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct ShakeRecognizer {
    speed_threshold: f32,
    last_position: Option<Vec3>,
    last_speed: f32,
}

impl ShakeRecognizer {
    pub fn new(speed_threshold: f32) -> Self {
        Self {
            speed_threshold,
            last_position: None,
            last_speed: 0.0,
        }
    }

    pub fn speed_threshold(&self) -> f32 {
        self.speed_threshold
    }

    /// Latest velocity estimate, in units per second
    pub fn last_speed(&self) -> f32 {
        self.last_speed
    }

    /// Captures the reference position when the object enters focus
    pub fn begin(&mut self, position: Vec3) {
        self.last_position = position.is_finite().then_some(position);
        self.last_speed = 0.0;
    }

    /// Processes one motion sample.
    ///
    /// Updates the shake bookkeeping on `trainer` and returns the completion
    /// event on the tick the accumulated shake time reaches its duration.
    pub fn tick<C: Clock>(
        &mut self,
        trainer: &mut TrainingController<C>,
        position: Vec3,
        dt: f32,
    ) -> Option<GestureCompleted> {
        if !position.is_finite() {
            trace!("ignoring non-finite motion sample");
            return None;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let movement = match self.last_position.replace(position) {
            Some(last) => position.distance(last),
            None => 0.0,
        };
        self.last_speed = movement / dt.max(MIN_DELTA_SECS);

        if trainer.is_shake_step() && self.last_speed > self.speed_threshold {
            if !trainer.state().is_shaking {
                debug!(speed = self.last_speed, "shake started");
                trainer.set_shaking(true);
            }
            let elapsed = trainer.state().shake_elapsed + dt;
            trainer.set_shake_elapsed(elapsed);

            if elapsed >= trainer.state().shake_duration {
                let step = trainer.state().current_step;
                trainer.complete_gesture();
                return Some(GestureCompleted { step });
            }
        } else if trainer.state().is_shaking {
            // Keep the accumulated time: a slow frame is a dip, not the end
            trainer.set_shaking(false);
        }

        None
    }
}

impl Default for ShakeRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_SHAKE_SPEED_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn trainer() -> TrainingController<ManualClock> {
        TrainingController::new(ManualClock::new(0.0))
    }

    /// Alternating samples 0.5 units apart: 5 u/s at dt = 0.1
    fn shake_sample(i: usize) -> Vec3 {
        if i % 2 == 0 {
            Vec3::new(0.5, 1.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        }
    }

    #[test]
    fn five_fast_ticks_complete_exactly_once() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::new(0.0, 1.0, 0.0));

        let events: Vec<_> = (0..5)
            .filter_map(|i| rec.tick(&mut ctl, shake_sample(i), 0.1))
            .collect();

        assert_eq!(events, vec![GestureCompleted { step: 0 }]);
        assert_eq!(ctl.state().completed_steps, vec![0]);
        assert_eq!(ctl.state().shake_elapsed, 0.0);
        assert!(!ctl.state().is_shaking);
    }

    #[test]
    fn four_fast_ticks_are_not_enough() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::new(0.0, 1.0, 0.0));
        for i in 0..4 {
            assert!(rec.tick(&mut ctl, shake_sample(i), 0.1).is_none());
        }
        assert!(ctl.state().is_shaking);
        assert!(ctl.state().shake_elapsed > 0.35);
        assert_eq!(ctl.state().current_step, 0);
    }

    #[test]
    fn slow_frame_pauses_without_resetting() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::new(0.0, 1.0, 0.0));
        rec.tick(&mut ctl, shake_sample(0), 0.1);
        rec.tick(&mut ctl, shake_sample(1), 0.1);
        let accumulated = ctl.state().shake_elapsed;

        // Holding still for a frame
        rec.tick(&mut ctl, shake_sample(1), 0.1);
        assert!(!ctl.state().is_shaking);
        assert_eq!(ctl.state().shake_elapsed, accumulated);

        // Resuming picks up where it left off
        let done = (0..3).filter_map(|i| rec.tick(&mut ctl, shake_sample(i), 0.1)).count();
        assert_eq!(done, 1);
        assert_eq!(ctl.state().current_step, 1);
    }

    #[test]
    fn slow_motion_never_accumulates() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::ZERO);
        for i in 0..50 {
            // 0.01 units per 0.1 s = 0.1 u/s
            rec.tick(&mut ctl, Vec3::new(0.01 * i as f32, 0.0, 0.0), 0.1);
        }
        assert_eq!(ctl.state().shake_elapsed, 0.0);
        assert_eq!(ctl.state().current_step, 0);
    }

    #[test]
    fn shaking_on_a_non_shake_step_does_nothing() {
        let mut ctl = trainer();
        ctl.complete_step(0);
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::ZERO);
        for i in 0..10 {
            assert!(rec.tick(&mut ctl, shake_sample(i), 0.1).is_none());
        }
        assert!(!ctl.state().is_shaking);
        assert_eq!(ctl.state().shake_elapsed, 0.0);
        assert_eq!(ctl.state().current_step, 1);
    }

    #[test]
    fn zero_and_negative_dt_stay_finite() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::ZERO);
        rec.tick(&mut ctl, Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert!(rec.last_speed().is_finite());
        rec.tick(&mut ctl, Vec3::new(0.0, 0.0, 0.0), -0.5);
        rec.tick(&mut ctl, Vec3::new(1.0, 0.0, 0.0), f32::NAN);
        assert!(ctl.state().shake_elapsed.is_finite());
        assert_eq!(ctl.state().shake_elapsed, 0.0);
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut ctl = trainer();
        let mut rec = ShakeRecognizer::default();
        rec.begin(Vec3::ZERO);
        assert!(rec
            .tick(&mut ctl, Vec3::new(f32::INFINITY, 0.0, 0.0), 0.1)
            .is_none());
        assert_eq!(rec.last_speed(), 0.0);
        assert!(!ctl.state().is_shaking);
    }
}
