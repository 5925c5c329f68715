//! Ordered-step state machine for the inhaler procedure.
//!
//! Every progress mutation funnels through [`TrainingController::complete_step`],
//! which only accepts the step currently active. Out-of-order or duplicate
//! requests are absorbed silently and counted in [`Diagnostics`].

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::debounce::InputDebouncer;
use crate::steps::{Step, StepAction, TRAINING_STEPS};

pub const DEFAULT_SHAKE_DURATION_SECS: f32 = 0.5;

/// Progress of one training session. Owned and mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingState {
    pub current_step: usize,
    pub completed_steps: Vec<usize>,
    pub is_cap_off: bool,
    pub is_inhaler_focused: bool,
    pub is_clipboard_focused: bool,
    pub is_shaking: bool,
    pub is_training_complete: bool,
    pub shake_elapsed: f32,
    pub shake_duration: f32,
    pub last_advance_at: Option<f64>,
}

impl TrainingState {
    pub fn new(shake_duration: f32) -> Self {
        Self {
            current_step: 0,
            completed_steps: Vec::new(),
            is_cap_off: false,
            is_inhaler_focused: false,
            is_clipboard_focused: false,
            is_shaking: false,
            is_training_complete: false,
            shake_elapsed: 0.0,
            shake_duration,
            last_advance_at: None,
        }
    }

    /// Fraction of the required shake time accumulated so far, in `[0, 1]`
    pub fn shake_progress(&self) -> f32 {
        if self.shake_duration > 0.0 {
            (self.shake_elapsed / self.shake_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for TrainingState {
    fn default() -> Self {
        Self::new(DEFAULT_SHAKE_DURATION_SECS)
    }
}

/// Counters for requests the controller absorbed without effect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// `complete_step` called with an id other than the active step
    pub rejected_completions: u64,
    /// `advance_step` dropped inside the debounce window
    pub debounced_advances: u64,
    /// `advance_step` on a step that is not a click step
    pub ignored_advances: u64,
}

pub struct TrainingController<C: Clock> {
    steps: &'static [Step],
    state: TrainingState,
    clock: C,
    debouncer: InputDebouncer,
    diagnostics: Diagnostics,
}

impl<C: Clock> TrainingController<C> {
    /// Controller over the canonical inhaler procedure
    pub fn new(clock: C) -> Self {
        Self::with_steps(&TRAINING_STEPS, clock)
    }

    pub fn with_steps(steps: &'static [Step], clock: C) -> Self {
        Self {
            steps,
            state: TrainingState::default(),
            clock,
            debouncer: InputDebouncer::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_debouncer(mut self, debouncer: InputDebouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    /// Sets the shake duration used now and by every later reset
    pub fn with_shake_duration(mut self, secs: f32) -> Self {
        self.state.shake_duration = secs;
        self
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn steps(&self) -> &'static [Step] {
        self.steps
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// The step not yet completed (the last one once training is complete)
    pub fn current(&self) -> Option<&'static Step> {
        self.steps.get(self.state.current_step)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Whether a shake gesture would currently complete a step
    pub fn is_shake_step(&self) -> bool {
        !self.state.is_training_complete && self.current().is_some_and(Step::is_shake_gated)
    }

    fn current_action(&self) -> Option<StepAction> {
        self.current().map(|s| s.action)
    }

    /// Completes `step_id` if and only if it is the active step.
    pub fn complete_step(&mut self, step_id: usize) {
        let state = &mut self.state;
        if state.is_training_complete || step_id != state.current_step {
            self.diagnostics.rejected_completions += 1;
            debug!(
                requested = step_id,
                current = state.current_step,
                complete = state.is_training_complete,
                "rejected out-of-order step completion"
            );
            return;
        }

        state.completed_steps.push(step_id);
        if state.completed_steps.len() >= self.steps.len() {
            state.is_training_complete = true;
            info!(step = step_id, "training complete");
        } else {
            state.current_step += 1;
            info!(step = step_id, next = state.current_step, "step completed");
        }
    }

    /// Records the cap state; removing it on the remove-cap step or putting
    /// it back on the replace-cap step completes that step.
    pub fn set_cap_off(&mut self, value: bool) {
        self.state.is_cap_off = value;
        match (value, self.current_action()) {
            (true, Some(StepAction::RemoveCap)) | (false, Some(StepAction::ReplaceCap)) => {
                self.complete_step(self.state.current_step)
            }
            _ => {}
        }
    }

    /// Called when a sustained shake has been recognized
    pub fn complete_gesture(&mut self) {
        self.reset_shake();
        if self.is_shake_step() {
            self.complete_step(self.state.current_step);
        } else {
            debug!(current = self.state.current_step, "shake on a non-shake step");
        }
    }

    /// Completes the active click step, at most once per debounce window.
    pub fn advance_step(&mut self) {
        let now = self.clock.now();
        if !self.debouncer.accept(self.state.last_advance_at, now) {
            self.diagnostics.debounced_advances += 1;
            debug!(current = self.state.current_step, "debounced advance request");
            return;
        }

        if self.state.is_training_complete || self.current_action() != Some(StepAction::Click) {
            self.diagnostics.ignored_advances += 1;
            debug!(current = self.state.current_step, "advance on a non-click step");
            return;
        }

        self.state.last_advance_at = Some(now);
        self.complete_step(self.state.current_step);
    }

    pub fn set_inhaler_focused(&mut self, value: bool) {
        if self.state.is_inhaler_focused != value {
            debug!(focused = value, "inhaler focus changed");
        }
        self.state.is_inhaler_focused = value;
    }

    pub fn set_clipboard_focused(&mut self, value: bool) {
        if self.state.is_clipboard_focused != value {
            debug!(focused = value, "clipboard focus changed");
        }
        self.state.is_clipboard_focused = value;
    }

    pub fn set_shaking(&mut self, value: bool) {
        self.state.is_shaking = value;
    }

    pub fn set_shake_elapsed(&mut self, secs: f32) {
        self.state.shake_elapsed = secs;
    }

    pub fn reset_shake(&mut self) {
        self.state.is_shaking = false;
        self.state.shake_elapsed = 0.0;
    }

    /// Restores the initial state. Diagnostics are kept.
    pub fn reset_training(&mut self) {
        self.state = TrainingState::new(self.state.shake_duration);
        info!("training reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn controller() -> (TrainingController<ManualClock>, ManualClock) {
        let clock = ManualClock::new(10.0);
        (TrainingController::new(clock.clone()), clock)
    }

    /// Drives the controller through the canonical procedure up to `step`
    fn advance_to(ctl: &mut TrainingController<ManualClock>, clock: &ManualClock, step: usize) {
        while ctl.state().current_step < step {
            match ctl.current().map(|s| s.action) {
                Some(StepAction::Shake) => ctl.complete_gesture(),
                Some(StepAction::RemoveCap) => ctl.set_cap_off(true),
                Some(StepAction::Click) => {
                    clock.advance(0.2);
                    ctl.advance_step();
                }
                Some(StepAction::ReplaceCap) | None => break,
            }
        }
    }

    #[test]
    fn test_initial_state() {
        let (ctl, _) = controller();
        assert_eq!(ctl.state(), &TrainingState::default());
        assert_eq!(ctl.total_steps(), 11);
        assert_eq!(ctl.current().map(|s| s.id), Some(0));
        assert!(ctl.is_shake_step());
    }

    #[test]
    fn test_complete_step_in_order() {
        let (mut ctl, _) = controller();
        ctl.complete_step(0);
        ctl.complete_step(1);
        assert_eq!(ctl.state().completed_steps, vec![0, 1]);
        assert_eq!(ctl.state().current_step, 2);
    }

    #[test]
    fn test_out_of_order_is_a_silent_noop() {
        let (mut ctl, _) = controller();
        let before = ctl.state().clone();
        for id in [1, 5, 10, 42, 1, 1] {
            ctl.complete_step(id);
        }
        assert_eq!(ctl.state(), &before);
        assert_eq!(ctl.diagnostics().rejected_completions, 6);
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let (mut ctl, _) = controller();
        ctl.complete_step(0);
        ctl.complete_step(0);
        assert_eq!(ctl.state().completed_steps, vec![0]);
        assert_eq!(ctl.state().current_step, 1);
    }

    #[test]
    fn test_completion_stays_on_last_index() {
        let (mut ctl, _) = controller();
        for id in 0..11 {
            ctl.complete_step(id);
        }
        let state = ctl.state();
        assert!(state.is_training_complete);
        assert_eq!(state.current_step, 10);
        assert_eq!(state.completed_steps, (0..11).collect::<Vec<_>>());

        // Completing the last index again must not duplicate it
        ctl.complete_step(10);
        assert_eq!(ctl.state().completed_steps.len(), 11);
    }

    #[test]
    fn test_cap_removal_completes_step_one() {
        let (mut ctl, _) = controller();
        ctl.complete_step(0);
        ctl.set_cap_off(true);
        assert!(ctl.state().is_cap_off);
        assert_eq!(ctl.state().current_step, 2);
        assert_eq!(ctl.state().completed_steps, vec![0, 1]);
    }

    #[test]
    fn test_cap_flag_elsewhere_changes_only_the_flag() {
        let (mut ctl, _) = controller();
        ctl.set_cap_off(true);
        assert!(ctl.state().is_cap_off);
        assert_eq!(ctl.state().current_step, 0);
        assert!(ctl.state().completed_steps.is_empty());

        ctl.set_cap_off(false);
        assert!(!ctl.state().is_cap_off);
        assert_eq!(ctl.state().current_step, 0);
    }

    #[test]
    fn test_cap_replacement_finishes_training() {
        let (mut ctl, clock) = controller();
        advance_to(&mut ctl, &clock, 10);
        assert_eq!(ctl.state().current_step, 10);
        assert!(ctl.state().is_cap_off);

        // Putting the cap on at the last step completes it; taking it off does not
        ctl.set_cap_off(true);
        assert!(!ctl.state().is_training_complete);
        ctl.set_cap_off(false);
        assert!(ctl.state().is_training_complete);
        assert_eq!(ctl.state().current_step, 10);
    }

    #[test]
    fn test_gesture_completes_shake_steps_only() {
        let (mut ctl, clock) = controller();
        ctl.set_shaking(true);
        ctl.set_shake_elapsed(0.3);
        ctl.complete_gesture();
        assert_eq!(ctl.state().completed_steps, vec![0]);
        assert!(!ctl.state().is_shaking);
        assert_eq!(ctl.state().shake_elapsed, 0.0);

        // Step 1 is the cap step: a shake does nothing
        ctl.complete_gesture();
        assert_eq!(ctl.state().current_step, 1);

        advance_to(&mut ctl, &clock, 9);
        assert!(ctl.is_shake_step());
        ctl.complete_gesture();
        assert_eq!(ctl.state().current_step, 10);
    }

    #[test]
    fn test_optional_step_also_accepts_click() {
        let (mut ctl, clock) = controller();
        advance_to(&mut ctl, &clock, 9);
        clock.advance(0.2);
        ctl.advance_step();
        assert_eq!(ctl.state().current_step, 10);
    }

    #[test]
    fn test_advance_ignored_on_non_click_step() {
        let (mut ctl, _) = controller();
        ctl.advance_step();
        assert_eq!(ctl.state().current_step, 0);
        assert_eq!(ctl.state().last_advance_at, None);
        assert_eq!(ctl.diagnostics().ignored_advances, 1);
    }

    #[test]
    fn test_advance_debounce_50ms_collapses() {
        let (mut ctl, clock) = controller();
        advance_to(&mut ctl, &clock, 2);
        clock.advance(1.0);
        ctl.advance_step();
        clock.advance(0.05);
        ctl.advance_step();
        assert_eq!(ctl.state().current_step, 3);
        assert_eq!(ctl.state().completed_steps, vec![0, 1, 2]);
        assert_eq!(ctl.diagnostics().debounced_advances, 1);
    }

    #[test]
    fn test_advance_debounce_200ms_passes_twice() {
        let (mut ctl, clock) = controller();
        advance_to(&mut ctl, &clock, 2);
        clock.advance(1.0);
        ctl.advance_step();
        clock.advance(0.2);
        ctl.advance_step();
        assert_eq!(ctl.state().current_step, 4);
        assert_eq!(ctl.state().completed_steps, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_focus_setters_do_not_touch_progress() {
        let (mut ctl, _) = controller();
        ctl.set_inhaler_focused(true);
        ctl.set_clipboard_focused(true);
        let state = ctl.state();
        assert!(state.is_inhaler_focused && state.is_clipboard_focused);
        assert_eq!(state.current_step, 0);
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let (mut ctl, clock) = controller();
        advance_to(&mut ctl, &clock, 6);
        ctl.set_inhaler_focused(true);
        ctl.set_shaking(true);
        ctl.set_shake_elapsed(0.2);
        ctl.reset_training();
        assert_eq!(ctl.state(), &TrainingState::default());

        // Reset from the completed state too
        advance_to(&mut ctl, &clock, 10);
        ctl.set_cap_off(false);
        assert!(ctl.state().is_training_complete);
        ctl.reset_training();
        assert_eq!(ctl.state(), &TrainingState::default());
    }

    #[test]
    fn test_reset_keeps_configured_shake_duration() {
        let clock = ManualClock::new(0.0);
        let mut ctl = TrainingController::new(clock).with_shake_duration(1.5);
        ctl.set_shake_elapsed(1.0);
        ctl.reset_training();
        assert_eq!(ctl.state(), &TrainingState::new(1.5));
    }

    #[test]
    fn test_completed_steps_is_always_a_prefix() {
        let (mut ctl, _) = controller();
        // Arbitrary, partly valid id sequence
        let ids = [3, 0, 0, 2, 1, 1, 7, 2, 4, 3, 3, 9, 4, 5, 10];
        for id in ids {
            ctl.complete_step(id);
            let state = ctl.state();
            let k = state.completed_steps.len();
            assert_eq!(state.completed_steps, (0..k).collect::<Vec<_>>());
            assert!(k <= state.current_step + 1);
        }
        assert_eq!(ctl.state().current_step, 6);
    }
}
