use serde::Serialize;

/// What the trainee has to do to complete a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
pub enum StepAction {
    #[strum(serialize = "shake")]
    Shake,
    #[strum(serialize = "remove cap")]
    RemoveCap,
    #[strum(serialize = "click")]
    Click,
    #[strum(serialize = "replace cap")]
    ReplaceCap,
}

/// One unit of the trained procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: usize,
    pub text: &'static str,
    pub action: StepAction,
    pub optional: bool,
}

impl Step {
    const fn new(id: usize, text: &'static str, action: StepAction) -> Self {
        Self {
            id,
            text,
            action,
            optional: false,
        }
    }

    const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether a completed shake gesture satisfies this step. Optional steps
    /// ("shake again before the second dose") accept a shake as well as a click.
    pub fn is_shake_gated(&self) -> bool {
        self.action == StepAction::Shake || self.optional
    }
}

/// Metered-dose inhaler procedure, in order
pub static TRAINING_STEPS: [Step; 11] = [
    Step::new(0, "Shake the inhaler well", StepAction::Shake),
    Step::new(1, "Remove the cap", StepAction::RemoveCap),
    Step::new(2, "Hold the inhaler upright", StepAction::Click),
    Step::new(3, "Tilt your head back slightly", StepAction::Click),
    Step::new(4, "Breathe out slowly", StepAction::Click),
    Step::new(
        5,
        "Place mouthpiece in mouth and seal with lips",
        StepAction::Click,
    ),
    Step::new(
        6,
        "Breathe in slowly and press the inhaler",
        StepAction::Click,
    ),
    Step::new(7, "Hold breath for 10-20 seconds", StepAction::Click),
    Step::new(
        8,
        "Exhale and wait before second dose if needed",
        StepAction::Click,
    ),
    Step::new(
        9,
        "(Optional) Shake again before second dose",
        StepAction::Click,
    )
    .optional(),
    Step::new(10, "Replace the mouthpiece cover", StepAction::ReplaceCap),
];
