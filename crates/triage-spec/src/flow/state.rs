use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{Answer, AnswerSet, ValidationError, ValidationResult};
use crate::spec::form::FormSpec;
use crate::spec::stop_flow::StopFlowContent;
use crate::validate::build_step_schema;
use crate::visibility::{HiddenSet, resolve_hidden};

/// Per-step bookkeeping, indexed by step number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepState {
    pub visited: bool,
    pub valid: bool,
    pub skipped: bool,
}

impl StepState {
    /// Non-blocking for recap.
    pub fn is_passable(&self) -> bool {
        self.valid || self.skipped
    }

    const SKIPPED: StepState = StepState {
        visited: false,
        valid: false,
        skipped: true,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Why the questionnaire ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StopReason {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_key: Option<String>,
}

/// What opened a stop-flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopTrigger {
    Rule { step: usize, rule: usize },
    Terminator { question_key: String },
}

impl StopTrigger {
    pub fn question_key(&self) -> Option<&str> {
        match self {
            StopTrigger::Rule { .. } => None,
            StopTrigger::Terminator { question_key } => Some(question_key),
        }
    }
}

/// An open stop-flow modal awaiting Stop, Continue or Cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PendingStop {
    pub trigger: StopTrigger,
    pub content: StopFlowContent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StopRecord {
    pub step: usize,
    pub reason: StopReason,
}

/// Skip range pre-marked while a continuing rule holds on the current step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpeculativeSkip {
    pub origin: usize,
    pub target: usize,
    pub prior: Vec<(usize, StepState)>,
    pub stashed: Vec<(String, Answer)>,
}

/// Everything the controller mutates. Cloned whole for stop/cancel snapshots.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlowState {
    pub answers: AnswerSet,
    pub current_step: usize,
    pub direction: Direction,
    pub steps: Vec<StepState>,
    pub hidden: HiddenSet,
    pub skipped_questions: BTreeSet<String>,
    pub continued_from: BTreeSet<usize>,
    pub pending: Option<PendingStop>,
    pub stopped: Option<StopRecord>,
    pub submitted: bool,
    pub speculative: Option<SpeculativeSkip>,
    pub errors: Vec<ValidationError>,
}

impl FlowState {
    pub fn initial(form: &FormSpec) -> Self {
        let answers: AnswerSet = form
            .questions()
            .map(|question| (question.key.clone(), question.default_answer()))
            .collect();
        let mut steps = vec![StepState::default(); form.number_of_steps()];
        if let Some(first) = steps.first_mut() {
            first.visited = true;
        }
        let hidden = resolve_hidden(form, &answers);
        Self {
            answers,
            current_step: 1,
            direction: Direction::Forward,
            steps,
            hidden,
            skipped_questions: BTreeSet::new(),
            continued_from: BTreeSet::new(),
            pending: None,
            stopped: None,
            submitted: false,
            speculative: None,
            errors: Vec::new(),
        }
    }

    pub fn slot(&self, step: usize) -> StepState {
        self.steps[step - 1]
    }

    pub fn slot_mut(&mut self, step: usize) -> &mut StepState {
        &mut self.steps[step - 1]
    }

    pub fn mark_left(&mut self, step: usize, valid: bool) {
        let slot = self.slot_mut(step);
        slot.valid = valid;
        slot.visited = true;
    }

    pub fn validate_step(&self, form: &FormSpec, step: usize) -> ValidationResult {
        build_step_schema(&form.steps[step - 1])
            .excluding(&self.skipped_questions)
            .validate(&self.answers, &self.answers)
    }

    /// Validates the current step up to and including the question at `anchor`.
    pub fn validate_prefix(&self, form: &FormSpec, step: usize, anchor: usize) -> ValidationResult {
        let spec = &form.steps[step - 1];
        let schema = build_step_schema(spec).excluding(&self.skipped_questions);
        match spec.questions.get(anchor) {
            Some(question) => schema.until(&question.key).validate(&self.answers, &self.answers),
            None => schema.validate(&self.answers, &self.answers),
        }
    }

    pub fn reset_answer(&mut self, form: &FormSpec, key: &str) {
        if let Some(question) = form.question(key) {
            self.answers.insert(key, question.default_answer());
        }
    }

    /// Resets every question of `step` positioned after `anchor` and flags it skipped.
    pub fn skip_questions_after(&mut self, form: &FormSpec, step: usize, anchor: usize) {
        for question in form.steps[step - 1].questions.iter().skip(anchor + 1) {
            self.answers.insert(question.key.clone(), question.default_answer());
            self.skipped_questions.insert(question.key.clone());
        }
    }

    pub fn skip_step(&mut self, form: &FormSpec, step: usize) {
        for question in &form.steps[step - 1].questions {
            self.answers.insert(question.key.clone(), question.default_answer());
            self.skipped_questions.insert(question.key.clone());
        }
        *self.slot_mut(step) = StepState::SKIPPED;
    }

    /// Makes a skipped step live again. Its answers are back at their defaults.
    pub fn release_step(&mut self, form: &FormSpec, step: usize) {
        for question in &form.steps[step - 1].questions {
            self.skipped_questions.remove(&question.key);
            self.answers.insert(question.key.clone(), question.default_answer());
        }
        self.slot_mut(step).skipped = false;
    }

    /// Releases the contiguous run of skipped steps after `origin`, plus the
    /// questions of `origin` that a stop or continue flagged skipped.
    pub fn release_following(&mut self, form: &FormSpec, origin: usize) {
        for question in &form.steps[origin - 1].questions {
            self.skipped_questions.remove(&question.key);
        }
        let mut step = origin + 1;
        while step <= self.steps.len() && self.slot(step).skipped {
            self.release_step(form, step);
            step += 1;
        }
    }

    pub fn reset_terminators(&mut self, form: &FormSpec, step: usize, keep: Option<&str>) {
        for question in &form.steps[step - 1].questions {
            if question.is_terminator() && keep != Some(question.key.as_str()) {
                self.answers.insert(question.key.clone(), question.default_answer());
            }
        }
    }

    /// Pre-marks `origin+1..target` skipped, stashing answers so it can be undone.
    pub fn speculate(&mut self, form: &FormSpec, origin: usize, target: usize) {
        let mut prior = Vec::new();
        let mut stashed = Vec::new();
        for step in origin + 1..target.min(self.steps.len() + 1) {
            prior.push((step, self.slot(step)));
            for question in &form.steps[step - 1].questions {
                let default = question.default_answer();
                if let Some(answer) = self.answers.insert(question.key.clone(), default.clone())
                    && answer != default
                {
                    stashed.push((question.key.clone(), answer));
                }
            }
            *self.slot_mut(step) = StepState::SKIPPED;
        }
        self.speculative = Some(SpeculativeSkip {
            origin,
            target,
            prior,
            stashed,
        });
    }

    /// Restores what [`FlowState::speculate`] changed. Returns false when
    /// nothing was pre-marked.
    pub fn undo_speculation(&mut self) -> bool {
        let Some(speculative) = self.speculative.take() else {
            return false;
        };
        for (step, prior) in speculative.prior {
            *self.slot_mut(step) = prior;
        }
        for (key, answer) in speculative.stashed {
            self.answers.insert(key, answer);
        }
        true
    }

    pub fn recompute_hidden(&mut self, form: &FormSpec) {
        self.hidden = resolve_hidden(form, &self.answers);
    }
}
