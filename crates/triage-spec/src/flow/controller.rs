use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::answers::{Answer, AnswerSet, ValidationError, ValidationResult};
use crate::error::FormError;
use crate::flow::command::{FlowCommand, IgnoreReason, Outcome};
use crate::flow::state::{
    Direction, FlowState, PendingStop, StepState, StopReason, StopRecord, StopTrigger,
};
use crate::spec::form::FormSpec;
use crate::spec::question::QuestionKind;
use crate::spec::step::StepSpec;
use crate::spec::stop_flow::StopFlowContent;
use crate::submission::{Submission, assemble};
use crate::visibility::{DependentsMap, HiddenSet, dependents_map, refresh_dependents};

/// Step sequencer for one questionnaire session.
///
/// Owns the answer set and the per-step state. All mutation goes through the
/// methods below; each call either applies fully or reports why it was
/// ignored in the returned [`Outcome`].
#[derive(Debug, Clone)]
pub struct FlowController {
    form: FormSpec,
    locations: BTreeMap<String, (usize, usize)>,
    dependents: DependentsMap,
    state: FlowState,
    /// State captured right before the stop-flow currently being resolved.
    attempt: Option<FlowState>,
    /// One entry per committed stop, newest last; Cancel pops.
    stop_history: Vec<FlowState>,
}

impl FlowController {
    pub fn new(form: FormSpec) -> Result<Self, FormError> {
        form.check()?;
        let locations = form
            .steps
            .iter()
            .enumerate()
            .flat_map(|(index, step)| {
                step.questions
                    .iter()
                    .enumerate()
                    .map(move |(position, question)| (question.key.clone(), (index + 1, position)))
            })
            .collect();
        let dependents = dependents_map(&form);
        let state = FlowState::initial(&form);
        debug!(form = %form.id, steps = form.number_of_steps(), "flow session started");
        Ok(Self {
            form,
            locations,
            dependents,
            state,
            attempt: None,
            stop_history: Vec::new(),
        })
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn number_of_steps(&self) -> usize {
        self.form.number_of_steps()
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn current_step_spec(&self) -> &StepSpec {
        &self.form.steps[self.state.current_step - 1]
    }

    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    pub fn step_states(&self) -> &[StepState] {
        &self.state.steps
    }

    /// State of a step by 1-based index.
    pub fn step_state(&self, step: usize) -> Option<StepState> {
        step.checked_sub(1)
            .and_then(|index| self.state.steps.get(index))
            .copied()
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.state.answers
    }

    pub fn answer(&self, key: &str) -> Option<&Answer> {
        self.state.answers.get(key)
    }

    pub fn hidden_questions(&self) -> &HiddenSet {
        &self.state.hidden
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.state.hidden.contains(key)
    }

    pub fn skipped_questions(&self) -> &BTreeSet<String> {
        &self.state.skipped_questions
    }

    pub fn steps_called_continue_flow(&self) -> &BTreeSet<usize> {
        &self.state.continued_from
    }

    pub fn is_stopping_flow(&self) -> bool {
        self.state.pending.is_some()
    }

    pub fn pending_stop(&self) -> Option<&PendingStop> {
        self.state.pending.as_ref()
    }

    pub fn stopped_reason(&self) -> Option<&StopReason> {
        self.state.stopped.as_ref().map(|record| &record.reason)
    }

    pub fn is_submitted(&self) -> bool {
        self.state.submitted
    }

    /// Errors of the last rejected transition.
    pub fn errors(&self) -> &[ValidationError] {
        &self.state.errors
    }

    /// Help texts currently surfaced for a question.
    pub fn info_for(&self, key: &str) -> Vec<&str> {
        self.form
            .question(key)
            .map(|question| question.active_info(&self.state.answers))
            .unwrap_or_default()
    }

    /// Validates a step against the live answers, without changing state.
    pub fn validate_step(&self, step: usize) -> Option<ValidationResult> {
        (1..=self.number_of_steps())
            .contains(&step)
            .then(|| self.state.validate_step(&self.form, step))
    }

    /// Frozen hand-off payload, available once the form is submitted.
    pub fn submission(&self) -> Option<Submission> {
        self.state
            .submitted
            .then(|| assemble(&self.form, &self.state))
    }

    pub fn apply(&mut self, command: FlowCommand) -> Outcome {
        match command {
            FlowCommand::Answer { key, value } => self.set_answer(&key, value),
            FlowCommand::ResetAnswer { key } => self.reset_answer(&key),
            FlowCommand::Next => self.next(),
            FlowCommand::Previous => self.previous(),
            FlowCommand::GoToStep { step } => self.go_to_step(step),
            FlowCommand::GoToRecap => self.go_to_recap(),
            FlowCommand::Stop { reason } => self.stop(&reason),
            FlowCommand::Continue => self.continue_flow(),
            FlowCommand::Cancel => self.cancel(),
            FlowCommand::Restart => self.restart(),
        }
    }

    /// Discards the session and starts over from step 1 with defaults.
    pub fn restart(&mut self) -> Outcome {
        self.state = FlowState::initial(&self.form);
        self.attempt = None;
        self.stop_history.clear();
        debug!("flow session restarted");
        Outcome::Moved {
            from: 1,
            to: 1,
            direction: Direction::Forward,
        }
    }

    /// Records an answer coming from the UI.
    pub fn set_answer(&mut self, key: &str, answer: Answer) -> Outcome {
        if let Some(reason) = self.interaction_blocked() {
            return Outcome::ignored(reason);
        }
        let Some(&(step, position)) = self.locations.get(key) else {
            warn!(key, "answer for unknown question");
            return Outcome::ignored(IgnoreReason::UnknownQuestion);
        };
        let question = &self.form.steps[step - 1].questions[position];
        if !question.kind.accepts(&answer) {
            warn!(
                key,
                kind = question.question_type().as_str(),
                "answer shape does not match question type"
            );
            return Outcome::ignored(IgnoreReason::TypeMismatch);
        }
        if self.state.slot(step).skipped {
            return Outcome::ignored(IgnoreReason::SkippedStep);
        }
        if self.state.answers.get(key) == Some(&answer) {
            return Outcome::Unchanged;
        }

        let terminator = match &question.kind {
            QuestionKind::TerminatorButton { stop_flow_content } if answer == Answer::Bool(true) => {
                if step != self.state.current_step {
                    return Outcome::ignored(IgnoreReason::InactiveStep);
                }
                Some(stop_flow_content.clone())
            }
            _ => None,
        };
        if terminator.is_some() {
            self.attempt = Some(self.state.clone());
        }

        self.state.answers.insert(key, answer);
        self.state.skipped_questions.remove(key);
        refresh_dependents(
            &self.form,
            &self.dependents,
            key,
            &self.state.answers,
            &mut self.state.hidden,
        );

        if let Some(content) = terminator {
            return self.trigger_stop(
                StopTrigger::Terminator {
                    question_key: key.to_string(),
                },
                content,
            );
        }

        if step == self.state.current_step {
            self.refresh_speculation();
        } else if self.state.slot(step).visited {
            let valid = self.state.validate_step(&self.form, step).valid;
            self.state.slot_mut(step).valid = valid;
        }
        Outcome::Updated
    }

    /// Puts a question back to its default answer.
    pub fn reset_answer(&mut self, key: &str) -> Outcome {
        match self.form.question(key) {
            Some(question) => {
                let default = question.default_answer();
                self.set_answer(key, default)
            }
            None => Outcome::ignored(IgnoreReason::UnknownQuestion),
        }
    }

    pub fn next(&mut self) -> Outcome {
        if let Some(reason) = self.interaction_blocked() {
            return Outcome::ignored(reason);
        }
        let current = self.state.current_step;
        if current >= self.number_of_steps() {
            return Outcome::ignored(IgnoreReason::LastStep);
        }
        let result = self.state.validate_step(&self.form, current);
        if !result.valid {
            return self.reject(result);
        }
        if let Some(outcome) = self.check_rules() {
            return outcome;
        }
        self.leave_forward(current + 1)
    }

    pub fn previous(&mut self) -> Outcome {
        if self.state.pending.is_some() {
            return Outcome::ignored(IgnoreReason::StopFlowPending);
        }
        let current = self.state.current_step;
        if self.state.submitted {
            return self.reopen();
        }
        if current <= 1 {
            return Outcome::ignored(IgnoreReason::FirstStep);
        }
        let target = (1..current)
            .rev()
            .find(|&step| !self.state.slot(step).skipped)
            .unwrap_or(1);
        let valid = self.state.validate_step(&self.form, current).valid;
        self.state.mark_left(current, valid);
        self.move_to(target, Direction::Backward)
    }

    /// Arbitrary jump, as used by a step tracker.
    pub fn go_to_step(&mut self, target: usize) -> Outcome {
        if self.state.pending.is_some() {
            return Outcome::ignored(IgnoreReason::StopFlowPending);
        }
        if target < 1 || target > self.number_of_steps() {
            return Outcome::ignored(IgnoreReason::OutOfRange);
        }
        let current = self.state.current_step;
        if target == current {
            return if self.state.submitted {
                self.reopen()
            } else {
                Outcome::ignored(IgnoreReason::SameStep)
            };
        }
        self.state.submitted = false;

        if target > current {
            let result = self.state.validate_step(&self.form, current);
            if !result.valid {
                return self.reject(result);
            }
            if let Some(outcome) = self.check_rules() {
                return outcome;
            }
            self.leave_forward(target)
        } else {
            let valid = self.state.validate_step(&self.form, current).valid;
            self.state.mark_left(current, valid);
            self.move_to(target, Direction::Backward)
        }
    }

    /// Finishes the questionnaire, or redirects to the first blocking step.
    pub fn go_to_recap(&mut self) -> Outcome {
        if let Some(reason) = self.interaction_blocked() {
            return Outcome::ignored(reason);
        }
        let current = self.state.current_step;
        let result = self.state.validate_step(&self.form, current);
        if !result.valid && !self.state.slot(current).skipped {
            return self.reject(result);
        }
        if let Some(outcome) = self.check_rules() {
            return outcome;
        }
        self.enter_recap()
    }

    /// Stop button of the open modal.
    pub fn stop(&mut self, reason: &str) -> Outcome {
        match self.state.pending.take() {
            Some(pending) => self.stop_with(pending.trigger, reason.to_string()),
            None => Outcome::ignored(IgnoreReason::NoStopFlowPending),
        }
    }

    /// Continue button of the open modal.
    pub fn continue_flow(&mut self) -> Outcome {
        match self.state.pending.take() {
            Some(pending) => {
                let target = pending
                    .content
                    .continue_target()
                    .unwrap_or(self.state.current_step + 1);
                self.continue_to(pending.trigger, target)
            }
            None => Outcome::ignored(IgnoreReason::NoStopFlowPending),
        }
    }

    /// Cancel button of the open modal, or undo of a committed stop.
    pub fn cancel(&mut self) -> Outcome {
        if let Some(pending) = self.state.pending.take() {
            self.attempt = None;
            if let Some(key) = pending.trigger.question_key() {
                self.reset_and_refresh(key);
            }
            self.refresh_speculation();
            debug!(step = self.state.current_step, "stop-flow dismissed");
            return Outcome::Cancelled;
        }
        if self.state.stopped.is_none() {
            return Outcome::ignored(IgnoreReason::NothingToCancel);
        }
        match self.stop_history.pop() {
            Some(previous) => self.state = previous,
            None => self.rollback_stop(),
        }
        info!(step = self.state.current_step, "stop-flow cancelled, state rolled back");
        Outcome::Cancelled
    }

    fn interaction_blocked(&self) -> Option<IgnoreReason> {
        if self.state.submitted {
            Some(IgnoreReason::Submitted)
        } else if self.state.pending.is_some() {
            Some(IgnoreReason::StopFlowPending)
        } else {
            None
        }
    }

    fn reject(&mut self, result: ValidationResult) -> Outcome {
        debug!(
            step = self.state.current_step,
            errors = result.errors.len(),
            "step did not validate"
        );
        self.state.errors = result.errors.clone();
        Outcome::Invalid {
            errors: result.errors,
        }
    }

    fn reopen(&mut self) -> Outcome {
        self.state.submitted = false;
        self.state.direction = Direction::Backward;
        self.state.recompute_hidden(&self.form);
        debug!(step = self.state.current_step, "recap left for editing");
        Outcome::Reopened {
            step: self.state.current_step,
        }
    }

    /// First rule of the current step that holds, turned into a stop-flow.
    fn check_rules(&mut self) -> Option<Outcome> {
        let current = self.state.current_step;
        let (rule, content) = self.form.steps[current - 1]
            .matching_rule(&self.state.answers)
            .map(|(index, rule)| (index, rule.content.clone()))?;
        Some(self.trigger_stop(
            StopTrigger::Rule {
                step: current,
                rule,
            },
            content,
        ))
    }

    fn trigger_stop(&mut self, trigger: StopTrigger, content: StopFlowContent) -> Outcome {
        if self.attempt.is_none() {
            self.attempt = Some(self.state.clone());
        }
        if let Some(reason) = content.bypass_reason() {
            return match content.continue_target() {
                Some(target) => self.continue_to(trigger, target),
                None => self.stop_with(trigger, reason.to_string()),
            };
        }
        debug!(step = self.state.current_step, ?trigger, "stop-flow awaiting a choice");
        self.state.pending = Some(PendingStop {
            trigger,
            content: content.clone(),
        });
        Outcome::StopFlowPending { content }
    }

    /// Position, within the current step, of the question that triggered.
    fn anchor(&self, trigger: &StopTrigger) -> usize {
        let step = &self.form.steps[self.state.current_step - 1];
        match trigger {
            StopTrigger::Terminator { question_key } => step
                .position_of(question_key)
                .unwrap_or(step.questions.len() - 1),
            StopTrigger::Rule { rule, .. } => step
                .stop_flow_condition
                .get(*rule)
                .map(|rule| step.rule_anchor(rule))
                .unwrap_or(step.questions.len() - 1),
        }
    }

    fn stop_with(&mut self, trigger: StopTrigger, reason: String) -> Outcome {
        let current = self.state.current_step;
        let anchor = self.anchor(&trigger);

        self.state.undo_speculation();
        self.state.skip_questions_after(&self.form, current, anchor);
        for step in current + 1..=self.number_of_steps() {
            self.state.skip_step(&self.form, step);
        }
        self.state.mark_left(current, true);
        self.state.slot_mut(current).skipped = false;

        let reason = StopReason {
            reason,
            question_key: trigger.question_key().map(str::to_string),
        };
        self.state.stopped = Some(StopRecord {
            step: current,
            reason: reason.clone(),
        });
        self.state.pending = None;
        self.state.errors.clear();
        self.state.submitted = true;
        self.state.recompute_hidden(&self.form);
        if let Some(previous) = self.attempt.take() {
            self.stop_history.push(previous);
        }
        info!(step = current, reason = %reason.reason, "questionnaire stopped");
        Outcome::Stopped { reason }
    }

    fn continue_to(&mut self, trigger: StopTrigger, target: usize) -> Outcome {
        let current = self.state.current_step;
        let anchor = self.anchor(&trigger);

        let result = self.state.validate_prefix(&self.form, current, anchor);
        if !result.valid {
            self.attempt = None;
            if let Some(key) = trigger.question_key() {
                self.reset_and_refresh(key);
            }
            return self.reject(result);
        }

        self.state.undo_speculation();
        let last = self.number_of_steps();
        let target = target.max(current + 1);
        self.state.skip_questions_after(&self.form, current, anchor);
        for step in current + 1..target.min(last + 1) {
            self.state.skip_step(&self.form, step);
        }
        self.state.continued_from.insert(current);
        self.state
            .reset_terminators(&self.form, current, trigger.question_key());
        self.state.mark_left(current, true);
        if self
            .state
            .stopped
            .as_ref()
            .is_some_and(|record| record.step == current)
        {
            self.state.stopped = None;
            self.stop_history.clear();
        }
        self.state.pending = None;
        self.attempt = None;

        if target > last {
            info!(step = current, "stop-flow continued past the last step");
            return self.enter_recap();
        }
        info!(from = current, to = target, "stop-flow continued");
        self.move_to(target, Direction::Forward);
        Outcome::Continued {
            from: current,
            to: target,
        }
    }

    fn leave_forward(&mut self, target: usize) -> Outcome {
        let from = self.state.current_step;
        if self.state.continued_from.remove(&from) {
            self.state.release_following(&self.form, from);
        }
        if self
            .state
            .stopped
            .as_ref()
            .is_some_and(|record| record.step == from)
        {
            debug!(step = from, "earlier stop abandoned");
            self.state.stopped = None;
            self.stop_history.clear();
            self.state.release_following(&self.form, from);
        }
        self.state.reset_terminators(&self.form, from, None);
        self.state.mark_left(from, true);
        self.move_to(target, Direction::Forward)
    }

    fn move_to(&mut self, target: usize, direction: Direction) -> Outcome {
        let from = self.state.current_step;
        // Pre-marked skips only live while their origin step is current.
        if self.state.undo_speculation() {
            debug!(from, "pre-marked skip range dropped");
        }
        if self.state.slot(target).skipped {
            self.state.release_step(&self.form, target);
        }
        self.state.slot_mut(target).visited = true;
        self.state.current_step = target;
        self.state.direction = direction;
        self.state.errors.clear();
        self.state.recompute_hidden(&self.form);
        debug!(from, to = target, ?direction, "moved");
        Outcome::Moved {
            from,
            to: target,
            direction,
        }
    }

    fn enter_recap(&mut self) -> Outcome {
        let current = self.state.current_step;
        self.state.undo_speculation();
        self.state.mark_left(current, true);
        let blocking = (1..=self.number_of_steps())
            .find(|&step| step != current && !self.state.slot(step).is_passable());
        if let Some(step) = blocking {
            debug!(step, "recap blocked, redirecting");
            return if step > current {
                self.leave_forward(step)
            } else {
                self.move_to(step, Direction::Backward)
            };
        }
        self.state.submitted = true;
        self.state.errors.clear();
        info!(step = current, stopped = self.state.stopped.is_some(), "questionnaire submitted");
        Outcome::Submitted
    }

    /// Fallback undo when no snapshot of the stop exists.
    fn rollback_stop(&mut self) {
        let Some(record) = self.state.stopped.take() else {
            return;
        };
        let origin = record.step;
        for question in &self.form.steps[origin - 1].questions {
            self.state.skipped_questions.remove(&question.key);
        }
        for step in origin + 1..=self.number_of_steps() {
            if self.state.slot(step).skipped {
                self.state.release_step(&self.form, step);
            }
            *self.state.slot_mut(step) = StepState::default();
        }
        let slot = self.state.slot_mut(origin);
        slot.valid = false;
        slot.visited = true;
        if let Some(key) = &record.reason.question_key {
            self.state.reset_answer(&self.form, key);
        }
        self.state.submitted = false;
        self.state.recompute_hidden(&self.form);
    }

    fn reset_and_refresh(&mut self, key: &str) {
        self.state.reset_answer(&self.form, key);
        refresh_dependents(
            &self.form,
            &self.dependents,
            key,
            &self.state.answers,
            &mut self.state.hidden,
        );
    }

    /// Re-evaluates the current step's rules after an answer changed and
    /// keeps the pre-marked skip range in line with them.
    fn refresh_speculation(&mut self) {
        let current = self.state.current_step;
        let last = self.number_of_steps();
        let prospective = self.form.steps[current - 1]
            .matching_rule(&self.state.answers)
            .map(|(_, rule)| rule.content.continue_target());

        let unchanged = match (&self.state.speculative, prospective) {
            (Some(speculative), Some(Some(target))) => {
                speculative.origin == current && speculative.target == target
            }
            (None, Some(_)) => self.state.continued_from.contains(&current),
            (None, None) => !self.state.continued_from.contains(&current),
            (Some(_), _) => false,
        };
        if unchanged {
            return;
        }

        self.state.undo_speculation();
        if prospective.is_none() && self.state.continued_from.remove(&current) {
            debug!(step = current, "continuing rule no longer holds, releasing skipped steps");
            self.state.release_following(&self.form, current);
        }
        if let Some(Some(target)) = prospective
            && target > current + 1
            && target <= last
            && !self.state.continued_from.contains(&current)
        {
            debug!(from = current, to = target, "pre-marking skip range");
            self.state.speculate(&self.form, current, target);
        }
    }
}
