use std::collections::BTreeSet;

use crate::answers::{Answer, AnswerSet, ValidationError, ValidationResult};
use crate::spec::question::{QuestionKind, QuestionSpec};
use crate::spec::step::StepSpec;

/// Validation rules for one step, optionally narrowed to a prefix of the
/// step or with skipped questions taken out.
#[derive(Debug, Clone)]
pub struct StepSchema<'a> {
    questions: Vec<&'a QuestionSpec>,
}

pub fn build_step_schema(step: &StepSpec) -> StepSchema<'_> {
    StepSchema {
        questions: step.questions.iter().collect(),
    }
}

impl<'a> StepSchema<'a> {
    /// Keeps questions up to and including `key`.
    pub fn until(mut self, key: &str) -> Self {
        if let Some(position) = self.questions.iter().position(|question| question.key == key) {
            self.questions.truncate(position + 1);
        }
        self
    }

    /// Drops the given questions.
    pub fn excluding(mut self, keys: &BTreeSet<String>) -> Self {
        self.questions.retain(|question| !keys.contains(&question.key));
        self
    }

    pub fn question_keys(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|question| question.key.as_str())
    }

    /// Validates the step's answers. `full` is the cross-step answer set that
    /// conditional required-ness is evaluated against; answers missing from
    /// `step_answers` fall back to the question default.
    pub fn validate(&self, step_answers: &AnswerSet, full: &AnswerSet) -> ValidationResult {
        let errors: Vec<ValidationError> = self
            .questions
            .iter()
            .filter_map(|question| {
                let answer = step_answers
                    .get(&question.key)
                    .cloned()
                    .unwrap_or_else(|| question.default_answer());
                validate_question(question, &answer, full)
            })
            .collect();

        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn validate_question(
    question: &QuestionSpec,
    answer: &Answer,
    full: &AnswerSet,
) -> Option<ValidationError> {
    if !question.kind.accepts(answer) {
        return Some(ValidationError::new(
            &question.key,
            "type mismatch",
            "type_mismatch",
        ));
    }

    let required = question.is_effectively_required(full);
    match (&question.kind, answer) {
        (QuestionKind::Boolean | QuestionKind::TerminatorButton { .. }, _) => None,
        (QuestionKind::MultiChoice { .. } | QuestionKind::MultiSelect { .. }, Answer::List(items)) => {
            if required && items.is_empty() {
                Some(required_error(question, "add at least one value"))
            } else if items.iter().any(|item| !question.has_option(item)) {
                Some(ValidationError::new(
                    &question.key,
                    "invalid value added",
                    "invalid_option",
                ))
            } else {
                None
            }
        }
        (QuestionKind::Select { .. }, Answer::Text(value)) => {
            if required && value.is_empty() {
                Some(required_error(question, "add a value"))
            } else if *answer != question.default_answer() && !question.has_option(value) {
                Some(ValidationError::new(
                    &question.key,
                    "add a valid value",
                    "invalid_option",
                ))
            } else {
                None
            }
        }
        (QuestionKind::Body { .. }, Answer::Text(value)) => {
            (required && value.is_empty()).then(|| required_error(question, "select a body part"))
        }
        (QuestionKind::Text | QuestionKind::Textarea, Answer::Text(value)) => {
            (required && value.is_empty()).then(|| required_error(question, "add a value"))
        }
        _ => Some(ValidationError::new(
            &question.key,
            "type mismatch",
            "type_mismatch",
        )),
    }
}

fn required_error(question: &QuestionSpec, message: &str) -> ValidationError {
    ValidationError::new(&question.key, message, "required")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::ChoiceOption;

    fn select_step() -> StepSpec {
        StepSpec::new(
            "pick",
            vec![
                QuestionSpec::new(
                    "level",
                    "Level",
                    QuestionKind::Select {
                        options: vec![ChoiceOption::new("1"), ChoiceOption::new("2")],
                    },
                )
                .required(),
                QuestionSpec::new("notes", "Notes", QuestionKind::Text).required(),
            ],
        )
    }

    #[test]
    fn until_truncates_after_key() {
        let step = select_step();
        let schema = build_step_schema(&step).until("level");
        assert_eq!(schema.question_keys().collect::<Vec<_>>(), vec!["level"]);
    }

    #[test]
    fn excluding_skips_required_checks() {
        let step = select_step();
        let skipped = BTreeSet::from(["notes".to_string()]);
        let answers = AnswerSet::from_iter([("level", Answer::Text("2".into()))]);
        let result = build_step_schema(&step)
            .excluding(&skipped)
            .validate(&answers, &answers);
        assert!(result.valid);
    }

    #[test]
    fn wrong_shape_is_type_mismatch() {
        let step = select_step();
        let answers = AnswerSet::from_iter([
            ("level", Answer::Bool(true)),
            ("notes", Answer::Text("x".into())),
        ]);
        let result = build_step_schema(&step).validate(&answers, &answers);
        assert_eq!(
            result.error_for("level").map(|error| error.code.as_str()),
            Some("type_mismatch")
        );
    }
}
