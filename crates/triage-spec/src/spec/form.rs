use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::spec::question::{QuestionKind, QuestionSpec};
use crate::spec::step::StepSpec;
use crate::spec::stop_flow::StopFlowContent;

/// Top-level questionnaire definition: an ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
}

fn default_version() -> String {
    "0.0.0".into()
}

impl FormSpec {
    /// Parses a JSON form and audits it.
    pub fn from_json(json: &str) -> Result<Self, FormError> {
        let form: FormSpec = serde_json::from_str(json)?;
        form.check()?;
        Ok(form)
    }

    pub fn number_of_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by 1-based index.
    pub fn step(&self, step: usize) -> Option<&StepSpec> {
        step.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.steps.iter().flat_map(|step| step.questions.iter())
    }

    pub fn question(&self, key: &str) -> Option<&QuestionSpec> {
        self.questions().find(|question| question.key == key)
    }

    /// Static configuration audit.
    pub fn check(&self) -> Result<(), FormError> {
        if self.steps.is_empty() {
            return Err(FormError::NoSteps(self.id.clone()));
        }

        let mut keys = BTreeSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.questions.is_empty() {
                return Err(FormError::EmptyStep {
                    step: index + 1,
                    name: step.name.clone(),
                });
            }
            for question in &step.questions {
                if !keys.insert(question.key.as_str()) {
                    return Err(FormError::DuplicateKey(question.key.clone()));
                }
                if let Some(default) = &question.default_answer
                    && !question.kind.accepts(default)
                {
                    return Err(FormError::DefaultMismatch {
                        key: question.key.clone(),
                        kind: question.question_type().as_str(),
                    });
                }
            }
        }

        let last = self.steps.len();
        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            for question in &step.questions {
                let mut references: Vec<&str> =
                    question.dependents.iter().map(String::as_str).collect();
                if let Some(condition) = &question.display_condition {
                    references.extend(condition.question_keys());
                }
                for info in &question.info_condition {
                    references.extend(info.condition.question_keys());
                }
                if let Some(missing) = references.into_iter().find(|key| !keys.contains(key)) {
                    return Err(FormError::UnknownReference {
                        question: question.key.clone(),
                        missing: missing.to_string(),
                    });
                }
                if let QuestionKind::TerminatorButton { stop_flow_content } = &question.kind {
                    check_continue_target(stop_flow_content, number, last)?;
                }
            }
            for rule in &step.stop_flow_condition {
                if let Some(missing) = rule
                    .condition
                    .question_keys()
                    .into_iter()
                    .find(|key| !keys.contains(key))
                {
                    return Err(FormError::UnknownRuleReference {
                        step: number,
                        missing: missing.to_string(),
                    });
                }
                check_continue_target(&rule.content, number, last)?;
            }
        }

        Ok(())
    }
}

fn check_continue_target(
    content: &StopFlowContent,
    step: usize,
    last: usize,
) -> Result<(), FormError> {
    match content.continue_target() {
        Some(target) if target <= step || target > last => Err(FormError::ContinueOutOfRange {
            step,
            target,
            last,
        }),
        _ => Ok(()),
    }
}
