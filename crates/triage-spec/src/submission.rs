use std::convert::Infallible;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::Answer;
use crate::flow::StopReason;
use crate::flow::state::FlowState;
use crate::spec::form::FormSpec;
use crate::spec::question::QuestionType;

/// One flattened answer. Skipped and hidden questions carry their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmittedAnswer {
    pub question_key: String,
    pub answer_type: QuestionType,
    pub answer: Answer,
    pub skipped: bool,
}

/// Payload handed to persistence/report generation once the form is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub form_id: String,
    pub form_version: String,
    pub answers: Vec<SubmittedAnswer>,
    pub skipped_steps: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

impl Submission {
    pub fn answer(&self, key: &str) -> Option<&SubmittedAnswer> {
        self.answers.iter().find(|answer| answer.question_key == key)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }
}

/// Receiver of finished submissions. Delivery failures belong to the sink;
/// the payload is already frozen when `submit` is called.
pub trait SubmissionSink {
    type Error;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error>;
}

impl SubmissionSink for Vec<Submission> {
    type Error = Infallible;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error> {
        self.push(submission.clone());
        Ok(())
    }
}

pub(crate) fn assemble(form: &FormSpec, state: &FlowState) -> Submission {
    let mut answers = Vec::new();
    let mut skipped_steps = Vec::new();

    for (index, step) in form.steps.iter().enumerate() {
        let step_skipped = state.steps[index].skipped;
        if step_skipped {
            skipped_steps.push(index + 1);
        }
        for question in &step.questions {
            let skipped = step_skipped || state.skipped_questions.contains(&question.key);
            let answer = if skipped || state.hidden.contains(&question.key) {
                question.default_answer()
            } else {
                state
                    .answers
                    .get(&question.key)
                    .cloned()
                    .unwrap_or_else(|| question.default_answer())
            };
            answers.push(SubmittedAnswer {
                question_key: question.key.clone(),
                answer_type: question.question_type(),
                answer,
                skipped,
            });
        }
    }

    Submission {
        form_id: form.id.clone(),
        form_version: form.version.clone(),
        answers,
        skipped_steps,
        stop_reason: state.stopped.as_ref().map(|record| record.reason.clone()),
    }
}
