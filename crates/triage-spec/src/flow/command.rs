use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{Answer, ValidationError};
use crate::flow::state::{Direction, StopReason};
use crate::spec::stop_flow::StopFlowContent;

/// A UI event expressed as data, so sessions can be recorded and replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowCommand {
    Answer { key: String, value: Answer },
    ResetAnswer { key: String },
    Next,
    Previous,
    GoToStep { step: usize },
    GoToRecap,
    Stop { reason: String },
    Continue,
    Cancel,
    Restart,
}

/// Why a request left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Submitted,
    StopFlowPending,
    NoStopFlowPending,
    FirstStep,
    LastStep,
    OutOfRange,
    SameStep,
    UnknownQuestion,
    TypeMismatch,
    SkippedStep,
    InactiveStep,
    NothingToCancel,
}

/// Result of one controller operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Moved {
        from: usize,
        to: usize,
        direction: Direction,
    },
    /// Left recap and returned to editing the current step.
    Reopened { step: usize },
    Invalid { errors: Vec<ValidationError> },
    StopFlowPending { content: StopFlowContent },
    Continued { from: usize, to: usize },
    Submitted,
    Stopped { reason: StopReason },
    Cancelled,
    Updated,
    Unchanged,
    Ignored { reason: IgnoreReason },
}

impl Outcome {
    pub(crate) fn ignored(reason: IgnoreReason) -> Self {
        Outcome::Ignored { reason }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Outcome::Ignored { .. })
    }
}
