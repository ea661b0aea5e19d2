#![allow(missing_docs)]

pub mod answers;
pub mod error;
pub mod expr;
pub mod flow;
pub mod render;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;

pub use answers::{Answer, AnswerSet, ValidationError, ValidationResult};
pub use error::FormError;
pub use expr::{Condition, Literal, Operator, evaluate};
pub use flow::{
    Direction, FlowCommand, FlowController, IgnoreReason, Outcome, PendingStop, StepState,
    StopReason, StopTrigger,
};
pub use render::{FlowView, build_view, render_json_ui, render_text};
pub use spec::{FormSpec, QuestionKind, QuestionSpec, QuestionType, StepSpec, StopFlowContent};
pub use submission::{Submission, SubmissionSink, SubmittedAnswer};
pub use validate::{StepSchema, build_step_schema};
pub use visibility::{HiddenSet, resolve_hidden};
