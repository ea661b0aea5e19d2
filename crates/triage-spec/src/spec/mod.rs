pub mod form;
pub mod question;
pub mod step;
pub mod stop_flow;

pub use form::FormSpec;
pub use question::{ChoiceOption, InfoCondition, QuestionKind, QuestionSpec, QuestionType};
pub use step::StepSpec;
pub use stop_flow::{
    BypassReason, CancelFlowButton, ContinueFlowButton, StopButton, StopFlowContent, StopFlowRule,
};
