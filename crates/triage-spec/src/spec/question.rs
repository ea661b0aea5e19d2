use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{Answer, AnswerSet};
use crate::expr::Condition;
use crate::spec::stop_flow::StopFlowContent;

/// Selectable option of a choice-like question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// Contextual help shown while `condition` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InfoCondition {
    pub condition: Condition,
    pub text: String,
}

/// Type-specific part of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Boolean,
    MultiChoice { options: Vec<ChoiceOption> },
    MultiSelect { options: Vec<ChoiceOption> },
    Select { options: Vec<ChoiceOption> },
    Body {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    Text,
    Textarea,
    TerminatorButton { stop_flow_content: StopFlowContent },
}

/// Fieldless mirror of [`QuestionKind`], reported in submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Boolean,
    MultiChoice,
    MultiSelect,
    Select,
    Body,
    Text,
    Textarea,
    TerminatorButton,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Boolean => "boolean",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::MultiSelect => "multi_select",
            QuestionType::Select => "select",
            QuestionType::Body => "body",
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::TerminatorButton => "terminator_button",
        }
    }
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Boolean => QuestionType::Boolean,
            QuestionKind::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionKind::MultiSelect { .. } => QuestionType::MultiSelect,
            QuestionKind::Select { .. } => QuestionType::Select,
            QuestionKind::Body { .. } => QuestionType::Body,
            QuestionKind::Text => QuestionType::Text,
            QuestionKind::Textarea => QuestionType::Textarea,
            QuestionKind::TerminatorButton { .. } => QuestionType::TerminatorButton,
        }
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            QuestionKind::MultiChoice { options }
            | QuestionKind::MultiSelect { options }
            | QuestionKind::Select { options }
            | QuestionKind::Body { options } => options,
            QuestionKind::Boolean
            | QuestionKind::Text
            | QuestionKind::Textarea
            | QuestionKind::TerminatorButton { .. } => &[],
        }
    }

    /// Answer used when the configuration does not provide one.
    pub fn empty_answer(&self) -> Answer {
        match self {
            QuestionKind::Boolean | QuestionKind::TerminatorButton { .. } => Answer::Bool(false),
            QuestionKind::MultiChoice { .. } | QuestionKind::MultiSelect { .. } => {
                Answer::List(Vec::new())
            }
            QuestionKind::Select { .. }
            | QuestionKind::Body { .. }
            | QuestionKind::Text
            | QuestionKind::Textarea => Answer::Text(String::new()),
        }
    }

    /// Whether `answer` has the shape this question type stores.
    pub fn accepts(&self, answer: &Answer) -> bool {
        matches!(
            (self, answer),
            (
                QuestionKind::Boolean | QuestionKind::TerminatorButton { .. },
                Answer::Bool(_)
            ) | (
                QuestionKind::MultiChoice { .. } | QuestionKind::MultiSelect { .. },
                Answer::List(_)
            ) | (
                QuestionKind::Select { .. }
                    | QuestionKind::Body { .. }
                    | QuestionKind::Text
                    | QuestionKind::Textarea,
                Answer::Text(_)
            )
        )
    }
}

/// One question of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub key: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_answer: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info_condition: Vec<InfoCondition>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl QuestionSpec {
    pub fn new(key: impl Into<String>, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            description: None,
            is_required: false,
            default_answer: None,
            display_condition: None,
            dependents: Vec::new(),
            info_condition: Vec::new(),
            kind,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_default(mut self, answer: Answer) -> Self {
        self.default_answer = Some(answer);
        self
    }

    pub fn with_display_condition(mut self, condition: Condition) -> Self {
        self.display_condition = Some(condition);
        self
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn default_answer(&self) -> Answer {
        self.default_answer
            .clone()
            .unwrap_or_else(|| self.kind.empty_answer())
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, QuestionKind::TerminatorButton { .. })
    }

    /// Displayed unless a display condition evaluates false.
    pub fn is_visible(&self, answers: &AnswerSet) -> bool {
        self.display_condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(answers))
    }

    /// Required-ness gated by the display condition over the full answer set.
    pub fn is_effectively_required(&self, answers: &AnswerSet) -> bool {
        self.is_required && self.is_visible(answers)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.kind.options().iter().any(|option| option.value == value)
    }

    /// Help texts whose condition currently holds.
    pub fn active_info<'a>(&'a self, answers: &AnswerSet) -> Vec<&'a str> {
        self.info_condition
            .iter()
            .filter(|info| info.condition.evaluate(answers))
            .map(|info| info.text.as_str())
            .collect()
    }
}
