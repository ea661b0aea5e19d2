use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{Answer, AnswerSet, bool_token, is_blank};

/// Boolean expression over the answer set, used for display conditions,
/// info conditions and stop-flow rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Condition {
    Composite(CompositeCondition),
    Question(QuestionCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeKind {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompositeCondition {
    #[serde(rename = "type")]
    pub kind: CompositeKind,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionCondition {
    pub question_key: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<Literal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    IsAllIn,
    NotIsAllIn,
    IsAnyIn,
    NotIsAnyIn,
    IsEmpty,
    NotIsEmpty,
    /// Anything the configuration names that the engine does not know.
    #[serde(other)]
    Unknown,
}

/// Condition value entry. Booleans compare through their `true`/`false` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Text(String),
}

impl Literal {
    pub fn token(&self) -> Cow<'_, str> {
        match self {
            Literal::Bool(value) => Cow::Borrowed(bool_token(*value)),
            Literal::Text(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl Condition {
    /// Leaf condition helper.
    pub fn question(
        question_key: impl Into<String>,
        operator: Operator,
        value: impl IntoIterator<Item = impl Into<Literal>>,
    ) -> Self {
        Condition::Question(QuestionCondition {
            question_key: question_key.into(),
            operator,
            value: value.into_iter().map(Into::into).collect(),
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::Composite(CompositeCondition {
            kind: CompositeKind::And,
            conditions,
        })
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Composite(CompositeCondition {
            kind: CompositeKind::Or,
            conditions,
        })
    }

    /// Evaluates the condition against the full answer set. Never fails:
    /// missing answers and unknown operators yield `false`.
    pub fn evaluate(&self, answers: &AnswerSet) -> bool {
        match self {
            Condition::Composite(composite) => match composite.kind {
                CompositeKind::And => composite
                    .conditions
                    .iter()
                    .all(|condition| condition.evaluate(answers)),
                CompositeKind::Or => composite
                    .conditions
                    .iter()
                    .any(|condition| condition.evaluate(answers)),
            },
            Condition::Question(leaf) => leaf.evaluate(answers),
        }
    }

    /// Question keys referenced anywhere in the tree, in declaration order.
    pub fn question_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Condition::Composite(composite) => {
                for condition in &composite.conditions {
                    condition.collect_keys(keys);
                }
            }
            Condition::Question(leaf) => {
                if !keys.contains(&leaf.question_key.as_str()) {
                    keys.push(&leaf.question_key);
                }
            }
        }
    }
}

impl QuestionCondition {
    pub fn evaluate(&self, answers: &AnswerSet) -> bool {
        let Some(answer) = answers.get(&self.question_key) else {
            return false;
        };
        let expected: Vec<Cow<'_, str>> = self.value.iter().map(Literal::token).collect();

        match self.operator {
            Operator::Equals => equals(answer, &expected),
            Operator::NotEquals => !equals(answer, &expected),
            Operator::IsAllIn => is_all_in(answer, &expected),
            Operator::NotIsAllIn => !is_all_in(answer, &expected),
            Operator::IsAnyIn => is_any_in(answer, &expected),
            Operator::NotIsAnyIn => !is_any_in(answer, &expected),
            Operator::IsEmpty => answer.is_blank(),
            Operator::NotIsEmpty => !answer.is_blank(),
            Operator::Unknown => false,
        }
    }
}

/// Free-function form of [`Condition::evaluate`].
pub fn evaluate(condition: &Condition, answers: &AnswerSet) -> bool {
    condition.evaluate(answers)
}

fn contains(expected: &[Cow<'_, str>], candidate: &str) -> bool {
    expected.iter().any(|value| value.as_ref() == candidate)
}

// An empty condition value means "the answer must be blank" for the three
// membership operators below.

fn equals(answer: &Answer, expected: &[Cow<'_, str>]) -> bool {
    if expected.is_empty() {
        return answer.is_blank();
    }
    match answer {
        Answer::List(items) => {
            items.len() == expected.len() && items.iter().all(|item| contains(expected, item))
        }
        scalar => {
            expected.len() == 1
                && scalar
                    .scalar_token()
                    .is_some_and(|token| token == expected[0])
        }
    }
}

fn is_all_in(answer: &Answer, expected: &[Cow<'_, str>]) -> bool {
    if expected.is_empty() {
        return answer.is_blank();
    }
    match answer {
        Answer::List(items) => {
            if items.iter().all(|item| is_blank(item)) || items.len() > expected.len() {
                return false;
            }
            items.iter().all(|item| contains(expected, item))
        }
        scalar => scalar
            .scalar_token()
            .is_some_and(|token| contains(expected, &token)),
    }
}

fn is_any_in(answer: &Answer, expected: &[Cow<'_, str>]) -> bool {
    if expected.is_empty() {
        return answer.is_blank();
    }
    match answer {
        Answer::List(items) => items.iter().any(|item| contains(expected, item)),
        scalar => scalar
            .scalar_token()
            .is_some_and(|token| contains(expected, &token)),
    }
}
