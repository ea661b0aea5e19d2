use std::borrow::Cow;
use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single answer value. The variant follows the question type:
/// booleans and terminator buttons hold `Bool`, multi choice/select hold `List`,
/// everything else holds `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl Answer {
    /// True for a blank scalar or a list made only of blank entries.
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Bool(_) => false,
            Answer::Text(text) => is_blank(text),
            Answer::List(items) => items.iter().all(|item| is_blank(item)),
        }
    }

    /// Canonical token used when comparing scalars with condition literals.
    pub fn scalar_token(&self) -> Option<Cow<'_, str>> {
        match self {
            Answer::Bool(value) => Some(Cow::Borrowed(bool_token(*value))),
            Answer::Text(text) => Some(Cow::Borrowed(text.as_str())),
            Answer::List(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Answer::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short display form used by the text renderer and the CLI.
    pub fn display(&self) -> String {
        match self {
            Answer::Bool(value) => bool_token(*value).to_string(),
            Answer::Text(text) => text.clone(),
            Answer::List(items) => items.join(", "),
        }
    }
}

pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

pub(crate) fn bool_token(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// The answers of one in-progress submission, keyed by question key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<String, Answer>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Answer> {
        self.answers.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.answers.contains_key(key)
    }

    /// Stores an answer and returns the previous one.
    pub fn insert(&mut self, key: impl Into<String>, answer: Answer) -> Option<Answer> {
        self.answers.insert(key.into(), answer)
    }

    pub fn remove(&mut self, key: &str) -> Option<Answer> {
        self.answers.remove(key)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Answer)> {
        self.answers.iter()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }
}

impl<K: Into<String>> FromIterator<(K, Answer)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (K, Answer)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().map(|(key, answer)| (key.into(), answer)).collect(),
        }
    }
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub question_key: String,
    pub path: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub(crate) fn new(question_key: &str, message: &str, code: &str) -> Self {
        Self {
            question_key: question_key.to_string(),
            path: format!("/{}", question_key),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Outcome of validating a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn error_for(&self, question_key: &str) -> Option<&ValidationError> {
        self.errors
            .iter()
            .find(|error| error.question_key == question_key)
    }
}
