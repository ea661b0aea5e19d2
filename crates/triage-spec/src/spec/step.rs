use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerSet;
use crate::spec::question::QuestionSpec;
use crate::spec::stop_flow::StopFlowRule;

/// One screen of the questionnaire. Steps are addressed by 1-based index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_flow_condition: Vec<StopFlowRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_label: Option<String>,
    #[serde(default)]
    pub no_continue_button: bool,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, questions: Vec<QuestionSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            questions,
            stop_flow_condition: Vec::new(),
            continue_label: None,
            no_continue_button: false,
        }
    }

    pub fn with_rule(mut self, rule: StopFlowRule) -> Self {
        self.stop_flow_condition.push(rule);
        self
    }

    /// First rule, in declaration order, whose condition holds.
    pub fn matching_rule(&self, answers: &AnswerSet) -> Option<(usize, &StopFlowRule)> {
        self.stop_flow_condition
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.condition.evaluate(answers))
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.key == key)
    }

    /// Position of the last question in this step a rule's condition reads;
    /// the last question of the step when the rule only reads other steps.
    pub fn rule_anchor(&self, rule: &StopFlowRule) -> usize {
        rule.condition
            .question_keys()
            .into_iter()
            .filter_map(|key| self.position_of(key))
            .max()
            .unwrap_or_else(|| self.questions.len().saturating_sub(1))
    }
}
