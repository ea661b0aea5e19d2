use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Condition;

/// Step-level rule: when `condition` holds the flow stops or leaps forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StopFlowRule {
    pub condition: Condition,
    pub content: StopFlowContent,
}

/// Terminal choice offered by the stop-flow modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StopButton {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContinueFlowButton {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_to_step: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CancelFlowButton {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `true` bypasses with an empty reason, a string bypasses with that reason,
/// `false` does not bypass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BypassReason {
    Flag(bool),
    Reason(String),
}

impl BypassReason {
    pub fn reason(&self) -> Option<&str> {
        match self {
            BypassReason::Flag(true) => Some(""),
            BypassReason::Flag(false) => None,
            BypassReason::Reason(reason) => Some(reason),
        }
    }
}

/// What the stop-flow modal shows and which ways out it offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StopFlowContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_buttons: Vec<StopButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_flow_button: Option<ContinueFlowButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_flow_button: Option<CancelFlowButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_modal_stop_reason: Option<BypassReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_to_step: Option<usize>,
}

impl StopFlowContent {
    /// Step the continue path lands on, if the content names one.
    pub fn continue_target(&self) -> Option<usize> {
        self.continue_flow_button
            .as_ref()
            .and_then(|button| button.continue_to_step)
            .or(self.continue_to_step)
    }

    pub fn bypass_reason(&self) -> Option<&str> {
        self.bypass_modal_stop_reason
            .as_ref()
            .and_then(BypassReason::reason)
    }
}
