use serde::Serialize;
use serde_json::Value;

use crate::answers::{Answer, ValidationError};
use crate::flow::{Direction, FlowController, StepState, StopReason};
use crate::spec::question::QuestionType;
use crate::spec::stop_flow::StopFlowContent;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// The current step awaits input.
    NeedInput,
    /// A stop-flow modal is open.
    StopFlow,
    /// Recap reached.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::StopFlow => "stop_flow",
            RenderStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub state: StepState,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub key: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    pub hidden: bool,
    pub skipped: bool,
    pub answer: Option<Answer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<String>,
}

/// Everything a rendering layer reads from a session.
#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub form_id: String,
    pub form_title: String,
    pub status: RenderStatus,
    pub current_step: usize,
    pub step_name: String,
    pub continue_label: Option<String>,
    pub show_continue: bool,
    pub direction: Direction,
    pub steps: Vec<StepView>,
    pub questions: Vec<QuestionView>,
    pub errors: Vec<ValidationError>,
    pub stop_flow: Option<StopFlowContent>,
    pub stop_reason: Option<StopReason>,
}

pub fn build_view(controller: &FlowController) -> FlowView {
    let form = controller.form();
    let answers = controller.answers();
    let step = controller.current_step_spec();

    let steps = form
        .steps
        .iter()
        .zip(controller.step_states())
        .enumerate()
        .map(|(index, (spec, state))| StepView {
            index: index + 1,
            name: spec.name.clone(),
            state: *state,
        })
        .collect();

    let questions = step
        .questions
        .iter()
        .map(|question| QuestionView {
            key: question.key.clone(),
            text: question.text.clone(),
            description: question.description.clone(),
            kind: question.question_type(),
            required: question.is_effectively_required(answers),
            hidden: controller.is_hidden(&question.key),
            skipped: controller.skipped_questions().contains(&question.key),
            answer: answers.get(&question.key).cloned(),
            options: question
                .kind
                .options()
                .iter()
                .map(|option| option.value.clone())
                .collect(),
            info: question
                .active_info(answers)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect();

    let status = if controller.is_submitted() {
        RenderStatus::Complete
    } else if controller.is_stopping_flow() {
        RenderStatus::StopFlow
    } else {
        RenderStatus::NeedInput
    };

    FlowView {
        form_id: form.id.clone(),
        form_title: form.title.clone(),
        status,
        current_step: controller.current_step(),
        step_name: step.name.clone(),
        continue_label: step.continue_label.clone(),
        show_continue: !step.no_continue_button,
        direction: controller.direction(),
        steps,
        questions,
        errors: controller.errors().to_vec(),
        stop_flow: controller
            .pending_stop()
            .map(|pending| pending.content.clone()),
        stop_reason: controller.stopped_reason().cloned(),
    }
}

/// Render the view as a structured JSON value.
pub fn render_json_ui(view: &FlowView) -> Value {
    serde_json::to_value(view).unwrap_or(Value::Null)
}

/// Render the view as human-friendly text.
pub fn render_text(view: &FlowView) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", view.form_title, view.form_id));
    lines.push(format!(
        "Status: {} (step {}/{})",
        view.status.as_str(),
        view.current_step,
        view.steps.len()
    ));

    let tracker = view
        .steps
        .iter()
        .map(|step| {
            let mark = if step.index == view.current_step {
                ">"
            } else if step.state.skipped {
                "-"
            } else if step.state.valid {
                "+"
            } else if step.state.visited {
                "~"
            } else {
                " "
            };
            format!("[{}{}]", mark, step.index)
        })
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!("Steps: {}", tracker));

    if view.status == RenderStatus::Complete {
        match &view.stop_reason {
            Some(stop) if stop.reason.is_empty() => lines.push("Stopped early.".to_string()),
            Some(stop) => lines.push(format!("Stopped early: {}", stop.reason)),
            None => lines.push("All steps completed.".to_string()),
        }
        return lines.join("\n");
    }

    lines.push(format!("Step {}: {}", view.current_step, view.step_name));
    for question in view.questions.iter().filter(|question| !question.hidden) {
        let mut entry = format!(" - {} ({})", question.key, question.text);
        if question.required {
            entry.push_str(" [required]");
        }
        if question.skipped {
            entry.push_str(" [skipped]");
        }
        if let Some(answer) = &question.answer
            && !answer.is_blank()
        {
            entry.push_str(&format!(" = {}", answer.display()));
        }
        lines.push(entry);
        if !question.options.is_empty() {
            lines.push(format!("     options: {}", question.options.join("/")));
        }
        for info in &question.info {
            lines.push(format!("     info: {}", info));
        }
    }

    for error in &view.errors {
        lines.push(format!("Error {}: {}", error.path, error.message));
    }

    if let Some(content) = &view.stop_flow {
        lines.push("Stop-flow:".to_string());
        if let Some(title) = &content.title {
            lines.push(format!("  {}", title));
        }
        if let Some(body) = &content.body {
            lines.push(format!("  {}", body));
        }
        for button in &content.stop_buttons {
            lines.push(format!("  stop: {} ({})", button.label, button.reason));
        }
        if content.continue_flow_button.is_some() {
            lines.push("  continue".to_string());
        }
        if content.cancel_flow_button.is_some() {
            lines.push("  cancel".to_string());
        }
    }

    lines.join("\n")
}
