use std::fmt;

use triage_spec::{
    Answer, FlowCommand, FormSpec, Outcome, PendingStop, QuestionKind, QuestionSpec,
};

/// One line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    Flow(FlowCommand),
    Help,
    Quit,
}

/// Error produced when a typed line cannot be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

impl fmt::Display for AnswerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message)?;
        if let Some(debug) = &self.debug_message {
            write!(f, " (expected {})", debug)?;
        }
        Ok(())
    }
}

impl std::error::Error for AnswerParseError {}

pub const HELP: &str = "\
Commands:
  set <key> <value>   answer a question (lists are comma separated, booleans yes/no)
  reset <key>         put a question back to its default
  next | back         move one step forward or backward
  goto <step>         jump to a step
  recap               finish the questionnaire
  stop [n|reason]     pick a stop button of the open stop-flow (first by default)
  continue | cancel   the other ways out of an open stop-flow
  restart             start over
  help | quit";

/// Parses one prompt line. `pending` is the open stop-flow, used to resolve
/// `stop` without an explicit reason.
pub fn parse_line(
    form: &FormSpec,
    pending: Option<&PendingStop>,
    line: &str,
) -> Result<LineCommand, AnswerParseError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "help" | "?" => return Ok(LineCommand::Help),
        "quit" | "exit" => return Ok(LineCommand::Quit),
        "next" | "n" => FlowCommand::Next,
        "back" | "previous" | "p" => FlowCommand::Previous,
        "recap" | "done" => FlowCommand::GoToRecap,
        "continue" => FlowCommand::Continue,
        "cancel" => FlowCommand::Cancel,
        "restart" => FlowCommand::Restart,
        "goto" => FlowCommand::GoToStep {
            step: rest.parse().map_err(|_| {
                AnswerParseError::new(
                    "Please enter a step number.",
                    Some("goto <step>".to_string()),
                )
            })?,
        },
        "stop" => FlowCommand::Stop {
            reason: stop_reason(pending, rest),
        },
        "reset" => FlowCommand::ResetAnswer {
            key: known_question(form, rest)?.key.clone(),
        },
        "set" => {
            let (key, raw) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let question = known_question(form, key)?;
            FlowCommand::Answer {
                key: question.key.clone(),
                value: parse_answer(&question.kind, raw.trim())?,
            }
        }
        "" => {
            return Err(AnswerParseError::new(
                "Type a command, or `help` for the list.",
                None,
            ));
        }
        other => {
            return Err(AnswerParseError::new(
                format!("Unknown command `{}`.", other),
                Some("one of set/reset/next/back/goto/recap/stop/continue/cancel".to_string()),
            ));
        }
    };
    Ok(LineCommand::Flow(command))
}

fn known_question<'a>(
    form: &'a FormSpec,
    key: &str,
) -> Result<&'a QuestionSpec, AnswerParseError> {
    match form.question(key) {
        Some(question) => Ok(question),
        None if key.is_empty() => Err(AnswerParseError::new(
            "Name the question to answer.",
            Some("a question key".to_string()),
        )),
        None => Err(AnswerParseError::new(
            format!("No question `{}` in this form.", key),
            None,
        )),
    }
}

/// Button number, explicit reason, or the first stop button.
fn stop_reason(pending: Option<&PendingStop>, raw: &str) -> String {
    let buttons = pending
        .map(|pending| pending.content.stop_buttons.as_slice())
        .unwrap_or_default();
    if raw.is_empty() {
        return buttons
            .first()
            .map(|button| button.reason.clone())
            .unwrap_or_default();
    }
    raw.parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| buttons.get(index))
        .map(|button| button.reason.clone())
        .unwrap_or_else(|| raw.to_string())
}

/// Turns typed text into the answer shape the question kind stores.
pub fn parse_answer(kind: &QuestionKind, raw: &str) -> Result<Answer, AnswerParseError> {
    match kind {
        QuestionKind::Boolean | QuestionKind::TerminatorButton { .. } => parse_boolean(raw),
        QuestionKind::MultiChoice { .. } | QuestionKind::MultiSelect { .. } => {
            let values: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
                .collect();
            if let Some(unknown) = values
                .iter()
                .find(|value| !kind.options().iter().any(|option| &option.value == *value))
            {
                return Err(invalid_choice(kind, unknown));
            }
            Ok(Answer::List(values))
        }
        QuestionKind::Select { options } | QuestionKind::Body { options } => {
            if !raw.is_empty()
                && !options.is_empty()
                && !options.iter().any(|option| option.value == raw)
            {
                return Err(invalid_choice(kind, raw));
            }
            Ok(Answer::Text(raw.to_string()))
        }
        QuestionKind::Text | QuestionKind::Textarea => Ok(Answer::Text(raw.to_string())),
    }
}

fn parse_boolean(raw: &str) -> Result<Answer, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Answer::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Answer::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn invalid_choice(kind: &QuestionKind, value: &str) -> AnswerParseError {
    let choices: Vec<&str> = kind
        .options()
        .iter()
        .map(|option| option.value.as_str())
        .collect();
    AnswerParseError::new(
        format!("`{}` is not one of the options.", value),
        Some(choices.join("/")),
    )
}

/// One-line summary of what an operation did.
pub fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Moved { from, to, .. } if from == to => format!("At step {}", to),
        Outcome::Moved { from, to, .. } => format!("Moved from step {} to step {}", from, to),
        Outcome::Reopened { step } => format!("Editing step {} again", step),
        Outcome::Invalid { errors } => {
            let details: Vec<String> = errors
                .iter()
                .map(|error| format!("{}: {}", error.question_key, error.message))
                .collect();
            format!("Step is not complete ({})", details.join("; "))
        }
        Outcome::StopFlowPending { content } => match &content.title {
            Some(title) => format!("Stop-flow: {}", title),
            None => "Stop-flow opened".to_string(),
        },
        Outcome::Continued { from, to } => {
            format!("Continued from step {} to step {}", from, to)
        }
        Outcome::Submitted => "Questionnaire submitted".to_string(),
        Outcome::Stopped { reason } if reason.reason.is_empty() => {
            "Questionnaire stopped".to_string()
        }
        Outcome::Stopped { reason } => format!("Questionnaire stopped: {}", reason.reason),
        Outcome::Cancelled => "Stop-flow cancelled".to_string(),
        Outcome::Updated => "Answer recorded".to_string(),
        Outcome::Unchanged => "Answer unchanged".to_string(),
        Outcome::Ignored { reason } => format!("Ignored ({:?})", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = include_str!("../../triage-spec/tests/fixtures/triage_form.json");

    fn form() -> FormSpec {
        FormSpec::from_json(FORM).expect("fixture form")
    }

    fn flow_command(line: &str) -> FlowCommand {
        match parse_line(&form(), None, line).expect("parse") {
            LineCommand::Flow(command) => command,
            other => panic!("expected a flow command, got {other:?}"),
        }
    }

    #[test]
    fn set_parses_by_question_kind() {
        assert_eq!(
            flow_command("set symptoms fever, pain"),
            FlowCommand::Answer {
                key: "symptoms".into(),
                value: Answer::List(vec!["fever".into(), "pain".into()]),
            }
        );
        assert_eq!(
            flow_command("set pregnant yes"),
            FlowCommand::Answer {
                key: "pregnant".into(),
                value: Answer::Bool(true),
            }
        );
        assert_eq!(
            flow_command("set details started   this morning"),
            FlowCommand::Answer {
                key: "details".into(),
                value: Answer::Text("started   this morning".into()),
            }
        );
        assert_eq!(
            flow_command("set medication"),
            FlowCommand::Answer {
                key: "medication".into(),
                value: Answer::List(Vec::new()),
            }
        );
    }

    #[test]
    fn set_rejects_unknown_options_and_keys() {
        let form = form();
        let error = parse_line(&form, None, "set age 9").expect_err("not an option");
        assert_eq!(error.debug_message.as_deref(), Some("1/2/3/4"));
        assert!(parse_line(&form, None, "set symptoms fever,rash").is_err());
        assert!(parse_line(&form, None, "set pregnant maybe").is_err());
        assert!(parse_line(&form, None, "set ghost 1").is_err());
        assert!(parse_line(&form, None, "dance").is_err());
        assert!(parse_line(&form, None, "goto two").is_err());
    }

    #[test]
    fn navigation_words_map_to_commands() {
        assert_eq!(flow_command("next"), FlowCommand::Next);
        assert_eq!(flow_command("BACK"), FlowCommand::Previous);
        assert_eq!(flow_command("goto 3"), FlowCommand::GoToStep { step: 3 });
        assert_eq!(flow_command("recap"), FlowCommand::GoToRecap);
        assert_eq!(
            flow_command("reset age"),
            FlowCommand::ResetAnswer { key: "age".into() }
        );
        let form = form();
        assert_eq!(parse_line(&form, None, "help"), Ok(LineCommand::Help));
        assert_eq!(parse_line(&form, None, "quit"), Ok(LineCommand::Quit));
    }

    #[test]
    fn stop_resolves_buttons_of_the_open_modal() {
        let form = form();
        let content = form.steps[2].stop_flow_condition[0].content.clone();
        let pending = PendingStop {
            trigger: triage_spec::StopTrigger::Rule { step: 3, rule: 0 },
            content,
        };
        let stop = |line: &str| parse_line(&form, Some(&pending), line).expect("parse");
        let expected = |reason: &str| {
            LineCommand::Flow(FlowCommand::Stop {
                reason: reason.into(),
            })
        };
        assert_eq!(stop("stop"), expected("emergency_room"));
        assert_eq!(stop("stop 1"), expected("emergency_room"));
        assert_eq!(stop("stop left"), expected("left"));
    }
}
