mod session;
mod sink;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use triage_spec::{
    AnswerSet, FlowCommand, FlowController, FormSpec, Outcome, Submission, SubmissionSink,
    build_step_schema, build_view, render_json_ui, render_text,
};

use session::{HELP, LineCommand, describe_outcome, parse_line};
use sink::JsonFileSink;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Triage questionnaire CLI",
    long_about = "Checks triage form configurations, validates answers, replays recorded sessions and runs questionnaires in a terminal"
)]
struct Cli {
    /// Log every flow transition (overrides TRIAGE_LOG).
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Form,
    Commands,
    Submission,
}

#[derive(Subcommand)]
enum Command {
    /// Load a form and run the configuration audit.
    Check {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM", env = "TRIAGE_FORM")]
        form: PathBuf,
    },
    /// Print the JSON schema of forms, command logs or submissions.
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::Form)]
        kind: SchemaKind,
    },
    /// Validate one step of an answers file.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM", env = "TRIAGE_FORM")]
        form: PathBuf,
        /// Path to the answers JSON object, keyed by question key.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// 1-based step number.
        #[arg(long)]
        step: usize,
    },
    /// Apply a recorded list of commands and print where the session ends up.
    Replay {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM", env = "TRIAGE_FORM")]
        form: PathBuf,
        /// JSON array of commands, e.g. [{"action": "next"}].
        #[arg(long, value_name = "EVENTS")]
        events: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write the submission here once the session is submitted.
        #[arg(long, value_name = "FILE")]
        submission_out: Option<PathBuf>,
    },
    /// Answer a form interactively.
    Run {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM", env = "TRIAGE_FORM")]
        form: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write the submission here instead of printing it.
        #[arg(long, value_name = "FILE")]
        submission_out: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Check { form } => run_check(&form),
        Command::Schema { kind } => run_schema(kind),
        Command::Validate {
            form,
            answers,
            step,
        } => run_validate(&form, &answers, step),
        Command::Replay {
            form,
            events,
            format,
            submission_out,
        } => run_replay(&form, &events, format, submission_out),
        Command::Run {
            form,
            format,
            submission_out,
        } => run_interactive(&form, format, submission_out),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TRIAGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read form {}: {}", path.display(), err))?;
    Ok(FormSpec::from_json(&contents)?)
}

fn run_check(form_path: &Path) -> CliResult<()> {
    let form = load_form(form_path)?;
    let questions = form.questions().count();
    let rules: usize = form
        .steps
        .iter()
        .map(|step| step.stop_flow_condition.len())
        .sum();
    println!(
        "Form {} ({}) is valid: {} steps, {} questions, {} stop-flow rules",
        form.id,
        form.version,
        form.number_of_steps(),
        questions,
        rules
    );
    Ok(())
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let schema = match kind {
        SchemaKind::Form => schemars::schema_for!(FormSpec),
        SchemaKind::Commands => schemars::schema_for!(Vec<FlowCommand>),
        SchemaKind::Submission => schemars::schema_for!(Submission),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_validate(form_path: &Path, answers_path: &Path, step: usize) -> CliResult<()> {
    let form = load_form(form_path)?;
    let spec = form.step(step).ok_or_else(|| {
        format!(
            "step {} is out of range (form has {} steps)",
            step,
            form.number_of_steps()
        )
    })?;
    let answers_json = fs::read_to_string(answers_path)?;
    let answers: AnswerSet = serde_json::from_str(&answers_json)?;

    let result = build_step_schema(spec).validate(&answers, &answers);
    println!(
        "Step {} ({}): {}",
        step,
        spec.name,
        if result.valid { "valid" } else { "invalid" }
    );
    for error in &result.errors {
        println!("  {}: {} [{}]", error.path, error.message, error.code);
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_replay(
    form_path: &Path,
    events_path: &Path,
    format: OutputFormat,
    submission_out: Option<PathBuf>,
) -> CliResult<()> {
    let form = load_form(form_path)?;
    let events_json = fs::read_to_string(events_path)?;
    let commands: Vec<FlowCommand> = serde_json::from_str(&events_json)?;

    let mut controller = FlowController::new(form)?;
    let mut outcomes = Vec::with_capacity(commands.len());
    for (index, command) in commands.into_iter().enumerate() {
        let outcome = controller.apply(command);
        debug!(index, ?outcome, "replayed command");
        outcomes.push(outcome);
    }

    let submission = controller.submission();
    if let Some(path) = submission_out {
        match &submission {
            Some(submission) => JsonFileSink::new(path).submit(submission)?,
            None => warn!("session did not reach submission, nothing written"),
        }
    }

    let view = build_view(&controller);
    match format {
        OutputFormat::Text => {
            for (index, outcome) in outcomes.iter().enumerate() {
                println!("{:>3}. {}", index + 1, describe_outcome(outcome));
            }
            println!("{}", render_text(&view));
        }
        OutputFormat::Json => {
            let payload = json!({
                "outcomes": outcomes,
                "view": render_json_ui(&view),
                "submission": submission,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

fn run_interactive(
    form_path: &Path,
    format: OutputFormat,
    submission_out: Option<PathBuf>,
) -> CliResult<()> {
    let form = load_form(form_path)?;
    let mut controller = FlowController::new(form)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    show_view(&controller, format)?;
    println!("Type `help` for commands.");
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match parse_line(controller.form(), controller.pending_stop(), &line) {
            Ok(LineCommand::Help) => println!("{}", HELP),
            Ok(LineCommand::Quit) => break,
            Ok(LineCommand::Flow(command)) => {
                let outcome = controller.apply(command);
                println!("{}", describe_outcome(&outcome));
                if !matches!(outcome, Outcome::Ignored { .. } | Outcome::Unchanged) {
                    show_view(&controller, format)?;
                }
                if matches!(outcome, Outcome::Submitted | Outcome::Stopped { .. }) {
                    println!("Type `back` to edit, `cancel` to undo a stop, or `quit` to finish.");
                }
            }
            Err(err) => {
                eprintln!("Invalid input: {}", err.user_message);
                if let Some(debug) = &err.debug_message {
                    eprintln!("  Expected: {}", debug);
                }
            }
        }
    }

    match controller.submission() {
        Some(submission) => deliver(&submission, submission_out),
        None => {
            println!("Questionnaire not submitted.");
            Ok(())
        }
    }
}

fn show_view(controller: &FlowController, format: OutputFormat) -> CliResult<()> {
    let view = build_view(controller);
    match format {
        OutputFormat::Text => println!("{}", render_text(&view)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&render_json_ui(&view))?),
    }
    Ok(())
}

fn deliver(submission: &Submission, submission_out: Option<PathBuf>) -> CliResult<()> {
    match submission_out {
        Some(path) => {
            let mut sink = JsonFileSink::new(path);
            sink.submit(submission)?;
            println!("Submission written to {}", sink.path().display());
        }
        None => println!("{}", submission.to_json_pretty()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::Value;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn schemas_serialize_for_every_kind() {
        for kind in [SchemaKind::Form, SchemaKind::Commands, SchemaKind::Submission] {
            assert!(run_schema(kind).is_ok());
        }
        let schema: Value =
            serde_json::to_value(schemars::schema_for!(FormSpec)).expect("schema value");
        assert!(schema["properties"]["steps"].is_object());
    }
}
