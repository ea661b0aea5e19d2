use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};
use std::fs;

const FORM: &str = include_str!("../../triage-spec/tests/fixtures/triage_form.json");

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn workspace() -> Result<TempDir, Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    temp.child("form.json").write_str(FORM)?;
    Ok(temp)
}

fn stdout_of(cmd: &mut Command) -> Result<String, Box<dyn std::error::Error>> {
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(String::from_utf8(output)?)
}

#[test]
fn check_reports_form_summary() -> TestResult {
    let temp = workspace()?;
    let stdout = stdout_of(
        Command::cargo_bin("triage")?
            .arg("check")
            .arg("--form")
            .arg(temp.child("form.json").path()),
    )?;
    assert!(stdout.contains("Form triage (1.0.0) is valid: 5 steps, 11 questions, 1 stop-flow rules"));
    Ok(())
}

#[test]
fn form_path_can_come_from_the_environment() -> TestResult {
    let temp = workspace()?;
    Command::cargo_bin("triage")?
        .arg("check")
        .env("TRIAGE_FORM", temp.child("form.json").path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn check_rejects_broken_configuration() -> TestResult {
    let temp = TempDir::new()?;
    let broken = temp.child("broken.json");
    broken.write_str(
        &json!({
            "id": "broken",
            "title": "Broken",
            "steps": [{
                "name": "one",
                "questions": [
                    { "key": "q", "text": "Q", "type": "text" },
                    { "key": "q", "text": "Q again", "type": "text" }
                ]
            }]
        })
        .to_string(),
    )?;
    let output = Command::cargo_bin("triage")?
        .arg("check")
        .arg("--form")
        .arg(broken.path())
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8(output)?.contains("DuplicateKey"));
    Ok(())
}

#[test]
fn validate_lists_step_errors() -> TestResult {
    let temp = workspace()?;
    let answers = temp.child("answers.json");
    answers.write_str(r#"{ "symptoms": ["pain"], "pain_location": "" }"#)?;

    let output = Command::cargo_bin("triage")?
        .args(["validate", "--step", "2", "--form"])
        .arg(temp.child("form.json").path())
        .arg("--answers")
        .arg(answers.path())
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    assert!(stdout.contains("Step 2 (Symptoms): invalid"));
    assert!(stdout.contains("/pain_location: select a body part [required]"));

    answers.write_str(r#"{ "symptoms": ["fever"] }"#)?;
    Command::cargo_bin("triage")?
        .args(["validate", "--step", "2", "--form"])
        .arg(temp.child("form.json").path())
        .arg("--answers")
        .arg(answers.path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn replay_writes_submission_after_continue() -> TestResult {
    let temp = workspace()?;
    let events = temp.child("events.json");
    events.write_str(
        &json!([
            { "action": "answer", "key": "age", "value": "2" },
            { "action": "next" },
            { "action": "answer", "key": "symptoms", "value": ["cough"] },
            { "action": "next" },
            { "action": "answer", "key": "severity", "value": "3" },
            { "action": "next" },
            { "action": "continue" },
            { "action": "answer", "key": "phone", "value": "555-0100" },
            { "action": "go_to_recap" }
        ])
        .to_string(),
    )?;
    let out = temp.child("out").child("submission.json");

    let stdout = stdout_of(
        Command::cargo_bin("triage")?
            .arg("replay")
            .arg("--form")
            .arg(temp.child("form.json").path())
            .arg("--events")
            .arg(events.path())
            .arg("--submission-out")
            .arg(out.path()),
    )?;
    assert!(stdout.contains("Continued from step 3 to step 5"));
    assert!(stdout.contains("Questionnaire submitted"));
    assert!(stdout.contains("All steps completed."));

    let submission: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(submission["form_id"], "triage");
    assert_eq!(submission["skipped_steps"], json!([4]));
    assert!(submission.get("stop_reason").is_none());
    Ok(())
}

#[test]
fn replay_json_reports_stop_reason() -> TestResult {
    let temp = workspace()?;
    let events = temp.child("events.json");
    events.write_str(
        &json!([
            { "action": "answer", "key": "age", "value": "2" },
            { "action": "next" },
            { "action": "answer", "key": "symptoms", "value": ["cough"] },
            { "action": "next" },
            { "action": "answer", "key": "severity", "value": "3" },
            { "action": "next" },
            { "action": "next" },
            { "action": "stop", "reason": "emergency_room" }
        ])
        .to_string(),
    )?;

    let stdout = stdout_of(
        Command::cargo_bin("triage")?
            .arg("replay")
            .arg("--form")
            .arg(temp.child("form.json").path())
            .arg("--events")
            .arg(events.path())
            .args(["--format", "json"]),
    )?;
    let payload: Value = serde_json::from_str(&stdout)?;
    assert_eq!(payload["outcomes"][5]["outcome"], "stop_flow_pending");
    assert_eq!(payload["outcomes"][6]["outcome"], "ignored");
    assert_eq!(payload["outcomes"][6]["reason"], "stop_flow_pending");
    assert_eq!(payload["outcomes"][7]["outcome"], "stopped");
    assert_eq!(payload["view"]["status"], "complete");
    assert_eq!(payload["submission"]["stop_reason"]["reason"], "emergency_room");
    assert_eq!(payload["submission"]["skipped_steps"], json!([4, 5]));
    Ok(())
}

#[test]
fn run_session_from_stdin_stops_and_writes_submission() -> TestResult {
    let temp = workspace()?;
    let out = temp.child("submission.json");
    let lines = [
        "set age 9",
        "set age 2",
        "next",
        "set symptoms fever",
        "next",
        "set severity 3",
        "next",
        "stop",
        "quit",
    ];

    let stdout = stdout_of(
        Command::cargo_bin("triage")?
            .arg("run")
            .arg("--form")
            .arg(temp.child("form.json").path())
            .arg("--submission-out")
            .arg(out.path())
            .write_stdin(format!("{}\n", lines.join("\n"))),
    )?;
    assert!(stdout.contains("Stop-flow: Severe symptoms"));
    assert!(stdout.contains("Questionnaire stopped: emergency_room"));
    assert!(stdout.contains("Submission written to"));

    let submission: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(submission["stop_reason"]["reason"], "emergency_room");
    Ok(())
}

#[test]
fn run_without_submission_says_so() -> TestResult {
    let temp = workspace()?;
    let stdout = stdout_of(
        Command::cargo_bin("triage")?
            .arg("run")
            .env("TRIAGE_FORM", temp.child("form.json").path())
            .write_stdin("next\n"),
    )?;
    assert!(stdout.contains("Step is not complete (age: add a value)"));
    assert!(stdout.contains("Questionnaire not submitted."));
    Ok(())
}

#[test]
fn schema_describes_submissions() -> TestResult {
    let stdout = stdout_of(Command::cargo_bin("triage")?.args(["schema", "submission"]))?;
    let schema: Value = serde_json::from_str(&stdout)?;
    assert!(schema["properties"]["skipped_steps"].is_object());
    Ok(())
}
