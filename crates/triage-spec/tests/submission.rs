use triage_spec::{
    Answer, FlowController, FormSpec, Outcome, QuestionType, Submission, SubmissionSink,
    build_view, render_json_ui, render_text,
};

fn fixture() -> FlowController {
    let form = FormSpec::from_json(include_str!("fixtures/triage_form.json")).expect("form");
    FlowController::new(form).expect("controller")
}

fn text(value: &str) -> Answer {
    Answer::Text(value.into())
}

/// Walks to step 3 with pain reported, then continues past the history step.
fn continued_session() -> FlowController {
    let mut flow = fixture();
    assert_eq!(flow.set_answer("age", text("3")), Outcome::Updated);
    flow.next();
    flow.set_answer("symptoms", Answer::List(vec!["pain".into()]));
    flow.set_answer("pain_location", text("head"));
    flow.next();
    flow.set_answer("severity", text("3"));
    flow.set_answer("details", text("sudden"));
    assert!(matches!(flow.next(), Outcome::StopFlowPending { .. }));
    assert_eq!(flow.continue_flow(), Outcome::Continued { from: 3, to: 5 });
    flow.set_answer("phone", text("555-0100"));
    assert_eq!(flow.go_to_recap(), Outcome::Submitted);
    flow
}

#[test]
fn submission_flattens_answers_in_form_order() {
    let flow = continued_session();
    let submission = flow.submission().expect("submission");

    assert_eq!(submission.form_id, "triage");
    assert_eq!(submission.form_version, "1.0.0");
    assert_eq!(submission.skipped_steps, vec![4]);
    assert!(submission.stop_reason.is_none());

    let keys: Vec<&str> = submission
        .answers
        .iter()
        .map(|answer| answer.question_key.as_str())
        .collect();
    assert_eq!(
        keys,
        vec![
            "age",
            "pregnant",
            "symptoms",
            "pain_location",
            "emergency",
            "severity",
            "details",
            "history",
            "medication",
            "phone",
            "notes"
        ]
    );

    let location = submission.answer("pain_location").expect("pain_location");
    assert_eq!(location.answer, text("head"));
    assert_eq!(location.answer_type, QuestionType::Body);
    assert!(!location.skipped);

    let details = submission.answer("details").expect("details");
    assert!(details.skipped);
    assert_eq!(details.answer, text(""));

    let history = submission.answer("history").expect("history");
    assert!(history.skipped);
    assert_eq!(history.answer, text(""));
}

#[test]
fn hidden_questions_report_their_default() {
    let mut flow = fixture();
    flow.set_answer("age", text("1"));
    flow.next();
    flow.set_answer("symptoms", Answer::List(vec!["pain".into()]));
    flow.set_answer("pain_location", text("chest"));
    // Pain dropped again: the location answer stays stored but is hidden.
    flow.set_answer("symptoms", Answer::List(vec!["cough".into()]));
    assert_eq!(flow.answer("pain_location"), Some(&text("chest")));

    flow.set_answer("emergency", Answer::Bool(true));
    let submission = flow.submission().expect("submission");
    let location = submission.answer("pain_location").expect("pain_location");
    assert_eq!(location.answer, text(""));
    assert!(!location.skipped);
    assert_eq!(
        submission.answer("emergency").map(|answer| &answer.answer),
        Some(&Answer::Bool(true))
    );
}

#[test]
fn stop_reason_travels_with_the_payload() {
    let mut flow = fixture();
    flow.set_answer("age", text("2"));
    flow.next();
    flow.set_answer("symptoms", Answer::List(vec!["fever".into()]));
    flow.next();
    flow.set_answer("severity", text("3"));
    flow.next();
    assert!(matches!(flow.stop("emergency_room"), Outcome::Stopped { .. }));

    let submission = flow.submission().expect("submission");
    assert_eq!(submission.skipped_steps, vec![4, 5]);
    let stop = submission.stop_reason.as_ref().expect("stop reason");
    assert_eq!(stop.reason, "emergency_room");
    assert!(stop.question_key.is_none());

    let json = submission.to_json_pretty().expect("json");
    let decoded: Submission = serde_json::from_str(&json).expect("decode json");
    assert_eq!(decoded, submission);

    let cbor = submission.to_cbor().expect("cbor");
    let decoded: Submission = serde_cbor::from_slice(&cbor).expect("decode cbor");
    assert_eq!(decoded.stop_reason, submission.stop_reason);
}

#[test]
fn sink_receives_frozen_submission() {
    let flow = continued_session();
    let mut sink: Vec<Submission> = Vec::new();
    let submission = flow.submission().expect("submission");
    match sink.submit(&submission) {
        Ok(()) => {}
        Err(never) => match never {},
    }
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].answer("phone").map(|a| &a.answer), Some(&text("555-0100")));
}

#[test]
fn views_reflect_modal_and_completion() {
    let mut flow = fixture();
    let view = build_view(&flow);
    let rendered = render_text(&view);
    assert!(rendered.contains("Status: need_input (step 1/5)"));
    assert!(rendered.contains("[>1]"));
    assert!(rendered.contains(" - age (Age group) [required]"));

    flow.set_answer("age", text("2"));
    flow.next();
    flow.set_answer("symptoms", Answer::List(vec!["fever".into()]));
    flow.next();
    flow.set_answer("severity", text("3"));
    flow.next();

    let ui = render_json_ui(&build_view(&flow));
    assert_eq!(ui["status"], "stop_flow");
    assert_eq!(ui["current_step"], 3);
    assert_eq!(ui["stop_flow"]["title"], "Severe symptoms");
    assert_eq!(ui["steps"][3]["skipped"], true);
    assert_eq!(ui["questions"][0]["type"], "select");

    let rendered = render_text(&build_view(&flow));
    assert!(rendered.contains("stop: Go to the ER (emergency_room)"));

    flow.stop("emergency_room");
    let rendered = render_text(&build_view(&flow));
    assert!(rendered.contains("Status: complete"));
    assert!(rendered.contains("Stopped early: emergency_room"));
    assert!(rendered.contains("[+1] [+2] [>3] [-4] [-5]"));
}
