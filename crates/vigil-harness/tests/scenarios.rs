//! End-to-end scenario runs against the scripted fake browser.
//!
//! The tokio clock is paused, so multi-second waits complete instantly.

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{create_app, FakeApp, FakeElement, FakeLauncher};
use vigil_harness::{
    FailureReason, Harness, HarnessError, Locator, MemoryArtifactStore, Readiness, RunOutcome,
    RunResult, RunState, Scenario, Step, WaitState,
};

const ENTRY: &str = "http://localhost:3000";

fn harness(app: &FakeApp, store: &MemoryArtifactStore) -> Harness<FakeLauncher> {
    Harness::new(app.launcher(), Arc::new(store.clone()))
}

async fn run(app: &FakeApp, scenario: &Scenario) -> RunResult {
    harness(app, &MemoryArtifactStore::new())
        .run(scenario)
        .await
        .expect("session should be acquired")
}

fn scenario_a(prompt: &str) -> Scenario {
    Scenario::builder("create animation", ENTRY)
        .step(Step::navigate("/"))
        .step(Step::wait_for(Locator::test_id("prompt-input")))
        .step(Step::fill(Locator::test_id("prompt-input"), prompt))
        .step(Step::click(Locator::role("button", "Create")))
        .step(Step::wait_for(Locator::test_id("result-canvas")).with_timeout(Duration::from_secs(60)))
        .step(Step::capture("result"))
        .build()
        .unwrap()
}

fn single_step(step: Step) -> Scenario {
    Scenario::builder("single", ENTRY).step(step).build().unwrap()
}

fn quick(step: Step) -> Step {
    step.with_timeout(Duration::from_secs(1))
}

// ---- end-to-end journeys ----

#[tokio::test(start_paused = true)]
async fn create_flow_completes_with_result_and_final_capture() {
    let app = create_app();
    let store = MemoryArtifactStore::new();

    let result = harness(&app, &store)
        .run(&scenario_a("a cat dancing"))
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.state(), RunState::Completed);
    assert_eq!(result.steps_completed, 6);
    assert_eq!(result.evidence_labels(), vec!["result", "final"]);
    assert_eq!(result.evidence[0].step_index, 5);
    assert_eq!(result.evidence[1].step_index, 6);
    assert!(result.evidence.iter().all(|e| e.is_stored()));
    assert!(result.page_errors.is_empty());
    assert!(result.error_log.is_none());

    assert_eq!(
        store.keys(),
        vec![
            "create-animation/005-result.png".to_string(),
            "create-animation/006-final.png".to_string(),
        ]
    );

    let state = app.last_session();
    assert_eq!(state.visits, vec!["http://localhost:3000/".to_string()]);
    assert_eq!(
        state.fills,
        vec![("prompt-input".to_string(), "a cat dancing".to_string())]
    );
    assert_eq!(state.clicks, vec!["create".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn rejected_prompt_times_out_waiting_for_canvas() {
    let app = create_app();

    let result = run(&app, &scenario_a("")).await;

    assert_eq!(result.outcome, RunOutcome::Timeout { index: 4 });
    assert_eq!(result.state(), RunState::TimedOut);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(result.evidence_labels(), vec!["final"]);
    assert_eq!(result.evidence[0].step_index, 6);
    assert!(result.evidence[0].is_stored());
}

#[tokio::test(start_paused = true)]
async fn duplicate_share_buttons_are_ambiguous() {
    let app = FakeApp::new([
        FakeElement::new("share-top", [Locator::role("button", "Share")]),
        FakeElement::new("share-bottom", [Locator::role("button", "Share")]),
    ]);
    let scenario = Scenario::builder("share", ENTRY)
        .step(Step::navigate("/"))
        .step(Step::click(Locator::role("button", "Share")))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;

    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 1,
            reason: FailureReason::AmbiguousMatch {
                locator: r#"role=button[name="Share"]"#.to_string(),
                count: 2,
            },
        }
    );
    assert!(app.last_session().clicks.is_empty(), "no element may be clicked");
    assert_eq!(result.evidence_labels(), vec!["final"]);
}

#[tokio::test(start_paused = true)]
async fn hidden_duplicate_still_makes_target_ambiguous() {
    let app = FakeApp::new([
        FakeElement::new("share-top", [Locator::role("button", "Share")]),
        FakeElement::new("share-menu", [Locator::role("button", "Share")]).hidden(),
    ]);

    let result = run(&app, &single_step(Step::click(Locator::role("button", "Share")))).await;

    assert!(matches!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::AmbiguousMatch { count: 2, .. },
        }
    ));
    assert!(app.last_session().clicks.is_empty());
}

// ---- run-level properties ----

#[tokio::test(start_paused = true)]
async fn empty_scenario_completes_with_only_final_capture() {
    let app = FakeApp::new([]);
    let scenario = Scenario::builder("empty", ENTRY).build().unwrap();

    let result = run(&app, &scenario).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.steps_completed, 0);
    assert_eq!(result.evidence.len(), 1);
    assert_eq!(result.evidence[0].label, "final");
    assert_eq!(result.evidence[0].step_index, 0);
    assert!(result.page_errors.is_empty());
    assert!(app.last_session().visits.is_empty());
}

#[tokio::test(start_paused = true)]
async fn evidence_is_ordered_and_ends_with_final_capture() {
    let app = FakeApp::new([]);
    let scenario = Scenario::builder("captures", ENTRY)
        .step(Step::navigate("/"))
        .step(Step::capture("first"))
        .step(Step::capture("second"))
        .step(Step::capture("third"))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;

    assert_eq!(result.evidence_labels(), vec!["first", "second", "third", "final"]);
    let indices: Vec<_> = result.evidence.iter().map(|e| e.step_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert!(result
        .evidence
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(result.started_at <= result.finished_at);
}

#[tokio::test(start_paused = true)]
async fn identical_runs_produce_identical_outcomes() {
    let first = run(&create_app(), &scenario_a("a cat dancing")).await;
    let second = run(&create_app(), &scenario_a("a cat dancing")).await;

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.evidence_labels(), second.evidence_labels());

    let first = run(&create_app(), &scenario_a("")).await;
    let second = run(&create_app(), &scenario_a("")).await;
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.evidence_labels(), second.evidence_labels());
}

#[tokio::test(start_paused = true)]
async fn page_errors_are_collected_while_steps_run() {
    let app = create_app();
    app.on_fill("prompt-input", |state| {
        let events = state.events();
        tokio::spawn(async move {
            for i in 0..3 {
                tokio::time::sleep(Duration::from_millis(300)).await;
                if let Some(events) = &events {
                    events.record_error(format!("TypeError: frame {i} is undefined"));
                }
            }
        });
    });
    let store = MemoryArtifactStore::new();

    let result = harness(&app, &store)
        .run(&scenario_a("a cat dancing"))
        .await
        .unwrap();

    assert!(result.is_success());
    let messages: Vec<_> = result.page_errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "TypeError: frame 0 is undefined",
            "TypeError: frame 1 is undefined",
            "TypeError: frame 2 is undefined",
        ]
    );
    assert!(result
        .page_errors
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));

    // The error log is an artifact, not evidence.
    assert_eq!(result.evidence_labels(), vec!["result", "final"]);
    let log = result.error_log.expect("error log stored");
    assert_eq!(log.key, "create-animation/page-errors.txt");
    let text = String::from_utf8(store.get(&log.key).unwrap()).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("frame 2"));
}

// ---- waiting ----

#[tokio::test(start_paused = true)]
async fn wait_for_that_never_resolves_times_out() {
    let app = FakeApp::new([FakeElement::new("banner", [Locator::test_id("banner")])]);

    for state in [WaitState::Attached, WaitState::Visible] {
        let scenario = Scenario::builder("missing", ENTRY)
            .step(Step::wait_for_state(Locator::test_id("missing"), state).with_timeout(Duration::from_secs(5)))
            .step(Step::capture("after"))
            .build()
            .unwrap();

        let result = run(&app, &scenario).await;
        assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 }, "state {state}");
        assert_eq!(result.evidence_labels(), vec!["final"]);
    }

    for state in [WaitState::Hidden, WaitState::Detached] {
        let result = run(
            &app,
            &single_step(quick(Step::wait_for_state(Locator::test_id("banner"), state))),
        )
        .await;
        assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 }, "state {state}");
    }
}

#[tokio::test(start_paused = true)]
async fn wait_for_states_follow_the_page() {
    let app = FakeApp::new([
        FakeElement::new("spinner", [Locator::test_id("spinner")]),
        FakeElement::new("go", [Locator::role("button", "Go")]),
        FakeElement::new("drawer", [Locator::test_id("drawer")]).hidden(),
    ]);
    app.on_click("go", |state| state.detach("spinner"));

    let scenario = Scenario::builder("states", ENTRY)
        .step(Step::wait_for_state(Locator::test_id("drawer"), WaitState::Attached))
        .step(Step::wait_for_state(Locator::test_id("drawer"), WaitState::Hidden))
        .step(Step::click(Locator::role("button", "Go")))
        .step(Step::wait_for_state(Locator::test_id("spinner"), WaitState::Detached))
        .step(Step::assert_hidden(Locator::test_id("spinner")))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;
    assert_eq!(result.outcome, RunOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn wait_for_url_matches_glob() {
    let app = FakeApp::new([FakeElement::new("share", [Locator::role("button", "Share")])]);
    app.on_click("share", |state| {
        state.url = "http://localhost:3000/share/abc123".to_string();
    });

    let scenario = Scenario::builder("share", ENTRY)
        .step(Step::navigate("/"))
        .step(Step::click(Locator::role("button", "Share")))
        .step(Step::wait_for_url("**/share/**"))
        .step(Step::capture("share-page"))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;
    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.evidence_labels(), vec!["share-page", "final"]);

    let never = Scenario::builder("never", ENTRY)
        .step(Step::navigate("/"))
        .step(quick(Step::wait_for_url("**/gallery/**")))
        .build()
        .unwrap();
    assert_eq!(run(&app, &never).await.outcome, RunOutcome::Timeout { index: 1 });
}

// ---- navigation ----

#[tokio::test(start_paused = true)]
async fn navigation_failure_is_recorded() {
    let app = FakeApp::new([]);
    app.page().fail_navigation = Some("net::ERR_CONNECTION_REFUSED".to_string());

    let result = run(&app, &single_step(Step::navigate("/"))).await;

    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::Navigation {
                url: "http://localhost:3000/".to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".to_string(),
            },
        }
    );
    assert_eq!(result.evidence_labels(), vec!["final"]);
}

#[tokio::test(start_paused = true)]
async fn hung_navigation_times_out() {
    let app = FakeApp::new([]);
    app.page().goto_delay = Some(Duration::from_secs(120));

    let result = run(
        &app,
        &single_step(Step::navigate("/").with_timeout(Duration::from_secs(5))),
    )
    .await;

    assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 });
}

#[tokio::test(start_paused = true)]
async fn navigation_waits_for_readiness() {
    let app = FakeApp::new([]);
    app.page().ready_state = "loading".to_string();

    let result = run(&app, &single_step(quick(Step::navigate("/")))).await;
    assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 });

    app.page().ready_state = "interactive".to_string();
    let result = run(&app, &single_step(quick(Step::navigate("/")))).await;
    assert_eq!(result.outcome, RunOutcome::Success);

    let needs_load = Scenario::builder("load", ENTRY)
        .readiness(Readiness::Load)
        .step(quick(Step::navigate("/")))
        .build()
        .unwrap();
    assert_eq!(run(&app, &needs_load).await.outcome, RunOutcome::Timeout { index: 0 });

    app.page().ready_state = "complete".to_string();
    let idle = Scenario::builder("idle", ENTRY)
        .readiness(Readiness::NetworkIdle)
        .step(quick(Step::navigate("/")))
        .build()
        .unwrap();
    assert_eq!(run(&app, &idle).await.outcome, RunOutcome::Success);
}

// ---- actions and assertions ----

#[tokio::test(start_paused = true)]
async fn missing_action_target_is_not_found() {
    let app = FakeApp::new([]);

    let result = run(&app, &single_step(quick(Step::click(Locator::test_id("ghost"))))).await;

    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::NotFound {
                locator: "testid=ghost".to_string(),
            },
        }
    );
}

#[tokio::test(start_paused = true)]
async fn hidden_action_target_times_out() {
    let app = FakeApp::new([FakeElement::new("menu", [Locator::test_id("menu")]).hidden()]);

    let result = run(&app, &single_step(quick(Step::click(Locator::test_id("menu"))))).await;

    assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 });
}

#[tokio::test(start_paused = true)]
async fn disabled_or_readonly_targets_are_not_interactable() {
    let app = FakeApp::new([
        FakeElement::new("remix", [Locator::role("button", "Remix This Animation")]).disabled(),
        FakeElement::new("title", [Locator::test_id("title")]).text("Gallery"),
    ]);

    let result = run(
        &app,
        &single_step(Step::click(Locator::role("button", "Remix This Animation"))),
    )
    .await;
    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::NotInteractable {
                locator: r#"role=button[name="Remix This Animation"]"#.to_string(),
                reason: "disabled".to_string(),
            },
        }
    );

    let result = run(&app, &single_step(Step::fill(Locator::test_id("title"), "x"))).await;
    assert!(matches!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::NotInteractable { ref reason, .. },
        } if reason == "not editable"
    ));
    assert!(app.sessions().iter().all(|page| page.clicks.is_empty()));
    assert!(app.sessions().iter().all(|page| page.fills.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn assertions_report_expected_and_actual() {
    let app = FakeApp::new([
        FakeElement::new("status", [Locator::test_id("status")]).text("Share"),
        FakeElement::new("heading", [Locator::role("heading", "Gallery")]).text("  Remix\n  This   Animation "),
        FakeElement::new("toast", [Locator::text("Saved")]).hidden(),
    ]);

    let result = run(
        &app,
        &single_step(quick(Step::assert_text(Locator::test_id("status"), "Remix This Animation"))),
    )
    .await;
    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::AssertionFailed {
                expected: "\"Remix This Animation\"".to_string(),
                actual: "\"Share\"".to_string(),
            },
        }
    );

    let result = run(
        &app,
        &single_step(Step::assert_text(Locator::role("heading", "Gallery"), "Remix This Animation")),
    )
    .await;
    assert_eq!(result.outcome, RunOutcome::Success, "text is compared normalized");

    let result = run(&app, &single_step(quick(Step::assert_visible(Locator::text("Saved"))))).await;
    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::AssertionFailed {
                expected: "visible".to_string(),
                actual: "hidden".to_string(),
            },
        }
    );

    let result = run(&app, &single_step(quick(Step::assert_visible(Locator::text("Gone"))))).await;
    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::AssertionFailed {
                expected: "visible".to_string(),
                actual: "no match".to_string(),
            },
        }
    );

    let result = run(&app, &single_step(quick(Step::assert_hidden(Locator::test_id("status"))))).await;
    assert_eq!(
        result.outcome,
        RunOutcome::StepFailure {
            index: 0,
            reason: FailureReason::AssertionFailed {
                expected: "hidden".to_string(),
                actual: "1 visible match(es)".to_string(),
            },
        }
    );

    let result = run(&app, &single_step(Step::assert_hidden(Locator::text("Saved")))).await;
    assert_eq!(result.outcome, RunOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn assertions_wait_for_late_content() {
    let app = FakeApp::new([
        FakeElement::new("status", [Locator::test_id("status")]).text("Working"),
        FakeElement::new("go", [Locator::role("button", "Go")]),
    ]);
    app.on_click("go", |state| {
        if let Some(status) = state.element_mut("status") {
            status.text = "Done".to_string();
        }
    });

    let scenario = Scenario::builder("late", ENTRY)
        .step(Step::click(Locator::role("button", "Go")))
        .step(Step::assert_text(Locator::test_id("status"), "Done"))
        .build()
        .unwrap();

    assert_eq!(run(&app, &scenario).await.outcome, RunOutcome::Success);
}

// ---- budgets ----

#[tokio::test(start_paused = true)]
async fn run_budget_bounds_the_whole_scenario() {
    let app = create_app();
    let scenario = Scenario::builder("budget", ENTRY)
        .run_timeout(Duration::from_secs(3))
        .step(Step::navigate("/"))
        .step(Step::wait_for(Locator::test_id("result-canvas")))
        .step(Step::capture("never"))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;

    assert_eq!(result.outcome, RunOutcome::Timeout { index: 1 });
    assert_eq!(result.evidence_labels(), vec!["final"]);
}

#[tokio::test(start_paused = true)]
async fn missing_target_under_spent_budget_is_a_timeout() {
    let app = FakeApp::new([]);
    let scenario = Scenario::builder("budget", ENTRY)
        .run_timeout(Duration::from_secs(1))
        .step(Step::click(Locator::test_id("ghost")))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;
    assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 });
}

#[tokio::test(start_paused = true)]
async fn assertion_cut_short_by_run_budget_is_a_timeout() {
    let app = FakeApp::new([FakeElement::new("status", [Locator::test_id("status")]).text("Share")]);
    let scenario = Scenario::builder("budget", ENTRY)
        .run_timeout(Duration::from_secs(2))
        .step(Step::assert_text(Locator::test_id("status"), "Remix"))
        .build()
        .unwrap();

    let result = run(&app, &scenario).await;
    assert_eq!(result.outcome, RunOutcome::Timeout { index: 0 });
    assert_eq!(result.evidence_labels(), vec!["final"]);
}

// ---- evidence ----

#[tokio::test(start_paused = true)]
async fn failed_capture_is_noted_not_fatal() {
    let app = FakeApp::new([]);
    app.page().fail_screenshots = true;

    let result = run(&app, &single_step(Step::capture("broken"))).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.evidence_labels(), vec!["broken", "final"]);
    for evidence in &result.evidence {
        assert!(evidence.artifact.is_none());
        let note = evidence.note.as_deref().unwrap_or_default();
        assert!(note.contains("compositor unavailable"), "note: {note}");
    }
}

// ---- harness driver ----

#[tokio::test(start_paused = true)]
async fn session_is_released_exactly_once() {
    let app = create_app();
    let h = harness(&app, &MemoryArtifactStore::new());

    h.run(&scenario_a("a cat dancing")).await.unwrap();
    h.run(&scenario_a("")).await.unwrap();
    h.run(&single_step(quick(Step::click(Locator::test_id("ghost")))))
        .await
        .unwrap();

    assert_eq!(app.launches(), 3);
    assert_eq!(app.closes(), 3);
}

#[tokio::test(start_paused = true)]
async fn panicking_run_still_releases_session() {
    let app = create_app();
    app.page().panic_on_query = true;

    let err = harness(&app, &MemoryArtifactStore::new())
        .run(&scenario_a("a cat dancing"))
        .await
        .unwrap_err();

    match err {
        HarnessError::RunAborted { scenario, message } => {
            assert_eq!(scenario, "create animation");
            assert_eq!(message, "query exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.launches(), 1);
    assert_eq!(app.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn launch_failure_is_an_infrastructure_error() {
    let app = create_app();
    let h = Harness::new(FakeLauncher::failing(&app), Arc::new(MemoryArtifactStore::new()));

    let err = h.run(&scenario_a("a cat dancing")).await.unwrap_err();

    assert!(matches!(err, HarnessError::LaunchFailed { .. }));
    assert_eq!(app.closes(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_all_keeps_input_order() {
    let app = create_app();
    let scenarios = vec![
        scenario_a("a cat dancing"),
        scenario_a(""),
        Scenario::builder("empty", ENTRY).build().unwrap(),
    ];

    let results = harness(&app, &MemoryArtifactStore::new())
        .with_parallelism(2)
        .run_all(&scenarios)
        .await;

    let outcomes: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().outcome)
        .collect();
    assert_eq!(outcomes[0], RunOutcome::Success);
    assert_eq!(outcomes[1], RunOutcome::Timeout { index: 4 });
    assert_eq!(outcomes[2], RunOutcome::Success);
    assert_eq!(app.launches(), 3);
    assert_eq!(app.closes(), 3);
}

#[tokio::test(start_paused = true)]
async fn parallel_sessions_do_not_share_page_state() {
    let app = create_app();
    let scenarios = vec![scenario_a("a cat dancing"), scenario_a("")];

    let results = harness(&app, &MemoryArtifactStore::new())
        .with_parallelism(2)
        .run_all(&scenarios)
        .await;

    let outcomes: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![RunOutcome::Success, RunOutcome::Timeout { index: 4 }]
    );

    let sessions = app.sessions();
    assert_eq!(sessions.len(), 2);
    let prompts: Vec<_> = sessions
        .iter()
        .map(|page| page.element("prompt-input").unwrap().text.clone())
        .collect();
    assert_eq!(prompts, vec!["a cat dancing".to_string(), String::new()]);
    assert!(sessions[0].element("result-canvas").unwrap().attached_at.is_some());
    assert!(sessions[1].element("result-canvas").unwrap().attached_at.is_none());

    // The page new sessions start from is untouched.
    assert!(app.page().fills.is_empty());
    assert!(app.page().element("result-canvas").unwrap().attached_at.is_none());
}
