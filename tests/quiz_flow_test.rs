use assessment_client::services::api_client::{ApiClient, RetryPolicy};
use assessment_client::services::quiz::{QuizAnswer, QuizSaveState, QuizTiming};
use assessment_client::session::{MemoryBackend, SessionStore};
use assessment_client::models::events::UiEffect;
use assessment_client::models::question::{
    AnswerOption, ChoiceDetails, Question, QuestionDetails, QuestionPrompt, QuestionType,
};
use assessment_client::SessionContext;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Clone)]
struct MockBackend {
    saves: Arc<AtomicU32>,
    fail_first: u32,
    response_delay: Duration,
}

async fn save_answer(
    State(state): State<MockBackend>,
    Json(_body): Json<JsonValue>,
) -> (StatusCode, Json<JsonValue>) {
    let n = state.saves.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.response_delay).await;
    if n < state.fail_first {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "backend unavailable" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "answer_id": Uuid::new_v4(), "already_submitted": false })),
    )
}

async fn spawn_backend(fail_first: u32, response_delay: Duration) -> (String, Arc<AtomicU32>) {
    let saves = Arc::new(AtomicU32::new(0));
    let state = MockBackend {
        saves: saves.clone(),
        fail_first,
        response_delay,
    };
    let app = Router::new()
        .route("/submissions/:id/save-answer", put(save_answer))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), saves)
}

fn ctx_for(base_url: &str) -> SessionContext {
    let api = ApiClient::new(reqwest::Client::new(), base_url, Duration::from_secs(5)).unwrap();
    let store = SessionStore::new(Box::new(MemoryBackend::new()), "itest".into());
    SessionContext::from_parts(api, store)
}

fn single_choice_question() -> Question {
    let section_id = Uuid::new_v4();
    Question {
        id: Uuid::new_v4(),
        section_id,
        question_type: QuestionType::SingleCorrect,
        marks: 1,
        prompt: QuestionPrompt {
            text: "2+2?".into(),
            image_urls: vec![],
        },
        details: QuestionDetails::Choice(ChoiceDetails {
            options: vec![
                AnswerOption {
                    id: Uuid::new_v4(),
                    text: "3".into(),
                },
                AnswerOption {
                    id: Uuid::new_v4(),
                    text: "4".into(),
                },
            ],
        }),
    }
}

fn fast_timing() -> QuizTiming {
    QuizTiming {
        debounce: Duration::from_millis(50),
        retry: RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(20),
            per_attempt_timeout: Duration::from_secs(2),
        },
    }
}

#[tokio::test]
async fn save_retries_twice_then_succeeds() {
    let (base, saves) = spawn_backend(2, Duration::ZERO).await;
    let ctx = ctx_for(&base);
    let question = single_choice_question();
    let option = question.options().unwrap()[1].id;

    let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question)
        .unwrap()
        .with_timing(fast_timing());
    let (tx, mut rx) = mpsc::channel(32);

    quiz.select_option(option);
    quiz.schedule_save(&ctx, &tx);
    quiz.flush().await;

    assert_eq!(saves.load(Ordering::SeqCst), 3, "fail, fail, success");
    assert_eq!(quiz.save_state(), QuizSaveState::Saved);

    let mut overlay_events = vec![];
    while let Ok(effect) = rx.try_recv() {
        if let UiEffect::SavingOverlay(on) = effect {
            overlay_events.push(on);
        }
    }
    assert_eq!(overlay_events, vec![true, false]);
}

#[tokio::test]
async fn rapid_clicks_coalesce_into_one_save() {
    let (base, saves) = spawn_backend(0, Duration::ZERO).await;
    let ctx = ctx_for(&base);
    let question = single_choice_question();
    let options = question.options().unwrap().to_vec();

    let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question)
        .unwrap()
        .with_timing(QuizTiming {
            debounce: Duration::from_millis(100),
            ..fast_timing()
        });
    let (tx, _rx) = mpsc::channel(32);

    quiz.select_option(options[0].id);
    quiz.schedule_save(&ctx, &tx);
    quiz.select_option(options[1].id);
    quiz.schedule_save(&ctx, &tx);
    quiz.flush().await;

    assert_eq!(saves.load(Ordering::SeqCst), 1, "debounce coalesces clicks");
    assert_eq!(quiz.selected(), &[options[1].id]);
    assert_eq!(quiz.save_state(), QuizSaveState::Saved);
}

#[tokio::test]
async fn in_flight_save_survives_a_newer_click() {
    let (base, saves) = spawn_backend(0, Duration::from_millis(300)).await;
    let ctx = ctx_for(&base);
    let question = single_choice_question();
    let options = question.options().unwrap().to_vec();

    let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question)
        .unwrap()
        .with_timing(fast_timing());
    let (tx, mut rx) = mpsc::channel(32);

    quiz.select_option(options[0].id);
    quiz.schedule_save(&ctx, &tx);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(quiz.save_state(), QuizSaveState::Saving, "first save in flight");

    // A click mid-save must not abort the request; the newer payload queues
    // behind it.
    quiz.select_option(options[1].id);
    quiz.schedule_save(&ctx, &tx);
    quiz.flush().await;

    assert_eq!(saves.load(Ordering::SeqCst), 2, "both saves reached the backend");
    assert_eq!(quiz.save_state(), QuizSaveState::Saved);

    let mut overlay_events = vec![];
    while let Ok(effect) = rx.try_recv() {
        if let UiEffect::SavingOverlay(on) = effect {
            overlay_events.push(on);
        }
    }
    assert_eq!(overlay_events, vec![true, false, true, false], "overlays stay paired");
}

#[tokio::test]
async fn exhausted_retries_surface_failed_state() {
    let (base, saves) = spawn_backend(u32::MAX, Duration::ZERO).await;
    let ctx = ctx_for(&base);
    let question = single_choice_question();
    let option = question.options().unwrap()[0].id;

    let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question)
        .unwrap()
        .with_timing(fast_timing());
    let (tx, mut rx) = mpsc::channel(32);

    quiz.select_option(option);
    quiz.schedule_save(&ctx, &tx);
    quiz.flush().await;

    assert_eq!(saves.load(Ordering::SeqCst), 3);
    assert_eq!(quiz.save_state(), QuizSaveState::Failed);

    let mut saw_error_toast = false;
    while let Ok(effect) = rx.try_recv() {
        if matches!(effect, UiEffect::Toast { .. }) {
            saw_error_toast = true;
        }
    }
    assert!(saw_error_toast, "failure must be surfaced, not swallowed");
}
