#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::broadcast;

use assessment_engine::config::EngineConfig;
use assessment_engine::models::event::SessionEvent;
use assessment_engine::models::{
    Choice, CorrectAnswer, Question, QuestionKind, Quiz, ResultVisibility, SecurityLevel,
};
use assessment_engine::services::SessionController;
use assessment_engine::stores::{MemoryAttemptStore, MemoryQuizStore};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assessment_engine=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn choice(id: &str) -> Choice {
    Choice {
        id: id.to_string(),
        text: format!("choice {id}"),
    }
}

pub fn single_question(id: &str, correct: &str, points: u32) -> Question {
    Question {
        id: id.to_string(),
        kind: QuestionKind::SingleChoice,
        prompt: format!("question {id}"),
        image_url: None,
        points,
        choices: vec![choice("0"), choice("1"), choice("2")],
        correct: Some(CorrectAnswer::Single(correct.to_string())),
    }
}

pub fn multi_question(id: &str, correct: &[&str], points: u32) -> Question {
    Question {
        id: id.to_string(),
        kind: QuestionKind::MultipleChoice,
        prompt: format!("question {id}"),
        image_url: None,
        points,
        choices: vec![choice("a"), choice("b"), choice("c")],
        correct: Some(CorrectAnswer::Multiple(
            correct.iter().map(|s| s.to_string()).collect(),
        )),
    }
}

pub fn open_question(id: &str, points: u32) -> Question {
    Question {
        id: id.to_string(),
        kind: QuestionKind::OpenEnded,
        prompt: format!("question {id}"),
        image_url: None,
        points,
        choices: Vec::new(),
        correct: None,
    }
}

pub fn two_question_quiz() -> Quiz {
    quiz(vec![
        single_question("q1", "0", 2),
        single_question("q2", "1", 2),
    ])
}

pub fn quiz(questions: Vec<Question>) -> Quiz {
    Quiz {
        id: "quiz-1".to_string(),
        title: "Integration quiz".to_string(),
        questions,
        time_limit_minutes: None,
        security_level: SecurityLevel::None,
        max_attempts: 0,
        available_from: None,
        available_until: None,
        show_results: ResultVisibility::Immediate,
        allow_review: true,
    }
}

pub fn timed_quiz(minutes: u32) -> Quiz {
    Quiz {
        time_limit_minutes: Some(minutes),
        ..two_question_quiz()
    }
}

pub fn secured_quiz(level: SecurityLevel) -> Quiz {
    Quiz {
        security_level: level,
        ..two_question_quiz()
    }
}

pub struct TestEnv {
    pub quiz_store: Arc<MemoryQuizStore>,
    pub attempt_store: Arc<MemoryAttemptStore>,
    pub events: broadcast::Sender<SessionEvent>,
    pub config: EngineConfig,
}

pub fn env_with(quiz: Quiz) -> TestEnv {
    init_tracing();
    let quiz_store = Arc::new(MemoryQuizStore::new());
    quiz_store.insert(quiz);
    TestEnv {
        quiz_store,
        attempt_store: Arc::new(MemoryAttemptStore::new()),
        events: assessment_engine::event_channel(),
        config: EngineConfig::default(),
    }
}

pub async fn start_session(env: &TestEnv) -> SessionController {
    SessionController::initialize(
        env.quiz_store.as_ref(),
        env.attempt_store.clone(),
        "quiz-1",
        "user-1",
        &env.config,
        env.events.clone(),
    )
    .await
    .expect("session should start")
}
