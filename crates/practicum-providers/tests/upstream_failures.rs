//! Generation and evaluation against a real HTTP backend that misbehaves.
//!
//! Whatever the upstream does, callers must get a complete, valid result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use practicum_core::evaluator::EvaluationEngine;
use practicum_core::generator::QuestionGenerator;
use practicum_core::model::{ProficiencyLevel, ResultSource, SessionConfig, UserAnswer};
use practicum_core::retry::RetryPolicy;
use practicum_core::scoring::score_all;
use practicum_core::traits::CompletionSettings;
use practicum_providers::openai::OpenAiProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        role: "Software Engineer".into(),
        company: String::new(),
        skills: vec!["X".into()],
        proficiency_level: ProficiencyLevel::Intermediate,
        number_of_questions: 5,
        question_types: vec!["technical-coding".into(), "behavioral".into()],
    }
}

async fn failing_server(status: u16, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream trouble"))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn provider(server: &MockServer) -> Arc<OpenAiProvider> {
    Arc::new(OpenAiProvider::new("key", Some(server.uri()), None))
}

#[tokio::test]
async fn server_errors_retry_then_fall_back_to_full_question_set() {
    let server = failing_server(500, 3).await;
    let generator = QuestionGenerator::new(provider(&server), CompletionSettings::default())
        .with_retry_policy(fast_retries());

    let report = generator.generate_with_report(&config()).await;

    assert_eq!(report.questions.len(), 5);
    assert_eq!(report.from_model, 0);
    assert_eq!(report.from_fallback, 5);
    assert!(report.failure.unwrap().contains("500"));

    let unique: HashSet<String> = report
        .questions
        .iter()
        .map(|q| q.text.to_lowercase())
        .collect();
    assert_eq!(unique.len(), 5);

    let coding = report
        .questions
        .iter()
        .filter(|q| q.question_type == "technical-coding")
        .count();
    let behavioral = report
        .questions
        .iter()
        .filter(|q| q.question_type == "behavioral")
        .count();
    assert_eq!((coding, behavioral), (3, 2));
}

#[tokio::test]
async fn auth_errors_are_not_retried() {
    let server = failing_server(401, 1).await;
    let generator = QuestionGenerator::new(provider(&server), CompletionSettings::default())
        .with_retry_policy(fast_retries());

    let questions = generator.generate(&config()).await;
    assert_eq!(questions.len(), 5);
}

#[tokio::test]
async fn malformed_model_output_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Sorry, I can't help with that."}}],
            "model": "gpt-4.1-mini"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = QuestionGenerator::new(provider(&server), CompletionSettings::default())
        .with_retry_policy(fast_retries());
    let report = generator.generate_with_report(&config()).await;

    assert_eq!(report.questions.len(), 5);
    assert_eq!(report.from_fallback, 5);
}

#[tokio::test]
async fn evaluation_falls_back_with_valid_result() {
    let questions = QuestionGenerator::offline().generate(&config()).await;

    let answer = "I would profile first, find the hot loop, then cache the lookups and batch the \
                  writes so the database sees fewer round trips.";
    assert!(answer.len() >= 100 && answer.len() < 200);
    let answers: Vec<UserAnswer> = questions
        .iter()
        .take(3)
        .map(|q| UserAnswer {
            question_id: q.id.clone(),
            answer_text: answer.to_string(),
            time_spent_seconds: 90,
        })
        .collect();

    let server = failing_server(503, 3).await;
    let engine = EvaluationEngine::new(provider(&server), CompletionSettings::default())
        .with_retry_policy(fast_retries());
    let report = engine
        .evaluate_with_report(&questions, &answers, &config())
        .await;

    assert_eq!(report.source, ResultSource::Fallback);
    let result = report.result;
    assert!(result.score <= 100);
    assert_eq!(result.total_questions, 5);
    assert!(!result.feedback.is_empty());
    assert!(!result.recommendations.is_empty());

    let types: HashSet<&str> = questions.iter().map(|q| q.question_type.as_str()).collect();
    let scored_types: HashSet<&str> = result.type_scores.keys().map(String::as_str).collect();
    assert_eq!(types, scored_types);
    let categories: HashSet<&str> = questions.iter().map(|q| q.category.as_str()).collect();
    let scored_categories: HashSet<&str> =
        result.category_scores.keys().map(String::as_str).collect();
    assert_eq!(categories, scored_categories);

    for (i, score) in score_all(&questions, &answers).iter().enumerate() {
        if i < 3 {
            assert!((65..=90).contains(&score.score), "answered q{}: {}", i + 1, score.score);
        } else {
            assert_eq!(score.score, 0);
        }
    }
}

#[tokio::test]
async fn model_evaluation_is_reconciled_against_questions() {
    let questions = QuestionGenerator::offline().generate(&config()).await;
    let answers = vec![UserAnswer {
        question_id: questions[0].id.clone(),
        answer_text: "fn main() { println!(\"hi\"); }".into(),
        time_spent_seconds: 45,
    }];

    let server = MockServer::start().await;
    let content = serde_json::json!({
        "score": 64.6,
        "categoryScores": {"x": 70, "Unknown": 12},
        "typeScores": {"technical-coding": 80},
        "feedback": "Decent start.",
        "recommendations": []
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": format!("```json\n{content}\n```")}}],
            "model": "gpt-4.1-mini"
        })))
        .mount(&server)
        .await;

    let engine = EvaluationEngine::new(provider(&server), CompletionSettings::default());
    let report = engine
        .evaluate_with_report(&questions, &answers, &config())
        .await;

    assert_eq!(report.source, ResultSource::Model);
    let result = report.result;
    assert_eq!(result.score, 65);
    assert_eq!(result.total_questions, 5);
    assert_eq!(result.category_scores.get("X"), Some(&70));
    assert!(!result.category_scores.contains_key("Unknown"));
    assert_eq!(result.type_scores.get("technical-coding"), Some(&80));
    assert!(result.type_scores.contains_key("behavioral"));
    assert_eq!(result.assessed_proficiency, ProficiencyLevel::Intermediate);
    assert!(!result.recommendations.is_empty());
}
