//! A scripted candidate runs through one practice session.
//!
//! Uses the default provider from `practicum.toml` (or the environment) when
//! one is configured and falls back to offline questions and scoring
//! otherwise. The finished record is written to the configured output
//! directory and printed as Markdown.
//!
//! ```text
//! PRACTICUM_OPENAI_KEY=sk-... cargo run -p practicum-providers --example practice_session
//! ```

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::time::Instant;

use practicum_core::driver::{lock, TimerDriver};
use practicum_core::evaluator::EvaluationEngine;
use practicum_core::generator::QuestionGenerator;
use practicum_core::model::{ProficiencyLevel, SessionConfig};
use practicum_core::practice::PracticeService;
use practicum_providers::load_config;
use practicum_report::{generate_markdown, JsonFileSink};

const ANSWERS: &[&str] = &[
    "I'd start from the ownership model: each value has one owner, borrows are checked at \
     compile time, and `Send`/`Sync` stop unsynchronized sharing across threads.",
    "",
    "Our team disagreed on a rewrite. I proposed a two-week spike with agreed metrics, and the \
     data settled it without anyone digging in.",
    "fn dedupe(v: &mut Vec<i32>) { v.sort_unstable(); v.dedup(); } // O(n log n)",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("practicum=info".parse()?),
        )
        .init();

    let config = load_config()?;
    let service = match config.build_default_provider()? {
        Some(provider) => {
            tracing::info!(provider = provider.name(), "using completion provider");
            PracticeService::new(
                QuestionGenerator::new(provider.clone(), config.completion_settings())
                    .with_retry_policy(config.retry_policy()),
                EvaluationEngine::new(provider, config.completion_settings())
                    .with_retry_policy(config.retry_policy()),
            )
        }
        None => {
            tracing::info!("no provider configured, running offline");
            PracticeService::offline()
        }
    }
    .with_limits(config.session_limits())
    .with_sink(Arc::new(JsonFileSink::new(&config.output_dir)));

    let session_config = SessionConfig {
        role: "Backend Engineer".into(),
        company: "Example Corp".into(),
        skills: vec!["Rust".into(), "Distributed Systems".into()],
        proficiency_level: ProficiencyLevel::Intermediate,
        number_of_questions: ANSWERS.len(),
        question_types: vec![
            "technical".into(),
            "behavioral".into(),
            "coding".into(),
        ],
    };

    let session = Arc::new(Mutex::new(service.prepare(session_config).await));
    let mut driver = TimerDriver::spawn(session.clone(), config.tick_interval());

    for answer in ANSWERS {
        let mut s = lock(&session);
        if let Some(question) = s.current_question() {
            println!("Q{}: {}", s.current_index() + 1, question.text);
        }
        if !answer.is_empty() {
            s.set_draft(*answer)?;
            s.submit_current(Instant::now())?;
        }
        if s.has_next() {
            s.next(Instant::now())?;
        }
    }

    let finished = {
        let mut s = lock(&session);
        if s.can_review_skipped() {
            let index = s.review_skipped(Instant::now())?;
            println!("Revisiting skipped question {}", index + 1);
            s.set_draft("Second look: I'd measure before deciding.")?;
            s.submit_current(Instant::now())?;
        }
        s.finish(Instant::now())?
    };
    driver.dispose();

    let record = service.complete(finished).await;
    println!("\n{}", generate_markdown(&record));
    println!(
        "Saved to {}",
        config.output_dir.join(format!("{}.json", record.id)).display()
    );
    Ok(())
}
