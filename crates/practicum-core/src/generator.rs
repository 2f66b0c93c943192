//! Question generation with a deterministic fallback.
//!
//! `QuestionGenerator::generate` always returns exactly
//! `config.number_of_questions` questions with case-insensitively unique text.
//! Completion failures are retried when transient and otherwise masked; the
//! deficit is filled from [`crate::question_bank`].

use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::diagnostics::{Diagnostics, Stage, TracingDiagnostics};
use crate::model::{normalize_text, ProficiencyLevel, Question, SessionConfig};
use crate::payload::{parse_questions, RawQuestion};
use crate::question_bank::{fallback_question, fallback_text};
use crate::retry::{complete_with_retry, RetryPolicy};
use crate::traits::{CompletionProvider, CompletionSettings};

const SYSTEM_PROMPT: &str = "You are an experienced technical interviewer. You write clear, \
non-overlapping interview questions. Respond ONLY with a JSON array, no prose.";

/// How many questions of each type to ask for.
///
/// `count_i = N / T + (1 if i < N % T)`, in the order the types are given.
pub fn target_distribution(n: usize, types: &[String]) -> Vec<(String, usize)> {
    if types.is_empty() {
        return Vec::new();
    }
    let t = types.len();
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| (ty.clone(), n / t + usize::from(i < n % t)))
        .collect()
}

/// Outcome of one generation run, for callers that want to see past the mask.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub questions: Vec<Question>,
    /// Questions accepted from the model response.
    pub from_model: usize,
    /// Questions synthesized locally.
    pub from_fallback: usize,
    /// Why the model path fell short, if it did.
    pub failure: Option<String>,
}

/// Produces the question list for a session.
pub struct QuestionGenerator {
    provider: Option<Arc<dyn CompletionProvider>>,
    settings: CompletionSettings,
    retry: RetryPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl QuestionGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: CompletionSettings) -> Self {
        Self {
            provider: Some(provider),
            settings,
            retry: RetryPolicy::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// A generator that never calls out and always uses the fallback.
    pub fn offline() -> Self {
        Self {
            provider: None,
            settings: CompletionSettings::default(),
            retry: RetryPolicy::none(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Generate exactly `config.number_of_questions` unique questions.
    pub async fn generate(&self, config: &SessionConfig) -> Vec<Question> {
        self.generate_with_report(config).await.questions
    }

    /// Like [`generate`](Self::generate), also reporting where questions came from.
    #[instrument(skip(self, config), fields(role = %config.role, n = config.number_of_questions))]
    pub async fn generate_with_report(&self, config: &SessionConfig) -> GenerationReport {
        let n = config.number_of_questions;
        let types = config.effective_question_types();
        let distribution = target_distribution(n, &types);

        if n == 0 {
            return GenerationReport {
                questions: Vec::new(),
                from_model: 0,
                from_fallback: 0,
                failure: None,
            };
        }

        let (candidates, mut failure) = match &self.provider {
            None => (Vec::new(), Some("no completion provider configured".to_string())),
            Some(provider) => {
                let request = self
                    .settings
                    .request(SYSTEM_PROMPT, build_prompt(config, &distribution));
                match complete_with_retry(
                    provider.as_ref(),
                    &request,
                    &self.retry,
                    Stage::Generation,
                    self.diagnostics.as_ref(),
                )
                .await
                {
                    Ok(response) => match parse_questions(&response.content) {
                        Ok(raw) => {
                            tracing::debug!(candidates = raw.len(), "parsed model questions");
                            (raw, None)
                        }
                        Err(e) => (Vec::new(), Some(e.to_string())),
                    },
                    Err(e) => (Vec::new(), Some(e.to_string())),
                }
            }
        };

        let accepted = accept_candidates(candidates, config, &distribution);
        let from_model = accepted.questions.len();
        if from_model < n && failure.is_none() {
            failure = Some(format!(
                "model returned {from_model} usable unique questions, {n} required"
            ));
        }
        if let Some(reason) = &failure {
            self.diagnostics.on_fallback(Stage::Generation, reason);
        }

        let questions = fill_with_fallback(accepted, config, &distribution);
        tracing::info!(
            from_model,
            from_fallback = n - from_model,
            "generated {} questions",
            questions.len()
        );

        GenerationReport {
            questions,
            from_model,
            from_fallback: n - from_model,
            failure,
        }
    }
}

/// Prompt describing the session and the exact per-type counts.
pub fn build_prompt(config: &SessionConfig, distribution: &[(String, usize)]) -> String {
    let mut prompt = format!(
        "Generate exactly {} interview questions for a {} candidate applying for the role of {}",
        config.number_of_questions, config.proficiency_level, config.role
    );
    if !config.company.trim().is_empty() {
        prompt.push_str(&format!(" at {}", config.company.trim()));
    }
    prompt.push_str(".\n\n");
    prompt.push_str(&format!(
        "Skills to cover: {}.\n\n",
        config.effective_skills().join(", ")
    ));

    prompt.push_str("Use exactly this distribution of question types:\n");
    for (ty, count) in distribution.iter().filter(|(_, c)| *c > 0) {
        prompt.push_str(&format!("- {count} x \"{ty}\"\n"));
    }

    prompt.push_str(
        "\nEvery question must be different from the others. Return a JSON array where \
         each element has these fields:\n\
         {\"text\": string, \"type\": one of the types above, \"category\": the skill it tests, \
         \"difficulty\": \"beginner\" | \"intermediate\" | \"advanced\" | \"expert\", \
         \"sampleAnswer\": string, \"explanation\": string, \"links\": [string]}\n",
    );
    prompt
}

/// Running state of the duplicate-filtering reduction.
#[derive(Debug, Default)]
struct Accepted {
    seen: HashSet<String>,
    questions: Vec<Question>,
    /// Questions accepted so far per distribution slot.
    per_type: Vec<usize>,
}

impl Accepted {
    fn new(slots: usize) -> Self {
        Self {
            per_type: vec![0; slots],
            ..Default::default()
        }
    }

    fn push(mut self, question: Question, key: String, slot: usize) -> Self {
        self.seen.insert(key);
        self.per_type[slot] += 1;
        self.questions.push(question);
        self
    }

    /// First slot still below its target, else round-robin by position.
    fn open_slot(&self, distribution: &[(String, usize)]) -> usize {
        distribution
            .iter()
            .zip(&self.per_type)
            .position(|((_, target), have)| have < target)
            .unwrap_or(self.questions.len() % distribution.len())
    }
}

/// Keep the first `n` well-formed, unique candidates.
fn accept_candidates(
    candidates: Vec<RawQuestion>,
    config: &SessionConfig,
    distribution: &[(String, usize)],
) -> Accepted {
    let n = config.number_of_questions;
    let skills = config.effective_skills();

    candidates
        .into_iter()
        .fold(Accepted::new(distribution.len()), |acc, raw| {
            if acc.questions.len() >= n {
                return acc;
            }
            let text = raw.text.trim();
            let key = normalize_text(text);
            if key.is_empty() || acc.seen.contains(&key) {
                return acc;
            }

            let slot = raw
                .question_type
                .as_deref()
                .and_then(|t| {
                    distribution
                        .iter()
                        .position(|(ty, _)| ty.eq_ignore_ascii_case(t.trim()))
                })
                .unwrap_or_else(|| acc.open_slot(distribution));
            let question_type = distribution[slot].0.clone();

            let category = raw
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| skills[acc.questions.len() % skills.len()].clone());
            let difficulty = raw
                .difficulty
                .as_deref()
                .and_then(|d| d.parse::<ProficiencyLevel>().ok())
                .unwrap_or(config.proficiency_level);

            let question = Question {
                id: String::new(),
                text: text.to_string(),
                question_type,
                category,
                difficulty,
                sample_answer: raw.sample_answer.clone().unwrap_or_default(),
                explanation: raw.explanation.clone().unwrap_or_default(),
                links: raw.link_urls(),
            };
            acc.push(question, key, slot)
        })
}

/// Top up to `n` questions from the question bank and assign ids.
fn fill_with_fallback(
    accepted: Accepted,
    config: &SessionConfig,
    distribution: &[(String, usize)],
) -> Vec<Question> {
    let n = config.number_of_questions;
    let skills = config.effective_skills();
    let mut acc = accepted;

    while acc.questions.len() < n {
        let index = acc.questions.len();
        let slot = acc.open_slot(distribution);
        let question_type = distribution[slot].0.clone();
        let skill = &skills[index % skills.len()];

        let base = fallback_text(index, skill, &question_type, config.role.trim());
        let mut text = base.clone();
        let mut variation = 1;
        while acc.seen.contains(&normalize_text(&text)) {
            text = format!("{base} (Variation {variation})");
            variation += 1;
        }

        let key = normalize_text(&text);
        let question = fallback_question(text, skill, &question_type, config.proficiency_level);
        acc = acc.push(question, key, slot);
    }

    acc.questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: format!("q{}", i + 1),
            ..q
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::diagnostics::testing::RecordingDiagnostics;
    use crate::error::CompletionError;
    use crate::traits::{CompletionRequest, CompletionResponse, ModelInfo, TokenUsage};

    enum Reply {
        Text(&'static str),
        Fail(CompletionError),
    }

    struct StubProvider {
        reply: Reply,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match &self.reply {
                Reply::Text(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    model: request.model.clone(),
                    token_usage: TokenUsage::default(),
                    latency_ms: 0,
                }),
                Reply::Fail(e) => Err(e.clone().into()),
            }
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn config(n: usize, types: &[&str]) -> SessionConfig {
        SessionConfig {
            role: "Software Engineer".into(),
            company: "Acme".into(),
            skills: vec!["X".into()],
            proficiency_level: ProficiencyLevel::Intermediate,
            number_of_questions: n,
            question_types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn assert_unique(questions: &[Question]) {
        let texts: HashSet<String> = questions.iter().map(Question::normalized_text).collect();
        assert_eq!(texts.len(), questions.len(), "duplicate question text");
        let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), questions.len(), "duplicate question id");
    }

    fn count_type(questions: &[Question], ty: &str) -> usize {
        questions.iter().filter(|q| q.question_type == ty).count()
    }

    #[test]
    fn distribution_spreads_remainder_to_first_types() {
        let types: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let d = target_distribution(7, &types);
        assert_eq!(
            d,
            vec![("a".into(), 3), ("b".into(), 2), ("c".into(), 2)]
        );
        let d = target_distribution(2, &types);
        assert_eq!(d.iter().map(|(_, c)| *c).collect::<Vec<_>>(), vec![1, 1, 0]);
    }

    #[test]
    fn prompt_mentions_distribution_and_company() {
        let c = config(5, &["technical-coding", "behavioral"]);
        let d = target_distribution(5, &c.question_types);
        let prompt = build_prompt(&c, &d);
        assert!(prompt.contains("exactly 5"));
        assert!(prompt.contains("3 x \"technical-coding\""));
        assert!(prompt.contains("2 x \"behavioral\""));
        assert!(prompt.contains("at Acme"));
    }

    #[tokio::test(start_paused = true)]
    async fn forced_failure_falls_back_with_distribution() {
        let provider = StubProvider::new(Reply::Fail(CompletionError::Network("down".into())));
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let generator = QuestionGenerator::new(provider.clone(), CompletionSettings::default())
            .with_diagnostics(diagnostics.clone());
        let c = config(5, &["technical-coding", "behavioral"]);

        let report = generator.generate_with_report(&c).await;

        assert_eq!(report.questions.len(), 5);
        assert_unique(&report.questions);
        assert_eq!(count_type(&report.questions, "technical-coding"), 3);
        assert_eq!(count_type(&report.questions, "behavioral"), 2);
        assert_eq!(report.from_fallback, 5);
        assert!(report.failure.is_some());
        // one attempt plus the default two retries
        assert_eq!(provider.calls.load(Ordering::Relaxed), 3);
        assert_eq!(diagnostics.fallbacks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auth_failure_skips_retry() {
        let provider = StubProvider::new(Reply::Fail(CompletionError::Auth("401".into())));
        let generator = QuestionGenerator::new(provider.clone(), CompletionSettings::default());

        let questions = generator.generate(&config(4, &["concepts"])).await;

        assert_eq!(questions.len(), 4);
        assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn model_questions_are_deduplicated_and_topped_up() {
        let provider = StubProvider::new(Reply::Text(
            r#"{"questions": [
                {"text": "What is ownership?", "type": "concepts", "category": "Rust"},
                {"text": "  what is OWNERSHIP?  ", "type": "concepts"},
                {"text": "", "type": "concepts"},
                {"text": "Explain lifetimes.", "type": "mystery"}
            ]}"#,
        ));
        let generator = QuestionGenerator::new(provider, CompletionSettings::default());
        let c = config(4, &["concepts", "coding"]);

        let report = generator.generate_with_report(&c).await;

        assert_eq!(report.questions.len(), 4);
        assert_unique(&report.questions);
        assert_eq!(report.from_model, 2);
        assert_eq!(report.from_fallback, 2);
        assert_eq!(report.questions[0].text, "What is ownership?");
        assert_eq!(report.questions[0].category, "Rust");
        // unknown type lands in the first under-filled slot
        assert_eq!(report.questions[1].question_type, "concepts");
        assert_eq!(count_type(&report.questions, "coding"), 2);
        assert_eq!(report.questions[3].id, "q4");
    }

    #[tokio::test]
    async fn surplus_model_questions_are_truncated() {
        let provider = StubProvider::new(Reply::Text(
            r#"[{"text": "A?"}, {"text": "B?"}, {"text": "C?"}, {"text": "D?"}]"#,
        ));
        let generator = QuestionGenerator::new(provider, CompletionSettings::default());

        let report = generator.generate_with_report(&config(2, &["general"])).await;

        assert_eq!(report.questions.len(), 2);
        assert_eq!(report.from_model, 2);
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn malformed_payload_uses_fallback() {
        let provider = StubProvider::new(Reply::Text("I cannot help with that."));
        let generator = QuestionGenerator::new(provider.clone(), CompletionSettings::default());

        let report = generator.generate_with_report(&config(3, &["behavioral"])).await;

        assert_eq!(report.questions.len(), 3);
        assert_eq!(report.from_fallback, 3);
        assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn fallback_collisions_get_variation_suffix() {
        // 5 verbs x 7 topics = 35 distinct coding texts for one skill
        let generator = QuestionGenerator::offline();
        let questions = generator.generate(&config(80, &["coding"])).await;

        assert_eq!(questions.len(), 80);
        assert_unique(&questions);
        assert!(questions.iter().any(|q| q.text.ends_with("(Variation 1)")));
        assert!(questions.iter().any(|q| q.text.ends_with("(Variation 2)")));
    }

    #[tokio::test]
    async fn fallback_avoids_model_text() {
        let taken = fallback_text(1, "X", "concepts", "Software Engineer");
        let body: &'static str = Box::leak(
            serde_json::json!([{ "text": taken, "type": "concepts" }])
                .to_string()
                .into_boxed_str(),
        );
        let provider = StubProvider::new(Reply::Text(body));
        let generator = QuestionGenerator::new(provider, CompletionSettings::default());

        let questions = generator.generate(&config(2, &["concepts"])).await;

        assert_eq!(questions.len(), 2);
        assert_unique(&questions);
        assert_eq!(questions[1].text, format!("{taken} (Variation 1)"));
    }

    #[tokio::test]
    async fn empty_config_lists_still_produce_questions() {
        let mut c = config(3, &[]);
        c.skills.clear();
        let questions = QuestionGenerator::offline().generate(&c).await;

        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.question_type == "technical"));
        assert!(questions.iter().all(|q| q.category == "Software Engineer"));
    }

    #[tokio::test]
    async fn zero_questions_is_empty() {
        let questions = QuestionGenerator::offline().generate(&config(0, &["coding"])).await;
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn generation_is_unique_across_sizes_and_types() {
        let generator = QuestionGenerator::offline();
        let type_sets: [&[&str]; 3] = [
            &["coding"],
            &["technical-coding", "behavioral", "system-design"],
            &["concepts", "Concepts", "culture"],
        ];
        for types in type_sets {
            for n in [1, 2, 7, 20, 45] {
                let mut c = config(n, types);
                c.skills = vec!["Rust".into(), "rust".into(), "SQL".into()];
                let questions = generator.generate(&c).await;
                assert_eq!(questions.len(), n);
                assert_unique(&questions);
            }
        }
    }
}
