//! Session evaluation with a deterministic fallback.
//!
//! The model is asked for a structured score object; whatever it returns is
//! reconciled against the question set so the result always honours the
//! `EvaluationResult` invariants. Any failure on that path is masked by
//! [`crate::scoring::fallback_evaluation`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::instrument;

use crate::diagnostics::{Diagnostics, Stage, TracingDiagnostics};
use crate::error::CompletionError;
use crate::model::{
    EvaluationResult, ProficiencyLevel, Question, ResultSource, SessionConfig, UserAnswer,
};
use crate::payload::{parse_evaluation, RawEvaluation};
use crate::retry::{complete_with_retry, RetryPolicy};
use crate::scoring::fallback_evaluation;
use crate::traits::{CompletionProvider, CompletionSettings};

const SYSTEM_PROMPT: &str = "You are a fair, rigorous interview assessor. Score candidate \
answers against the reference answers. Respond ONLY with a JSON object, no prose.";

/// Longest candidate answer forwarded to the model, in characters.
const MAX_ANSWER_CHARS: usize = 2_000;

/// Outcome of one evaluation, for callers that want to see past the mask.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub result: EvaluationResult,
    pub source: ResultSource,
    /// Why the model path was abandoned, if it was.
    pub failure: Option<String>,
}

/// Scores a finished session.
pub struct EvaluationEngine {
    provider: Option<Arc<dyn CompletionProvider>>,
    settings: CompletionSettings,
    retry: RetryPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl EvaluationEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: CompletionSettings) -> Self {
        Self {
            provider: Some(provider),
            settings,
            retry: RetryPolicy::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// An engine that always scores locally.
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

    /// Evaluate a finished session. Never fails.
    pub async fn evaluate(
        &self,
        questions: &[Question],
        answers: &[UserAnswer],
        config: &SessionConfig,
    ) -> EvaluationResult {
        self.evaluate_with_report(questions, answers, config)
            .await
            .result
    }

    /// Like [`evaluate`](Self::evaluate), also reporting which path produced the result.
    #[instrument(skip_all, fields(questions = questions.len(), answers = answers.len()))]
    pub async fn evaluate_with_report(
        &self,
        questions: &[Question],
        answers: &[UserAnswer],
        config: &SessionConfig,
    ) -> EvaluationReport {
        let fallback = fallback_evaluation(questions, answers, config);

        let answered = answers.iter().filter(|a| !a.is_blank()).count();
        let attempt = match &self.provider {
            None => Err("no completion provider configured".to_string()),
            Some(_) if answered == 0 => Err("no answers to assess".to_string()),
            Some(provider) => self
                .primary(provider.as_ref(), questions, answers, config, &fallback)
                .await
                .map_err(|e| e.to_string()),
        };

        match attempt {
            Ok(result) => {
                tracing::info!(score = result.score, "evaluation scored by model");
                EvaluationReport {
                    result,
                    source: ResultSource::Model,
                    failure: None,
                }
            }
            Err(reason) => {
                self.diagnostics.on_fallback(Stage::Evaluation, &reason);
                tracing::info!(score = fallback.score, "evaluation scored locally");
                EvaluationReport {
                    result: fallback,
                    source: ResultSource::Fallback,
                    failure: Some(reason),
                }
            }
        }
    }

    async fn primary(
        &self,
        provider: &dyn CompletionProvider,
        questions: &[Question],
        answers: &[UserAnswer],
        config: &SessionConfig,
        fallback: &EvaluationResult,
    ) -> Result<EvaluationResult, CompletionError> {
        let request = self
            .settings
            .request(SYSTEM_PROMPT, build_prompt(questions, answers, config));
        let response = complete_with_retry(
            provider,
            &request,
            &self.retry,
            Stage::Evaluation,
            self.diagnostics.as_ref(),
        )
        .await?;
        let raw = parse_evaluation(&response.content)?;
        reconcile(raw, questions, fallback)
    }
}

/// Prompt summarizing every question, its reference answer and the candidate's answer.
pub fn build_prompt(
    questions: &[Question],
    answers: &[UserAnswer],
    config: &SessionConfig,
) -> String {
    let by_id: HashMap<&str, &UserAnswer> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();

    let mut prompt = format!(
        "Assess a {} candidate interviewing for the role of {}. Skills in scope: {}.\n\n",
        config.proficiency_level,
        config.role,
        config.effective_skills().join(", ")
    );

    for (i, q) in questions.iter().enumerate() {
        prompt.push_str(&format!(
            "### Question {} [type: {}, category: {}]\n{}\n",
            i + 1,
            q.question_type,
            q.category,
            q.text
        ));
        if !q.sample_answer.trim().is_empty() {
            prompt.push_str(&format!("Reference answer: {}\n", q.sample_answer.trim()));
        }
        match by_id.get(q.id.as_str()).filter(|a| !a.is_blank()) {
            Some(a) => {
                let text: String = a.answer_text.trim().chars().take(MAX_ANSWER_CHARS).collect();
                prompt.push_str(&format!(
                    "Candidate answer ({}s spent):\n{}\n\n",
                    a.time_spent_seconds, text
                ));
            }
            None => prompt.push_str("Candidate answer: (no answer, score 0)\n\n"),
        }
    }

    let categories = distinct(questions.iter().map(|q| q.category.as_str()));
    let types = distinct(questions.iter().map(|q| q.question_type.as_str()));
    prompt.push_str(&format!(
        "Return a JSON object with these fields:\n\
         {{\"score\": 0-100, \"totalQuestions\": {}, \
         \"assessedProficiency\": \"beginner\" | \"intermediate\" | \"advanced\" | \"expert\", \
         \"categoryScores\": {{one 0-100 entry for each of: {}}}, \
         \"typeScores\": {{one 0-100 entry for each of: {}}}, \
         \"feedback\": string, \"recommendations\": [string]}}\n",
        questions.len(),
        categories.join(", "),
        types.join(", ")
    ));
    prompt
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Force a model evaluation into the result invariants.
///
/// Keys are matched case-insensitively against the question set; missing
/// keys take the locally computed value and extra keys are dropped.
pub fn reconcile(
    raw: RawEvaluation,
    questions: &[Question],
    fallback: &EvaluationResult,
) -> Result<EvaluationResult, CompletionError> {
    let score = match raw.score {
        Some(s) if s.is_finite() => clamp_score(s),
        other => {
            return Err(CompletionError::Validation(format!(
                "unusable overall score: {other:?}"
            )))
        }
    };

    let category_scores = reconcile_map(&raw.category_scores, &fallback.category_scores)?;
    let type_scores = reconcile_map(&raw.type_scores, &fallback.type_scores)?;

    let assessed_proficiency = raw
        .assessed_proficiency
        .as_deref()
        .and_then(|p| p.parse::<ProficiencyLevel>().ok())
        .unwrap_or_else(|| ProficiencyLevel::from_score(score));

    let feedback = raw
        .feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| fallback.feedback.clone());

    let recommendations: Vec<String> = raw
        .recommendations
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    let recommendations = if recommendations.is_empty() {
        fallback.recommendations.clone()
    } else {
        recommendations
    };

    Ok(EvaluationResult {
        score,
        total_questions: questions.len(),
        assessed_proficiency,
        category_scores,
        type_scores,
        feedback,
        recommendations,
    })
}

fn reconcile_map(
    model: &BTreeMap<String, f64>,
    expected: &BTreeMap<String, u8>,
) -> Result<BTreeMap<String, u8>, CompletionError> {
    expected
        .iter()
        .map(|(key, local)| {
            let found = model
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
                .map(|(_, v)| *v);
            match found {
                Some(v) if !v.is_finite() => Err(CompletionError::Validation(format!(
                    "sub-score for `{key}` is not finite"
                ))),
                Some(v) => Ok((key.clone(), clamp_score(v))),
                None => Ok((key.clone(), *local)),
            }
        })
        .collect()
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
