//! Deterministic answer scoring.
//!
//! This is the evaluation fallback: pure, in-memory and total, so it can back
//! up the model path without introducing a failure mode of its own.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{
    is_code_type, EvaluationResult, ProficiencyLevel, Question, SessionConfig, UserAnswer,
};

const CODE_KEYWORDS: &[&str] = &[
    "function", "def", "class", "return", "const", "let", "var", "fn", "struct", "impl",
    "public", "private", "static", "async", "await", "import", "lambda", "interface",
    "elif", "switch", "catch",
];

const CODE_SYNTAX: &[&str] = &[
    "if (", "if(", "for (", "for(", "while (", "while(", "=>", "->", "){", ") {", "};", "==",
    "!=", "[]", "::",
];

/// Rough quality band of one scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    Unanswered,
    Minimal,
    Brief,
    Partial,
    Detailed,
    Comprehensive,
}

/// Score of a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
    pub question_id: String,
    pub score: u8,
    pub bucket: ScoreBucket,
}

/// Base points and band for an answer of `len` characters.
pub fn length_score(len: usize) -> (u32, ScoreBucket) {
    match len {
        0..=9 => (10, ScoreBucket::Minimal),
        10..=49 => (25, ScoreBucket::Brief),
        50..=99 => (45, ScoreBucket::Partial),
        100..=199 => (65, ScoreBucket::Detailed),
        _ => (80, ScoreBucket::Comprehensive),
    }
}

/// +10 for a considered answer, +5 for a long one, nothing for a rushed one.
pub fn time_bonus(seconds: u64) -> u32 {
    if seconds > 30 && seconds < 300 {
        10
    } else if seconds >= 300 {
        5
    } else {
        0
    }
}

/// Whether the text contains structural code tokens.
pub fn contains_code(text: &str) -> bool {
    let has_keyword = text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| CODE_KEYWORDS.contains(&word));
    has_keyword || CODE_SYNTAX.iter().any(|token| text.contains(token))
}

/// Score one question against its (possibly missing) answer.
pub fn score_answer(question: &Question, answer: Option<&UserAnswer>) -> QuestionScore {
    let text = answer.map(|a| a.answer_text.trim()).unwrap_or_default();
    if text.is_empty() {
        return QuestionScore {
            question_id: question.id.clone(),
            score: 0,
            bucket: ScoreBucket::Unanswered,
        };
    }

    let (base, bucket) = length_score(text.chars().count());
    let time = answer.map(|a| time_bonus(a.time_spent_seconds)).unwrap_or(0);
    let code = if is_code_type(&question.question_type) && contains_code(text) {
        15
    } else {
        0
    };

    QuestionScore {
        question_id: question.id.clone(),
        score: (base + time + code).min(100) as u8,
        bucket,
    }
}

/// Score every question, in question order.
pub fn score_all(questions: &[Question], answers: &[UserAnswer]) -> Vec<QuestionScore> {
    let by_id: HashMap<&str, &UserAnswer> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();
    questions
        .iter()
        .map(|q| score_answer(q, by_id.get(q.id.as_str()).copied()))
        .collect()
}

/// Rounded mean; zero for an empty slice.
pub fn rounded_mean(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let mean = f64::from(sum) / scores.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Mean score per key, with exactly one entry per key present in `questions`.
pub fn bucket_means<F>(questions: &[Question], scores: &[QuestionScore], key: F) -> BTreeMap<String, u8>
where
    F: Fn(&Question) -> &str,
{
    let mut grouped: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for (q, s) in questions.iter().zip(scores) {
        grouped.entry(key(q).to_string()).or_default().push(s.score);
    }
    grouped
        .into_iter()
        .map(|(k, v)| (k, rounded_mean(&v)))
        .collect()
}

/// Compute the full evaluation locally.
pub fn fallback_evaluation(
    questions: &[Question],
    answers: &[UserAnswer],
    config: &SessionConfig,
) -> EvaluationResult {
    let scores = score_all(questions, answers);
    let per_question: Vec<u8> = scores.iter().map(|s| s.score).collect();
    let score = rounded_mean(&per_question);
    let category_scores = bucket_means(questions, &scores, |q| q.category.as_str());
    let type_scores = bucket_means(questions, &scores, |q| q.question_type.as_str());
    let assessed_proficiency = ProficiencyLevel::from_score(score);

    let unanswered = scores
        .iter()
        .filter(|s| s.bucket == ScoreBucket::Unanswered)
        .count();
    let tally = Tally {
        total: questions.len(),
        answered: questions.len() - unanswered,
        unanswered,
    };

    EvaluationResult {
        score,
        total_questions: questions.len(),
        assessed_proficiency,
        feedback: synthesize_feedback(score, &tally, config),
        recommendations: synthesize_recommendations(
            score,
            assessed_proficiency,
            &tally,
            &type_scores,
            config,
        ),
        category_scores,
        type_scores,
    }
}

/// Answered/unanswered counts used when writing feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
}

/// Overall feedback paragraph. Never empty.
pub fn synthesize_feedback(score: u8, tally: &Tally, config: &SessionConfig) -> String {
    let opening = match score {
        85.. => "Excellent work",
        70..=84 => "Strong performance",
        55..=69 => "Solid foundation",
        1..=54 => "There is clear room to grow",
        0 => "No scorable answers were given",
    };
    let role = config.role.trim();
    let role = if role.is_empty() { "this" } else { role };

    let mut feedback = format!(
        "{opening}: you answered {} of {} questions with an overall score of {score}/100 \
         for the {role} role.",
        tally.answered, tally.total
    );
    if tally.unanswered > 0 {
        feedback.push_str(&format!(
            " {} question{} left unanswered, which lowered the overall score.",
            tally.unanswered,
            if tally.unanswered == 1 { " was" } else { "s were" }
        ));
    } else if tally.total > 0 {
        feedback.push_str(" Every question received an answer.");
    }
    feedback
}

/// Concrete next steps. Never empty.
pub fn synthesize_recommendations(
    score: u8,
    assessed: ProficiencyLevel,
    tally: &Tally,
    type_scores: &BTreeMap<String, u8>,
    config: &SessionConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if tally.unanswered > 0 {
        recommendations.push(
            "Attempt every question, even with a partial answer; unanswered questions score zero."
                .to_string(),
        );
    }

    if type_scores.len() > 1 {
        if let Some((weakest, s)) = type_scores.iter().min_by_key(|(_, s)| **s) {
            recommendations.push(format!(
                "Practice more {weakest} questions; it was your lowest-scoring area ({s}/100)."
            ));
        }
    }

    if score < 55 {
        recommendations.push(
            "Give fuller answers: state your reasoning, the trade-offs you considered and a \
             concrete example."
                .to_string(),
        );
    }

    let weak_code_type = type_scores
        .iter()
        .any(|(ty, s)| is_code_type(ty) && *s < 70);
    if weak_code_type {
        recommendations.push(
            "Include a short working code snippet when a question asks for an implementation."
                .to_string(),
        );
    }

    let skills = config.effective_skills().join(", ");
    if assessed < config.proficiency_level {
        recommendations.push(format!(
            "Review the fundamentals of {skills} before targeting {} level interviews.",
            config.proficiency_level
        ));
    } else {
        recommendations.push(format!(
            "Keep practicing {skills} at {} difficulty to stretch further.",
            next_level(assessed)
        ));
    }

    recommendations
}

fn next_level(level: ProficiencyLevel) -> ProficiencyLevel {
    match level {
        ProficiencyLevel::Beginner => ProficiencyLevel::Intermediate,
        ProficiencyLevel::Intermediate => ProficiencyLevel::Advanced,
        ProficiencyLevel::Advanced | ProficiencyLevel::Expert => ProficiencyLevel::Expert,
    }
}
