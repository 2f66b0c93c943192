//! The durable record of one finished session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluator::EvaluationReport;
use crate::model::{EvaluationResult, Question, ResultSource, SessionConfig, UserAnswer};
use crate::session::{FinishReason, FinishedSession};

/// What a [`crate::traits::ResultSink`] receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub config: SessionConfig,
    pub questions: Vec<Question>,
    pub answers: Vec<UserAnswer>,
    /// Positions still marked skipped when the session ended.
    pub skipped: Vec<usize>,
    pub result: EvaluationResult,
    pub source: ResultSource,
    pub finish_reason: FinishReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(finished: FinishedSession, report: EvaluationReport) -> Self {
        Self {
            id: finished.id,
            config: finished.config,
            questions: finished.questions,
            answers: finished.answers,
            skipped: finished.skipped,
            result: report.result,
            source: report.source,
            finish_reason: finished.reason,
            started_at: finished.started_at,
            finished_at: finished.finished_at,
        }
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&UserAnswer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// Questions with no non-blank answer, in session order.
    pub fn unanswered(&self) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(|q| self.answer_for(&q.id).map_or(true, UserAnswer::is_blank))
    }

    /// Wall-clock length of the session in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::ProficiencyLevel;

    fn record() -> SessionRecord {
        let question = |id: &str| Question {
            id: id.into(),
            text: format!("text {id}"),
            question_type: "technical".into(),
            category: "Rust".into(),
            difficulty: ProficiencyLevel::Advanced,
            sample_answer: String::new(),
            explanation: String::new(),
            links: vec![],
        };
        let started_at = Utc::now();
        SessionRecord {
            id: Uuid::new_v4(),
            config: SessionConfig {
                role: "Engineer".into(),
                company: "Acme".into(),
                skills: vec!["Rust".into()],
                proficiency_level: ProficiencyLevel::Advanced,
                number_of_questions: 3,
                question_types: vec!["technical".into()],
            },
            questions: vec![question("q1"), question("q2"), question("q3")],
            answers: vec![
                UserAnswer {
                    question_id: "q1".into(),
                    answer_text: "ownership".into(),
                    time_spent_seconds: 30,
                },
                UserAnswer {
                    question_id: "q3".into(),
                    answer_text: "   ".into(),
                    time_spent_seconds: 2,
                },
            ],
            skipped: vec![1],
            result: EvaluationResult {
                score: 40,
                total_questions: 3,
                assessed_proficiency: ProficiencyLevel::Beginner,
                category_scores: BTreeMap::from([("Rust".to_string(), 40)]),
                type_scores: BTreeMap::from([("technical".to_string(), 40)]),
                feedback: "Keep going.".into(),
                recommendations: vec!["Practice more.".into()],
            },
            source: ResultSource::Fallback,
            finish_reason: FinishReason::TimeExpired,
            started_at,
            finished_at: started_at + chrono::Duration::seconds(95),
        }
    }

    #[test]
    fn unanswered_includes_blank_answers() {
        let ids: Vec<_> = record().unanswered().map(|q| q.id.clone()).collect();
        assert_eq!(ids, vec!["q2", "q3"]);
    }

    #[test]
    fn serializes_camel_case() {
        let r = record();
        assert_eq!(r.duration_secs(), 95);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["finishReason"], "time-expired");
        assert_eq!(json["result"]["totalQuestions"], 3);
        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
