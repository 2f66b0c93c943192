//! Core data model types for practicum.
//!
//! Everything the presentation layer exchanges with the core lives here:
//! session configuration in, questions and answers during the session, and the
//! terminal evaluation result out. Field names serialize in camelCase.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Difficulty tier of a session, and the tier assessed at the end of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    /// Map an overall score onto a tier.
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => ProficiencyLevel::Expert,
            70..=84 => ProficiencyLevel::Advanced,
            55..=69 => ProficiencyLevel::Intermediate,
            _ => ProficiencyLevel::Beginner,
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProficiencyLevel::Beginner => write!(f, "beginner"),
            ProficiencyLevel::Intermediate => write!(f, "intermediate"),
            ProficiencyLevel::Advanced => write!(f, "advanced"),
            ProficiencyLevel::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "junior" | "entry" => Ok(ProficiencyLevel::Beginner),
            "intermediate" | "mid" => Ok(ProficiencyLevel::Intermediate),
            "advanced" | "senior" => Ok(ProficiencyLevel::Advanced),
            "expert" | "staff" | "principal" => Ok(ProficiencyLevel::Expert),
            other => Err(format!("unknown proficiency level: {other}")),
        }
    }
}

/// Immutable input describing the session to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Target role, e.g. "Backend Engineer".
    pub role: String,
    /// Target company. May be empty.
    #[serde(default)]
    pub company: String,
    /// Skills to cover. Expected to hold at least one entry.
    pub skills: Vec<String>,
    pub proficiency_level: ProficiencyLevel,
    /// Exact number of questions to produce.
    pub number_of_questions: usize,
    /// Question type tags to distribute across. Expected non-empty.
    pub question_types: Vec<String>,
}

impl SessionConfig {
    /// Report problems a collaborator should fix before starting a session.
    ///
    /// The generator tolerates every issue listed here, so an empty result is
    /// advisory rather than required.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.role.trim().is_empty() {
            issues.push("role is empty".to_string());
        }
        if self.skills.iter().all(|s| s.trim().is_empty()) {
            issues.push("at least one skill is required".to_string());
        }
        if self.question_types.iter().all(|t| t.trim().is_empty()) {
            issues.push("at least one question type is required".to_string());
        }
        if self.number_of_questions == 0 {
            issues.push("numberOfQuestions must be at least 1".to_string());
        }

        issues
    }

    /// Skills with blanks removed; falls back to the role when none remain.
    pub fn effective_skills(&self) -> Vec<String> {
        let skills: Vec<String> = self
            .skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !skills.is_empty() {
            return skills;
        }
        let role = self.role.trim();
        if role.is_empty() {
            vec!["general".to_string()]
        } else {
            vec![role.to_string()]
        }
    }

    /// Question types with blanks and case-insensitive duplicates removed.
    pub fn effective_question_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for t in &self.question_types {
            let t = t.trim();
            if t.is_empty() || types.iter().any(|seen| seen.eq_ignore_ascii_case(t)) {
                continue;
            }
            types.push(t.to_string());
        }
        if types.is_empty() {
            types.push("technical".to_string());
        }
        types
    }
}

/// A generated interview question. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub category: String,
    pub difficulty: ProficiencyLevel,
    #[serde(default)]
    pub sample_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub links: Vec<String>,
}

impl Question {
    /// Text key used for uniqueness checks within a session.
    pub fn normalized_text(&self) -> String {
        normalize_text(&self.text)
    }
}

/// Lower-case and trim question text for duplicate detection.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether a question type tag denotes hands-on coding or technical work.
pub fn is_code_type(question_type: &str) -> bool {
    let t = question_type.to_lowercase();
    t.contains("coding") || t.contains("technical") || t.contains("code")
}

/// The latest answer a candidate submitted for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub answer_text: String,
    pub time_spent_seconds: u64,
}

impl UserAnswer {
    /// An answer only counts when it has non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.answer_text.trim().is_empty()
    }
}

/// Terminal scoring result of a session. All scores lie in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub score: u8,
    pub total_questions: usize,
    pub assessed_proficiency: ProficiencyLevel,
    /// Keyed by every category present in the question set, no others.
    pub category_scores: BTreeMap<String, u8>,
    /// Keyed by every question type present in the question set, no others.
    pub type_scores: BTreeMap<String, u8>,
    pub feedback: String,
    pub recommendations: Vec<String>,
}

/// Where a terminal value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Parsed from the completion service response.
    Model,
    /// Computed locally after the completion service failed.
    Fallback,
}
