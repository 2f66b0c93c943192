//! Deterministic question templates used when the model cannot supply enough
//! questions.
//!
//! Text is a pure function of `(index, skill, question type)`: a
//! type-specific verb list and topic list are cycled by index. Verb and topic
//! list lengths are coprime so consecutive indices walk every pairing before
//! repeating.

use crate::model::{is_code_type, ProficiencyLevel, Question};

/// Broad family a free-form question type tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Coding,
    Concepts,
    SystemDesign,
    Behavioral,
    General,
}

impl QuestionKind {
    pub fn of(question_type: &str) -> Self {
        let t = question_type.to_lowercase();
        if t.contains("behav") || t.contains("situation") {
            QuestionKind::Behavioral
        } else if t.contains("design") || t.contains("architect") {
            QuestionKind::SystemDesign
        } else if t.contains("concept") || t.contains("theory") {
            QuestionKind::Concepts
        } else if is_code_type(&t) {
            QuestionKind::Coding
        } else {
            QuestionKind::General
        }
    }

    fn verbs(self) -> &'static [&'static str] {
        match self {
            QuestionKind::Coding => &["Implement", "Write", "Refactor", "Optimize", "Debug"],
            QuestionKind::Concepts => &["Explain", "Compare", "Describe", "Critique"],
            QuestionKind::SystemDesign => &["Design", "Architect", "Outline", "Scale"],
            QuestionKind::Behavioral => &["Tell me about", "Describe", "Walk me through", "Share"],
            QuestionKind::General => &["Discuss", "Summarize", "Evaluate"],
        }
    }

    fn topics(self) -> &'static [&'static str] {
        match self {
            QuestionKind::Coding => &[
                "a function that removes duplicates from a list while keeping order",
                "an LRU cache with O(1) lookups",
                "a token-bucket rate limiter",
                "cursor-based pagination over a large result set",
                "a parser for a simple key=value configuration file",
                "a retry helper with exponential backoff",
                "a function that merges overlapping intervals",
            ],
            QuestionKind::Concepts => &[
                "memory management",
                "error handling",
                "concurrency primitives",
                "testing strategies",
                "performance trade-offs",
                "state management",
                "dependency management",
                "API versioning",
                "security hardening",
            ],
            QuestionKind::SystemDesign => &[
                "a URL shortener",
                "a real-time chat service",
                "a notification delivery pipeline",
                "a metrics ingestion backend",
                "a file upload service",
                "a job scheduling system",
                "a feature flag service",
            ],
            QuestionKind::Behavioral => &[
                "disagreed with a technical decision",
                "had to learn a new tool under a tight deadline",
                "mentored a less experienced teammate",
                "handled an ambiguous requirement",
                "recovered from a production incident",
                "pushed back on scope",
                "received difficult feedback",
                "improved a slow team process",
                "balanced quality against delivery speed",
            ],
            QuestionKind::General => &[
                "the strengths",
                "the most common pitfalls",
                "recent changes in the ecosystem",
                "the learning path",
                "the tooling",
                "the debugging workflow",
                "the deployment story",
                "the community practices",
            ],
        }
    }
}

/// Question text for one fallback slot, before any collision suffix.
pub fn fallback_text(index: usize, skill: &str, question_type: &str, role: &str) -> String {
    let kind = QuestionKind::of(question_type);
    let verbs = kind.verbs();
    let topics = kind.topics();
    let verb = verbs[index % verbs.len()];
    let topic = topics[index % topics.len()];

    match kind {
        QuestionKind::Coding => format!("{verb} {topic} using {skill}."),
        QuestionKind::Concepts => format!("{verb} how {skill} approaches {topic}."),
        QuestionKind::SystemDesign => {
            format!("{verb} {topic} where {skill} is a core part of the stack.")
        }
        QuestionKind::Behavioral => {
            format!("{verb} a time you {topic} while working as a {role} with {skill}.")
        }
        QuestionKind::General => format!("{verb} {topic} of {skill} for a {role}."),
    }
}

/// Build a complete fallback question with the given text.
pub fn fallback_question(
    text: String,
    skill: &str,
    question_type: &str,
    difficulty: ProficiencyLevel,
) -> Question {
    let kind = QuestionKind::of(question_type);
    let (sample_answer, explanation) = match kind {
        QuestionKind::Coding => (
            format!(
                "State the input/output contract, write a working {skill} solution, \
                 then walk through edge cases and its time and space complexity."
            ),
            "Assesses the ability to turn a requirement into correct, readable code.".to_string(),
        ),
        QuestionKind::Concepts => (
            format!(
                "Define the concept, show how {skill} applies it with a concrete example, \
                 and name the trade-offs compared to alternatives."
            ),
            "Assesses depth of understanding beyond surface-level definitions.".to_string(),
        ),
        QuestionKind::SystemDesign => (
            format!(
                "Clarify requirements, sketch the components and data flow, justify where \
                 {skill} fits, then discuss scaling, failure modes and monitoring."
            ),
            "Assesses structured thinking about architecture and trade-offs.".to_string(),
        ),
        QuestionKind::Behavioral => (
            "Use the STAR format: the situation, your task, the actions you took and the \
             measurable result, plus what you would do differently."
                .to_string(),
            "Assesses ownership, communication and reflection.".to_string(),
        ),
        QuestionKind::General => (
            format!("Give a concise overview of {skill} backed by one or two concrete examples."),
            "Assesses breadth of practical knowledge.".to_string(),
        ),
    };

    Question {
        id: String::new(),
        text,
        question_type: question_type.to_string(),
        category: skill.to_string(),
        difficulty,
        sample_answer,
        explanation,
        links: Vec::new(),
    }
}
