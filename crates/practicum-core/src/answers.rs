//! Latest answer per question, independent of navigation order.

use std::collections::{BTreeSet, HashMap};

use crate::model::UserAnswer;

/// Holds one live answer per question and the set of skipped positions.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    /// Question ids in session order; positions index into this.
    order: Vec<String>,
    answers: HashMap<String, UserAnswer>,
    skipped: BTreeSet<usize>,
}

impl AnswerStore {
    pub fn new(question_ids: Vec<String>) -> Self {
        Self {
            order: question_ids,
            ..Default::default()
        }
    }

    /// Insert or replace the answer for `question_id`. A non-blank answer
    /// clears the question's skip flag.
    pub fn submit(&mut self, question_id: &str, text: &str, time_spent_seconds: u64) {
        if !text.trim().is_empty() {
            if let Some(index) = self.position(question_id) {
                self.skipped.remove(&index);
            }
        }
        self.answers.insert(
            question_id.to_string(),
            UserAnswer {
                question_id: question_id.to_string(),
                answer_text: text.to_string(),
                time_spent_seconds,
            },
        );
    }

    pub fn get(&self, question_id: &str) -> Option<&UserAnswer> {
        self.answers.get(question_id)
    }

    /// Mark a position as skipped. Does not touch any stored answer.
    pub fn skip(&mut self, index: usize) {
        if index < self.order.len() {
            self.skipped.insert(index);
        }
    }

    pub fn is_skipped(&self, index: usize) -> bool {
        self.skipped.contains(&index)
    }

    /// Skipped positions in ascending order.
    pub fn skipped(&self) -> impl Iterator<Item = usize> + '_ {
        self.skipped.iter().copied()
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// All current answers, in question order, one per question.
    pub fn list_answers(&self) -> Vec<UserAnswer> {
        let mut listed: Vec<UserAnswer> = self
            .order
            .iter()
            .filter_map(|id| self.answers.get(id).cloned())
            .collect();
        // answers for ids outside the session order go last, by id
        let mut extra: Vec<&UserAnswer> = self
            .answers
            .values()
            .filter(|a| self.position(&a.question_id).is_none())
            .collect();
        extra.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        listed.extend(extra.into_iter().cloned());
        listed
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    fn position(&self, question_id: &str) -> Option<usize> {
        self.order.iter().position(|id| id == question_id)
    }
}
