//! One candidate's interview, from the first question to finish.
//!
//! `InterviewSession` is synchronous and takes `now` on every time-dependent
//! call, so tests can drive it deterministically. [`crate::driver`] runs the
//! live tick tasks on top of it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::answers::AnswerStore;
use crate::error::SessionError;
use crate::model::{Question, SessionConfig, UserAnswer};
use crate::navigation::Navigator;
use crate::timer::{
    QuestionTimer, SessionTimer, TimerEvent, DEFAULT_QUESTION_LIMIT, DEFAULT_SESSION_LIMIT,
};

/// Time limits applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub question: Duration,
    pub session: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            question: DEFAULT_QUESTION_LIMIT,
            session: DEFAULT_SESSION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Finished,
    Disposed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The candidate pressed finish.
    Completed,
    /// The session clock ran out.
    TimeExpired,
}

/// Everything evaluation and persistence need from a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedSession {
    pub id: Uuid,
    pub config: SessionConfig,
    pub questions: Vec<Question>,
    pub answers: Vec<UserAnswer>,
    pub skipped: Vec<usize>,
    pub reason: FinishReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Live state of one interview.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    id: Uuid,
    config: SessionConfig,
    questions: Vec<Question>,
    store: AnswerStore,
    nav: Navigator,
    draft: String,
    limits: SessionLimits,
    /// One clock per question, indexed like `questions`.
    question_timers: Vec<QuestionTimer>,
    session_timer: SessionTimer,
    visit_started_at: Instant,
    status: SessionStatus,
    reason: Option<FinishReason>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    /// Start the session clock and the first question.
    pub fn start(
        config: SessionConfig,
        questions: Vec<Question>,
        limits: SessionLimits,
        now: Instant,
    ) -> Self {
        let ids = questions.iter().map(|q| q.id.clone()).collect();
        let question_timers = (0..questions.len())
            .map(|i| QuestionTimer::paused(i, limits.question, now))
            .collect();
        let mut session = Self {
            id: Uuid::new_v4(),
            config,
            store: AnswerStore::new(ids),
            nav: Navigator::new(questions.len()),
            questions,
            draft: String::new(),
            limits,
            question_timers,
            session_timer: SessionTimer::start(limits.session, now),
            visit_started_at: now,
            status: SessionStatus::Active,
            reason: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        if !session.questions.is_empty() {
            session.arrive(0, now);
        }
        tracing::info!(session_id = %session.id, questions = session.questions.len(), "session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn current_index(&self) -> usize {
        self.nav.current()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.nav.current())
    }

    /// Unsaved text for the current question.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.draft = text.into();
        Ok(())
    }

    pub fn answer(&self, question_id: &str) -> Option<&UserAnswer> {
        self.store.get(question_id)
    }

    pub fn answers(&self) -> Vec<UserAnswer> {
        self.store.list_answers()
    }

    pub fn is_skipped(&self, index: usize) -> bool {
        self.store.is_skipped(index)
    }

    pub fn skipped(&self) -> Vec<usize> {
        self.store.skipped().collect()
    }

    /// Clock of the current question.
    pub fn question_timer(&self) -> Option<&QuestionTimer> {
        self.question_timers.get(self.nav.current())
    }

    /// Time left on the current question, if its clock is running.
    pub fn question_remaining(&self, now: Instant) -> Option<Duration> {
        self.question_timer()
            .filter(|t| t.is_running())
            .map(|t| t.remaining(now))
    }

    pub fn session_remaining(&self, now: Instant) -> Duration {
        self.session_timer.remaining(now)
    }

    pub fn has_next(&self) -> bool {
        self.nav.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.nav.has_previous()
    }

    pub fn can_review_skipped(&self) -> bool {
        self.is_active() && self.nav.initial_pass_complete() && self.store.has_skipped()
    }

    pub fn can_finish(&self) -> bool {
        self.is_active() && self.nav.initial_pass_complete()
    }

    /// Save the draft as the answer to the current question.
    ///
    /// A blank draft is stored but does not count as answering: the clock
    /// keeps running and a skip mark stays.
    pub fn submit_current(&mut self, now: Instant) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.check_index(self.nav.current())?;
        self.store_draft(now);
        Ok(())
    }

    /// Mark the current question skipped. Stays on it; the clock keeps running.
    pub fn skip_current(&mut self, _now: Instant) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.store.skip(self.nav.current());
        Ok(())
    }

    /// Move forward. Leaving an unanswered question marks it skipped.
    pub fn next(&mut self, now: Instant) -> Result<usize, SessionError> {
        self.ensure_active()?;
        let target = self.nav.current() + 1;
        self.check_index(target)?;
        if !self.current_is_answered() {
            self.store.skip(self.nav.current());
        }
        self.move_to(target, now)
    }

    pub fn previous(&mut self, now: Instant) -> Result<usize, SessionError> {
        self.ensure_active()?;
        let target = self
            .nav
            .current()
            .checked_sub(1)
            .ok_or(SessionError::IndexOutOfRange {
                index: 0,
                len: self.questions.len(),
            })?;
        self.move_to(target, now)
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) -> Result<usize, SessionError> {
        self.ensure_active()?;
        self.check_index(index)?;
        if index == self.nav.current() {
            return Ok(index);
        }
        self.move_to(index, now)
    }

    /// Go to the next skipped question after the current one, wrapping around.
    pub fn review_skipped(&mut self, now: Instant) -> Result<usize, SessionError> {
        self.ensure_active()?;
        if !self.can_review_skipped() {
            return Err(SessionError::ReviewUnavailable);
        }
        let current = self.nav.current();
        let skipped = self.skipped();
        let target = skipped
            .iter()
            .copied()
            .find(|&i| i > current)
            .or_else(|| skipped.first().copied())
            .ok_or(SessionError::ReviewUnavailable)?;
        if target == current {
            return Ok(target);
        }
        self.move_to(target, now)
    }

    /// Finish at the candidate's request, saving any pending draft first.
    pub fn finish(&mut self, now: Instant) -> Result<FinishedSession, SessionError> {
        self.ensure_active()?;
        if !self.can_finish() {
            return Err(SessionError::FinishUnavailable);
        }
        self.complete(now, FinishReason::Completed);
        self.finished().ok_or(SessionError::NotActive)
    }

    /// Snapshot of a finished session.
    pub fn finished(&self) -> Option<FinishedSession> {
        let (reason, finished_at) = (self.reason?, self.finished_at?);
        Some(FinishedSession {
            id: self.id,
            config: self.config.clone(),
            questions: self.questions.clone(),
            answers: self.store.list_answers(),
            skipped: self.skipped(),
            reason,
            started_at: self.started_at,
            finished_at,
        })
    }

    /// Advance the question clock; auto-skips and moves on when it runs out.
    pub fn tick_question(&mut self, now: Instant) -> Option<TimerEvent> {
        if !self.is_active() {
            return None;
        }
        let current = self.nav.current();
        let timer = *self.question_timers.get(current)?;
        let question_id = self.questions.get(current)?.id.clone();
        let (timer, event) = timer.tick(now, &question_id);
        self.question_timers[current] = timer;

        if event.is_some() {
            tracing::info!(session_id = %self.id, %question_id, "question time expired, skipping");
            self.store.skip(current);
            if let Ok(target) = self.nav.next() {
                self.switch(current, target, now);
            }
        }
        event
    }

    /// Advance the session clock; finishes the session when it runs out.
    pub fn tick_session(&mut self, now: Instant) -> Option<TimerEvent> {
        if !self.is_active() {
            return None;
        }
        let (timer, event) = self.session_timer.tick(now);
        self.session_timer = timer;

        if event.is_some() {
            tracing::info!(session_id = %self.id, "session time expired, finishing");
            self.complete(now, FinishReason::TimeExpired);
        }
        event
    }

    /// Advance both clocks.
    pub fn tick(&mut self, now: Instant) -> Vec<TimerEvent> {
        self.tick_question(now)
            .into_iter()
            .chain(self.tick_session(now))
            .collect()
    }

    /// Cancel both clocks. No timer event can fire afterwards.
    pub fn dispose(&mut self) {
        self.cancel_question_timers(Instant::now());
        self.session_timer = self.session_timer.cancel();
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Disposed;
            tracing::debug!(session_id = %self.id, "session disposed");
        }
    }

    fn complete(&mut self, now: Instant, reason: FinishReason) {
        if self.has_pending_draft() {
            self.store_draft(now);
        }
        self.cancel_question_timers(now);
        self.session_timer = self.session_timer.cancel();
        self.status = SessionStatus::Finished;
        self.reason = Some(reason);
        self.finished_at = Some(Utc::now());
        tracing::info!(
            session_id = %self.id,
            ?reason,
            answered = self.store.len(),
            "session finished"
        );
    }

    /// The draft differs from what is stored. Clearing a stored answer
    /// counts; a blank draft on a never-answered question does not.
    fn has_pending_draft(&self) -> bool {
        let Some(question) = self.current_question() else {
            return false;
        };
        match self.store.get(&question.id) {
            Some(stored) => stored.answer_text != self.draft,
            None => !self.draft.trim().is_empty(),
        }
    }

    /// Upsert the draft for the current question, crediting this visit.
    fn store_draft(&mut self, now: Instant) {
        let current = self.nav.current();
        let Some(question) = self.questions.get(current) else {
            return;
        };
        let id = question.id.clone();
        let earlier = self
            .store
            .get(&id)
            .map(|a| a.time_spent_seconds)
            .unwrap_or(0);
        let this_visit = now.saturating_duration_since(self.visit_started_at).as_secs();
        self.store.submit(&id, &self.draft, earlier + this_visit);
        self.visit_started_at = now;

        if !self.draft.trim().is_empty() {
            if let Some(timer) = self.question_timers.get_mut(current) {
                *timer = timer.submit(now);
            }
        }
        tracing::debug!(question_id = %id, "answer submitted");
    }

    fn cancel_question_timers(&mut self, now: Instant) {
        for timer in &mut self.question_timers {
            *timer = timer.cancel(now);
        }
    }

    fn current_is_answered(&self) -> bool {
        self.current_question()
            .and_then(|q| self.store.get(&q.id))
            .is_some_and(|a| !a.is_blank())
    }

    fn move_to(&mut self, index: usize, now: Instant) -> Result<usize, SessionError> {
        let from = self.nav.current();
        let index = self.nav.jump(index)?;
        self.switch(from, index, now);
        Ok(index)
    }

    /// Pause the clock being left, then arrive at `to`.
    fn switch(&mut self, from: usize, to: usize, now: Instant) {
        if let Some(timer) = self.question_timers.get_mut(from) {
            *timer = timer.pause(now);
        }
        self.arrive(to, now);
    }

    /// Load the stored answer as the draft and resume the question's clock
    /// if it has not finished.
    fn arrive(&mut self, index: usize, now: Instant) {
        let stored = self
            .questions
            .get(index)
            .and_then(|q| self.store.get(&q.id))
            .map(|a| a.answer_text.clone());
        self.visit_started_at = now;
        if let Some(timer) = self.question_timers.get_mut(index) {
            *timer = timer.resume(now);
        }
        self.draft = stored.unwrap_or_default();
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index < self.questions.len() {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            })
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotActive)
        }
    }
}
