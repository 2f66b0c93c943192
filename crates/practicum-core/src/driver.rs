//! Live clocks for an [`InterviewSession`].
//!
//! Two independent tokio tasks tick the question and session timers on a
//! fixed interval and forward whatever fires over a channel. The tasks stop
//! on their own once the session is no longer active, and are aborted on
//! [`TimerDriver::dispose`] or drop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::InterviewSession;
use crate::timer::TimerEvent;

/// A session shared between the driver tasks and the presentation layer.
pub type SharedSession = Arc<Mutex<InterviewSession>>;

/// Default tick interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Lock a shared session, recovering from a poisoned mutex.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, InterviewSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TimerDriver {
    session: SharedSession,
    question_task: JoinHandle<()>,
    session_task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl TimerDriver {
    /// Spawn both tick tasks. Must be called inside a tokio runtime.
    pub fn spawn(session: SharedSession, tick: Duration) -> Self {
        let (tx, events) = mpsc::unbounded_channel();

        let question_task = tokio::spawn(tick_loop(
            session.clone(),
            tick,
            tx.clone(),
            InterviewSession::tick_question,
        ));
        let session_task = tokio::spawn(tick_loop(
            session.clone(),
            tick,
            tx,
            InterviewSession::tick_session,
        ));

        Self {
            session,
            question_task,
            session_task,
            events,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Wait for the next timer event. `None` once both tasks have stopped.
    pub async fn next_event(&mut self) -> Option<TimerEvent> {
        self.events.recv().await
    }

    /// Take an event that already fired, without waiting.
    pub fn try_next_event(&mut self) -> Option<TimerEvent> {
        self.events.try_recv().ok()
    }

    /// Stop both tasks, dispose the session and drop undelivered events.
    pub fn dispose(&mut self) {
        self.question_task.abort();
        self.session_task.abort();
        lock(&self.session).dispose();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.question_task.abort();
        self.session_task.abort();
    }
}

async fn tick_loop(
    session: SharedSession,
    period: Duration,
    tx: mpsc::UnboundedSender<TimerEvent>,
    step: fn(&mut InterviewSession, Instant) -> Option<TimerEvent>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let event = {
            let mut guard = lock(&session);
            if !guard.is_active() {
                break;
            }
            step(&mut guard, Instant::now())
        };
        if let Some(event) = event {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
}
