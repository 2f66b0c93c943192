//! Per-question and per-session clocks as pure state values.
//!
//! Every reading is recomputed from captured instants; nothing is counted
//! per tick, so late or skipped ticks still produce the right answer. Each
//! transition consumes the state and returns the next one together with the
//! event it fired, if any.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Default whole-session limit.
pub const DEFAULT_SESSION_LIMIT: Duration = Duration::from_secs(3600);
/// Default per-question limit.
pub const DEFAULT_QUESTION_LIMIT: Duration = Duration::from_secs(600);

/// Something a timer decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    /// The question ran out of time without a submission.
    AutoSkip { question_id: String, index: usize },
    /// The session ran out of time.
    AutoFinish,
}

/// Lifecycle of one question's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionTimerStatus {
    /// The question is on screen and the clock is counting.
    Running,
    /// The candidate is elsewhere; the clock resumes on return.
    Paused,
    /// Answer submitted in time. Terminal.
    Submitted,
    /// Time ran out; auto-skip has fired. Terminal.
    Expired,
    /// Stopped by session end or disposal. Terminal.
    Cancelled,
}

/// Countdown for one question, carried across visits.
///
/// `banked` holds the time spent on earlier visits; the visit in progress is
/// read as `now - resumed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionTimer {
    pub index: usize,
    pub limit: Duration,
    pub banked: Duration,
    pub resumed_at: Instant,
    pub status: QuestionTimerStatus,
}

impl QuestionTimer {
    /// A clock that has not run yet.
    pub fn paused(index: usize, limit: Duration, now: Instant) -> Self {
        Self {
            index,
            limit,
            banked: Duration::ZERO,
            resumed_at: now,
            status: QuestionTimerStatus::Paused,
        }
    }

    pub fn start(index: usize, limit: Duration, now: Instant) -> Self {
        Self::paused(index, limit, now).resume(now)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.status {
            QuestionTimerStatus::Running => {
                self.banked + now.saturating_duration_since(self.resumed_at)
            }
            _ => self.banked,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.limit.saturating_sub(self.elapsed(now))
    }

    pub fn is_running(&self) -> bool {
        self.status == QuestionTimerStatus::Running
    }

    /// Running or paused; anything else never counts again.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            QuestionTimerStatus::Running | QuestionTimerStatus::Paused
        )
    }

    /// Start counting again from the banked time. Only a paused clock resumes.
    pub fn resume(self, now: Instant) -> Self {
        if self.status != QuestionTimerStatus::Paused {
            return self;
        }
        Self {
            resumed_at: now,
            status: QuestionTimerStatus::Running,
            ..self
        }
    }

    /// Bank the visit in progress and stop counting.
    pub fn pause(self, now: Instant) -> Self {
        if !self.is_running() {
            return self;
        }
        Self {
            banked: self.elapsed(now),
            status: QuestionTimerStatus::Paused,
            ..self
        }
    }

    /// Advance to `now`. Fires `AutoSkip` once, on the tick that first
    /// observes the limit.
    pub fn tick(self, now: Instant, question_id: &str) -> (Self, Option<TimerEvent>) {
        if !self.is_running() || self.elapsed(now) < self.limit {
            return (self, None);
        }
        let event = TimerEvent::AutoSkip {
            question_id: question_id.to_string(),
            index: self.index,
        };
        (
            Self {
                banked: self.elapsed(now),
                status: QuestionTimerStatus::Expired,
                ..self
            },
            Some(event),
        )
    }

    /// Record a manual submission. No effect once terminal.
    pub fn submit(self, now: Instant) -> Self {
        self.close(now, QuestionTimerStatus::Submitted)
    }

    /// Stop without firing. No effect once terminal.
    pub fn cancel(self, now: Instant) -> Self {
        self.close(now, QuestionTimerStatus::Cancelled)
    }

    fn close(self, now: Instant, status: QuestionTimerStatus) -> Self {
        if self.is_open() {
            Self {
                banked: self.elapsed(now),
                status,
                ..self
            }
        } else {
            self
        }
    }
}

/// Wall clock for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimer {
    pub started_at: Instant,
    pub limit: Duration,
    pub fired: bool,
    pub cancelled: bool,
}

impl SessionTimer {
    pub fn start(limit: Duration, now: Instant) -> Self {
        Self {
            started_at: now,
            limit,
            fired: false,
            cancelled: false,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.limit.saturating_sub(self.elapsed(now))
    }

    pub fn is_active(&self) -> bool {
        !self.fired && !self.cancelled
    }

    /// Advance to `now`. Fires `AutoFinish` exactly once.
    pub fn tick(self, now: Instant) -> (Self, Option<TimerEvent>) {
        if !self.is_active() || self.elapsed(now) < self.limit {
            return (self, None);
        }
        (
            Self {
                fired: true,
                ..self
            },
            Some(TimerEvent::AutoFinish),
        )
    }

    pub fn cancel(self) -> Self {
        Self {
            cancelled: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn question_timer_fires_once_at_limit() {
        let t0 = Instant::now();
        let timer = QuestionTimer::start(2, secs(60), t0);

        let (timer, event) = timer.tick(t0 + secs(59), "q3");
        assert!(event.is_none());
        assert_eq!(timer.remaining(t0 + secs(59)), secs(1));

        let (timer, event) = timer.tick(t0 + secs(60), "q3");
        assert_eq!(
            event,
            Some(TimerEvent::AutoSkip {
                question_id: "q3".into(),
                index: 2
            })
        );
        assert_eq!(timer.status, QuestionTimerStatus::Expired);

        let (_, event) = timer.tick(t0 + secs(61), "q3");
        assert!(event.is_none());
    }

    #[test]
    fn delayed_tick_still_reads_true_elapsed() {
        let t0 = Instant::now();
        let timer = QuestionTimer::start(0, secs(30), t0);
        // one tick, far too late: no counter drift, fires immediately
        let (timer, event) = timer.tick(t0 + secs(95), "q1");
        assert!(event.is_some());
        assert_eq!(timer.elapsed(t0 + secs(95)), secs(95));
        assert_eq!(timer.remaining(t0 + secs(95)), Duration::ZERO);
    }

    #[test]
    fn submit_before_limit_suppresses_auto_skip() {
        let t0 = Instant::now();
        let timer = QuestionTimer::start(0, secs(60), t0).submit(t0 + secs(20));
        assert_eq!(timer.status, QuestionTimerStatus::Submitted);
        assert_eq!(timer.elapsed(t0 + secs(500)), secs(20));

        for s in [60, 61, 600, 6000] {
            let (_, event) = timer.tick(t0 + secs(s), "q1");
            assert!(event.is_none());
        }
    }

    #[test]
    fn terminal_states_are_sticky() {
        let t0 = Instant::now();
        let (expired, _) = QuestionTimer::start(0, secs(1), t0).tick(t0 + secs(1), "q1");
        assert_eq!(expired.submit(t0).status, QuestionTimerStatus::Expired);
        assert_eq!(expired.cancel(t0).status, QuestionTimerStatus::Expired);
        assert_eq!(expired.resume(t0).status, QuestionTimerStatus::Expired);

        let cancelled = QuestionTimer::start(0, secs(1), t0).cancel(t0);
        assert_eq!(cancelled.submit(t0).status, QuestionTimerStatus::Cancelled);
        assert_eq!(cancelled.resume(t0).status, QuestionTimerStatus::Cancelled);
        assert!(cancelled.tick(t0 + secs(5), "q1").1.is_none());
    }

    #[test]
    fn paused_clock_continues_where_it_stopped() {
        let t0 = Instant::now();
        let timer = QuestionTimer::start(0, secs(60), t0).pause(t0 + secs(40));
        assert_eq!(timer.status, QuestionTimerStatus::Paused);
        assert_eq!(timer.remaining(t0 + secs(500)), secs(20));
        assert!(timer.tick(t0 + secs(500), "q1").1.is_none());

        let timer = timer.resume(t0 + secs(500));
        let (timer, event) = timer.tick(t0 + secs(519), "q1");
        assert!(event.is_none());
        let (timer, event) = timer.tick(t0 + secs(520), "q1");
        assert!(event.is_some());
        assert_eq!(timer.elapsed(t0 + secs(999)), secs(60));
    }

    #[test]
    fn session_timer_fires_once() {
        let t0 = Instant::now();
        let timer = SessionTimer::start(DEFAULT_SESSION_LIMIT, t0);

        let (timer, event) = timer.tick(t0 + secs(3599));
        assert!(event.is_none());

        let (timer, event) = timer.tick(t0 + secs(3600));
        assert_eq!(event, Some(TimerEvent::AutoFinish));

        let (_, event) = timer.tick(t0 + secs(7200));
        assert!(event.is_none());
    }

    #[test]
    fn cancelled_session_timer_never_fires() {
        let t0 = Instant::now();
        let timer = SessionTimer::start(secs(10), t0).cancel();
        assert!(timer.tick(t0 + secs(10)).1.is_none());
        assert!(!timer.is_active());
    }

    #[test]
    fn event_serializes_tagged() {
        let json = serde_json::to_value(TimerEvent::AutoSkip {
            question_id: "q1".into(),
            index: 0,
        })
        .unwrap();
        assert_eq!(json["type"], "auto-skip");
        assert_eq!(json["question_id"], "q1");
    }
}
