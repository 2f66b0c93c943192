//! End-to-end practice flow: generate, run, evaluate, persist.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::instrument;

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::evaluator::EvaluationEngine;
use crate::generator::QuestionGenerator;
use crate::model::SessionConfig;
use crate::record::SessionRecord;
use crate::session::{FinishedSession, InterviewSession, SessionLimits};
use crate::traits::ResultSink;

/// Wires a generator, an evaluator and an optional sink together.
pub struct PracticeService {
    generator: QuestionGenerator,
    evaluator: EvaluationEngine,
    sink: Option<Arc<dyn ResultSink>>,
    limits: SessionLimits,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PracticeService {
    pub fn new(generator: QuestionGenerator, evaluator: EvaluationEngine) -> Self {
        Self {
            generator,
            evaluator,
            sink: None,
            limits: SessionLimits::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// A service that never calls out: fallback questions and local scoring.
    pub fn offline() -> Self {
        Self::new(QuestionGenerator::offline(), EvaluationEngine::offline())
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Receives sink failures. Generator and evaluator keep their own.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Generate questions and start the clocks once they are ready.
    #[instrument(skip_all, fields(role = %config.role, questions = config.number_of_questions))]
    pub async fn prepare(&self, config: SessionConfig) -> InterviewSession {
        let questions = self.generator.generate(&config).await;
        InterviewSession::start(config, questions, self.limits, Instant::now())
    }

    /// Evaluate a finished session and hand the record to the sink.
    ///
    /// A sink failure is reported through diagnostics; the record is
    /// returned regardless.
    #[instrument(skip_all, fields(session_id = %finished.id))]
    pub async fn complete(&self, finished: FinishedSession) -> SessionRecord {
        let report = self
            .evaluator
            .evaluate_with_report(&finished.questions, &finished.answers, &finished.config)
            .await;
        let record = SessionRecord::new(finished, report);

        if let Some(sink) = &self.sink {
            match sink.persist(&record).await {
                Ok(()) => tracing::info!(sink = sink.name(), "session record persisted"),
                Err(e) => self
                    .diagnostics
                    .on_sink_error(&record.id.to_string(), &format!("{e:#}")),
            }
        }
        record
    }
}
