//! practicum-core: question generation, session clocks, answers and scoring.
//!
//! This crate holds the data model, the completion-provider trait and every
//! piece of interview-session logic. It does no I/O of its own; HTTP backends
//! live in `practicum-providers` and persistence in `practicum-report`.

pub mod answers;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod model;
pub mod navigation;
pub mod payload;
pub mod practice;
pub mod question_bank;
pub mod record;
pub mod retry;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod traits;
