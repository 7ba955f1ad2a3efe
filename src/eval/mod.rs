//! Evaluation pipeline for the municipal chatbot.
//!
//! This module provides:
//! - Question loading with ground truth
//! - A runner that replays questions through the chat agent
//! - An LLM-as-judge grader and summary statistics over its output

pub mod grader;
pub mod question;
pub mod record;
pub mod results;
pub mod runner;
pub mod service;
pub mod summary;

pub use grader::{GradeParseError, JudgePrompt, ResponseGrader, parse_grade};
pub use question::{Question, QuestionId, QuestionIndex, load_questions};
pub use record::{Grade, GradeOutcome, GradeRecord, GradeStatus, ResponseRecord};
pub use results::{load_records, save_records};
pub use runner::{ResponseRunner, RunReport};
pub use service::{AnsweringService, ChatAgent, JudgingService, LlmJudge};
pub use summary::{EXIT_OVER_THRESHOLD, RunSummary, SummaryStats, exit_code_for};
