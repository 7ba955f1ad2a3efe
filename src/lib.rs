//! Tyn Chatbot Eval - evaluation harness for the Horšovský Týn municipal chatbot.
//!
//! The chatbot answers Czech questions about the town's official notice
//! board, news and website content, which are published as CSV tables.
//! This crate replays a fixed question set through the chat agent and
//! grades every answer with a second LLM acting as judge.
//!
//! # Overview
//!
//! The pipeline has three offline stages, each persisting its output as JSON:
//! 1. Load the evaluation questions (with ground truth)
//! 2. Ask the agent every question, timing each call
//! 3. Grade every successful answer against the ground truth
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use tyn_chatbot_eval::{
//!     config::Config,
//!     eval::{ChatAgent, JudgePrompt, LlmJudge, QuestionIndex, ResponseGrader, ResponseRunner, SummaryStats, load_questions},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     // Ask every question
//!     let questions = load_questions(Path::new("questions.json"))?;
//!     let runner = ResponseRunner::new(Arc::new(ChatAgent::from_config(&config)?));
//!     let report = runner.run_and_save(&questions, Path::new("responses.json")).await?;
//!
//!     // Grade the answers
//!     let grader = ResponseGrader::new(
//!         Arc::new(LlmJudge::from_config(&config)),
//!         JudgePrompt::from_config(&config)?,
//!     );
//!     let index = QuestionIndex::build(questions)?;
//!     let grades = grader.grade(&report.records, &index).await;
//!
//!     SummaryStats::from_records(&grades).print_summary();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **ChatAgent**: answering service over the municipal CSV tables
//! - **LlmJudge**: judging service scoring answers on a 1-5 rubric
//! - **ResponseRunner** / **ResponseGrader**: sequential pipeline stages
//! - **SummaryStats**: aggregate report recomputed from grade records

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod llm;
pub mod logging;

// Re-export commonly used types
pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{
    GradeRecord, Question, ResponseGrader, ResponseRecord, ResponseRunner, SummaryStats,
};
pub use llm::LlmClient;
