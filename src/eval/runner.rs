//! Replays evaluation questions through the answering service.

use super::question::Question;
use super::record::{ResponseRecord, now_timestamp};
use super::results::save_records;
use super::service::AnsweringService;
use super::summary::RunSummary;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Length of the answer preview printed per question.
const PREVIEW_CHARS: usize = 100;

/// Records and counts of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<ResponseRecord>,
    pub summary: RunSummary,
}

/// Asks every question in turn and records the outcome.
///
/// Calls are strictly sequential: each answer completes (or fails) before
/// the next question is sent. A failing question is recorded and the run
/// moves on; nothing is retried.
pub struct ResponseRunner {
    service: Arc<dyn AnsweringService>,
}

impl ResponseRunner {
    pub fn new(service: Arc<dyn AnsweringService>) -> Self {
        Self { service }
    }

    /// Run all questions, preserving input order.
    pub async fn run(&self, questions: &[Question]) -> RunReport {
        let total = questions.len();
        println!("Running {} evaluation questions...", total);
        println!("{}", "-".repeat(60));

        let mut records = Vec::with_capacity(total);

        for (idx, question) in questions.iter().enumerate() {
            println!(
                "[{}/{}] Question {}: {}",
                idx + 1,
                total,
                question.id,
                question.question
            );

            let record = self.answer_one(question).await;

            if record.success {
                println!("  ✓ Completed in {:.2} seconds", record.duration);
                let preview: String = record
                    .response
                    .replace('\n', " ")
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect();
                println!("  Preview: {}...", preview);
            } else {
                let error = record.error.as_deref().unwrap_or_default();
                warn!(id = %question.id, error = %error, "question failed");
                println!("  ✗ Failed in {:.2} seconds: {}", record.duration, error);
            }
            println!();

            records.push(record);
        }

        let summary = RunSummary::from_records(&records);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "evaluation run complete"
        );

        RunReport { records, summary }
    }

    /// Run all questions and write the records once, at the end.
    ///
    /// If the returned future is dropped before completion, no output file
    /// is created.
    pub async fn run_and_save(&self, questions: &[Question], output: &Path) -> Result<RunReport> {
        let report = self.run(questions).await;
        save_records(&report.records, output)?;
        Ok(report)
    }

    async fn answer_one(&self, question: &Question) -> ResponseRecord {
        let start = Instant::now();
        let outcome = self
            .service
            .answer(&question.question)
            .await
            .map_err(|e| format!("{:#}", e));
        let duration = start.elapsed();

        ResponseRecord::from_outcome(question, outcome, duration, now_timestamp())
    }
}
