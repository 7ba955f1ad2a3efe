//! Records produced by the runner and the grader.
//!
//! Both record types are built from an explicit outcome value, so a
//! response is either answered or failed and a grade is exactly one of
//! skipped, failed or graded. The persisted JSON stays flat.

use super::question::{Question, QuestionId};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reasoning stored on records whose original answer failed.
pub const SKIPPED_REASONING: &str = "Original response failed - no grading performed";

/// Current local time as an ISO-8601 string.
pub fn now_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// What the answering service produced for one question.
pub type AnswerOutcome = std::result::Result<String, String>;

/// One answered (or failed) evaluation question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: QuestionId,
    pub question: String,
    /// Agent answer, or `ERROR: <message>` when the call failed.
    pub response: String,
    #[serde(default)]
    pub expected_dataset: String,
    #[serde(default)]
    pub notes: String,
    /// Wall-clock latency of the answering call in seconds.
    pub duration: f64,
    pub success: bool,
    /// Set exactly when `success` is false.
    pub error: Option<String>,
    pub timestamp: String,
}

impl ResponseRecord {
    pub fn from_outcome(
        question: &Question,
        outcome: AnswerOutcome,
        duration: Duration,
        timestamp: String,
    ) -> Self {
        let (response, success, error) = match outcome {
            Ok(answer) => (answer, true, None),
            Err(message) => (format!("ERROR: {}", message), false, Some(message)),
        };

        Self {
            id: question.id.clone(),
            question: question.question.clone(),
            response,
            expected_dataset: question.dataset.clone().unwrap_or_default(),
            notes: question.notes.clone().unwrap_or_default(),
            duration: duration.as_secs_f64(),
            success,
            error,
            timestamp,
        }
    }
}

/// Free-text judge feedback; judges return either a sentence or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feedback {
    Text(String),
    List(Vec<String>),
}

/// Scores returned by the judge (1-5 scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub accuracy: f64,
    pub completeness: f64,
    pub relevance: f64,
    pub clarity: f64,
    /// Produced by the judge, not computed from the criteria.
    pub overall_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Feedback>,
}

/// State of a graded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    /// The original answer failed; the judge was not called.
    Skipped,
    /// Ground truth was missing or the judge call/reply failed.
    GradingFailed,
    Graded,
}

/// Result of grading a single response.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Skipped,
    Failed {
        ground_truth: Option<String>,
        error: String,
    },
    Graded {
        grade: Grade,
        ground_truth: String,
    },
}

/// A response record together with its grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    #[serde(flatten)]
    pub response: ResponseRecord,
    pub status: GradeStatus,
    pub grade: Option<Grade>,
    pub ground_truth: Option<String>,
    pub grading_reasoning: Option<String>,
    pub grading_error: Option<String>,
    pub graded_at: String,
}

impl GradeRecord {
    pub fn new(response: ResponseRecord, outcome: GradeOutcome, graded_at: String) -> Self {
        let (status, grade, ground_truth, grading_reasoning, grading_error) = match outcome {
            GradeOutcome::Skipped => (
                GradeStatus::Skipped,
                None,
                None,
                Some(SKIPPED_REASONING.to_string()),
                None,
            ),
            GradeOutcome::Failed {
                ground_truth,
                error,
            } => (GradeStatus::GradingFailed, None, ground_truth, None, Some(error)),
            GradeOutcome::Graded {
                grade,
                ground_truth,
            } => {
                let reasoning = grade.reasoning.clone();
                (
                    GradeStatus::Graded,
                    Some(grade),
                    Some(ground_truth),
                    reasoning,
                    None,
                )
            }
        };

        Self {
            response,
            status,
            grade,
            ground_truth,
            grading_reasoning,
            grading_error,
            graded_at,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.status == GradeStatus::Graded
    }

    /// Overall score of a graded record; `None` for skipped or failed ones.
    pub fn overall_score(&self) -> Option<f64> {
        self.grade.as_ref().map(|g| g.overall_score)
    }
}
