//! LLM-as-judge grading of agent responses against ground truth.

use super::question::{Question, QuestionIndex};
use super::record::{Grade, GradeOutcome, GradeRecord, ResponseRecord, now_timestamp};
use super::results::save_records;
use super::service::JudgingService;
use crate::config::Config;
use crate::error::Result;
use crate::llm::Prompts;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fields a judge reply must contain.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "accuracy",
    "completeness",
    "relevance",
    "clarity",
    "overall_score",
];

/// Characters of the question shown in progress lines.
const PREVIEW_CHARS: usize = 50;

/// Why a judge reply could not be turned into a [`Grade`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeParseError {
    #[error("Failed to parse LLM response as JSON: {0}")]
    Json(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid grade: {0}")]
    Invalid(String),
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(reply: &str) -> &str {
    let reply = reply.trim();

    let Some(rest) = reply.strip_prefix("```") else {
        return reply;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return reply;
    };

    // Drop the info string ("json") on the opening fence line.
    match body.split_once('\n') {
        Some((_, content)) => content.trim(),
        None => {
            let body = body.trim();
            body.strip_prefix("json").map_or(body, str::trim_start)
        }
    }
}

/// Parse a judge reply as a strict JSON grade.
pub fn parse_grade(reply: &str) -> std::result::Result<Grade, GradeParseError> {
    let value: Value = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| GradeParseError::Json(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| GradeParseError::Invalid("expected a JSON object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if object.get(field).is_none_or(Value::is_null) {
            return Err(GradeParseError::MissingField(field));
        }
    }

    serde_json::from_value(value).map_err(|e| GradeParseError::Invalid(e.to_string()))
}

/// Judge prompt template.
#[derive(Debug, Clone)]
pub struct JudgePrompt {
    template: String,
}

impl Default for JudgePrompt {
    fn default() -> Self {
        Self::new(Prompts::judge_prompt())
    }
}

impl JudgePrompt {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Configured prompt file, or the built-in prompt.
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.judge.prompt_file {
            Some(path) => Ok(Self::new(Prompts::load_template(path)?)),
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, response: &ResponseRecord, question: &Question, ground_truth: &str) -> String {
        Prompts::render(
            &self.template,
            &[
                ("question", response.question.as_str()),
                ("ground_truth", ground_truth),
                ("response", response.response.as_str()),
                ("expected_dataset", question.dataset.as_deref().unwrap_or_default()),
                ("notes", question.notes.as_deref().unwrap_or_default()),
            ],
        )
    }
}

/// Grades a list of responses one at a time.
pub struct ResponseGrader {
    judge: Arc<dyn JudgingService>,
    prompt: JudgePrompt,
}

impl ResponseGrader {
    pub fn new(judge: Arc<dyn JudgingService>, prompt: JudgePrompt) -> Self {
        Self { judge, prompt }
    }

    /// Grade every response, preserving input order.
    pub async fn grade(
        &self,
        responses: &[ResponseRecord],
        questions: &QuestionIndex,
    ) -> Vec<GradeRecord> {
        let total = responses.len();
        println!(
            "Grading {} responses using LLM-as-a-judge with ground truth comparison...",
            total
        );

        let mut records = Vec::with_capacity(total);

        for (idx, response) in responses.iter().enumerate() {
            let preview: String = response.question.chars().take(PREVIEW_CHARS).collect();
            println!(
                "[{}/{}] Grading question {}: {}...",
                idx + 1,
                total,
                response.id,
                preview
            );

            let outcome = self.grade_one(response, questions).await;

            match &outcome {
                GradeOutcome::Skipped => println!("  - Skipped (original response failed)"),
                GradeOutcome::Graded { grade, .. } => {
                    println!("  ✓ Graded (Overall: {}/5)", grade.overall_score)
                }
                GradeOutcome::Failed { error, .. } => {
                    warn!(id = %response.id, error = %error, "grading failed");
                    println!("  ✗ Failed: {}", error);
                }
            }

            records.push(GradeRecord::new(response.clone(), outcome, now_timestamp()));
        }

        let graded = records.iter().filter(|r| r.is_graded()).count();
        info!(total, graded, "grading complete");
        records
    }

    /// Grade and write the result list once, at the end.
    pub async fn grade_and_save(
        &self,
        responses: &[ResponseRecord],
        questions: &QuestionIndex,
        output: &Path,
    ) -> Result<Vec<GradeRecord>> {
        let records = self.grade(responses, questions).await;
        save_records(&records, output)?;
        Ok(records)
    }

    async fn grade_one(&self, response: &ResponseRecord, questions: &QuestionIndex) -> GradeOutcome {
        if !response.success {
            return GradeOutcome::Skipped;
        }

        let Some((question, ground_truth)) = questions
            .get(&response.id)
            .and_then(|q| q.ground_truth.as_deref().map(|gt| (q, gt)))
        else {
            return GradeOutcome::Failed {
                ground_truth: None,
                error: format!("No ground truth found for question ID {}", response.id),
            };
        };

        let prompt = self.prompt.render(response, question, ground_truth);

        let reply = match self.judge.judge(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                return GradeOutcome::Failed {
                    ground_truth: Some(ground_truth.to_string()),
                    error: format!("Error during grading: {:#}", e),
                };
            }
        };
        debug!(id = %response.id, chars = reply.len(), "judge replied");

        match parse_grade(&reply) {
            Ok(grade) => GradeOutcome::Graded {
                grade,
                ground_truth: ground_truth.to_string(),
            },
            Err(e) => GradeOutcome::Failed {
                ground_truth: Some(ground_truth.to_string()),
                error: e.to_string(),
            },
        }
    }
}
