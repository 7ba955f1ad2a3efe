//! Evaluation questions and their ground truth.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Question identifier.
///
/// Question files use both numeric and string ids; the original form is
/// kept so that records serialize back exactly as they were read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Number(n) => write!(f, "{}", n),
            QuestionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for QuestionId {
    fn from(n: i64) -> Self {
        QuestionId::Number(n)
    }
}

impl From<i32> for QuestionId {
    fn from(n: i32) -> Self {
        QuestionId::Number(n.into())
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        QuestionId::Text(s.to_string())
    }
}

/// A single evaluation question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// The natural-language question, usually in Czech.
    pub question: String,
    /// Label of the table the question targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Accepted correct answer; required for grading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<String>,
}

impl Question {
    pub fn new(id: impl Into<QuestionId>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            dataset: None,
            notes: None,
            ground_truth: None,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_ground_truth(mut self, ground_truth: impl Into<String>) -> Self {
        self.ground_truth = Some(ground_truth.into());
        self
    }
}

/// Load the ordered question list from a JSON array.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    if !path.exists() {
        return Err(EvalError::QuestionsNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let questions: Vec<Question> = serde_json::from_str(&content).map_err(|e| {
        EvalError::Serialization(format!(
            "Failed to parse questions file {}: {}",
            path.display(),
            e
        ))
    })?;

    if let Some(blank) = questions.iter().find(|q| q.question.trim().is_empty()) {
        return Err(EvalError::InvalidQuestions(format!(
            "question {} in {} has no text",
            blank.id,
            path.display()
        )));
    }

    info!(count = questions.len(), path = %path.display(), "loaded questions");
    Ok(questions)
}

/// Lookup from question id to question, used to find ground truth.
#[derive(Debug, Clone, Default)]
pub struct QuestionIndex {
    by_id: HashMap<QuestionId, Question>,
}

impl QuestionIndex {
    /// Build the index, rejecting duplicate ids.
    pub fn build(questions: Vec<Question>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(questions.len());

        for question in questions {
            if by_id.contains_key(&question.id) {
                return Err(EvalError::DuplicateQuestionId(question.id.to_string()));
            }
            by_id.insert(question.id.clone(), question);
        }

        Ok(Self { by_id })
    }

    /// Load a questions file and index it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::build(load_questions(path)?)
    }

    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_questions_keeps_order_and_optional_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(
            &path,
            r#"[
                {"id": 2, "question": "Kdy je zastupitelstvo?", "dataset": "messages", "ground_truth": "15. května"},
                {"id": "a1", "question": "Kolik stojí poplatek za psa?"}
            ]"#,
        )
        .unwrap();

        let questions = load_questions(&path).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, QuestionId::Number(2));
        assert_eq!(questions[0].dataset.as_deref(), Some("messages"));
        assert_eq!(questions[1].id, QuestionId::Text("a1".to_string()));
        assert!(questions[1].ground_truth.is_none());
        assert!(questions[1].notes.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_questions(Path::new("/nonexistent/questions.json"));
        assert!(matches!(result, Err(EvalError::QuestionsNotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(&path, "[{\"id\": 1,").unwrap();
        assert!(matches!(
            load_questions(&path),
            Err(EvalError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_rejects_blank_question_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(
            &path,
            r#"[{"id": 1, "question": "Kdy je svoz?"}, {"id": "b2", "question": "  "}]"#,
        )
        .unwrap();

        let result = load_questions(&path);
        assert!(matches!(result, Err(EvalError::InvalidQuestions(msg)) if msg.contains("b2")));
    }

    #[test]
    fn test_index_rejects_duplicate_ids() {
        let questions = vec![
            Question::new(1, "first"),
            Question::new(2, "second"),
            Question::new(1, "again"),
        ];
        let result = QuestionIndex::build(questions);
        assert!(matches!(result, Err(EvalError::DuplicateQuestionId(id)) if id == "1"));
    }

    #[test]
    fn test_numeric_and_text_ids_are_distinct() {
        let index = QuestionIndex::build(vec![
            Question::new(1, "numeric"),
            Question::new("1", "text"),
        ])
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&QuestionId::Number(1)).unwrap().question, "numeric");
        assert_eq!(index.get(&QuestionId::from("1")).unwrap().question, "text");
    }

    #[test]
    fn test_id_serializes_in_original_form() {
        assert_eq!(serde_json::to_string(&QuestionId::Number(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&QuestionId::from("q7")).unwrap(), "\"q7\"");
    }
}
