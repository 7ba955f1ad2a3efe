//! Configuration for the evaluation pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.
//! A `Config` is loaded once, validated, and then handed to the runner and
//! grader explicitly.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM configuration shared by the chat agent and the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name used by the chat agent
    pub model: String,

    /// Maximum tokens for response
    pub max_tokens: u32,

    /// Temperature for the chat agent
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// Settings for the LLM acting as judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Judge model; falls back to `llm.model` when unset.
    pub model: Option<String>,

    /// Low temperature keeps grading consistent between runs.
    pub temperature: f32,

    /// Prompt template file overriding the built-in judge prompt.
    pub prompt_file: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.1,
            prompt_file: None,
        }
    }
}

/// Settings for the chat agent that answers evaluation questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// CSV tables the agent answers from.
    pub csv_files: Vec<PathBuf>,

    /// Directory relative CSV paths are resolved against.
    pub base_path: Option<PathBuf>,

    /// System prompt template file overriding the built-in prompt.
    pub system_prompt_file: Option<PathBuf>,

    /// Keep earlier question/answer turns in the conversation.
    pub use_memory: bool,

    /// Upper bound on the table text placed into the system prompt.
    pub max_table_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            csv_files: vec![
                PathBuf::from("data/data-v2/official_boards_tyn.csv"),
                PathBuf::from("data/data-v2/messages_tyn.csv"),
                PathBuf::from("data/data-v2/editors_tyn.csv"),
            ],
            base_path: None,
            system_prompt_file: None,
            use_memory: true,
            max_table_chars: 120_000,
        }
    }
}

/// Where evaluation inputs and results live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    /// Root directory for `responses/` and `grades/` output files.
    pub results_dir: PathBuf,

    /// Default questions file.
    pub questions_file: PathBuf,

    /// Failure rate above which a run exits with status 2.
    pub failure_threshold: f64,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("eval/results"),
            questions_file: PathBuf::from("eval/questions/eval_questions_with_ground_truth.json"),
            failure_threshold: 0.5,
        }
    }
}

impl EvalSettings {
    pub fn responses_dir(&self) -> PathBuf {
        self.results_dir.join("responses")
    }

    pub fn grades_dir(&self) -> PathBuf {
        self.results_dir.join("grades")
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Judge settings
    pub judge: JudgeConfig,
    /// Chat agent settings
    pub agent: AgentConfig,
    /// Evaluation file locations and thresholds
    pub eval: EvalSettings,
}

impl Config {
    /// Load configuration from environment variables and a config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY / OPENAI_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (`explicit_path`, or ~/.config/chatbot-eval/config.yaml)
    /// 3. Default values
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(EvalError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_from_file(path)?
            }
            None => match Self::config_file_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Override values from environment-style key lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = lookup("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(api_key) = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.llm.api_key = api_key;
        }

        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }

        if let Some(temp) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }

        if let Some(model) = lookup("JUDGE_MODEL") {
            self.judge.model = Some(model);
        }

        if let Some(temp) = lookup("JUDGE_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.judge.temperature = temp;
        }

        if let Some(dir) = lookup("EVAL_RESULTS_DIR") {
            self.eval.results_dir = PathBuf::from(dir);
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "chatbot-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present and in range.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(EvalError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(EvalError::Config(
                "LLM API key is required. Set LLM_API_KEY or OPENAI_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(EvalError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(EvalError::Config(format!(
                "Agent temperature must be between 0.0 and 1.0, got {}",
                self.llm.temperature
            )));
        }

        if !(0.0..=2.0).contains(&self.judge.temperature) {
            return Err(EvalError::Config(format!(
                "Judge temperature must be between 0.0 and 2.0, got {}",
                self.judge.temperature
            )));
        }

        if !(0.0..=1.0).contains(&self.eval.failure_threshold) {
            return Err(EvalError::Config(format!(
                "failure_threshold must be between 0.0 and 1.0, got {}",
                self.eval.failure_threshold
            )));
        }

        if self.agent.csv_files.is_empty() {
            return Err(EvalError::Config(
                "At least one CSV file must be configured for the agent".to_string(),
            ));
        }

        Ok(())
    }

    /// The model the judge runs on.
    pub fn judge_model(&self) -> &str {
        self.judge.model.as_deref().unwrap_or(&self.llm.model)
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.judge.temperature, 0.1);
        assert_eq!(config.agent.csv_files.len(), 3);
        assert!(config.agent.use_memory);
    }

    #[test]
    fn test_validate_fails_without_api_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::with_llm("https://api.example.com", "key", "gpt-4o-mini");
        assert!(config.validate().is_ok());

        config.llm.temperature = 1.5;
        assert!(config.validate().is_err());

        config.llm.temperature = 0.0;
        config.eval.failure_threshold = 1.2;
        assert!(config.validate().is_err());

        config.eval.failure_threshold = 0.5;
        config.agent.csv_files.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
    }

    #[test]
    fn test_env_overrides_and_openai_key_fallback() {
        let vars: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-openai"),
            ("LLM_MODEL", "gpt-4o"),
            ("JUDGE_TEMPERATURE", "0.3"),
            ("LLM_MAX_TOKENS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key, "sk-openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.judge.temperature, 0.3);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.judge_model(), "gpt-4o");
    }

    #[test]
    fn test_llm_api_key_wins_over_openai_key() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "LLM_API_KEY" => Some("primary".to_string()),
            "OPENAI_API_KEY" => Some("fallback".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.api_key, "primary");
    }

    #[test]
    fn test_load_from_yaml_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "llm:\n  api_key: from-file\njudge:\n  model: gpt-4o\neval:\n  failure_threshold: 0.2\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.llm.api_key, "from-file");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.judge_model(), "gpt-4o");
        assert_eq!(config.eval.failure_threshold, 0.2);
        assert_eq!(config.judge.temperature, 0.1);
    }

    #[test]
    fn test_load_with_missing_explicit_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/config.yaml")));
        assert!(matches!(result, Err(EvalError::Config(_))));
    }
}
