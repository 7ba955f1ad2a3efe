//! External services the pipeline talks to.
//!
//! The runner only needs something that answers a question and the grader
//! only needs something that replies to a judge prompt. Production
//! implementations are backed by [`LlmClient`]; tests plug in mocks.

use crate::config::Config;
use crate::data::{DataCatalog, validate_csv_files};
use crate::error::Result;
use crate::llm::{LlmClient, Message, Prompts};
use async_trait::async_trait;
use chrono::Local;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Turns a natural-language question into an answer.
#[async_trait]
pub trait AnsweringService: Send + Sync {
    async fn answer(&self, question: &str) -> anyhow::Result<String>;
}

/// Replies to a fully formatted judge prompt.
#[async_trait]
pub trait JudgingService: Send + Sync {
    async fn judge(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Chat agent answering from the municipal CSV tables.
pub struct ChatAgent {
    client: LlmClient,
    system_template: String,
    data_context: String,
    use_memory: bool,
    /// Earlier user/assistant turns, replayed when memory is on.
    history: Mutex<Vec<Message>>,
}

impl ChatAgent {
    pub fn new(
        client: LlmClient,
        system_template: impl Into<String>,
        data_context: impl Into<String>,
        use_memory: bool,
    ) -> Self {
        Self {
            client,
            system_template: system_template.into(),
            data_context: data_context.into(),
            use_memory,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Validate the configured tables, load them and build the agent.
    pub fn from_config(config: &Config) -> Result<Self> {
        let agent = &config.agent;
        let paths = validate_csv_files(&agent.csv_files, agent.base_path.as_deref())?;
        let catalog = DataCatalog::load(&paths)?;

        let template = match &agent.system_prompt_file {
            Some(path) => Prompts::load_template(path)?,
            None => Prompts::system_prompt().to_string(),
        };

        info!(
            model = %config.llm.model,
            tables = catalog.tables.len(),
            use_memory = agent.use_memory,
            "created chat agent"
        );

        Ok(Self::new(
            LlmClient::new(config.llm.clone()),
            template,
            catalog.render(agent.max_table_chars),
            agent.use_memory,
        ))
    }

    /// System prompt with the current local time filled in.
    fn system_prompt(&self) -> String {
        let current_time = Local::now().format("%Y-%m-%d %H:%M (%:z)").to_string();
        Prompts::render(
            &self.system_template,
            &[
                ("current_time", current_time.as_str()),
                ("data_context", self.data_context.as_str()),
            ],
        )
    }
}

#[async_trait]
impl AnsweringService for ChatAgent {
    async fn answer(&self, question: &str) -> anyhow::Result<String> {
        let mut history = self.history.lock().await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt()));
        if self.use_memory {
            messages.extend(history.iter().cloned());
        }
        messages.push(Message::user(question));

        let response = self.client.chat(messages).await?;
        debug!(
            finish_reason = ?response.finish_reason,
            chars = response.content.len(),
            "agent answered"
        );

        if self.use_memory {
            history.push(Message::user(question));
            history.push(Message::assistant(response.content.clone()));
        }

        Ok(response.content)
    }
}

/// LLM acting as judge.
pub struct LlmJudge {
    client: LlmClient,
}

impl LlmJudge {
    /// Create a new judge with the given LLM client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// Judge on the configured model at the judge temperature.
    pub fn from_config(config: &Config) -> Self {
        let client = LlmClient::new(config.llm.clone())
            .with_model(config.judge_model())
            .with_temperature(config.judge.temperature);
        Self::new(client)
    }
}

#[async_trait]
impl JudgingService for LlmJudge {
    async fn judge(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.client.complete(None, prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    fn agent(template: &str) -> ChatAgent {
        ChatAgent::new(
            LlmClient::new(LlmConfig::default()),
            template,
            "### messages_tyn (0 řádků)",
            true,
        )
    }

    #[test]
    fn test_system_prompt_fills_placeholders() {
        let prompt = agent("čas: {current_time}\n{data_context}").system_prompt();
        assert!(!prompt.contains("{current_time}"));
        assert!(prompt.contains("### messages_tyn"));
        assert!(prompt.starts_with("čas: 20"));
    }

    #[test]
    fn test_agent_from_config_fails_on_missing_tables() {
        let mut config = Config::with_llm("https://api.example.com", "key", "gpt-4o-mini");
        config.agent.csv_files = vec!["/nonexistent/messages_tyn.csv".into()];
        let result = ChatAgent::from_config(&config);
        assert!(matches!(result, Err(crate::error::EvalError::DataSource(_))));
    }

    #[test]
    fn test_agent_from_config_loads_tables() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("messages_tyn.csv"), "title\nSvoz odpadu\n").unwrap();

        let mut config = Config::with_llm("https://api.example.com", "key", "gpt-4o-mini");
        config.agent.csv_files = vec!["messages_tyn.csv".into()];
        config.agent.base_path = Some(dir.path().to_path_buf());

        let agent = ChatAgent::from_config(&config).unwrap();
        assert!(agent.data_context.contains("Svoz odpadu"));
        assert!(agent.system_prompt().contains("Svoz odpadu"));
    }
}
