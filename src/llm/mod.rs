//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for LLM API calls and
//! the prompts used by the chat agent and the judge.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role};
pub use prompts::Prompts;
