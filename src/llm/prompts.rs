//! Prompt templates for the chat agent and the judge.
//!
//! Templates use `{name}` placeholders. Only known placeholders are
//! substituted, so literal JSON braces in a template survive rendering.

use crate::error::{EvalError, Result};
use std::path::Path;

/// Built-in prompt templates.
pub struct Prompts;

impl Prompts {
    /// System prompt for the municipal chatbot.
    ///
    /// Placeholders: `{current_time}`, `{data_context}`.
    pub fn system_prompt() -> &'static str {
        r#"Jsi asistent obce Horšovský Týn. Odpovídáš občanům česky na otázky o úřední desce, aktualitách a obsahu webu města.

Aktuální čas: {current_time}

Máš k dispozici tyto tabulky:
{data_context}

Pravidla:
- Odpovídej pouze na základě dat v tabulkách. Pokud odpověď v datech není, řekni to.
- Při hledání názvů a jmen toleruj drobné překlepy, chybějící diakritiku a různé tvary slov.
- U časových dotazů ("poslední", "letos", "tento měsíc") vycházej z aktuálního času.
- Uveď, ze které tabulky informace pochází, a u dokumentů přidej odkaz, pokud je v datech.
- Odpovídej stručně a věcně."#
    }

    /// LLM-as-judge prompt comparing an answer against the ground truth.
    ///
    /// Placeholders: `{question}`, `{ground_truth}`, `{response}`,
    /// `{expected_dataset}`, `{notes}`.
    pub fn judge_prompt() -> &'static str {
        r#"You are an expert evaluator grading answers of a Czech municipal-data chatbot.
Compare the chatbot's response with the ground truth answer.

Question: {question}

Ground truth answer: {ground_truth}

Chatbot response: {response}

Expected dataset: {expected_dataset}
Notes: {notes}

Score each criterion on a scale from 1 (poor) to 5 (excellent):
- accuracy: are the facts in the response consistent with the ground truth?
- completeness: does the response cover everything the ground truth contains?
- relevance: does the response address the question that was asked?
- clarity: is the response clear and well structured?

Respond in JSON format:
{
    "accuracy": <1-5>,
    "completeness": <1-5>,
    "relevance": <1-5>,
    "clarity": <1-5>,
    "overall_score": <1-5>,
    "reasoning": "<brief explanation>",
    "strengths": ["<strength>", ...],
    "weaknesses": ["<weakness>", ...]
}

Respond with only the JSON, no other text."#
    }

    /// Load a template from a file, rejecting empty templates.
    pub fn load_template(path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(EvalError::Config(format!(
                "Prompt file not found: {}",
                path.display()
            )));
        }

        let template = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        if template.trim().is_empty() {
            return Err(EvalError::Config(format!(
                "Prompt file is empty: {}",
                path.display()
            )));
        }

        Ok(template)
    }

    /// Substitute `{key}` placeholders with values in a single pass.
    ///
    /// Substituted text is never scanned again, so values that themselves
    /// contain `{key}` come through unchanged. Unknown placeholders and
    /// other braces are left as they are.
    pub fn render(template: &str, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let substitution = after.find('}').and_then(|end| {
                let key = &after[..end];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, value)| (*value, end))
            });

            match substitution {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}
