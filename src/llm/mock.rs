//! Mock LLM client for testing and `--mock` mode.
//!
//! Provides deterministic responses and records every prompt it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AskError, Result};
use crate::llm::prompt::{ANSWER_LABEL, ROUTING_MARKER, SQL_QUERY_LABEL, SQL_RESULT_LABEL};
use crate::llm::types::{last_user_content, Message};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses.
///
/// Resolution order for each call: the next queued outcome, then the first
/// custom pattern contained in the prompt, then a default derived from the
/// prompt's shape (routing, SQL generation or summarization).
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Outcomes returned in order before any pattern matching.
    queued: Mutex<VecDeque<std::result::Result<String, String>>>,
    /// Every prompt received, in order.
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the prompt contains `pattern` (case-insensitive), the mock
    /// returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Queues a completion for the next call.
    pub fn then_return(self, response: impl Into<String>) -> Self {
        lock(&self.queued).push_back(Ok(response.into()));
        self
    }

    /// Queues a failure for the next call.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        lock(&self.queued).push_back(Err(message.into()));
        self
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Number of prompts that contained `marker`.
    pub fn calls_containing(&self, marker: &str) -> usize {
        lock(&self.prompts)
            .iter()
            .filter(|p| p.contains(marker))
            .count()
    }

    /// Number of routing prompts received.
    pub fn routing_calls(&self) -> usize {
        self.calls_containing(ROUTING_MARKER)
    }

    fn custom_response(&self, prompt: &str) -> Option<String> {
        let prompt_lower = prompt.to_lowercase();
        self.custom_responses
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(&pattern.to_lowercase()))
            .map(|(_, response)| response.clone())
    }

    /// Generates a default response based on the prompt's shape.
    fn default_response(prompt: &str) -> String {
        if prompt.contains(ROUTING_MARKER) {
            return default_route(prompt);
        }

        if prompt.trim_end().ends_with(ANSWER_LABEL) {
            let rows = prompt
                .rsplit_once(SQL_RESULT_LABEL)
                .map(|(_, rest)| rest.trim_end().trim_end_matches(ANSWER_LABEL).trim())
                .unwrap_or("[]");
            return format!(" The query returned {rows}.");
        }

        if prompt.trim_end().ends_with(SQL_QUERY_LABEL) {
            return match first_created_table(prompt) {
                Some(table) => format!(" SELECT COUNT(*) FROM \"{table}\""),
                None => " SELECT 1".to_string(),
            };
        }

        "I don't know how to answer that.".to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let prompt = last_user_content(messages).to_string();
        lock(&self.prompts).push(prompt.clone());

        if let Some(outcome) = lock(&self.queued).pop_front() {
            return outcome.map_err(AskError::llm);
        }

        Ok(self
            .custom_response(&prompt)
            .unwrap_or_else(|| Self::default_response(&prompt)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Answers a routing prompt with the first descriptor line's database and table.
fn default_route(prompt: &str) -> String {
    let first = prompt.lines().find_map(|line| {
        let parts: Vec<&str> = line.split('|').collect();
        (parts.len() == 4).then(|| (parts[1].to_string(), parts[2].to_string()))
    });

    match first {
        Some((database, table)) => {
            format!("database == {database}\ndatabase.table == {database}.{table}")
        }
        None => "database == default".to_string(),
    }
}

/// Name of the first `CREATE TABLE` in the prompt's table info.
fn first_created_table(prompt: &str) -> Option<String> {
    let rest = prompt.split_once("CREATE TABLE ")?.1;
    let name = rest.split_whitespace().next()?;
    Some(name.trim_matches('"').to_string())
}
